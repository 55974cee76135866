//! Context window construction: a token-bounded suffix of the ancestor chain.

use std::collections::HashSet;

use nprovider::{Message, ProviderAdapter, ResolvedConfig, Role, ToolSchema};
use serde_json::Value;

use crate::{BudgetOverflow, ChatError, MessageStore, persist};

/// Replacement text for a tool result that no longer fits the window.
pub const INSUFFICIENT_TOKENS_NOTICE: &str = "The number of tokens is insufficient to complete the service, and calling it again is prohibited";

#[derive(Debug, Clone, Copy)]
pub struct ContextParams<'a> {
    pub system_message: Option<&'a str>,
    pub tools: &'a [ToolSchema],
    pub config: &'a ResolvedConfig,
    /// Build time in epoch milliseconds, used for the `max_time` cutoff.
    pub now_millis: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextWindow {
    pub wire_messages: Vec<Value>,
    /// Retained messages, oldest first, after orphan demotion.
    pub messages: Vec<Message>,
    pub total_tokens: u32,
    pub system_tokens: u32,
    pub tools_tokens: u32,
}

impl ContextWindow {
    pub fn message_tokens(&self) -> u32 {
        self.total_tokens
            .saturating_sub(self.system_tokens)
            .saturating_sub(self.tools_tokens)
    }
}

pub struct ContextBuilder<'a> {
    adapter: &'a dyn ProviderAdapter,
    store: &'a dyn MessageStore,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(adapter: &'a dyn ProviderAdapter, store: &'a dyn MessageStore) -> Self {
        Self { adapter, store }
    }

    /// Walks from `leaf` towards the root, newest first, until a bound is hit.
    ///
    /// A leaf without contents marks a continuation turn: it is not sent but its
    /// parent chain is.
    pub async fn build(
        &self,
        leaf: &Message,
        params: ContextParams<'_>,
    ) -> Result<ContextWindow, ChatError> {
        let backend = self.adapter.backend().as_str();
        let estimator = self.adapter.estimator();
        let config = params.config;

        let system_tokens = params
            .system_message
            .filter(|text| !text.is_empty())
            .map(|text| estimator.estimate_text(&[text]))
            .unwrap_or_default();
        let tools_tokens = estimator.estimate_tools(params.tools);
        let budget =
            config.input_budget() - i64::from(system_tokens) - i64::from(tools_tokens);

        let include_leaf = leaf.contents.is_some();
        let leaf_tokens = if include_leaf {
            match leaf.tokens_for(backend) {
                Some(tokens) if tokens > 0 => tokens,
                _ => estimator.estimate_message(leaf),
            }
        } else {
            0
        };

        if budget - i64::from(leaf_tokens) < 1 {
            return Err(ChatError::budget(BudgetOverflow {
                system_tokens,
                tools_tokens,
                message_tokens: leaf_tokens,
                budget,
            }));
        }

        let mut newest_first = Vec::new();
        let mut running = i64::from(leaf_tokens);
        let mut user_count = 0_u32;
        if include_leaf {
            if leaf.role == Role::User {
                user_count += 1;
            }
            newest_first.push(leaf.clone().with_tokens(backend, leaf_tokens));
        }

        let mut next_parent = leaf.parent_id.clone();
        while let Some(parent_id) = next_parent.take() {
            let Some(mut candidate) = self.store.load(&parent_id).await? else {
                break;
            };

            if candidate.role == Role::User
                && config.max_count > 0
                && user_count + 1 > config.max_count
            {
                break;
            }

            if config.max_time > 0
                && candidate.created_time > 0
                && candidate.created_time.saturating_add(config.max_time) < params.now_millis
            {
                break;
            }

            let cached = candidate.tokens_for(backend).filter(|tokens| *tokens > 0);
            let mut tokens = match cached {
                Some(tokens) => tokens,
                None => {
                    let tokens = estimator.estimate_message(&candidate);
                    candidate = persist(self.store, candidate.with_tokens(backend, tokens)).await?;
                    tokens
                }
            };

            if running + i64::from(tokens) > budget {
                if candidate.tool_call_id.is_none() {
                    break;
                }

                candidate.set_text(INSUFFICIENT_TOKENS_NOTICE);
                tokens = estimator.estimate_message(&candidate);
                if running + i64::from(tokens) > budget {
                    break;
                }
                candidate.tokens.insert(backend.to_string(), tokens);
            }

            running += i64::from(tokens);
            if candidate.role == Role::User {
                user_count += 1;
            }
            next_parent = candidate.parent_id.clone();
            newest_first.push(candidate);
        }

        newest_first.reverse();
        let messages = demote_orphaned_tool_results(newest_first);
        let wire_messages = self.adapter.convert_messages(&messages, config)?;
        let message_tokens = u32::try_from(running).unwrap_or(u32::MAX);

        Ok(ContextWindow {
            wire_messages,
            messages,
            total_tokens: system_tokens
                .saturating_add(message_tokens)
                .saturating_add(tools_tokens),
            system_tokens,
            tools_tokens,
        })
    }
}

/// Tool results whose call was pruned from the window are sent as plain
/// assistant text.
pub fn demote_orphaned_tool_results(mut messages: Vec<Message>) -> Vec<Message> {
    let issued = messages
        .iter()
        .flat_map(|message| message.tool_calls.iter().map(|call| call.id.clone()))
        .collect::<HashSet<_>>();

    for message in &mut messages {
        if message.role != Role::Tool {
            continue;
        }

        let answered = message
            .tool_call_id
            .as_ref()
            .is_some_and(|id| issued.contains(id));
        if !answered {
            message.role = Role::Assistant;
            message.tool_call_id = None;
        }
    }

    messages
}
