//! Stable engine construction surface for facade consumers.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::{
    BackendId, ChatEngine, EstimatorProfile, HttpTransport, MessageStore, ProviderAdapter,
    ProviderError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(90),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Wires the backend adapter, a reqwest-backed transport, and `store` into an
/// engine. Credentials and endpoints come from `ChatCallbacks::on_config` per send.
pub fn build_engine(
    backend: BackendId,
    store: Arc<dyn MessageStore>,
    config: TransportConfig,
) -> Result<ChatEngine, ProviderError> {
    let http = Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|err| ProviderError::transport(err.to_string()))?;
    let transport = Arc::new(HttpTransport::new(http));

    Ok(ChatEngine::new(build_adapter(backend)?, transport).with_store(store))
}

pub fn build_adapter(backend: BackendId) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
    build_adapter_with_profile(backend, None)
}

/// Like [`build_adapter`], replacing the backend's default estimator profile.
pub fn build_adapter_with_profile(
    backend: BackendId,
    profile: Option<EstimatorProfile>,
) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
    match backend {
        BackendId::OpenAi => build_openai_adapter(profile),
        BackendId::Gemini => build_gemini_adapter(profile),
    }
}

#[cfg(feature = "provider-openai")]
fn build_openai_adapter(
    profile: Option<EstimatorProfile>,
) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
    use nprovider::ProfileEstimator;
    use nprovider::adapters::openai::OpenAiAdapter;

    let adapter = match profile {
        Some(profile) => OpenAiAdapter::new().with_estimator(ProfileEstimator::new(profile)),
        None => OpenAiAdapter::new(),
    };
    Ok(Arc::new(adapter))
}

#[cfg(not(feature = "provider-openai"))]
fn build_openai_adapter(
    _profile: Option<EstimatorProfile>,
) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
    Err(ProviderError::invalid_request(
        "provider-openai feature is not enabled on nexus",
    ))
}

#[cfg(feature = "provider-gemini")]
fn build_gemini_adapter(
    profile: Option<EstimatorProfile>,
) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
    use nprovider::ProfileEstimator;
    use nprovider::adapters::gemini::GeminiAdapter;

    let adapter = match profile {
        Some(profile) => GeminiAdapter::new().with_estimator(ProfileEstimator::new(profile)),
        None => GeminiAdapter::new(),
    };
    Ok(Arc::new(adapter))
}

#[cfg(not(feature = "provider-gemini"))]
fn build_gemini_adapter(
    _profile: Option<EstimatorProfile>,
) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
    Err(ProviderError::invalid_request(
        "provider-gemini feature is not enabled on nexus",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryMessageStore;

    #[test]
    fn build_engine_uses_the_requested_backend() {
        let engine = build_engine(
            BackendId::Gemini,
            Arc::new(InMemoryMessageStore::new()),
            TransportConfig::default().with_timeout(Duration::from_secs(5)),
        )
        .expect("engine should build");

        assert_eq!(engine.backend(), BackendId::Gemini);
    }

    #[test]
    fn custom_profile_changes_estimates() {
        let adapter = build_adapter_with_profile(
            BackendId::OpenAi,
            Some(EstimatorProfile::openai().with_scale(2.0)),
        )
        .expect("adapter should build");

        assert_eq!(adapter.estimator().estimate_text(&["abcdefgh"]), 4);
    }
}
