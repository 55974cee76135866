//! reqwest-based transport with SSE decoding and cancellation.

use async_stream::try_stream;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::request::WireRequest;
use crate::sse::SseDecoder;
use crate::transport::{EventStream, ProviderFuture, Transport};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn prepare(&self, request: &WireRequest) -> RequestBuilder {
        request
            .headers
            .iter()
            .fold(self.client.post(&request.url), |builder, (name, value)| {
                builder.header(name.as_str(), value.as_str())
            })
            .json(&request.body)
    }

    async fn execute(
        &self,
        request: &WireRequest,
        cancel: &CancellationToken,
    ) -> Result<Response, ProviderError> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ProviderError::cancelled("request cancelled")),
            response = self.prepare(request).send() => response.map_err(map_reqwest_error)?,
        };

        if !response.status().is_success() {
            return Err(parse_error(response).await);
        }

        Ok(response)
    }
}

impl Transport for HttpTransport {
    fn send<'a>(
        &'a self,
        request: WireRequest,
        cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            let response = self.execute(&request, &cancel).await?;

            tokio::select! {
                _ = cancel.cancelled() => Err(ProviderError::cancelled("request cancelled")),
                body = response.text() => body.map_err(map_reqwest_error),
            }
        })
    }

    fn open_stream<'a>(
        &'a self,
        request: WireRequest,
        cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<EventStream<'a>, ProviderError>> {
        Box::pin(async move {
            let response = self.execute(&request, &cancel).await?;

            let stream = try_stream! {
                let mut chunks = response.bytes_stream();
                let mut decoder = SseDecoder::default();

                loop {
                    let item = tokio::select! {
                        _ = cancel.cancelled() => Some(Err(ProviderError::cancelled("stream cancelled"))),
                        item = chunks.next() => item.map(|item| item.map_err(map_reqwest_error)),
                    };

                    let Some(item) = item else {
                        break;
                    };

                    let bytes = item?;
                    if let Some(error) = inline_request_error(&String::from_utf8_lossy(&bytes)) {
                        Err::<(), _>(error)?;
                    }

                    for data in decoder.feed(&bytes) {
                        yield data;
                    }
                }

                if let Some(data) = decoder.finish() {
                    yield data;
                }
            };

            Ok(Box::pin(stream) as EventStream<'a>)
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::timeout(error.to_string())
    } else {
        ProviderError::transport(error.to_string())
    }
}

async fn parse_error(response: Response) -> ProviderError {
    let status = response.status();
    let status_text = status.canonical_reason().unwrap_or_default().to_string();
    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body)
        .unwrap_or_else(|| format!("{}: {}", status.as_u16(), body.trim()));

    ProviderError::from_status(status.as_u16(), status_text, message)
}

/// Reads `error.message` or `detail.message` out of a JSON error body.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    let message = value
        .pointer("/error/message")
        .or_else(|| value.pointer("/detail/message"))?;

    message.as_str().map(str::to_string)
}

/// Some proxies answer a stream request with a bare `detail` error object
/// instead of an SSE body.
fn inline_request_error(chunk: &str) -> Option<ProviderError> {
    let value = serde_json::from_str::<Value>(chunk.trim()).ok()?;
    let detail = value.get("detail")?;
    if detail.get("type").and_then(Value::as_str) != Some("invalid_request_error") {
        return None;
    }

    let message = detail.get("message").and_then(Value::as_str).unwrap_or_default();
    let code = match detail.get("code") {
        Some(Value::String(code)) => code.clone(),
        Some(Value::Number(code)) => code.to_string(),
        _ => String::new(),
    };

    Some(
        ProviderError::invalid_request(format!("{message}: {code} (invalid_request_error)"))
            .with_status_text(message),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;

    #[test]
    fn error_message_prefers_error_then_detail() {
        assert_eq!(
            extract_error_message(r#"{"error":{"message":"bad key","type":"auth"}}"#).as_deref(),
            Some("bad key")
        );
        assert_eq!(
            extract_error_message(r#"{"detail":{"message":"too long"}}"#).as_deref(),
            Some("too long")
        );
        assert_eq!(extract_error_message("<html>oops</html>"), None);
    }

    #[test]
    fn inline_detail_error_is_detected() {
        let error = inline_request_error(
            r#"{"detail":{"type":"invalid_request_error","message":"context too long","code":"context_length_exceeded"}}"#,
        )
        .expect("detail error should be detected");

        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
        assert_eq!(error.status_text.as_deref(), Some("context too long"));
        assert!(inline_request_error("data: {\"choices\":[]}").is_none());
    }
}
