//! [`EventResolver`] backed by an OpenAI-compatible completion service.

use tracing::{debug, info};

use quickcal_core::{ParsedEvent, TemporalContext, resolve_content, system_prompt};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, EventResolver};

use super::client::CompletionClient;
use super::config::OpenAiConfig;

const NAME: &str = "openai";

pub struct OpenAiResolver {
    config: OpenAiConfig,
    client: CompletionClient,
}

impl OpenAiResolver {
    /// Builds the resolver. A missing API key is not an error here; it is
    /// reported by [`EventResolver::resolve`].
    pub fn new(config: OpenAiConfig) -> ProviderResult<Self> {
        let client = CompletionClient::new(&config)?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    async fn resolve_impl(&self, input: &str, ctx: TemporalContext) -> ProviderResult<ParsedEvent> {
        let api_key = self
            .config
            .require_api_key()
            .map_err(|e| e.with_provider(NAME))?;

        let system = system_prompt(&ctx);
        let content = self
            .client
            .complete(api_key, &system, input)
            .await
            .map_err(|e| e.with_provider(NAME))?;
        debug!("completion content: {}", content);

        let event = resolve_content(&content, &ctx, &self.config.resolution)
            .map_err(|e| ProviderError::from(e).with_provider(NAME))?;

        info!(
            "resolved {:?} to {:?} on {} {}-{} ({})",
            input,
            event.summary,
            event.date,
            event.start_time.format("%H:%M"),
            event.end_time.format("%H:%M"),
            event.time_zone
        );
        Ok(event)
    }
}

impl EventResolver for OpenAiResolver {
    fn name(&self) -> &str {
        NAME
    }

    fn resolve<'a>(
        &'a self,
        input: &'a str,
        ctx: TemporalContext,
    ) -> BoxFuture<'a, ProviderResult<ParsedEvent>> {
        Box::pin(self.resolve_impl(input, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{NaiveDate, NaiveTime};
    use chrono_tz::America::New_York;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ctx(h: u32, m: u32) -> TemporalContext {
        let local = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap();
        TemporalContext::from_local(New_York, local).unwrap()
    }

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        }))
    }

    fn resolver(server: &MockServer) -> OpenAiResolver {
        OpenAiResolver::new(OpenAiConfig::new("sk-test").with_base_url(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion("{}"))
            .expect(0)
            .mount(&server)
            .await;

        let resolver =
            OpenAiResolver::new(OpenAiConfig::default().with_base_url(server.uri())).unwrap();
        let err = resolver.resolve("lunch", ctx(10, 0)).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert_eq!(err.provider(), Some("openai"));
    }

    #[tokio::test]
    async fn lunch_tomorrow_at_noon() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "temperature": 0.3,
                "response_format": {"type": "json_object"}
            })))
            .respond_with(completion(
                r#"{"summary":"lunch","startTime":"12:00","endTime":"13:00","date":"2024-01-02"}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let event = resolver(&server)
            .resolve("lunch tomorrow at noon", ctx(10, 0))
            .await
            .unwrap();

        assert_eq!(
            event,
            ParsedEvent {
                summary: "lunch".to_string(),
                start_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                time_zone: New_York,
            }
        );
    }

    #[tokio::test]
    async fn request_carries_prompt_and_raw_input() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(completion(
                r#"{"summary":"call","startTime":"02:00","endTime":"03:00","date":"2024-01-01"}"#,
            ))
            .mount(&server)
            .await;

        let event = resolver(&server).resolve("call at 2am", ctx(23, 0)).await.unwrap();
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        let system = messages[0]["content"].as_str().unwrap();
        assert!(system.contains("America/New_York"));
        assert!(system.contains("Current date: 2024-01-01"));
        assert!(system.contains("Current time: 23:00"));
        assert_eq!(messages[1], json!({"role": "user", "content": "call at 2am"}));
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let err = resolver(&server).resolve("lunch", ctx(10, 0)).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::UpstreamError);
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.body(), Some("internal error"));
    }

    #[tokio::test]
    async fn rate_limit_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = resolver(&server).resolve("lunch", ctx(10, 0)).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::UpstreamError);
        assert_eq!(err.status(), Some(429));
    }

    #[tokio::test]
    async fn envelope_without_content_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = resolver(&server).resolve("lunch", ctx(10, 0)).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::UpstreamError);
    }

    #[tokio::test]
    async fn non_json_envelope_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let err = resolver(&server).resolve("lunch", ctx(10, 0)).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::UpstreamError);
    }

    #[tokio::test]
    async fn prose_content_is_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion("Sure, lunch is at noon tomorrow!"))
            .mount(&server)
            .await;

        let err = resolver(&server).resolve("lunch", ctx(10, 0)).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn bad_time_is_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion(
                r#"{"summary":"lunch","startTime":"noon","endTime":"13:00","date":"2024-01-02"}"#,
            ))
            .mount(&server)
            .await;

        let err = resolver(&server).resolve("lunch", ctx(10, 0)).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn stale_date_rolled_to_tomorrow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion(
                "```json\n{\"summary\":\"at dentist\",\"startTime\":\"09:00\",\"date\":\"2023-01-01\"}\n```",
            ))
            .mount(&server)
            .await;

        let event = resolver(&server).resolve("dentist at 9", ctx(10, 0)).await.unwrap();
        assert_eq!(event.summary, "dentist");
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(event.end_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }
}
