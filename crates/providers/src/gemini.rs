use crate::model::{FragmentStream, GenerativeModel};
use crate::sse::{SseEvent, SseParser};
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::settings::{GenerationSettings, ModelProvider, DEFAULT_BASE_URL};
use shared::{Attachment, ChatError};
use std::collections::VecDeque;
use std::env;
use std::time::Duration;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
pub struct GeminiContent {
    pub role: String,
    pub parts: Vec<GeminiPart>,
}

/// Serializes as `{"text": ...}` or `{"inlineData": {...}}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GeminiPart {
    Text(String),
    InlineData(InlineData),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: i32,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiStreamResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<GeminiErrorBody>,
}

impl GeminiStreamResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Single user-role message: the text part first, then one inline part per
/// sendable attachment in the order given.
pub fn build_request(
    prompt: &str,
    attachments: &[Attachment],
    generation: &GenerationSettings,
) -> GenerateContentRequest {
    let mut parts = vec![GeminiPart::Text(prompt.to_string())];
    for att in attachments {
        if !att.is_sendable() {
            tracing::debug!(name = %att.name, "skipping attachment without data or media type");
            continue;
        }
        parts.push(GeminiPart::InlineData(InlineData {
            mime_type: att.mime_type.clone(),
            data: att.data.clone(),
        }));
    }

    let generation_config = (!generation.is_empty()).then(|| GenerationConfig {
        temperature: generation.temperature,
        max_output_tokens: generation.max_output_tokens,
        thinking_config: generation
            .thinking_budget
            .map(|thinking_budget| ThinkingConfig { thinking_budget }),
    });

    GenerateContentRequest {
        contents: vec![GeminiContent {
            role: "user".to_string(),
            parts,
        }],
        generation_config,
    }
}

pub struct GeminiClient {
    http: Client,
    auth_token: String,
    model: String,
    base_url: String,
    generation: GenerationSettings,
}

impl GeminiClient {
    pub fn from_settings(settings: &ModelProvider) -> Result<Self> {
        let auth_token = match settings.auth.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            // Try environment variable as fallback
            _ => env::var("GEMINI_API_KEY").map_err(|_| ChatError::MissingApiKey)?,
        };
        let base_url = env::var("GEMINI_BASE_URL").unwrap_or_else(|_| settings.base_url.clone());
        let base_url = if base_url.trim().is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            base_url.trim_end_matches('/').to_string()
        };

        Ok(Self {
            http: Client::builder()
                .connect_timeout(Duration::from_secs(15))
                .timeout(Duration::from_secs(300))
                .build()?,
            auth_token,
            model: settings.model.clone(),
            base_url,
            generation: settings.generation.clone(),
        })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn stream(&self, prompt: &str, attachments: &[Attachment]) -> Result<FragmentStream> {
        let req = build_request(prompt, attachments, &self.generation);
        tracing::debug!(
            model = %self.model,
            parts = req.contents.first().map(|c| c.parts.len()).unwrap_or(0),
            "gemini stream request"
        );

        let resp = self
            .http
            .post(self.stream_url())
            .header("x-goog-api-key", &self.auth_token)
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.trim().chars().take(800).collect();
            return Err(ChatError::Api {
                status: status.as_u16(),
                body: detail,
            }
            .into());
        }

        let body: BoxStream<'static, Result<Vec<u8>>> = resp
            .bytes_stream()
            .map_ok(|bytes| bytes.to_vec())
            .map_err(|e| ChatError::Stream(e.to_string()).into())
            .boxed();
        Ok(fragments_from_body(body))
    }
}

struct BodyState {
    body: BoxStream<'static, Result<Vec<u8>>>,
    parser: SseParser,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

impl BodyState {
    fn queue(&mut self, event: SseEvent) {
        if let Some(item) = decode_event(&event) {
            self.pending.push_back(item);
        }
    }
}

/// Turn a raw SSE body into text fragments. The first error ends the stream.
pub(crate) fn fragments_from_body(body: BoxStream<'static, Result<Vec<u8>>>) -> FragmentStream {
    let state = BodyState {
        body,
        parser: SseParser::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                if item.is_err() {
                    st.pending.clear();
                    st.finished = true;
                }
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            match st.body.next().await {
                Some(Ok(bytes)) => {
                    for event in st.parser.feed(&bytes) {
                        st.queue(event);
                    }
                }
                Some(Err(e)) => {
                    st.finished = true;
                    st.pending.push_back(Err(e));
                }
                None => {
                    st.finished = true;
                    if let Some(event) = st.parser.finish() {
                        st.queue(event);
                    }
                }
            }
        }
    })
    .boxed()
}

fn decode_event(event: &SseEvent) -> Option<Result<String>> {
    let data = event.data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    match serde_json::from_str::<GeminiStreamResponse>(data) {
        Ok(resp) => {
            if let Some(err) = resp.error {
                return Some(Err(ChatError::Api {
                    status: err.code,
                    body: err.message,
                }
                .into()));
            }
            let text = resp.text();
            (!text.is_empty()).then_some(Ok(text))
        }
        Err(e) => {
            // Skip unparseable events rather than failing the whole answer
            tracing::warn!("unparseable gemini stream event: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::collect_response;
    use serde_json::json;

    fn body(chunks: Vec<&'static str>) -> BoxStream<'static, Result<Vec<u8>>> {
        stream::iter(chunks.into_iter().map(|c| Ok(c.as_bytes().to_vec()))).boxed()
    }

    #[test]
    fn test_request_text_first_then_valid_images() {
        let attachments = vec![
            Attachment::new("a.png", "image/png", "AAAA"),
            Attachment::new("broken.png", "", "BBBB"),
            Attachment::new("empty.jpg", "image/jpeg", ""),
            Attachment::new("b.jpg", "image/jpeg", "CCCC"),
        ];
        let req = build_request("describe", &attachments, &GenerationSettings::default());
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "describe"},
                        {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
                        {"inlineData": {"mimeType": "image/jpeg", "data": "CCCC"}}
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_generation_config_serialized_when_set() {
        let generation = GenerationSettings {
            temperature: Some(0.5),
            max_output_tokens: None,
            thinking_budget: Some(1024),
        };
        let value = serde_json::to_value(build_request("", &[], &generation)).unwrap();
        assert_eq!(
            value["generationConfig"],
            json!({"temperature": 0.5, "thinkingConfig": {"thinkingBudget": 1024}})
        );
        assert_eq!(value["contents"][0]["parts"][0], json!({"text": ""}));
    }

    #[tokio::test]
    async fn test_sse_body_accumulates_fragments() {
        let stream = fragments_from_body(body(vec![
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hello \"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"te",
            "xt\":\"**world**\"}]}}]}\n\n",
            "data: {\"candidates\":[{\"finishReason\":\"STOP\"}]}",
        ]));
        assert_eq!(collect_response(stream).await.unwrap(), "Hello **world**");
    }

    #[tokio::test]
    async fn test_error_payload_fails_stream() {
        let stream = fragments_from_body(body(vec![
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"partial\"}]}}]}\n\n",
            "data: {\"error\":{\"code\":429,\"message\":\"quota exceeded\"}}\n\n",
        ]));
        let err = collect_response(stream).await.unwrap_err();
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_empty_body_yields_empty_text() {
        let stream = fragments_from_body(body(vec![]));
        assert_eq!(collect_response(stream).await.unwrap(), "");
    }

    #[test]
    fn test_missing_key_is_reported() {
        if env::var("GEMINI_API_KEY").is_ok() {
            return;
        }
        let err = GeminiClient::from_settings(&ModelProvider::default())
            .err()
            .expect("missing key must fail");
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
