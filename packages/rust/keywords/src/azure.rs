//! Azure OpenAI chat-completions backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use drivedocs_shared::{DriveDocsError, KeywordsConfig, Result, resolve_api_key};

use crate::KeywordExtractor;
use crate::parse::parse_tags;

/// User-Agent string for keyword requests.
const USER_AGENT: &str = concat!("drivedocs/", env!("CARGO_PKG_VERSION"));

/// Build the keyword prompt for a document.
pub fn build_prompt(text: &str) -> String {
    format!(
        "Extract the 3-5 most relevant keywords from the text enclosed by triple backticks.\n\
         Provide them as a list in Norwegian, with each keyword being a single word.\n\
         Ensure the keywords are pertinent to HR contexts such as recruitment, employee relations, benefits, etc.\n\
         Format your response as: [\"keyword1\", \"keyword2\", \"keyword3\"].\n\
         Your response should ONLY include the list of keywords.\n\
         \n\
         Here is the text:\n\
         \n\
         ```{text}```"
    )
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Keyword extractor backed by an Azure OpenAI chat deployment.
pub struct AzureKeywordExtractor {
    client: Client,
    completions_url: Url,
    api_key: String,
    temperature: f32,
    max_input_chars: usize,
}

impl AzureKeywordExtractor {
    /// Build from config, reading the API key from `config.api_key_env`.
    pub fn from_config(config: &KeywordsConfig) -> Result<Self> {
        Self::with_api_key(config, resolve_api_key(config)?)
    }

    /// Build from config with an explicit API key.
    pub fn with_api_key(config: &KeywordsConfig, api_key: impl Into<String>) -> Result<Self> {
        let completions_url = completions_url(config)?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DriveDocsError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            completions_url,
            api_key: api_key.into(),
            temperature: config.temperature,
            max_input_chars: config.max_input_chars,
        })
    }
}

#[async_trait]
impl KeywordExtractor for AzureKeywordExtractor {
    #[instrument(skip_all, fields(chars = text.chars().count()))]
    async fn extract_tags(&self, text: &str) -> Result<Vec<String>> {
        let prompt = build_prompt(truncate_content(text, self.max_input_chars));
        let request = ChatRequest {
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(self.completions_url.clone())
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DriveDocsError::TagExtraction(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveDocsError::TagExtraction(format!(
                "HTTP {status}: {}",
                truncate_content(&body, 200)
            )));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| DriveDocsError::TagExtraction(format!("invalid response: {e}")))?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DriveDocsError::TagExtraction("no choices returned".into()))?;

        let tags = parse_tags(&content);
        debug!(?tags, "extracted tags");
        Ok(tags)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...`
fn completions_url(config: &KeywordsConfig) -> Result<Url> {
    let base = format!("{}/", config.endpoint.trim_end_matches('/'));
    let mut url = Url::parse(&base)
        .and_then(|b| {
            b.join(&format!(
                "openai/deployments/{}/chat/completions",
                config.deployment
            ))
        })
        .map_err(|e| {
            DriveDocsError::config(format!("invalid keyword endpoint '{}': {e}", config.endpoint))
        })?;

    url.query_pairs_mut()
        .append_pair("api-version", &config.api_version);
    Ok(url)
}

/// Cut `content` to at most `max_chars` characters.
fn truncate_content(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> KeywordsConfig {
        KeywordsConfig {
            endpoint: server.uri(),
            ..Default::default()
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": content}}
            ]
        })
    }

    #[test]
    fn truncate_short_content() {
        assert_eq!(truncate_content("short text", 100), "short text");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_content("æøåæøå", 3), "æøå");
    }

    #[test]
    fn completions_url_shape() {
        let config = KeywordsConfig {
            endpoint: "https://hr-tags.openai.azure.com/".into(),
            ..Default::default()
        };
        let url = completions_url(&config).unwrap();
        assert_eq!(
            url.as_str(),
            "https://hr-tags.openai.azure.com/openai/deployments/gpt-4o-mini/chat/completions?api-version=2024-05-01-preview"
        );
    }

    #[test]
    fn prompt_embeds_text() {
        let prompt = build_prompt("Ferieregler for ansatte");
        assert!(prompt.contains("```Ferieregler for ansatte```"));
        assert!(prompt.contains("Norwegian"));
    }

    #[tokio::test]
    async fn extract_tags_from_completion() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4o-mini/chat/completions"))
            .and(query_param("api-version", "2024-05-01-preview"))
            .and(header("api-key", "secret"))
            .and(body_string_contains("Ferieregler"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion(r#"["ferie", "regler", "ansatte"]"#)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let extractor =
            AzureKeywordExtractor::with_api_key(&config_for(&server), "secret").unwrap();
        let tags = extractor.extract_tags("Ferieregler for ansatte").await.unwrap();
        assert_eq!(tags, vec!["ferie", "regler", "ansatte"]);
    }

    #[tokio::test]
    async fn http_error_is_tag_extraction_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let extractor =
            AzureKeywordExtractor::with_api_key(&config_for(&server), "secret").unwrap();
        let err = extractor.extract_tags("tekst").await.unwrap_err();
        assert!(matches!(err, DriveDocsError::TagExtraction(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn empty_choices_is_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let extractor =
            AzureKeywordExtractor::with_api_key(&config_for(&server), "secret").unwrap();
        assert!(extractor.extract_tags("tekst").await.is_err());
    }

    #[test]
    fn missing_api_key_env() {
        let config = KeywordsConfig {
            api_key_env: "DD_TEST_NO_SUCH_KEY_98765".into(),
            ..Default::default()
        };
        let result = AzureKeywordExtractor::from_config(&config);
        assert!(matches!(result, Err(DriveDocsError::Config { .. })));
    }
}
