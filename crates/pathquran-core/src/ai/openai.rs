use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::CompletionError;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

/// Client for any OpenAI-compatible chat completions endpoint (OpenAI
/// itself, Groq).
#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAIClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn openai(api_key: &str) -> Self {
        Self::new(OPENAI_BASE_URL, api_key)
    }

    pub fn groq(api_key: &str) -> Self {
        Self::new(GROQ_BASE_URL, api_key)
    }

    /// One system message plus one user message. Returns the first choice's
    /// content, empty when the provider sent none.
    pub async fn chat(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: Option<f32>,
    ) -> Result<String, CompletionError> {
        let request = OpenAIRequest {
            model: model.to_string(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(CompletionError::from_send)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CompletionError::from_response(status, &text));
        }

        let openai_response: OpenAIResponse =
            response.json().await.map_err(CompletionError::Decode)?;
        Ok(openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    pub fn list_models(base_url: &str) -> Vec<String> {
        if base_url == GROQ_BASE_URL {
            vec![
                "llama3-8b-8192".to_string(),
                "llama3-70b-8192".to_string(),
                "llama-3.1-8b-instant".to_string(),
            ]
        } else {
            vec![
                "gpt-4o".to_string(),
                "gpt-4o-mini".to_string(),
                "gpt-4-turbo".to_string(),
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = OpenAIRequest {
            model: "llama3-8b-8192".to_string(),
            messages: vec![OpenAIMessage {
                role: "system".to_string(),
                content: "be brief".to_string(),
            }],
            temperature: Some(0.5),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["temperature"], 0.5);
    }

    #[test]
    fn test_response_without_content_is_empty() {
        let parsed: OpenAIResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"role": "assistant"}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = OpenAIClient::new("http://localhost:8080/v1/", "key");
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }
}
