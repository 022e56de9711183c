use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::CompletionError;

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn generate(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
    ) -> Result<String, CompletionError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            system: Some(system.to_string()).filter(|s| !s.is_empty()),
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(CompletionError::from_send)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CompletionError::from_response(status, &text));
        }

        let ollama_response: OllamaResponse =
            response.json().await.map_err(CompletionError::Decode)?;
        Ok(ollama_response.response)
    }

    pub async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(CompletionError::from_send)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CompletionError::from_response(status, &text));
        }

        let models_response: OllamaModelsResponse =
            response.json().await.map_err(CompletionError::Decode)?;
        Ok(models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_system_is_omitted() {
        let request = OllamaRequest {
            model: "llama3.2:latest".to_string(),
            prompt: "2:255".to_string(),
            system: Some(String::new()).filter(|s| !s.is_empty()),
            stream: false,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("system").is_none());
        assert_eq!(value["stream"], false);
    }
}
