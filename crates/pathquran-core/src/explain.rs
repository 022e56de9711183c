//! AI verse explanation: prompt construction, the provider call, and
//! splitting the reply into titled sections.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use crate::ai::{CompletionError, OllamaClient, OpenAIClient};
use crate::config::Config;
use crate::corpus::Corpus;
use crate::provider::Provider;
use crate::settings::TranslationSource;

pub const TEMPERATURE: f32 = 0.5;
pub const NO_RESPONSE: &str = "No response.";

/// Prompts for one explanation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationRequest {
    pub range: String,
    pub system: String,
    pub user: String,
}

impl ExplanationRequest {
    /// Build the prompts for a typed range. `None` when the input is blank.
    ///
    /// The range is not validated: a malformed range still produces a request
    /// whose verse and tafsir sections say nothing was found.
    pub fn build(corpus: &Corpus, translation: TranslationSource, input: &str) -> Option<Self> {
        let range = input.trim();
        if range.is_empty() {
            return None;
        }

        let verse_text = corpus.translation(translation).range_text(range);
        let tafsir_text = corpus.tafsir().range_text(range);

        Some(Self {
            range: range.to_string(),
            system: system_prompt(translation),
            user: user_prompt(range, translation, &verse_text, &tafsir_text),
        })
    }
}

pub fn system_prompt(translation: TranslationSource) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are an Islamic AI assistant for a Quran explanation app called PathToQuran.\n\n");
    prompt.push_str("Your job is to explain Quranic verses to users in three structured sections:\n\n");
    prompt.push_str("---\n\n");
    prompt.push_str("1. **Context and Explanation**\n");
    prompt.push_str("   - Briefly describe the historical, social, or spiritual context.\n");
    prompt.push_str("   - Mention if the content involves ethics, law, guidance, or stories of prophets.\n");
    prompt.push_str("   - Be concise and rooted in established understanding.\n\n");
    prompt.push_str("2. **Meaning in Simple Terms**\n");
    prompt.push_str("   - Summarize the overall message in clear, modern English.\n");
    prompt.push_str("   - Identify who is being addressed (e.g., believers, disbelievers, Prophet).\n");
    prompt.push_str("   - Keep it accessible for readers of all backgrounds.\n\n");
    prompt.push_str("3. **Verse-by-Verse Breakdown**\n");
    prompt.push_str("   - Use bullet points with verse numbers (e.g., 2:2, 2:3).\n");
    prompt.push_str("   - Explain each verse based primarily on the official English translation.\n");
    prompt.push_str("   - You may quote from the translation to support clarity.\n");
    prompt.push_str("   - Use the Tafsir provided as a reference to ensure accuracy and avoid misinterpretation, not as the sole basis.\n\n");
    prompt.push_str("---\n\n");
    prompt.push_str("**IMPORTANT GUIDELINES**\n");
    prompt.push_str(&format!(
        "- Always refer to the official English translation: **\"{}\"**.\n",
        translation.attribution()
    ));
    prompt.push_str("- Do not paraphrase the Quran directly; explain based on its meaning.\n");
    prompt.push_str("- Use the Tafsir reference to guide and check your explanation.\n");
    prompt.push_str("- If unsure about any verse, say: \"I do not have enough knowledge to explain this.\"\n");
    prompt.push_str("- Avoid Arabic and transliteration.\n");
    prompt.push_str("- Be accurate, neutral, respectful, and educational.\n\n");
    prompt.push_str("Return your response using clear section headings and spacing.");

    prompt
}

pub fn user_prompt(
    range: &str,
    translation: TranslationSource,
    verse_text: &str,
    tafsir_text: &str,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("Surah & Ayah(s): {}\n\n", range));
    prompt.push_str("Please explain the following Quranic verse(s) using the official English translation provided below.\n");
    prompt.push_str("Use the Tafsir only for context or verification, not as your main source.\n\n");
    prompt.push_str("---\n\n");

    prompt.push_str(&format!("**Verse Text ({})**\n", translation.title()));
    if verse_text.is_empty() {
        prompt.push_str("No verse text found.");
    } else {
        prompt.push_str(verse_text);
    }
    prompt.push_str("\n\n---\n\n");

    prompt.push_str("**Tafsir Reference (Maulana Wahiduddin Khan):**\n");
    if tafsir_text.is_empty() {
        prompt.push_str("No tafsir found for this range.");
    } else {
        prompt.push_str(tafsir_text);
    }
    prompt.push_str("\n\n---\n\n");

    prompt.push_str("Do not guess or paraphrase. Stick strictly to the provided verse text. ");
    prompt.push_str("Follow the explanation format described in the system message.\n");

    prompt
}

/// A titled block of an explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub header: Option<String>,
    pub body: String,
}

/// Split a reply before every line that starts with `**`. A leading
/// `**heading**` becomes the section header.
pub fn split_sections(text: &str) -> Vec<Section> {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    let heading = HEADING.get_or_init(|| Regex::new(r"^\*\*(.+?)\*\*").expect("heading pattern is valid"));

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            if line.starts_with("**") {
                chunks.push(std::mem::take(&mut current));
            } else {
                current.push('\n');
            }
        }
        current.push_str(line);
    }
    chunks.push(current);

    chunks
        .into_iter()
        .filter_map(|chunk| {
            let (header, body) = match heading.captures(&chunk) {
                Some(caps) => {
                    let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
                    let header = caps.get(1).map(|m| m.as_str().trim().to_string());
                    (header, chunk[whole..].trim().to_string())
                }
                None => (None, chunk.trim().to_string()),
            };
            if header.is_none() && body.is_empty() {
                None
            } else {
                Some(Section { header, body })
            }
        })
        .collect()
}

/// Sends explanation requests to the configured provider.
#[derive(Clone)]
pub struct Explainer {
    provider: Provider,
    model: String,
    hosted: Option<OpenAIClient>,
    ollama: OllamaClient,
}

impl Explainer {
    pub fn from_config(config: &Config) -> Self {
        let provider = config.provider();
        let hosted = config.api_key(provider).map(|key| match provider {
            Provider::OpenAI => OpenAIClient::openai(&key),
            _ => OpenAIClient::groq(&key),
        });

        Self {
            provider,
            model: config.model(),
            hosted,
            ollama: OllamaClient::new(config.ollama_url()),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One request, no retries. An empty completion becomes
    /// [`NO_RESPONSE`].
    pub async fn explain(&self, request: &ExplanationRequest) -> Result<String, CompletionError> {
        info!(range = %request.range, provider = self.provider.as_str(), model = %self.model, "requesting explanation");

        let reply = match self.provider {
            Provider::Ollama => {
                self.ollama
                    .generate(&self.model, &request.system, &request.user)
                    .await?
            }
            Provider::Groq | Provider::OpenAI => {
                let client = self.hosted.as_ref().ok_or(match self.provider {
                    Provider::OpenAI => CompletionError::MissingApiKey("OpenAI"),
                    _ => CompletionError::MissingApiKey("Groq"),
                })?;
                client
                    .chat(&self.model, &request.system, &request.user, Some(TEMPERATURE))
                    .await?
            }
        };

        debug!(chars = reply.len(), "explanation received");
        if reply.trim().is_empty() {
            Ok(NO_RESPONSE.to_string())
        } else {
            Ok(reply)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::VerseTable;
    use crate::tafsir::TafsirTable;

    fn corpus() -> Corpus {
        let sahih: VerseTable = vec![
            (2, 2, "This is the Book about which there is no doubt.".to_string()),
            (2, 3, "Who believe in the unseen.".to_string()),
        ]
        .into_iter()
        .collect();
        let tafsir = TafsirTable::from_json_str(
            r#"{"2:2": {"ayah_keys": ["2:2", "2:3"], "text": "<p>The Book is guidance.</p>"}, "2:3": "2:2"}"#,
        )
        .unwrap();
        Corpus::new(vec!["Al-Fatihah".into(), "Al-Baqarah".into()])
            .with_translation(TranslationSource::SahihInternational, sahih)
            .with_tafsir(tafsir)
    }

    #[test]
    fn test_blank_input_builds_nothing() {
        assert!(ExplanationRequest::build(&corpus(), TranslationSource::SahihInternational, "   ").is_none());
    }

    #[test]
    fn test_user_prompt_carries_verses_and_tafsir() {
        let request =
            ExplanationRequest::build(&corpus(), TranslationSource::SahihInternational, "2:2-3").unwrap();

        assert_eq!(request.range, "2:2-3");
        assert!(request.user.contains("Surah & Ayah(s): 2:2-3"));
        assert!(request.user.contains("**Verse Text (Sahih International)**"));
        assert!(request.user.contains("**2:3**: Who believe in the unseen."));
        assert!(request.user.contains("**2:2**:\nThe Book is guidance."));
        assert!(!request.user.contains("<p>"));
        assert!(request.system.contains("**\"Sahih International\"**"));
    }

    #[test]
    fn test_missing_text_is_called_out() {
        let request =
            ExplanationRequest::build(&corpus(), TranslationSource::ClearQuran, "9:1").unwrap();
        assert!(request.user.contains("No verse text found."));
        assert!(request.user.contains("No tafsir found for this range."));
        assert!(request.system.contains("The Clear Quran by Mustafa Khattab"));
    }

    #[test]
    fn test_split_sections_extracts_headings() {
        let reply = "Here is the explanation.\n**Context and Explanation**\nRevealed in Madinah.\n\n**Meaning in Simple Terms**  \nThe Book guides.\n- point";
        let sections = split_sections(reply);

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].header, None);
        assert_eq!(sections[0].body, "Here is the explanation.");
        assert_eq!(sections[1].header.as_deref(), Some("Context and Explanation"));
        assert_eq!(sections[1].body, "Revealed in Madinah.");
        assert_eq!(sections[2].header.as_deref(), Some("Meaning in Simple Terms"));
        assert_eq!(sections[2].body, "The Book guides.\n- point");
    }

    #[test]
    fn test_split_sections_keeps_inline_bold() {
        let sections = split_sections("The word **taqwa** means mindfulness.");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].header, None);
        assert_eq!(sections[0].body, "The word **taqwa** means mindfulness.");
    }

    #[test]
    fn test_split_sections_empty_reply() {
        assert!(split_sections("").is_empty());
        assert!(split_sections("\n\n").is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_is_reported_without_network() {
        let mut config = Config::new();
        config.provider = Some("openai".to_string());
        let mut explainer = Explainer::from_config(&config);
        // The environment may carry a real key
        explainer.hosted = None;

        let request =
            ExplanationRequest::build(&corpus(), TranslationSource::SahihInternational, "2:2").unwrap();
        let err = explainer.explain(&request).await.unwrap_err();
        assert!(matches!(err, CompletionError::MissingApiKey("OpenAI")));
    }
}
