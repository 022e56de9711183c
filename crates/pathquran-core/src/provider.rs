#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Groq,
    OpenAI,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Groq => "groq",
            Provider::OpenAI => "openai",
            Provider::Ollama => "ollama",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "groq" => Some(Provider::Groq),
            "openai" => Some(Provider::OpenAI),
            "ollama" => Some(Provider::Ollama),
            _ => None,
        }
    }

    pub fn all() -> Vec<Provider> {
        vec![Provider::Groq, Provider::OpenAI, Provider::Ollama]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Groq => "Groq (Hosted)",
            Provider::OpenAI => "ChatGPT (OpenAI)",
            Provider::Ollama => "Ollama (Local)",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Groq => "llama3-8b-8192",
            Provider::OpenAI => "gpt-4o-mini",
            Provider::Ollama => "llama3.2:latest",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names_round_trip() {
        for provider in Provider::all() {
            assert_eq!(Provider::from_str(provider.as_str()), Some(provider));
        }
        assert_eq!(Provider::from_str("GROQ"), Some(Provider::Groq));
        assert_eq!(Provider::from_str("claude"), None);
    }
}
