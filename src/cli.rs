//! Non-interactive subcommands. Each prints plain text to stdout.

use std::path::Path;

use anyhow::{anyhow, Result};
use clap::Subcommand;
use pathquran_core::explain::{split_sections, ExplanationRequest, Section};
use pathquran_core::ai::openai::{GROQ_BASE_URL, OPENAI_BASE_URL};
use pathquran_core::{
    AppState, Config, Corpus, Explainer, OllamaClient, OpenAIClient, Preferences, Provider,
    TafsirIndex,
};

#[derive(Subcommand)]
pub enum Commands {
    /// List every surah with its number
    Chapters,
    /// Print a surah using the saved display preferences
    Read {
        /// Surah number
        chapter: u32,
    },
    /// Print the tafsir entries for a surah
    Tafsir {
        /// Surah number
        chapter: u32,
    },
    /// Print the verses (or tafsir) for a range such as 2:255 or 2:1-5
    Range {
        range: String,
        /// Print tafsir instead of the translation
        #[arg(long)]
        tafsir: bool,
    },
    /// Ask the configured AI provider to explain a range
    Explain { range: String },
    /// Show the saved reading position
    LastRead,
    /// List models for the configured provider
    Models,
    /// Show or change the AI provider and model
    Config {
        /// groq, openai or ollama
        #[arg(long)]
        provider: Option<String>,
        /// Model name for the provider
        #[arg(long)]
        model: Option<String>,
    },
    /// Clear all saved preferences and the reading position
    Reset,
}

pub async fn run(
    command: Commands,
    config: &Config,
    state: &mut AppState,
    data_dir: &Path,
) -> Result<()> {
    match command {
        Commands::Chapters => {
            let corpus = Corpus::load(data_dir).await?;
            print!("{}", format_chapters(&corpus));
        }
        Commands::Read { chapter } => {
            let corpus = Corpus::load(data_dir).await?;
            print!("{}", format_chapter(&corpus, state.preferences(), chapter)?);
        }
        Commands::Tafsir { chapter } => {
            let corpus = Corpus::load(data_dir).await?;
            print!("{}", format_tafsir(&corpus, chapter)?);
        }
        Commands::Range { range, tafsir } => {
            let corpus = Corpus::load(data_dir).await?;
            let text = if tafsir {
                corpus.tafsir().range_text(&range)
            } else {
                corpus
                    .translation(state.preferences().translation)
                    .range_text(&range)
            };
            if text.is_empty() {
                println!("Nothing found for {}", range.trim());
            } else {
                println!("{}", text);
            }
        }
        Commands::Explain { range } => {
            let corpus = Corpus::load(data_dir).await?;
            explain(&corpus, config, state.preferences(), &range).await?;
        }
        Commands::LastRead => {
            let last_read = state.last_read();
            println!("{}:{}", last_read.surah, last_read.ayah);
        }
        Commands::Models => list_models(config).await?,
        Commands::Config { provider, model } => {
            let updated = configure(config, provider.as_deref(), model)?;
            if provider.is_some() || updated.default_model != config.default_model {
                updated.save()?;
            }
            print!("{}", format_config(&updated));
        }
        Commands::Reset => {
            state.reset();
            println!("Preferences reset to defaults.");
        }
    }
    Ok(())
}

async fn explain(corpus: &Corpus, config: &Config, prefs: &Preferences, range: &str) -> Result<()> {
    let Some(request) = ExplanationRequest::build(corpus, prefs.translation, range) else {
        return Err(anyhow!("Enter a range such as 2:255 or 2:1-5"));
    };

    let explainer = Explainer::from_config(config);
    println!(
        "Explaining {} with {} ({})...\n",
        request.range,
        explainer.provider().display_name(),
        explainer.model()
    );

    let text = explainer.explain(&request).await?;
    print!("{}", format_sections(&split_sections(&text)));
    Ok(())
}

async fn list_models(config: &Config) -> Result<()> {
    let provider = config.provider();
    let models = match provider {
        Provider::Ollama => OllamaClient::new(config.ollama_url()).list_models().await?,
        Provider::Groq => OpenAIClient::list_models(GROQ_BASE_URL),
        Provider::OpenAI => OpenAIClient::list_models(OPENAI_BASE_URL),
    };

    println!("{} models:", provider.display_name());
    let current = config.model();
    for model in models {
        let marker = if model == current { "*" } else { " " };
        println!("{} {}", marker, model);
    }
    Ok(())
}

pub fn configure(config: &Config, provider: Option<&str>, model: Option<String>) -> Result<Config> {
    let mut updated = config.clone();
    if let Some(provider) = provider {
        updated.set_provider(provider)?;
    }
    if let Some(model) = model {
        updated.default_model = Some(model);
    }
    Ok(updated)
}

pub fn format_config(config: &Config) -> String {
    let provider = config.provider();
    let key = match provider {
        Provider::Ollama => config.ollama_url().to_string(),
        _ if config.api_key(provider).is_some() => "API key set".to_string(),
        _ => "API key missing".to_string(),
    };
    format!(
        "Provider: {}\nModel: {}\n{}\n",
        provider.display_name(),
        config.model(),
        key
    )
}

pub fn format_chapters(corpus: &Corpus) -> String {
    corpus
        .chapter_names()
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{:>3}. {}\n", i + 1, name))
        .collect()
}

pub fn format_chapter(corpus: &Corpus, prefs: &Preferences, chapter: u32) -> Result<String> {
    let name = corpus
        .chapter_name(chapter)
        .ok_or_else(|| anyhow!("No surah numbered {}", chapter))?;

    let mut out = format!("{}. {}\n\n", chapter, name);
    for verse in corpus.chapter_view(chapter, prefs) {
        out.push_str(&format!("[{}:{}]\n", chapter, verse.number));
        for text in [verse.script, verse.transliteration, verse.translation]
            .into_iter()
            .flatten()
        {
            out.push_str(text);
            out.push('\n');
        }
        out.push('\n');
    }
    Ok(out)
}

pub fn format_tafsir(corpus: &Corpus, chapter: u32) -> Result<String> {
    let name = corpus
        .chapter_name(chapter)
        .ok_or_else(|| anyhow!("No surah numbered {}", chapter))?;

    let index = TafsirIndex::build(corpus.tafsir());
    let entries = index.chapter(chapter);

    let mut out = format!("Tafsir for {}. {}\n\n", chapter, name);
    if entries.is_empty() {
        out.push_str("No Tafsir available.\n");
    }
    for entry in entries {
        out.push_str(&format!("Ayahs: {}\n{}\n\n", entry.ayah_label(), entry.plain_text().trim()));
    }
    Ok(out)
}

pub fn format_sections(sections: &[Section]) -> String {
    let mut out = String::new();
    for section in sections {
        if let Some(header) = &section.header {
            out.push_str(&format!("== {} ==\n", header));
        }
        if !section.body.is_empty() {
            out.push_str(&section.body);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathquran_core::{Script, TafsirTable, TranslationSource, VerseTable};

    fn corpus() -> Corpus {
        let uthmani: VerseTable = vec![(1, 1, "بِسْمِ ٱللَّهِ".to_string())].into_iter().collect();
        let sahih: VerseTable = vec![(1, 1, "In the name of Allah".to_string())].into_iter().collect();
        let tafsir = TafsirTable::from_json_str(
            r#"{"1:1": {"ayah_keys": ["1:1", "1:2"], "text": "<p>Every beginning is with His name.</p>"}, "1:2": "1:1"}"#,
        )
        .unwrap();
        Corpus::new(vec!["Al-Fatihah".into(), "Al-Baqarah".into()])
            .with_script(Script::Uthmani, uthmani)
            .with_translation(TranslationSource::SahihInternational, sahih)
            .with_tafsir(tafsir)
    }

    #[test]
    fn test_format_chapters() {
        assert_eq!(format_chapters(&corpus()), "  1. Al-Fatihah\n  2. Al-Baqarah\n");
    }

    #[test]
    fn test_format_chapter_uses_preferences() {
        let prefs = Preferences::default();
        let out = format_chapter(&corpus(), &prefs, 1).unwrap();
        assert_eq!(out, "1. Al-Fatihah\n\n[1:1]\nبِسْمِ ٱللَّهِ\nIn the name of Allah\n\n");

        let no_script = Preferences {
            script: Script::Off,
            ..Preferences::default()
        };
        let out = format_chapter(&corpus(), &no_script, 1).unwrap();
        assert!(!out.contains("بِسْمِ"));
    }

    #[test]
    fn test_format_chapter_rejects_unknown_surah() {
        assert!(format_chapter(&corpus(), &Preferences::default(), 115).is_err());
        assert!(format_chapter(&corpus(), &Preferences::default(), 0).is_err());
    }

    #[test]
    fn test_format_tafsir() {
        let out = format_tafsir(&corpus(), 1).unwrap();
        assert!(out.contains("Ayahs: 1:1, 1:2\nEvery beginning is with His name."));
        assert_eq!(out.matches("Ayahs:").count(), 1);

        let empty = format_tafsir(&corpus(), 2).unwrap();
        assert!(empty.contains("No Tafsir available."));
    }

    #[test]
    fn test_configure_switches_provider_and_model() {
        let config = Config::new();

        let updated = configure(&config, Some("ollama"), None).unwrap();
        assert_eq!(updated.provider(), Provider::Ollama);
        assert_eq!(updated.model(), Provider::Ollama.default_model());

        let updated = configure(&updated, None, Some("mistral:latest".into())).unwrap();
        assert_eq!(updated.model(), "mistral:latest");
        assert!(format_config(&updated).starts_with("Provider: Ollama (Local)\nModel: mistral:latest\n"));

        assert!(configure(&config, Some("bard"), None).is_err());
    }

    #[test]
    fn test_format_sections() {
        let sections = split_sections("Intro\n**Context and Explanation**\nMakkan surah.");
        assert_eq!(
            format_sections(&sections),
            "Intro\n\n== Context and Explanation ==\nMakkan surah.\n\n"
        );
    }
}
