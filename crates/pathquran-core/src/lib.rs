pub mod ai;
pub mod config;
pub mod corpus;
pub mod explain;
pub mod last_read;
pub mod provider;
pub mod reference;
pub mod settings;
pub mod state;
pub mod store;
pub mod tafsir;

// Re-export main types for convenience
pub use ai::{CompletionError, OllamaClient, OpenAIClient};
pub use config::Config;
pub use corpus::{Corpus, VerseTable, VerseView};
pub use explain::{split_sections, ExplanationRequest, Explainer, Section};
pub use last_read::{LastRead, LastReadWriter};
pub use provider::Provider;
pub use reference::VerseRange;
pub use settings::{Preferences, Script, TranslationSource};
pub use state::AppState;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use tafsir::{TafsirEntry, TafsirIndex, TafsirTable};
