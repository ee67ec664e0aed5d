//! # paper-summa
//!
//! Summarise the PDFs of a Zotero collection with an LLM and store each
//! summary as a tagged child note.
//!
//! ## Features
//!
//! - **Idempotent**: items that already carry a note with the summary tag are skipped
//! - **Streaming**: summaries are echoed to the console as the model produces them
//! - **Provider Agnostic**: any OpenAI-compatible chat completion endpoint

pub mod agent;
pub mod config;
pub mod pdf;
pub mod processor;
pub mod sse;
pub mod summary;
pub mod ui;
pub mod zotero;

pub use agent::{OpenAiSummarizer, Summarizer};
pub use config::Config;
pub use pdf::{PdfExtractor, TextExtractor};
pub use processor::{ItemOutcome, ProcessReport, ProcessSettings, Processor};
pub use summary::SummaryNote;
pub use zotero::{Library, ZoteroClient};
