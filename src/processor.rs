//! Collection processing: find unsummarised items, summarise their PDFs and
//! write the summaries back as tagged notes.

use crate::agent::{collect_fragments, Summarizer};
use crate::config::{Config, ConfigError};
use crate::pdf::TextExtractor;
use crate::summary::SummaryNote;
use crate::zotero::{find_pdf_attachment, has_summary_note, Item, Library, ZoteroError};
use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// What happened to one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A note with the summary tag already exists
    AlreadySummarized,
    /// No PDF attachment, or its file is not synced locally
    NoPdf,
    ExtractFailed,
    /// Extraction produced only whitespace
    EmptyText,
    SummarizeFailed,
    EmptySummary,
    /// A new note was written
    Summarized,
}

/// Per-outcome counts for a whole collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    pub summarized: usize,
    pub already_summarized: usize,
    pub no_pdf: usize,
    pub extract_failed: usize,
    pub empty_text: usize,
    pub summarize_failed: usize,
    pub empty_summary: usize,
}

impl ProcessReport {
    pub fn record(&mut self, outcome: ItemOutcome) {
        let counter = match outcome {
            ItemOutcome::AlreadySummarized => &mut self.already_summarized,
            ItemOutcome::NoPdf => &mut self.no_pdf,
            ItemOutcome::ExtractFailed => &mut self.extract_failed,
            ItemOutcome::EmptyText => &mut self.empty_text,
            ItemOutcome::SummarizeFailed => &mut self.summarize_failed,
            ItemOutcome::EmptySummary => &mut self.empty_summary,
            ItemOutcome::Summarized => &mut self.summarized,
        };
        *counter += 1;
    }

    pub fn total(&self) -> usize {
        self.summarized
            + self.already_summarized
            + self.no_pdf
            + self.extract_failed
            + self.empty_text
            + self.summarize_failed
            + self.empty_summary
    }
}

impl fmt::Display for ProcessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} items: {} summarised, {} already summarised, {} without PDF, {} extraction failures, \
             {} empty texts, {} summarisation failures, {} empty summaries",
            self.total(),
            self.summarized,
            self.already_summarized,
            self.no_pdf,
            self.extract_failed,
            self.empty_text,
            self.summarize_failed,
            self.empty_summary
        )
    }
}

/// Settings the processor needs from the config
#[derive(Debug, Clone)]
pub struct ProcessSettings {
    /// Tag marking a summary note
    pub summary_tag: String,
    /// Root of the local attachment storage
    pub storage_dir: PathBuf,
    /// Pause after each written note
    pub delay: Duration,
}

impl ProcessSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            summary_tag: config.zotero.summary_tag.clone(),
            storage_dir: config.storage_dir()?,
            delay: config.delay(),
        })
    }
}

type Observer = Box<dyn Fn(&str) + Send + Sync>;

/// Walks a collection one item at a time.
pub struct Processor<'a> {
    library: &'a dyn Library,
    extractor: &'a dyn TextExtractor,
    summarizer: &'a dyn Summarizer,
    settings: ProcessSettings,
    observer: Option<Observer>,
}

impl<'a> Processor<'a> {
    pub fn new(
        library: &'a dyn Library,
        extractor: &'a dyn TextExtractor,
        summarizer: &'a dyn Summarizer,
        settings: ProcessSettings,
    ) -> Self {
        Self {
            library,
            extractor,
            summarizer,
            settings,
            observer: None,
        }
    }

    /// Receive every summary fragment as it streams in
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Process every top-level item of a collection in listing order.
    ///
    /// Extraction and summarisation failures skip the item. Library errors,
    /// including a failed note write, abort the run.
    pub async fn process_collection(&self, collection_key: &str) -> Result<ProcessReport, ZoteroError> {
        let items = self.library.list_top_level_items(collection_key).await?;
        tracing::debug!(collection = collection_key, items = items.len(), "processing collection");

        let mut report = ProcessReport::default();
        for item in &items {
            let outcome = self.process_item(item).await?;
            report.record(outcome);
        }
        Ok(report)
    }

    /// Run one item through the pipeline.
    pub async fn process_item(&self, item: &Item) -> Result<ItemOutcome, ZoteroError> {
        let children = self.library.list_children(&item.key).await?;
        if has_summary_note(&children, &self.settings.summary_tag) {
            println!(
                "{} {} (already has a '{}' note)",
                "Skipping".dimmed(),
                item.title,
                self.settings.summary_tag
            );
            return Ok(ItemOutcome::AlreadySummarized);
        }

        println!("\n{} {}", "Processing".bold(), item.title);

        let pdf_path = find_pdf_attachment(&children)
            .and_then(|attachment| attachment.local_path(&self.settings.storage_dir))
            .filter(|path| path.exists());
        let Some(pdf_path) = pdf_path else {
            tracing::debug!(item = %item.key, "no local PDF attachment");
            return Ok(ItemOutcome::NoPdf);
        };

        println!(
            "Reading PDF: {}",
            pdf_path
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default()
        );
        let text = match self.extractor.extract(&pdf_path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("{} {}", "PDF error:".red(), e);
                return Ok(ItemOutcome::ExtractFailed);
            }
        };
        if text.trim().is_empty() {
            tracing::warn!(item = %item.key, "PDF yielded no text");
            return Ok(ItemOutcome::EmptyText);
        }

        println!("Generating summary...\n");
        let summary = match self.summarize(&text).await {
            Ok(summary) => summary,
            Err(e) => {
                eprintln!("{} {}", "LLM error:".red(), e);
                return Ok(ItemOutcome::SummarizeFailed);
            }
        };
        if summary.trim().is_empty() {
            tracing::warn!(item = %item.key, "model returned an empty summary");
            return Ok(ItemOutcome::EmptySummary);
        }

        let note = SummaryNote::new(&summary, &self.settings.summary_tag);
        self.library
            .create_note(&item.key, &note.html, &note.tags)
            .await?;
        println!("{} {}", "Added AI summary to".green(), item.title);

        if !self.settings.delay.is_zero() {
            tokio::time::sleep(self.settings.delay).await;
        }
        Ok(ItemOutcome::Summarized)
    }

    async fn summarize(&self, text: &str) -> Result<String, crate::agent::SummarizeError> {
        let fragments = self.summarizer.stream(text).await?;
        let summary = collect_fragments(fragments, |fragment| {
            if let Some(observer) = &self.observer {
                observer(fragment);
            }
        })
        .await?;
        if self.observer.is_some() {
            println!("\n");
        }
        Ok(summary)
    }
}
