//! paper-summa CLI - AI summaries for the PDFs in a Zotero collection
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use clap::{Parser, Subcommand};
use colored::Colorize;
use paper_summa::{
    ui, Config, Library, OpenAiSummarizer, PdfExtractor, ProcessSettings, Processor,
    TextExtractor, ZoteroClient,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "paper-summa")]
#[command(author, version, about = "AI summaries for the PDFs in a Zotero collection", long_about = None)]
struct Cli {
    /// Settings file to use instead of zotero_config_dev.toml / zotero_config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List collections with their keys
    Collections,
    /// Summarise a collection by key, without the interactive menu
    Process {
        /// Collection key
        key: String,
    },
    /// Print the text extracted from a PDF
    Extract {
        /// Path to the PDF
        path: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "paper_summa=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Extract { path }) => {
            let text = PdfExtractor.extract(&path)?;
            println!("{}", text);
            println!("\n--- Extracted {} characters ---", text.len());
        }
        Some(Commands::Collections) => {
            let config = load_config(cli.config.as_ref())?;
            let library = ZoteroClient::new(&config.zotero)?;
            for collection in library.list_collections().await? {
                println!("{}  {}", collection.key.dimmed(), collection.name);
            }
        }
        Some(Commands::Process { key }) => {
            let config = load_config(cli.config.as_ref())?;
            let library = ZoteroClient::new(&config.zotero)?;
            summarise_collection(&config, &library, &key).await?;
        }
        None => {
            // Settings must load before any client is built
            let config = load_config(cli.config.as_ref())?;
            let library = ZoteroClient::new(&config.zotero)?;

            let collections = library.list_collections().await?;
            if collections.is_empty() {
                println!("No collections found.");
                return Ok(());
            }
            let mut stdout = io::stdout();
            ui::print_menu(&mut stdout, &collections)?;
            let choice = ui::prompt_choice(&mut io::stdin().lock(), &mut stdout, collections.len())?;
            summarise_collection(&config, &library, &collections[choice].key).await?;
        }
    }

    Ok(())
}

async fn summarise_collection(
    config: &Config,
    library: &ZoteroClient,
    collection_key: &str,
) -> anyhow::Result<()> {
    let summarizer = OpenAiSummarizer::new(config)?;
    let settings = ProcessSettings::from_config(config)?;
    let processor = Processor::new(library, &PdfExtractor, &summarizer, settings).with_observer(
        |fragment| {
            print!("{}", fragment);
            let _ = io::stdout().flush();
        },
    );

    let report = processor.process_collection(collection_key).await?;
    println!("\n{} {}", "Done:".green().bold(), report);
    Ok(())
}
