use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{prelude::*, EnvFilter};

use deckproxy_core::{
    deck::ArchidektClient, lang, scryfall::ScryfallClient, AppConfig, PrintRequest,
    ProgressSender, ProgressUpdate, ProxyPrinter,
};

/// Generate a printable proxy sheet from a Magic deck list.
#[derive(Debug, Parser)]
#[command(name = "deckproxy", version, about)]
struct Cli {
    /// Path to a card list exported from Archidekt
    #[arg(long)]
    deck_file: Option<PathBuf>,

    /// Url of a deck hosted on Archidekt
    #[arg(long)]
    deck_url: Option<String>,

    /// Directory for the generated sheet and its images
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// File name of the generated sheet, without extension
    #[arg(long)]
    output_name: Option<String>,

    /// Preferred card language code (e.g. en, de, ja)
    #[arg(long)]
    language: Option<String>,

    /// Copies to print for each token related to a deck card
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=100))]
    token_copies: u32,

    /// Print every token printing instead of one per token name
    #[arg(long)]
    print_all_tokens: bool,

    /// Keep a copy of each downloaded card image next to the sheet
    #[arg(long)]
    save_images: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();
    if cli.deck_file.is_none() && cli.deck_url.is_none() {
        bail!("provide --deck-file or --deck-url");
    }
    if let Some(language) = cli.language.as_deref() {
        if !lang::is_known_language(language) {
            bail!(
                "unsupported language '{language}', expected one of: {}",
                lang::available_languages()
            );
        }
    }

    let config = AppConfig::load()?;
    tracing::debug!("loaded configuration: {config:?}");
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let scryfall = ScryfallClient::new(config.scryfall_base_url.as_str(), timeout)?;
    let archidekt = ArchidektClient::new(config.archidekt_base_url.as_str(), timeout)?;

    let (progress_tx, mut progress_rx) = mpsc::channel(16);
    let reporter = tokio::spawn(async move {
        while let Some(update) = progress_rx.recv().await {
            print_progress(&update);
        }
    });

    let printer = ProxyPrinter::new(config, archidekt, scryfall.clone(), scryfall)
        .with_progress(ProgressSender::new(progress_tx));

    let request = PrintRequest {
        deck_url: cli.deck_url,
        deck_file: cli.deck_file,
        output_dir: cli.output_dir,
        output_name: cli.output_name,
        language: cli.language,
        token_copies: cli.token_copies,
        print_all_tokens: cli.print_all_tokens,
        save_images: cli.save_images,
    };

    let result = printer.generate(&request).await;
    drop(printer);
    let _ = reporter.await;

    let sheet = result?;
    println!("sheet written to {}", sheet.display());
    Ok(())
}

fn print_progress(update: &ProgressUpdate) {
    if let Some(percent) = update.percent {
        println!("{percent:.1}%");
    }
    if let Some(error) = &update.error {
        eprintln!("{error}");
    }
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("deckproxy.log");

    let env_filter = EnvFilter::from_default_env();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
