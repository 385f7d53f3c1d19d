#![warn(clippy::all, missing_docs)]

//! Core domain logic for the deckproxy sheet generator.
//!
//! This crate hosts the deck models, the card database and deck provider
//! clients, the card resolution and token expansion engine, and the
//! printable sheet assembly used by the command line frontend.

pub mod config;
pub mod deck;
pub mod document;
pub mod error;
pub mod lang;
pub mod models;
pub mod printer;
pub mod progress;
pub mod resolve;
pub mod scryfall;

pub use config::AppConfig;
pub use error::PrintError;
pub use models::{CardSide, DeckDetails, DeckEntry, TokenRef};
pub use printer::{PrintRequest, ProxyPrinter};
pub use progress::{ProgressSender, ProgressStage, ProgressUpdate};
pub use resolve::{CardLookup, DeckResolver, ResolveOptions};

/// User agent presented to the card database and deck provider APIs.
pub(crate) const USER_AGENT: &str = concat!("deckproxy/", env!("CARGO_PKG_VERSION"));
