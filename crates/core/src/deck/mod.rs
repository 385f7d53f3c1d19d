//! Deck sources: exported list files and online deck builders.

pub mod archidekt;
pub mod parser;

pub use archidekt::ArchidektClient;
pub use parser::CardListParser;
