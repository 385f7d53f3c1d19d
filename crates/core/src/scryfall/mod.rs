//! Card database client and response payloads.

pub mod client;
pub mod models;

pub use client::ScryfallClient;
