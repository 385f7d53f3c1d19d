//! Deck retrieval from the Archidekt deck builder.

use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{error, warn};

use crate::models::{DeckDetails, DeckEntry};

/// Oracle layout marking an art-series card.
const ART_SERIES_LAYOUT: &str = "art_series";

static DECK_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://archidekt\.com/(?:api/decks/(\d+)/|decks/(\d+)/)")
        .expect("invalid deck url regex")
});

/// Extract the numeric deck id from an Archidekt deck url.
pub fn extract_deck_id(url: &str) -> Option<u64> {
    let captures = DECK_ID_RE.captures(url)?;
    captures
        .iter()
        .skip(1)
        .flatten()
        .find_map(|group| group.as_str().parse().ok())
}

/// Client fetching decks from the Archidekt API.
pub struct ArchidektClient {
    base_url: String,
    http: reqwest::Client,
}

impl ArchidektClient {
    /// Create a client against the given API base url with a bounded
    /// per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    /// Fetch the deck behind `deck_url` and map its cards into entries.
    /// Returns `None` when the url is not recognized, the deck cannot be
    /// loaded, or it contains no cards.
    pub async fn retrieve_deck(&self, deck_url: &str) -> Option<DeckDetails> {
        let deck_id = extract_deck_id(deck_url)?;
        let Some(deck) = self.fetch_deck(deck_id).await else {
            error!("deck {deck_id} could not be loaded from the deck provider");
            return None;
        };

        let cards = deck.cards.unwrap_or_default();
        if cards.is_empty() {
            error!("deck {deck_id} is empty");
            return None;
        }

        let mut details =
            DeckDetails::new(deck.name.unwrap_or_else(|| format!("deck-{deck_id}")));
        details.cards = map_entries(cards);
        Some(details)
    }

    async fn fetch_deck(&self, deck_id: u64) -> Option<DeckResponse> {
        let url = format!("{}/api/decks/{deck_id}/", self.base_url);
        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                error!("deck {deck_id}: request failed: {err}");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(
                "deck {deck_id}: failure response from the deck provider: {}",
                response.status()
            );
            return None;
        }
        match response.json::<DeckResponse>().await {
            Ok(deck) => Some(deck),
            Err(err) => {
                error!("deck {deck_id}: failed to decode deck response: {err}");
                None
            }
        }
    }
}

fn map_entries(cards: Vec<DeckCard>) -> Vec<DeckEntry> {
    let mut entries = Vec::new();
    for card in cards {
        let name = card
            .card
            .as_ref()
            .and_then(|inner| inner.oracle_card.as_ref())
            .and_then(|oracle| oracle.name.clone());
        let Some(name) = name else {
            continue;
        };
        if card.quantity <= 0 {
            continue;
        }

        let mut entry = DeckEntry::new(name, card.quantity as u32);
        if let Some(inner) = &card.card {
            entry.collector_number = inner.collector_number.clone();
            entry.expansion_code = inner
                .edition
                .as_ref()
                .and_then(|edition| edition.edition_code.clone());
            entry.is_art = inner
                .oracle_card
                .as_ref()
                .and_then(|oracle| oracle.layout.as_deref())
                .is_some_and(|layout| layout.eq_ignore_ascii_case(ART_SERIES_LAYOUT));
        }
        entry.is_etched = modifier_is(&card.modifier, "Etched");
        entry.is_foil = modifier_is(&card.modifier, "Foil");
        entries.push(entry);
    }
    entries
}

fn modifier_is(modifier: &Option<String>, expected: &str) -> bool {
    modifier
        .as_deref()
        .is_some_and(|value| value.eq_ignore_ascii_case(expected))
}

#[derive(Debug, Deserialize)]
struct DeckResponse {
    name: Option<String>,
    #[serde(default)]
    cards: Option<Vec<DeckCard>>,
}

#[derive(Debug, Deserialize)]
struct DeckCard {
    card: Option<CardInfo>,
    #[serde(default)]
    quantity: i64,
    #[serde(default)]
    modifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CardInfo {
    #[serde(rename = "oracleCard")]
    oracle_card: Option<OracleCard>,
    edition: Option<Edition>,
    #[serde(rename = "collectorNumber", default)]
    collector_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OracleCard {
    name: Option<String>,
    #[serde(default)]
    layout: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Edition {
    #[serde(rename = "editioncode", default)]
    edition_code: Option<String>,
}
