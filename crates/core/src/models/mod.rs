//! Shared domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator between the face names of a double-faced card.
pub const FACE_SEPARATOR: &str = " // ";

/// One printable face of a card. Identity is the (name, image url) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardSide {
    /// Face name as printed on the card.
    pub name: String,
    /// Location of the face image.
    pub image_url: String,
}

/// Reference to a related token discovered during resolution, pending
/// expansion into its own entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    /// Token name.
    pub name: String,
    /// Dereferenceable uri of the token's own card record.
    pub uri: String,
}

/// One line of a deck: a card name plus quantity and print qualifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckEntry {
    /// Card name, the canonical query key.
    pub name: String,
    /// Number of copies to print.
    pub quantity: u32,
    /// Expansion code narrowing the lookup to a specific printing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expansion_code: Option<String>,
    /// Collector number narrowing the lookup to a specific printing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector_number: Option<String>,
    /// Art-card variant; only the first resolved side is kept.
    #[serde(default)]
    pub is_art: bool,
    /// Etched printing requested; affects candidate selection.
    #[serde(default)]
    pub is_etched: bool,
    /// Foil printing requested.
    #[serde(default)]
    pub is_foil: bool,
    /// Resolved printable sides, an insertion-ordered set keyed on
    /// (name, image url). Empty until resolution runs.
    #[serde(default)]
    pub sides: Vec<CardSide>,
    /// Related token references discovered during resolution.
    #[serde(default)]
    pub tokens: Vec<TokenRef>,
}

impl DeckEntry {
    /// New entry with the given name and print quantity.
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
            ..Self::default()
        }
    }

    /// Insert a side unless an equal one is already present, preserving
    /// insertion order.
    pub fn add_side(&mut self, side: CardSide) {
        if !self.sides.contains(&side) {
            self.sides.push(side);
        }
    }
}

/// A deck with its display name and entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckDetails {
    /// Deck display name.
    pub name: String,
    /// Deck entries in list order.
    pub cards: Vec<DeckEntry>,
    /// When the deck was read from its source.
    pub retrieved_at: DateTime<Utc>,
}

impl DeckDetails {
    /// New empty deck with the given display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cards: Vec::new(),
            retrieved_at: Utc::now(),
        }
    }

    /// Total number of printable sides across all entries.
    pub fn side_count(&self) -> usize {
        self.cards.iter().map(|card| card.sides.len()).sum()
    }
}
