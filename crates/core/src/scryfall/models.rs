#![allow(missing_docs)]

//! Response payloads from the card database.

use serde::Deserialize;

/// Component kind marking a related part as a token.
pub const COMPONENT_TOKEN: &str = "token";

/// One page of a card search response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardSearchPage {
    #[serde(default)]
    pub data: Vec<CardData>,
}

/// A single card record as returned by the card database.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardData {
    pub name: Option<String>,
    pub lang: Option<String>,
    pub set: Option<String>,
    #[serde(default)]
    pub tcgplayer_etched_id: Option<i64>,
    #[serde(default)]
    pub all_parts: Option<Vec<RelatedPart>>,
    #[serde(default)]
    pub card_faces: Option<Vec<CardFace>>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
}

impl CardData {
    /// Whether an etched printing of this record exists.
    pub fn etched_available(&self) -> bool {
        self.tcgplayer_etched_id.is_some()
    }

    /// Top-level large image, present only on single-faced cards.
    pub fn large_image(&self) -> Option<&str> {
        self.image_uris
            .as_ref()
            .and_then(|uris| uris.large.as_deref())
            .filter(|url| !url.is_empty())
    }
}

/// One face of a multi-faced card.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardFace {
    pub name: Option<String>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
}

/// Image locations attached to a card or face.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageUris {
    pub large: Option<String>,
}

/// Reference to a related game piece, e.g. a token.
#[derive(Debug, Clone, Deserialize)]
pub struct RelatedPart {
    pub name: String,
    pub component: String,
    pub uri: String,
}
