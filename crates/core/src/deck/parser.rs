//! Parser for card lists exported as plain text.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::models::{DeckDetails, DeckEntry};

/// Marker for a foil printing on an exported list line.
const FOIL_MARKER: &str = "*F*";
/// Marker for an etched printing on an exported list line.
const ETCHED_MARKER: &str = "*E*";

/// Parses deck lists exported as text, one card per line.
///
/// Line grammar: `[<quantity>[x]] <name> [(<expansion>)] [*F*] [*E*]`.
/// A missing or unparsable quantity defaults to one copy.
pub struct CardListParser;

impl CardListParser {
    /// Read and parse the file at `path`. The deck takes its display name
    /// from the file stem.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<DeckDetails> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read deck list {}", path.display()))?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("deck");
        Ok(Self::parse(name, &contents))
    }

    /// Parse deck list text into entries, skipping lines that yield no
    /// card name.
    pub fn parse(name: &str, contents: &str) -> DeckDetails {
        let mut deck = DeckDetails::new(name);
        for line in contents.lines() {
            match parse_line(line) {
                Some(entry) => deck.cards.push(entry),
                None => debug!("skipping deck list line without a card name: '{line}'"),
            }
        }
        deck
    }
}

fn parse_line(line: &str) -> Option<DeckEntry> {
    let line = line.trim_end();

    // Leading quantity, with an optional `x` suffix.
    let first_token = line.split(' ').next().unwrap_or("");
    let quantity_token = if first_token.len() > 1 && first_token.contains('x') {
        let last_char_at = first_token
            .char_indices()
            .last()
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        &first_token[..last_char_at]
    } else {
        first_token
    };
    let (quantity, name_start) = match quantity_token.parse::<u32>() {
        Ok(quantity) => (quantity, line.find(' ').map(|idx| idx + 1).unwrap_or(0)),
        Err(_) => (1, 0),
    };

    // The name runs up to the first print qualifier, if any.
    let expansion_start = line.find('(');
    let foil_idx = line.find(FOIL_MARKER);
    let etched_idx = line.find(ETCHED_MARKER);
    let name_end = [expansion_start, foil_idx, etched_idx]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());

    let name = line.get(name_start..name_end)?.trim_end();
    if name.is_empty() {
        return None;
    }

    let mut entry = DeckEntry::new(name, quantity);
    if let (Some(start), Some(end)) = (expansion_start, line.find(')')) {
        if end > start + 1 {
            entry.expansion_code = Some(line[start + 1..end].trim_end().to_string());
        }
    }
    entry.is_foil = foil_idx.is_some();
    entry.is_etched = etched_idx.is_some();
    Some(entry)
}
