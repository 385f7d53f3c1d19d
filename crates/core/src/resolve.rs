//! Card identity resolution and token expansion.
//!
//! For each deck entry the resolver picks the matching card database
//! record, derives the printable sides (single face, double face, art
//! card), and harvests related token references. Token expansion then
//! appends one synthetic entry per token. Per-entry failures are soft:
//! the entry keeps an empty side set and is later dropped from the
//! manifest.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, warn};

use crate::{
    models::{CardSide, DeckEntry, TokenRef, FACE_SEPARATOR},
    progress::{ProgressSender, ProgressStage},
    scryfall::models::{CardData, COMPONENT_TOKEN},
};

/// Port for resolving deck entries against the card database.
///
/// Implementations log transport failures and surface them as `None`.
#[allow(async_fn_in_trait)]
pub trait CardLookup {
    /// Exact printing lookup by set code and collector number.
    async fn find_card(
        &self,
        name: &str,
        set_code: &str,
        collector_number: &str,
        language: Option<&str>,
    ) -> Option<CardData>;

    /// Name search, optionally widened to extra prints and to other
    /// languages.
    async fn search_cards(
        &self,
        name: &str,
        include_extras: bool,
        include_multilingual: bool,
    ) -> Option<Vec<CardData>>;

    /// Fetch a card record by database identifier.
    async fn card_by_id(&self, id: &str) -> Option<CardData>;
}

/// Caller-supplied knobs for one resolution run.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Preferred card language; resolution retries without it on a miss.
    pub language: Option<String>,
    /// Copies to print for each related token; zero disables harvesting.
    pub token_copies: u32,
    /// Materialize every token printing instead of one per name.
    pub print_all_tokens: bool,
}

/// Resolves deck entries to printable card sides and expands related
/// tokens into synthetic entries.
pub struct DeckResolver<L> {
    lookup: L,
    progress: ProgressSender,
}

impl<L: CardLookup> DeckResolver<L> {
    /// New resolver over the given lookup port.
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            progress: ProgressSender::disabled(),
        }
    }

    /// Attach a progress channel notified after each processed entry.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    /// Resolve every entry in place, then append expanded token entries.
    ///
    /// Entries are processed in list order so progress percentages are
    /// monotonic and token discovery order is deterministic.
    pub async fn resolve_deck(&self, cards: &mut Vec<DeckEntry>, options: &ResolveOptions) {
        let total = cards.len();
        let mut processed = 0usize;
        self.report_percent(processed, total).await;
        for card in cards.iter_mut() {
            self.resolve_entry(card, options).await;
            processed += 1;
            self.report_percent(processed, total).await;
        }

        self.expand_tokens(cards, options.token_copies, options.print_all_tokens)
            .await;
    }

    /// Resolve one entry. On success `entry.sides` holds the printable
    /// sides; on a soft failure it stays empty and the entry is excluded
    /// from the manifest later.
    pub async fn resolve_entry(&self, entry: &mut DeckEntry, options: &ResolveOptions) {
        let language = options.language.as_deref();
        let mut candidate = self.search_candidate(entry, language).await;
        if candidate.is_none() && language.is_some() {
            warn!(
                "card '{}' in [{}] was not found in the card database",
                entry.name,
                language.unwrap_or_default()
            );
            candidate = self.search_candidate(entry, None).await;
        }
        let Some(candidate) = candidate else {
            error!(
                "card '{}' was not found in the card database and will be ignored",
                entry.name
            );
            self.progress
                .error(
                    ProgressStage::DeckDetails,
                    format!("card '{}' not found", entry.name),
                )
                .await;
            return;
        };

        // The extraction steps below override each other; their order is
        // load-bearing.
        collect_face_sides(&candidate, entry);
        collapse_art_sides(entry);
        if !ensure_single_face(entry, &candidate) {
            error!("card '{}' does not have any url to its picture", entry.name);
            self.progress
                .error(
                    ProgressStage::DeckDetails,
                    format!("card '{}' has no printable image", entry.name),
                )
                .await;
        }

        if options.token_copies > 0 {
            harvest_tokens(entry, &candidate);
        }
    }

    /// Look up candidates and select the first record satisfying the
    /// entry's print qualifiers.
    async fn search_candidate(&self, entry: &DeckEntry, language: Option<&str>) -> Option<CardData> {
        let candidates = match (
            entry.expansion_code.as_deref(),
            entry.collector_number.as_deref(),
        ) {
            (Some(set_code), Some(collector_number)) => self
                .lookup
                .find_card(&entry.name, set_code, collector_number, language)
                .await
                .map(|card| vec![card]),
            _ => {
                let include_extras =
                    entry.expansion_code.is_some() || entry.is_etched || entry.is_art;
                self.lookup
                    .search_cards(&entry.name, include_extras, language.is_some())
                    .await
            }
        }?;

        candidates
            .into_iter()
            .find(|candidate| selects(entry, candidate, language))
    }

    /// Append one synthetic entry per harvested token reference.
    ///
    /// Discovery order is preserved; without `print_all` only the first
    /// reference per token name is materialized. Expansion is single-depth:
    /// token entries never carry further tokens.
    pub async fn expand_tokens(&self, cards: &mut Vec<DeckEntry>, copies: u32, print_all: bool) {
        let mut tokens: Vec<TokenRef> = cards
            .iter()
            .flat_map(|card| card.tokens.iter().cloned())
            .collect();
        if !print_all {
            let mut seen = HashSet::new();
            tokens.retain(|token| seen.insert(token.name.clone()));
        }

        for token in tokens {
            let Some(id) = card_id_from_uri(&token.uri) else {
                error!(
                    "token '{}' does not have a valid card database uri",
                    token.name
                );
                continue;
            };
            let Some(record) = self.lookup.card_by_id(&id).await else {
                continue;
            };

            let mut entry = DeckEntry::new(token.name, copies);
            entry.expansion_code = record.set.clone();
            entry.add_side(CardSide {
                name: record.name.clone().unwrap_or_default(),
                image_url: record.large_image().unwrap_or_default().to_string(),
            });
            cards.push(entry);
        }
    }

    async fn report_percent(&self, processed: usize, total: usize) {
        if total == 0 {
            return;
        }
        let percent = processed as f64 / total as f64 * 100.0;
        self.progress
            .percent(ProgressStage::DeckDetails, percent)
            .await;
    }
}

/// Candidate selection predicate over the entry's print qualifiers.
fn selects(entry: &DeckEntry, candidate: &CardData, language: Option<&str>) -> bool {
    let name_matches = candidate
        .name
        .as_deref()
        .is_some_and(|name| name.to_lowercase() == entry.name.to_lowercase());
    if !name_matches {
        return false;
    }
    if entry.is_etched && !candidate.etched_available() {
        return false;
    }
    if let Some(expansion) = entry.expansion_code.as_deref() {
        if candidate.set.as_deref() != Some(expansion) {
            return false;
        }
    }
    if let Some(language) = language {
        if !candidate
            .lang
            .as_deref()
            .is_some_and(|lang| lang.eq_ignore_ascii_case(language))
        {
            return false;
        }
    }
    true
}

/// One side per face that carries an image reference. Faces without one
/// are skipped.
fn collect_face_sides(candidate: &CardData, entry: &mut DeckEntry) {
    let Some(faces) = &candidate.card_faces else {
        return;
    };
    for face in faces {
        let Some(uris) = &face.image_uris else {
            continue;
        };
        entry.add_side(CardSide {
            name: face.name.clone().unwrap_or_default(),
            image_url: uris.large.clone().unwrap_or_default(),
        });
    }
}

/// Art cards print once: keep only the first extracted side. Applies to
/// flagged entries and to names splitting into two identical halves.
fn collapse_art_sides(entry: &mut DeckEntry) {
    let halves: Vec<&str> = entry.name.split(FACE_SEPARATOR).collect();
    let self_split = halves.len() > 1 && halves[0] == halves[1];
    if (entry.is_art || self_split) && !entry.sides.is_empty() {
        entry.sides.truncate(1);
    }
}

/// Replace an empty or degenerate side set with the candidate's top-level
/// image. Returns false when the candidate has no usable image at all, in
/// which case the side set stays empty.
fn ensure_single_face(entry: &mut DeckEntry, candidate: &CardData) -> bool {
    let degenerate = entry.sides.is_empty()
        || entry
            .sides
            .iter()
            .any(|side| side.name.is_empty() || side.image_url.is_empty());
    if !degenerate {
        return true;
    }

    entry.sides.clear();
    match candidate.large_image() {
        Some(image_url) => {
            entry.sides.push(CardSide {
                name: entry.name.clone(),
                image_url: image_url.to_string(),
            });
            true
        }
        None => false,
    }
}

/// Collect related parts marked as tokens, pending expansion. No
/// deduplication here; that happens during expansion.
fn harvest_tokens(entry: &mut DeckEntry, candidate: &CardData) {
    let Some(parts) = &candidate.all_parts else {
        return;
    };
    for part in parts.iter().filter(|part| part.component == COMPONENT_TOKEN) {
        entry.tokens.push(TokenRef {
            name: part.name.clone(),
            uri: part.uri.clone(),
        });
    }
}

static CARD_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("invalid card id regex")
});

/// Database identifier from the trailing path segment of a lookup uri.
fn card_id_from_uri(uri: &str) -> Option<String> {
    let segment = uri.trim_end_matches('/').rsplit('/').next()?;
    CARD_ID_RE.is_match(segment).then(|| segment.to_string())
}
