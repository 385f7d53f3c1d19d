//! Hard failure taxonomy for materialization requests.

use thiserror::Error;

/// Errors that abort a print request.
///
/// Per-entry lookup failures are soft: they are logged, reported on the
/// progress channel and only drop the affected entry.
#[derive(Debug, Error)]
pub enum PrintError {
    /// Neither a deck file nor a deck url was supplied.
    #[error("no deck input: provide a deck list file or a deck url")]
    MissingInput,
    /// The deck url does not belong to a supported deck provider.
    #[error("unrecognized deck url: {0}")]
    UnrecognizedDeckUrl(String),
    /// The deck could not be loaded or parsed.
    #[error("failed to load deck: {0}")]
    DeckLoad(String),
    /// The deck has no printable cards.
    #[error("deck contains no printable cards")]
    EmptyDeck,
    /// Filesystem failure while writing output.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
