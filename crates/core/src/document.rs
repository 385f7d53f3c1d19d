//! Printable sheet assembly from a materialized deck.
//!
//! The assembler downloads each resolved side's image once, stores it
//! under the output folder and emits a self-describing HTML sheet that
//! prints every card at physical size.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::warn;

use crate::{
    error::PrintError,
    models::{DeckDetails, FACE_SEPARATOR},
    progress::{ProgressSender, ProgressStage},
};

/// Physical card width in millimetres.
pub const CARD_WIDTH_MM: f64 = 63.0;
/// Physical card height in millimetres.
pub const CARD_HEIGHT_MM: f64 = 88.0;

/// Subdirectory holding the images referenced by the sheet.
const IMAGES_DIR: &str = "images";

/// Port for fetching the image bytes referenced by resolved card sides.
#[allow(async_fn_in_trait)]
pub trait ImageSource {
    /// Download the image at `url`, returning `None` on failure.
    async fn download_image(&self, url: &str) -> Option<Vec<u8>>;
}

/// Writes a printable HTML sheet plus its card images to an output folder.
pub struct SheetAssembler<I> {
    images: I,
    progress: ProgressSender,
}

struct SheetCell {
    name: String,
    image: String,
    copies: u32,
}

impl<I: ImageSource> SheetAssembler<I> {
    /// New assembler over the given image source.
    pub fn new(images: I) -> Self {
        Self {
            images,
            progress: ProgressSender::disabled(),
        }
    }

    /// Attach a progress channel notified after each written image.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    /// Assemble the sheet for `deck` under `output_dir`. The sheet file is
    /// named after `file_name` or, when absent, the deck. Returns the
    /// sheet path.
    ///
    /// Sides whose image cannot be downloaded are skipped; a deck without
    /// any printable side is an error and produces no document.
    pub async fn assemble(
        &self,
        deck: &DeckDetails,
        output_dir: &Path,
        file_name: Option<&str>,
        save_images: bool,
    ) -> Result<PathBuf, PrintError> {
        let total = deck.side_count();
        if total == 0 {
            self.progress
                .error(ProgressStage::Document, "no cards found in the deck")
                .await;
            return Err(PrintError::EmptyDeck);
        }

        let images_dir = output_dir.join(IMAGES_DIR);
        fs::create_dir_all(&images_dir).await?;

        let mut cells: Vec<SheetCell> = Vec::new();
        let mut step = 0usize;
        self.report_percent(step, total).await;
        for card in &deck.cards {
            for side in &card.sides {
                let Some(bytes) = self.images.download_image(&side.image_url).await else {
                    warn!("image for '{}' was not received", side.name);
                    step += 1;
                    self.report_percent(step, total).await;
                    continue;
                };

                let image_name =
                    format!("{:03}_{}.jpg", cells.len(), sanitize_component(&side.name));
                fs::write(images_dir.join(&image_name), &bytes).await?;

                if save_images {
                    let stem = format!(
                        "{}_{}",
                        card.quantity,
                        side.name.replace(FACE_SEPARATOR, "-")
                    );
                    let original = format!("{}.jpg", sanitize_component(&stem));
                    fs::write(output_dir.join(original), &bytes).await?;
                }

                cells.push(SheetCell {
                    name: side.name.clone(),
                    image: format!("{IMAGES_DIR}/{image_name}"),
                    copies: card.quantity,
                });
                step += 1;
                self.report_percent(step, total).await;
            }
        }

        let sheet_name = sanitize_component(file_name.unwrap_or(&deck.name));
        let sheet_path = output_dir.join(format!("{sheet_name}.html"));
        fs::write(&sheet_path, render_sheet(&deck.name, &cells)).await?;
        Ok(sheet_path)
    }

    async fn report_percent(&self, step: usize, total: usize) {
        if total == 0 {
            return;
        }
        let percent = step as f64 / total as f64 * 100.0;
        self.progress
            .percent(ProgressStage::Document, percent)
            .await;
    }
}

fn render_sheet(title: &str, cells: &[SheetCell]) -> String {
    let mut body = String::new();
    for cell in cells {
        for _ in 0..cell.copies {
            let _ = writeln!(
                body,
                r#"    <img class="card" src="{}" alt="{}">"#,
                cell.image,
                escape_html(&cell.name)
            );
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <style>
    @page {{ size: A4 landscape; margin: 10mm; }}
    body {{ margin: 0; }}
    .sheet {{ display: flex; flex-wrap: wrap; gap: 1mm; }}
    img.card {{ width: {CARD_WIDTH_MM}mm; height: {CARD_HEIGHT_MM}mm; object-fit: fill; }}
  </style>
</head>
<body>
  <div class="sheet">
{body}  </div>
</body>
</html>
"#,
        title = escape_html(title),
        body = body,
    )
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn sanitize_component(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ' ') {
            result.push(ch);
        }
    }
    let result = result.trim().to_string();
    if result.is_empty() {
        "card".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardSide, DeckEntry};
    use crate::progress::ProgressUpdate;
    use std::collections::HashMap;
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct StubImages {
        bytes_by_url: HashMap<String, Vec<u8>>,
    }

    impl StubImages {
        fn with(urls: &[(&str, &[u8])]) -> Self {
            Self {
                bytes_by_url: urls
                    .iter()
                    .map(|(url, bytes)| (url.to_string(), bytes.to_vec()))
                    .collect(),
            }
        }
    }

    impl ImageSource for StubImages {
        async fn download_image(&self, url: &str) -> Option<Vec<u8>> {
            self.bytes_by_url.get(url).cloned()
        }
    }

    fn deck_with_side(name: &str, url: &str, quantity: u32) -> DeckDetails {
        let mut deck = DeckDetails::new("My Deck");
        let mut entry = DeckEntry::new(name, quantity);
        entry.add_side(CardSide {
            name: name.to_string(),
            image_url: url.to_string(),
        });
        deck.cards.push(entry);
        deck
    }

    #[tokio::test]
    async fn writes_sheet_and_images() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let images = StubImages::with(&[("https://img/bolt.jpg", b"jpegdata")]);
        let assembler = SheetAssembler::new(images);

        let deck = deck_with_side("Lightning Bolt", "https://img/bolt.jpg", 3);
        let sheet = assembler.assemble(&deck, dir.path(), None, false).await?;

        assert!(sheet.ends_with("My Deck.html"));
        let html = std::fs::read_to_string(&sheet)?;
        assert_eq!(html.matches("<img class=\"card\"").count(), 3);
        assert!(html.contains("images/000_Lightning Bolt.jpg"));
        assert!(dir.path().join("images/000_Lightning Bolt.jpg").exists());
        Ok(())
    }

    #[tokio::test]
    async fn output_name_overrides_the_deck_name() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let images = StubImages::with(&[("https://img/bolt.jpg", b"jpegdata")]);
        let assembler = SheetAssembler::new(images);

        let deck = deck_with_side("Lightning Bolt", "https://img/bolt.jpg", 1);
        let sheet = assembler
            .assemble(&deck, dir.path(), Some("burn"), false)
            .await?;

        assert!(sheet.ends_with("burn.html"));
        Ok(())
    }

    #[tokio::test]
    async fn save_images_keeps_quantity_prefixed_originals() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let images = StubImages::with(&[("https://img/fire-ice.jpg", b"jpegdata")]);
        let assembler = SheetAssembler::new(images);

        let deck = deck_with_side("Fire // Ice", "https://img/fire-ice.jpg", 2);
        assembler.assemble(&deck, dir.path(), None, true).await?;

        assert!(dir.path().join("2_Fire-Ice.jpg").exists());
        Ok(())
    }

    #[tokio::test]
    async fn empty_deck_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let (tx, mut rx) = mpsc::channel(4);
        let assembler =
            SheetAssembler::new(StubImages::default()).with_progress(ProgressSender::new(tx));

        let deck = DeckDetails::new("Empty");
        let result = assembler.assemble(&deck, dir.path(), None, false).await;

        assert!(matches!(result, Err(PrintError::EmptyDeck)));
        drop(assembler);
        let update = rx.recv().await.expect("expected an error update");
        assert!(update.error.is_some());
    }

    #[tokio::test]
    async fn failed_downloads_are_skipped_but_progress_completes() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let images = StubImages::with(&[("https://img/known.jpg", b"jpegdata")]);
        let (tx, mut rx) = mpsc::channel(16);
        let assembler = SheetAssembler::new(images).with_progress(ProgressSender::new(tx));

        let mut deck = deck_with_side("Known", "https://img/known.jpg", 1);
        let mut missing = DeckEntry::new("Missing", 1);
        missing.add_side(CardSide {
            name: "Missing".to_string(),
            image_url: "https://img/missing.jpg".to_string(),
        });
        deck.cards.push(missing);

        let sheet = assembler.assemble(&deck, dir.path(), None, false).await?;
        drop(assembler);

        let html = std::fs::read_to_string(&sheet)?;
        assert_eq!(html.matches("<img class=\"card\"").count(), 1);

        let mut updates: Vec<ProgressUpdate> = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        let percents: Vec<f64> = updates.iter().filter_map(|update| update.percent).collect();
        assert_eq!(percents.last().copied(), Some(100.0));
        Ok(())
    }

    #[test]
    fn sanitize_drops_path_hostile_characters() {
        assert_eq!(sanitize_component("Fire / Ice?"), "Fire  Ice");
        assert_eq!(sanitize_component("../evil"), "evil");
        assert_eq!(sanitize_component("///"), "card");
    }

    #[test]
    fn html_escaping_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<Foo & "Bar">"#),
            "&lt;Foo &amp; &quot;Bar&quot;&gt;"
        );
    }
}
