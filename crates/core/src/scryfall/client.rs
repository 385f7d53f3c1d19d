//! HTTP client for the Scryfall card database.

use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use super::models::{CardData, CardSearchPage};
use crate::{document::ImageSource, resolve::CardLookup};

/// Transient failures are retried this many times with doubling delays.
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(4);

/// Client for card lookups and image downloads.
///
/// Transport and decoding failures are soft: they are logged and surface
/// as `None`, so a single bad card never aborts a whole deck.
#[derive(Clone)]
pub struct ScryfallClient {
    base_url: String,
    http: reqwest::Client,
    card_cache: Arc<RwLock<HashMap<String, CardData>>>,
}

impl ScryfallClient {
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
            card_cache: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Exact printing lookup by set code and collector number, optionally
    /// narrowed to a language.
    pub async fn find_card(
        &self,
        name: &str,
        set_code: &str,
        collector_number: &str,
        language: Option<&str>,
    ) -> Option<CardData> {
        let mut url = format!("{}/cards/{set_code}/{collector_number}", self.base_url);
        if let Some(language) = language {
            url.push('/');
            url.push_str(language);
        }
        self.get_json(&url, &[], name).await
    }

    /// Name search, optionally widened to extra prints and variations and
    /// to other languages.
    pub async fn search_cards(
        &self,
        name: &str,
        include_extras: bool,
        include_multilingual: bool,
    ) -> Option<Vec<CardData>> {
        let url = format!("{}/cards/search", self.base_url);
        let mut query: Vec<(&str, &str)> = vec![("q", name)];
        if include_extras {
            query.push(("unique", "prints"));
            query.push(("include_extras", "true"));
            query.push(("include_variations", "true"));
        }
        if include_multilingual {
            query.push(("include_multilingual", "true"));
        }
        let page: CardSearchPage = self.get_json(&url, &query, name).await?;
        Some(page.data)
    }

    /// Fetch a card record by database identifier, serving repeats from an
    /// in-memory cache.
    pub async fn card_by_id(&self, id: &str) -> Option<CardData> {
        if let Some(card) = self.card_cache.read().get(id) {
            return Some(card.clone());
        }

        let url = format!("{}/cards/{id}", self.base_url);
        let card: CardData = self.get_json(&url, &[], id).await?;
        self.card_cache
            .write()
            .insert(id.to_string(), card.clone());
        Some(card)
    }

    /// Download raw image bytes, returning `None` on failure.
    pub async fn download_image(&self, image_url: &str) -> Option<Vec<u8>> {
        let response = self.get_with_retry(image_url, &[]).await?;
        match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(err) => {
                error!("failed to read image bytes from {image_url}: {err}");
                None
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        subject: &str,
    ) -> Option<T> {
        let response = self.get_with_retry(url, query).await?;
        match response.json::<T>().await {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                error!("failed to decode response for '{subject}': {err}");
                None
            }
        }
    }

    /// Issue a GET, retrying 429 and 5xx responses and transport errors
    /// with capped exponential backoff.
    async fn get_with_retry(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Option<reqwest::Response> {
        let mut delay = RETRY_BASE_DELAY;
        for attempt in 1..=MAX_RETRIES + 1 {
            match self.http.get(url).query(query).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Some(response);
                    }
                    if status == StatusCode::NOT_FOUND {
                        debug!("resource not found at {url}");
                        return None;
                    }
                    if status != StatusCode::TOO_MANY_REQUESTS && !status.is_server_error() {
                        error!("request to {url} failed with status {status}");
                        return None;
                    }
                    warn!("transient status {status} from {url} (attempt {attempt})");
                }
                Err(err) => {
                    warn!("request to {url} failed (attempt {attempt}): {err}");
                }
            }
            if attempt > MAX_RETRIES {
                break;
            }
            sleep(delay).await;
            delay = (delay * 2).min(RETRY_MAX_DELAY);
        }

        error!("request to {url} exhausted retries");
        None
    }
}

impl CardLookup for ScryfallClient {
    async fn find_card(
        &self,
        name: &str,
        set_code: &str,
        collector_number: &str,
        language: Option<&str>,
    ) -> Option<CardData> {
        ScryfallClient::find_card(self, name, set_code, collector_number, language).await
    }

    async fn search_cards(
        &self,
        name: &str,
        include_extras: bool,
        include_multilingual: bool,
    ) -> Option<Vec<CardData>> {
        ScryfallClient::search_cards(self, name, include_extras, include_multilingual).await
    }

    async fn card_by_id(&self, id: &str) -> Option<CardData> {
        ScryfallClient::card_by_id(self, id).await
    }
}

impl ImageSource for ScryfallClient {
    async fn download_image(&self, image_url: &str) -> Option<Vec<u8>> {
        ScryfallClient::download_image(self, image_url).await
    }
}
