//! Remote product list.
//!
//! One fixed resource, fetched exactly once per screen instance and rendered
//! in the order returned. No retry, no pagination, no cache; while the fetch
//! is pending (or after it fails) the list is simply empty.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::Result;

/// The fixed resource backing the list.
pub const PRODUCTS_URL: &str = "https://api.freeapi.app/api/v1/public/randomproducts?page=1&limit=50&inc=category%252Cprice%252Cthumbnail%252Cimages%252Ctitle%252Cid&query=mens-watches";

/// Hard ceiling on the single request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Item identifier. The wire format sends either a string or a number.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ItemId {
    /// String identifier.
    Text(String),
    /// Numeric identifier.
    Number(i64),
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// An externally defined list entry. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteItem {
    /// Identifier of the item.
    pub id: ItemId,
    /// Display title.
    pub title: String,
}

/// Wire envelope: `{ "data": { "data": [ ... ] } }`.
#[derive(Debug, Deserialize)]
struct Envelope {
    data: Page,
}

#[derive(Debug, Deserialize)]
struct Page {
    data: Vec<RemoteItem>,
}

/// Parse a response body into its items, preserving order.
pub fn parse_items(body: &str) -> Result<Vec<RemoteItem>> {
    let envelope: Envelope = serde_json::from_str(body)?;
    Ok(envelope.data.data)
}

/// The network fetch, consumed as a black box.
#[async_trait]
pub trait ItemFetcher: Send + Sync {
    /// Fetch the full item sequence.
    async fn fetch_items(&self) -> Result<Vec<RemoteItem>>;
}

/// reqwest-backed fetcher for the fixed products resource.
pub struct HttpFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpFetcher {
    /// Create a fetcher against [`PRODUCTS_URL`].
    pub fn new() -> Result<Self> {
        Self::with_url(PRODUCTS_URL)
    }

    /// Create a fetcher against a specific URL.
    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ItemFetcher for HttpFetcher {
    async fn fetch_items(&self) -> Result<Vec<RemoteItem>> {
        debug!(url = %self.url, "Fetching remote items");

        let envelope: Envelope = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(envelope.data.data)
    }
}

/// View model for the remote list screen.
pub struct RemoteListScreen {
    fetcher: Box<dyn ItemFetcher>,
    items: RwLock<Vec<RemoteItem>>,
    fetched: AtomicBool,
}

impl RemoteListScreen {
    /// Create the screen over the given fetcher.
    pub fn new(fetcher: impl ItemFetcher + 'static) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            items: RwLock::new(Vec::new()),
            fetched: AtomicBool::new(false),
        }
    }

    /// Issue the screen's single fetch.
    ///
    /// Exactly one network request per screen instance: repeat calls are
    /// no-ops, including after a failure (no retry). A failed fetch leaves
    /// the list empty.
    pub async fn load(&self) -> Result<()> {
        if self.fetched.swap(true, Ordering::SeqCst) {
            debug!("Already fetched, ignoring load request");
            return Ok(());
        }

        match self.fetcher.fetch_items().await {
            Ok(items) => {
                info!(count = items.len(), "Remote list loaded");
                *self.items.write() = items;
                Ok(())
            }
            Err(e) => {
                warn!("Remote list fetch failed: {}", e);
                Err(e)
            }
        }
    }

    /// Snapshot of the items, in the order the server returned them.
    pub fn items(&self) -> Vec<RemoteItem> {
        self.items.read().clone()
    }

    /// Whether the single fetch has been issued.
    pub fn has_fetched(&self) -> bool {
        self.fetched.load(Ordering::SeqCst)
    }
}
