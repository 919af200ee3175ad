//! Per-URL artifact cache.
//!
//! Script text and parsed source maps are memoized by URL string for the
//! cache's lifetime. Population is coalesced: concurrent requests for the same
//! URL share one fetch (first writer wins), while unrelated URLs proceed
//! independently. Failed fetches and unusable maps are memoized as absence so
//! a broken artifact is not refetched for every frame that references it.

use crate::http::TextFetcher;
use crate::position_map::{self, MapLocation, PositionMap};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OnceCell;

type Slot<T> = Arc<OnceCell<Option<T>>>;

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// URLs whose text was obtained
    pub texts: usize,
    /// Scripts with a usable source map
    pub maps: usize,
    /// Fetches issued since construction
    pub fetches: u64,
}

/// Coalescing text and position-map cache shared by resolution tasks.
pub struct ArtifactCache {
    fetcher: Arc<dyn TextFetcher>,
    texts: Mutex<HashMap<String, Slot<Arc<str>>>>,
    maps: Mutex<HashMap<String, Slot<Arc<PositionMap>>>>,
    fetches: AtomicU64,
}

impl ArtifactCache {
    pub fn new(fetcher: Arc<dyn TextFetcher>) -> Self {
        Self {
            fetcher,
            texts: Mutex::new(HashMap::new()),
            maps: Mutex::new(HashMap::new()),
            fetches: AtomicU64::new(0),
        }
    }

    fn slot<T>(index: &Mutex<HashMap<String, Slot<T>>>, url: &str) -> Slot<T> {
        let mut index = index.lock();
        Arc::clone(index.entry(url.to_string()).or_default())
    }

    /// Text behind `url`, fetched at most once per URL.
    ///
    /// `None` when the fetch failed; the failure is logged and remembered.
    pub async fn get_text(&self, url: &str) -> Option<Arc<str>> {
        let cell = Self::slot(&self.texts, url);
        cell.get_or_init(|| self.fetch(url)).await.clone()
    }

    async fn fetch(&self, url: &str) -> Option<Arc<str>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        log::debug!(target: "cache", "fetching {}", url);

        let fetcher = Arc::clone(&self.fetcher);
        let owned = url.to_string();
        match tokio::task::spawn_blocking(move || fetcher.fetch_text(&owned)).await {
            Ok(Ok(text)) => {
                log::debug!(target: "cache", "fetched {} ({} bytes)", url, text.len());
                Some(Arc::from(text))
            }
            Ok(Err(e)) => {
                log::warn!(target: "cache", "no text for {}: {}", url, e);
                None
            }
            Err(e) => {
                log::error!(target: "cache", "fetch task for {} failed: {}", url, e);
                None
            }
        }
    }

    /// Source map declared by `text` (the script fetched from `url`).
    ///
    /// `None` when no directive is present or the map cannot be obtained or
    /// parsed. Absence is an expected outcome, not an error.
    pub async fn get_position_map(&self, url: &str, text: &str) -> Option<Arc<PositionMap>> {
        let cell = Self::slot(&self.maps, url);
        cell.get_or_init(|| self.load_position_map(url, text))
            .await
            .clone()
    }

    async fn load_position_map(&self, url: &str, text: &str) -> Option<Arc<PositionMap>> {
        let Some(reference) = position_map::find_source_mapping_url(text) else {
            log::debug!(target: "cache", "{} declares no source map", url);
            return None;
        };

        let (json, map_url): (Arc<str>, String) = match position_map::locate(url, reference) {
            Ok(MapLocation::Inline(json)) => (Arc::from(json), url.to_string()),
            Ok(MapLocation::External(map_url)) => (self.get_text(&map_url).await?, map_url),
            Err(e) => {
                log::warn!(target: "cache", "source map reference in {}: {}", url, e);
                return None;
            }
        };

        match PositionMap::from_json(&json) {
            Ok(map) => {
                log::debug!(target: "cache", "parsed source map for {} ({})", url, map_url);
                Some(Arc::new(map.with_map_url(map_url)))
            }
            Err(e) => {
                log::warn!(target: "cache", "unusable source map {}: {}", map_url, e);
                None
            }
        }
    }

    /// Original text for `source`: embedded `sourcesContent` first, else
    /// fetched relative to the map's URL through this cache.
    pub async fn get_source_content(&self, map: &PositionMap, source: &str) -> Option<Arc<str>> {
        if let Some(content) = map.source_content_for(source) {
            return Some(content);
        }
        let url = map.resolve_source_url(source)?;
        self.get_text(&url).await
    }

    pub fn stats(&self) -> CacheStats {
        let texts = self
            .texts
            .lock()
            .values()
            .filter(|c| matches!(c.get(), Some(Some(_))))
            .count();
        let maps = self
            .maps
            .lock()
            .values()
            .filter(|c| matches!(c.get(), Some(Some(_))))
            .count();
        CacheStats {
            texts,
            maps,
            fetches: self.fetches.load(Ordering::Relaxed),
        }
    }

    /// Forget every entry. Fetches already in flight finish into their own
    /// detached cells.
    pub fn clear(&self) {
        self.texts.lock().clear();
        self.maps.lock().clear();
        log::debug!(target: "cache", "cleared");
    }
}
