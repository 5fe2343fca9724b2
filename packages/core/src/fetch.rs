//! Fetch boundary
//!
//! The cache never performs I/O. A [`PageSource`] delivers pages of children
//! asynchronously and the loaders here coordinate it with the cache:
//!
//! 1. [`admit`]: single-flight admission through [`TreeCache::begin_fetch`]
//!    (one request per parent) and the stored resume cursor
//! 2. [`PendingFetch::fetch`]: the request itself, with no cache borrow held
//! 3. [`PendingFetch::complete`]: [`TreeCache::finish_fetch`] whatever the
//!    outcome, then [`TreeCache::upsert_page`] on success
//!
//! [`load_next_page`] runs the three steps against an exclusively owned cache.
//! [`load_next_page_shared`] runs them against a [`SharedCache`], locking only
//! for steps 1 and 3, so concurrent loaders overlap and admission decides which
//! of them reaches the source.
//!
//! Retries, backoff and timeouts belong to the source implementation.

use crate::cache::{TreeCache, UpsertOutcome};
use crate::models::{Node, NodeId, PageInfo};
use crate::workload::Fixture;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cache handle shared between concurrent loaders
pub type SharedCache = Arc<Mutex<TreeCache>>;

/// One page of children returned by a [`PageSource`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub nodes: Vec<Node>,
    pub info: PageInfo,
}

/// Asynchronous provider of child pages
///
/// Implementations must be `Send + Sync` so loaders can run on any executor.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the children of `parent` (top level when `None`) starting at `cursor`
    ///
    /// A `None` cursor requests the first page.
    async fn fetch_page(&self, parent: Option<&str>, cursor: Option<&str>) -> Result<Page>;
}

/// An admitted request. The parent stays busy until [`PendingFetch::complete`].
#[derive(Debug)]
#[must_use = "an admitted fetch blocks its parent until completed"]
pub struct PendingFetch {
    parent: Option<NodeId>,
    cursor: Option<String>,
}

impl PendingFetch {
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Cursor the request resumes from; `None` for the first page
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Ask `source` for the admitted page
    pub async fn fetch<S>(&self, source: &S) -> Result<Page>
    where
        S: PageSource + ?Sized,
    {
        source.fetch_page(self.parent(), self.cursor()).await
    }

    /// Release admission, then merge the page if the request succeeded.
    ///
    /// # Errors
    ///
    /// Returns the source's error with the parent as context. Admission is
    /// released either way, so a later call may retry.
    pub fn complete(self, cache: &mut TreeCache, fetched: Result<Page>) -> Result<UpsertOutcome> {
        let parent = self.parent.as_deref();
        cache.finish_fetch(parent);

        let page = fetched.with_context(|| format!("Failed to fetch children of {:?}", parent))?;
        let outcome = cache.upsert_page(parent, page.nodes, page.info);
        tracing::debug!(?parent, cursor = ?self.cursor, inserted = outcome.inserted, "Loaded page");
        Ok(outcome)
    }
}

/// Claim the fetch slot for `parent` and read its resume cursor.
///
/// Returns `None` when a fetch for the same parent is already outstanding. A
/// parent whose listing is complete is fetched again from its stored cursor,
/// or from the start when there is none.
pub fn admit(cache: &mut TreeCache, parent: Option<&str>) -> Option<PendingFetch> {
    if !cache.begin_fetch(parent) {
        tracing::debug!(?parent, "Fetch already in flight, skipping");
        return None;
    }

    let cursor = cache
        .page_state(parent)
        .and_then(|page| page.next_cursor.clone());
    Some(PendingFetch {
        parent: parent.map(str::to_string),
        cursor,
    })
}

/// Fetch and merge the next page of children of `parent`.
///
/// Returns `Ok(false)` without contacting the source when a fetch for the same
/// parent is already outstanding.
///
/// # Errors
///
/// See [`PendingFetch::complete`].
pub async fn load_next_page<S>(
    cache: &mut TreeCache,
    source: &S,
    parent: Option<&str>,
) -> Result<bool>
where
    S: PageSource + ?Sized,
{
    let Some(pending) = admit(cache, parent) else {
        return Ok(false);
    };
    let fetched = pending.fetch(source).await;
    pending.complete(cache, fetched)?;
    Ok(true)
}

/// [`load_next_page`] on a shared cache. The lock is not held while the
/// source is working.
pub async fn load_next_page_shared<S>(
    cache: &Mutex<TreeCache>,
    source: &S,
    parent: Option<&str>,
) -> Result<bool>
where
    S: PageSource + ?Sized,
{
    let admitted = admit(&mut *cache.lock().await, parent);
    let Some(pending) = admitted else {
        return Ok(false);
    };
    let fetched = pending.fetch(source).await;
    pending.complete(&mut *cache.lock().await, fetched)?;
    Ok(true)
}

/// Fetch pages of `parent` until the source reports no more.
///
/// Returns the number of pages merged.
pub async fn load_all<S>(cache: &mut TreeCache, source: &S, parent: Option<&str>) -> Result<usize>
where
    S: PageSource + ?Sized,
{
    let mut pages = 0;
    loop {
        if !load_next_page(cache, source, parent).await? {
            break;
        }
        pages += 1;
        if !cache.page_state(parent).is_some_and(|page| page.has_more) {
            break;
        }
    }
    Ok(pages)
}

/// [`load_all`] on a shared cache. Stops early when another loader holds the
/// parent's slot.
pub async fn load_all_shared<S>(
    cache: &Mutex<TreeCache>,
    source: &S,
    parent: Option<&str>,
) -> Result<usize>
where
    S: PageSource + ?Sized,
{
    let mut pages = 0;
    loop {
        if !load_next_page_shared(cache, source, parent).await? {
            break;
        }
        pages += 1;
        let has_more = cache
            .lock()
            .await
            .page_state(parent)
            .is_some_and(|page| page.has_more);
        if !has_more {
            break;
        }
    }
    Ok(pages)
}

/// Serves a generated [`Fixture`] in fixed-size pages.
///
/// Cursors are decimal offsets into the parent's sorted child listing.
#[derive(Debug, Clone)]
pub struct FixturePageSource {
    fixture: Arc<Fixture>,
    page_size: usize,
    requests: Arc<AtomicUsize>,
}

impl FixturePageSource {
    pub fn new(fixture: Arc<Fixture>, page_size: usize) -> Self {
        Self {
            fixture,
            page_size: page_size.max(1),
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `fetch_page` calls served so far
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }
}

#[async_trait]
impl PageSource for FixturePageSource {
    async fn fetch_page(&self, parent: Option<&str>, cursor: Option<&str>) -> Result<Page> {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let offset = match cursor {
            None => 0,
            Some(cursor) => cursor
                .parse::<usize>()
                .with_context(|| format!("Invalid cursor '{}'", cursor))?,
        };

        Ok(self.fixture.page(parent, offset, self.page_size))
    }
}
