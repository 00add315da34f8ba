//! View queries and the cache-versus-network decision.
//!
//! # Design
//! - A [`ViewQuery`] normalises its keyword (trimmed, blank means absent) and
//!   drops blank filter values, so equivalence is plain equality of the two.
//! - The snapshot may serve a request only for page 1 of the unfiltered view,
//!   after the first load, with no forced refresh pending.
//! - A keyword or filter change relative to the last successful query forces
//!   the *next* resolution onto the network and asks the caller to schedule
//!   that resolution out of band.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Keyword, filters and pagination of one list request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewQuery {
    keyword: Option<String>,
    filters: BTreeMap<String, String>,
    page: u32,
    page_size: u32,
}

impl ViewQuery {
    /// First page of the unfiltered view.
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            keyword: None,
            filters: BTreeMap::new(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Set the search keyword; blank input clears it.
    #[must_use]
    pub fn with_keyword(mut self, keyword: impl AsRef<str>) -> Self {
        let trimmed = keyword.as_ref().trim();
        self.keyword = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Add a filter value; blank values are ignored and the first value for a key wins.
    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl AsRef<str>) -> Self {
        let value = value.as_ref().trim();
        if !value.is_empty() {
            self.filters
                .entry(key.into())
                .or_insert_with(|| value.to_string());
        }
        self
    }

    /// Select a page; page numbers start at 1.
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Search keyword, if any.
    #[must_use]
    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    /// Active filter values by key.
    #[must_use]
    pub const fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    /// Value of one filter.
    #[must_use]
    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(String::as_str)
    }

    /// Requested page, starting at 1.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Requested page size.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// No keyword and no filter value.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.keyword.is_none() && self.filters.is_empty()
    }

    /// Same keyword and filters; pagination is ignored.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        self.keyword == other.keyword && self.filters == other.filters
    }
}

/// Where a list request is answered from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Serve the current store snapshot.
    Cache,
    /// Fetch this query from the backend.
    Network(ViewQuery),
}

impl Resolution {
    /// Whether the snapshot answers the request.
    #[must_use]
    pub const fn use_cache(&self) -> bool {
        matches!(self, Self::Cache)
    }
}

/// Outcome of one [`QueryCoordinator::resolve`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvePlan {
    /// How to answer the current request.
    pub resolution: Resolution,
    /// Query whose forced refresh the caller should schedule out of band.
    pub scheduled_refresh: Option<ViewQuery>,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    has_fetched_once: bool,
    force_refresh: bool,
    last_query: Option<ViewQuery>,
    scheduled_for: Option<ViewQuery>,
}

/// Per-collection cache policy.
#[derive(Debug, Default)]
pub struct QueryCoordinator {
    state: Mutex<CoordinatorState>,
}

impl QueryCoordinator {
    /// Coordinator for a session that has not fetched yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide how to answer `requested` given whether the snapshot is empty.
    pub fn resolve(&self, requested: &ViewQuery, snapshot_is_empty: bool) -> ResolvePlan {
        let mut state = self.lock();
        let use_cache = requested.page() == 1
            && requested.is_unconstrained()
            && !snapshot_is_empty
            && state.has_fetched_once
            && !state.force_refresh;

        let resolution = if use_cache {
            debug!(page = requested.page(), "serving list from snapshot");
            Resolution::Cache
        } else {
            state.has_fetched_once = true;
            state.force_refresh = false;
            Resolution::Network(requested.clone())
        };

        let changed = state
            .last_query
            .as_ref()
            .is_some_and(|last| !last.equivalent(requested));
        let already_scheduled = state
            .scheduled_for
            .as_ref()
            .is_some_and(|pending| pending.equivalent(requested));
        let scheduled_refresh = if changed && !already_scheduled {
            debug!(
                keyword = requested.keyword().unwrap_or_default(),
                "query changed; forcing the next resolution onto the network"
            );
            state.force_refresh = true;
            state.scheduled_for = Some(requested.clone());
            Some(requested.clone())
        } else {
            None
        };

        ResolvePlan {
            resolution,
            scheduled_refresh,
        }
    }

    /// Record a successful network answer for `query`.
    pub fn record_success(&self, query: &ViewQuery) {
        let mut state = self.lock();
        state.last_query = Some(query.clone());
        if state
            .scheduled_for
            .as_ref()
            .is_some_and(|pending| pending.equivalent(query))
        {
            state.scheduled_for = None;
        }
    }

    /// Force the next resolution onto the network.
    pub fn invalidate(&self) {
        self.lock().force_refresh = true;
    }

    /// Whether a forced refresh is pending.
    #[must_use]
    pub fn refresh_pending(&self) -> bool {
        self.lock().force_refresh
    }

    /// Last query answered from the network.
    #[must_use]
    pub fn last_query(&self) -> Option<ViewQuery> {
        self.lock().last_query.clone()
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
