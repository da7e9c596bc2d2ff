// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use common::{ErrorEnvelope, SearchResults};
use parking_lot::RwLock;
use tokio::time::{self, Duration};
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError, RequestOptions};

use super::StoreState;

/// How long the query must stay unchanged before an auto-search fires.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(600);

/// One searchable result category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SearchKind {
    Profiles,
    Goals,
    Tasks,
}

impl SearchKind {
    pub const ALL: [SearchKind; 3] = [SearchKind::Profiles, SearchKind::Goals, SearchKind::Tasks];

    pub fn token(&self) -> &'static str {
        match self {
            SearchKind::Profiles => "profiles",
            SearchKind::Goals => "goals",
            SearchKind::Tasks => "tasks",
        }
    }
}

/// The search type filter: a set of result categories with a normalized
/// wire encoding.
///
/// The wire token is the union-set-as-string the server expects: the
/// member tokens joined in fixed order, collapsing to the literal "all"
/// when every category is present. The empty set also encodes (and
/// decodes) as "all" — filtering down to nothing is not a useful search,
/// so emptiness means "no filter".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchScope {
    kinds: BTreeSet<SearchKind>,
}

impl SearchScope {
    /// The full universe (encodes as "all").
    pub fn all() -> Self {
        Self {
            kinds: SearchKind::ALL.into_iter().collect(),
        }
    }

    pub fn contains(&self, kind: SearchKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn insert(&mut self, kind: SearchKind) {
        self.kinds.insert(kind);
    }

    pub fn remove(&mut self, kind: SearchKind) {
        self.kinds.remove(&kind);
    }

    pub fn toggle(&mut self, kind: SearchKind) {
        if !self.kinds.remove(&kind) {
            self.kinds.insert(kind);
        }
    }

    /// Encodes the set for the `type=` query parameter.
    pub fn token(&self) -> String {
        if self.kinds.is_empty() || self.kinds.len() == SearchKind::ALL.len() {
            return "all".to_string();
        }
        self.kinds
            .iter()
            .map(SearchKind::token)
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Decodes a wire token by sub-token membership. "all", the empty
    /// string, and any token naming every category all decode to the full
    /// universe.
    pub fn parse(token: &str) -> Self {
        if token.is_empty() || token == "all" {
            return Self::all();
        }
        let mut scope = Self::default();
        for kind in SearchKind::ALL {
            if token.contains(kind.token()) {
                scope.insert(kind);
            }
        }
        if scope.kinds.is_empty() || scope.kinds.len() == SearchKind::ALL.len() {
            return Self::all();
        }
        scope
    }
}

/// State container for the unified search page: a type filter, a debounced
/// text query, and cursor-paginated profile results.
pub struct SearchStore {
    api: Arc<ApiClient>,
    state: RwLock<StoreState<SearchResults>>,
    scope: RwLock<SearchScope>,
    query: RwLock<String>,
    /// Bumped on every keystroke and every explicit search; a sleeping
    /// debounce or an in-flight response only applies while its generation
    /// is still the newest (same guard as the entity stores, shared between
    /// debounce and stale-response concerns).
    generation: AtomicU64,
}

impl SearchStore {
    pub fn new(api: Arc<ApiClient>) -> Arc<Self> {
        Arc::new(Self {
            api,
            state: RwLock::new(StoreState::default()),
            scope: RwLock::new(SearchScope::all()),
            query: RwLock::new(String::new()),
            generation: AtomicU64::new(0),
        })
    }

    pub fn results(&self) -> SearchResults {
        self.state.read().data.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn error(&self) -> Option<ErrorEnvelope> {
        self.state.read().error.clone()
    }

    pub fn set_error(&self, envelope: ErrorEnvelope) {
        self.state.write().error = Some(envelope);
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    pub fn scope(&self) -> SearchScope {
        self.scope.read().clone()
    }

    pub fn set_scope(&self, scope: SearchScope) {
        *self.scope.write() = scope;
    }

    pub fn toggle_kind(&self, kind: SearchKind) {
        self.scope.write().toggle(kind);
    }

    pub fn query(&self) -> String {
        self.query.read().clone()
    }

    /// Records a query keystroke and fires the search once the query has
    /// settled for `SEARCH_DEBOUNCE`. Each keystroke supersedes the
    /// previous pending one; only the newest survives the settle window.
    pub async fn set_query(&self, query: &str) -> Result<(), ApiError> {
        *self.query.write() = query.to_string();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        time::sleep(SEARCH_DEBOUNCE).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("debounced search superseded before settle");
            return Ok(());
        }
        self.run_search(generation).await
    }

    /// Runs the search immediately (submit button), replacing the result
    /// set wholesale.
    pub async fn search(&self) -> Result<(), ApiError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.run_search(generation).await
    }

    async fn run_search(&self, generation: u64) -> Result<(), ApiError> {
        let query = self.query();
        let token = self.scope.read().token();
        self.state.write().loading = true;

        let options = RequestOptions::get()
            .with_query("query", query)
            .with_query("type", token)
            .with_query("recycled", "false");
        let result = self.api.request("/search", options).await;

        let mut state = self.state.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            // A newer search owns the spinner now; leave loading to it.
            debug!("discarding superseded search response");
            return Ok(());
        }
        state.loading = false;
        match result.and_then(|body| Ok(serde_json::from_value::<SearchResults>(body)?)) {
            Ok(results) => {
                state.data = results;
                state.error = None;
                Ok(())
            }
            Err(err) => {
                state.error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Fetches the next cursor page of profile results and appends it,
    /// skipping ids already present for the current query. A no-op when the
    /// last page was reached.
    ///
    /// Pagination is a background nicety: a failed page is logged and
    /// dropped, never surfaced as a blocking error.
    pub async fn load_more_profiles(&self) {
        let Some(offset) = self.state.read().data.next_offset.clone() else {
            return;
        };
        let query = self.query();
        let token = self.scope.read().token();
        let generation = self.generation.load(Ordering::SeqCst);

        let options = RequestOptions::get()
            .with_query("query", query)
            .with_query("type", token)
            .with_query("recycled", "false")
            .with_query("offset", offset);
        let result = self.api.request("/search", options).await;

        match result.and_then(|body| Ok(serde_json::from_value::<SearchResults>(body)?)) {
            Ok(page) => {
                // A new search started while the page was in flight; its
                // results belong to the superseded query.
                if self.generation.load(Ordering::SeqCst) != generation {
                    debug!("discarding superseded profile page");
                    return;
                }
                let mut state = self.state.write();
                let known: BTreeSet<String> =
                    state.data.profiles.iter().map(|p| p.id.clone()).collect();
                state
                    .data
                    .profiles
                    .extend(page.profiles.into_iter().filter(|p| !known.contains(&p.id)));
                state.data.next_offset = page.next_offset;
            }
            Err(err) => {
                warn!("failed to load more profiles: {err}");
            }
        }
    }
}
