//! App module - contains the main application state and logic

mod debounce;
mod details;
mod filters;
mod views;

pub use debounce::spawn_debouncer;
pub use views::{CardView, DetailView, ListView, PageView, EMPTY_MESSAGE, LIST_ERROR_MESSAGE};

use crate::api::ApiClient;
use crate::error::QueryError;
use crate::favorites::FavoritesStore;
use crate::query::{CatalogQueries, QueryResult, QueryStatus};
use crate::settings::Settings;
use crate::storage::LocalStorage;
use crate::types::{ListQuery, ListingEntry, SortDirection, SortField};
use crate::url_state::{
    Navigation, UrlState, PARAM_DIR, PARAM_FAVORITES, PARAM_PAGE, PARAM_SEARCH, PARAM_SORT,
    PARAM_TYPE,
};
use details::DetailLoader;
use filters::{derive_page, DerivedPage};
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// ============================================================================
// REPAINT
// ============================================================================

/// Redraw request channel. Every state change bumps the frame counter.
#[derive(Clone)]
pub struct Repaint(Arc<watch::Sender<u64>>);

impl Default for Repaint {
    fn default() -> Self {
        Self::new()
    }
}

impl Repaint {
    pub fn new() -> Self {
        Self(Arc::new(watch::Sender::new(0)))
    }

    pub fn request(&self) {
        self.0.send_modify(|frame| *frame = frame.wrapping_add(1));
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.0.subscribe()
    }
}

// ============================================================================
// APP STATE
// ============================================================================

pub struct Explorer {
    queries: CatalogQueries,
    url: UrlState,
    favorites: FavoritesStore,
    details: DetailLoader,
    settings: Settings,
    repaint: Repaint,
    // Cancelled on shutdown
    cancel: CancellationToken,
}

impl Explorer {
    pub fn new(settings: Settings, storage: LocalStorage, query: &str) -> Self {
        Self::with_api(ApiClient::new(), settings, storage, query)
    }

    fn with_api(api: ApiClient, settings: Settings, storage: LocalStorage, query: &str) -> Self {
        let queries = CatalogQueries::new(api, settings.list_limit);
        let repaint = Repaint::new();
        let details = DetailLoader::new(
            queries.clone(),
            settings.detail_concurrency,
            repaint.clone(),
        );

        Self {
            queries,
            url: UrlState::new("/", query),
            favorites: FavoritesStore::load(storage),
            details,
            settings,
            repaint,
            cancel: CancellationToken::new(),
        }
    }

    pub fn repaint(&self) -> &Repaint {
        &self.repaint
    }

    pub fn url(&self) -> &UrlState {
        &self.url
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn list_query(&self) -> ListQuery {
        self.url.list_query()
    }

    // ========================================================================
    // DATA LOADING
    // ========================================================================

    /// Request whatever the current view is missing or has gone stale,
    /// without waiting. Completion of each request triggers a repaint; values
    /// already in cache and requests already running start nothing.
    pub fn ensure_queries(&self) {
        if self.queries.peek_list().wants_fetch() {
            debug!("Requesting base list");
            self.spawn_query(self.queries.refetch_list());
        }

        if let Some(type_name) = self.list_query().type_filter {
            if self.queries.peek_members(&type_name).wants_fetch() {
                debug!(type_name = %type_name, "Requesting type members");
                self.spawn_query(self.queries.refetch_members(&type_name));
            }
        }
    }

    /// Repaint once `fetch` settles, unless it was cancelled or we shut down
    fn spawn_query<T, F>(&self, fetch: F)
    where
        T: Send + Sync + 'static,
        F: Future<Output = QueryResult<T>> + Send + 'static,
    {
        let repaint = self.repaint.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = fetch => result,
            };
            if !matches!(result, Err(QueryError::Cancelled)) {
                repaint.request();
            }
        });
    }

    /// Wait for the base list and, when filtered, the type membership
    pub async fn load(&self) -> Result<(), QueryError> {
        match self.list_query().type_filter {
            Some(type_name) => {
                let (list, members) = tokio::join!(
                    self.queries.pokemon_list(&self.cancel),
                    self.queries.type_members(&type_name, &self.cancel),
                );
                list?;
                members?;
            }
            None => {
                self.queries.pokemon_list(&self.cancel).await?;
            }
        }
        Ok(())
    }

    /// Wait for the detail records of every card on the current page.
    /// Failures are left to degrade the affected cards.
    pub async fn load_page_details(&self) {
        let Some(page) = self.current_page() else {
            return;
        };
        let results: Vec<_> = futures::stream::iter(page.items.iter())
            .map(|entry| self.queries.pokemon_detail(&entry.name, &self.cancel))
            .buffer_unordered(self.settings.detail_concurrency.max(1))
            .collect()
            .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!(failed, total = results.len(), "Some detail records failed to load");
        }
    }

    pub async fn detail_view(&self, name: &str) -> Result<DetailView, QueryError> {
        let detail = self.queries.pokemon_detail(name, &self.cancel).await?;
        Ok(DetailView::new(&detail, self.favorites.is_favorite(&detail.name)))
    }

    pub async fn type_names(&self) -> Result<Vec<String>, QueryError> {
        let types = self.queries.type_list(&self.cancel).await?;
        Ok(types.results.iter().map(|t| t.name.clone()).collect())
    }

    // ========================================================================
    // VIEWS
    // ========================================================================

    fn current_page(&self) -> Option<DerivedPage> {
        let base = self.queries.peek_list().value().cloned()?;
        let query = self.list_query();
        let membership = query
            .type_filter
            .as_deref()
            .and_then(|t| self.queries.peek_members(t).value().cloned());

        Some(derive_page(
            &base.results,
            membership.as_deref(),
            self.favorites.set(),
            &query,
            self.settings.page_size,
        ))
    }

    pub fn list_view(&self) -> ListView {
        match self.queries.peek_list() {
            QueryStatus::Failed(e) => return failed_view(&e),
            QueryStatus::Idle | QueryStatus::Loading => return ListView::Loading,
            QueryStatus::Ready { .. } => {}
        }

        let query = self.list_query();
        let mut type_pending = false;
        if let Some(type_name) = query.type_filter.as_deref() {
            match self.queries.peek_members(type_name) {
                QueryStatus::Failed(e) => return failed_view(&e),
                QueryStatus::Ready { .. } => {}
                QueryStatus::Idle | QueryStatus::Loading => type_pending = true,
            }
        }

        let Some(page) = self.current_page() else {
            return ListView::Loading;
        };
        ListView::Page(PageView {
            cards: page.items.iter().map(|e| self.card_view(e)).collect(),
            page: page.page,
            page_count: page.page_count,
            total: page.total,
            has_prev: page.has_prev(),
            has_next: page.has_next(),
            type_pending,
        })
    }

    pub fn card_view(&self, entry: &ListingEntry) -> CardView {
        let favorite = self.favorites.is_favorite(&entry.name);
        let href = self.detail_href(&entry.name);
        match self.queries.peek_detail(&entry.name) {
            QueryStatus::Ready { value, .. } => CardView::from_detail(entry, &value, favorite, href),
            _ => CardView::placeholder(entry, favorite, href),
        }
    }

    /// Detail link that carries the current query string along
    pub fn detail_href(&self, name: &str) -> String {
        let query = self.url.query_string();
        if query.is_empty() {
            format!("/pokemon/{}", name)
        } else {
            format!("/pokemon/{}?{}", name, query)
        }
    }

    /// Report the current page's cards as visible and unmount the rest
    pub fn mount_visible_cards(&mut self) {
        let Some(page) = self.current_page() else {
            self.details.unmount_all();
            return;
        };
        let names: Vec<&str> = page.items.iter().map(|e| e.name.as_str()).collect();
        self.details.retain_mounted(&names);
        let started = names
            .iter()
            .filter(|name| self.details.on_visible(name))
            .count();
        if started > 0 {
            debug!(started, "Detail fetches started for visible cards");
        }
    }

    // ========================================================================
    // ACTIONS
    // ========================================================================

    /// Apply several parameter updates as one navigation
    pub fn set_params(&mut self, updates: &[(&str, Option<&str>)], navigation: Navigation) {
        self.url.set_many(updates, navigation);
        self.repaint.request();
    }

    /// Settled search box text, after debouncing
    pub fn commit_search(&mut self, text: &str) {
        self.url
            .set_many(&[(PARAM_SEARCH, Some(text))], Navigation::Replace);
        self.repaint.request();
    }

    pub fn set_type(&mut self, type_name: Option<&str>) {
        let type_name = type_name.map(|t| t.trim().to_lowercase());
        self.url
            .set_many(&[(PARAM_TYPE, type_name.as_deref())], Navigation::Replace);
        self.repaint.request();
    }

    pub fn set_sort(&mut self, field: SortField) {
        self.url
            .set_many(&[(PARAM_SORT, Some(field.as_param()))], Navigation::Replace);
        self.repaint.request();
    }

    pub fn set_direction(&mut self, direction: SortDirection) {
        self.url
            .set_many(&[(PARAM_DIR, Some(direction.as_param()))], Navigation::Replace);
        self.repaint.request();
    }

    pub fn toggle_favorites_only(&mut self) {
        let value = if self.list_query().favorites_only {
            None
        } else {
            Some("1")
        };
        self.url
            .set_many(&[(PARAM_FAVORITES, value)], Navigation::Replace);
        self.repaint.request();
    }

    pub fn goto_page(&mut self, page: usize) {
        let value = (page > 1).then(|| page.to_string());
        self.url
            .set_many(&[(PARAM_PAGE, value.as_deref())], Navigation::Push);
        self.repaint.request();
    }

    pub fn next_page(&mut self) -> bool {
        match self.list_view() {
            ListView::Page(page) if page.has_next => {
                self.goto_page(page.page + 1);
                true
            }
            _ => false,
        }
    }

    pub fn prev_page(&mut self) -> bool {
        let page = self.list_query().page;
        if page <= 1 {
            return false;
        }
        self.goto_page(page - 1);
        true
    }

    pub fn back(&mut self) -> bool {
        let moved = self.url.back();
        if moved {
            self.repaint.request();
        }
        moved
    }

    pub fn forward(&mut self) -> bool {
        let moved = self.url.forward();
        if moved {
            self.repaint.request();
        }
        moved
    }

    pub fn toggle_favorite(&mut self, name: &str) -> bool {
        let favorite = self.favorites.toggle_favorite(name);
        self.repaint.request();
        favorite
    }

    /// Pick up favorites changed by another process
    pub fn sync_storage(&mut self) -> bool {
        match self.favorites.sync() {
            Ok(true) => {
                info!("Favorites updated from another session");
                self.repaint.request();
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!(error = %e, "Failed to poll storage");
                false
            }
        }
    }

    /// Re-issue the base list and type membership queries
    pub fn retry(&self) {
        info!("Retrying list queries");
        self.spawn_query(self.queries.refetch_list());
        if let Some(type_name) = self.list_query().type_filter {
            self.spawn_query(self.queries.refetch_members(&type_name));
        }
        self.repaint.request();
    }

    pub fn retry_detail(&self, name: &str) {
        self.spawn_query(self.queries.refetch_detail(name));
        self.repaint.request();
    }

    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        self.details.unmount_all();
    }
}

fn failed_view(error: &QueryError) -> ListView {
    ListView::Failed {
        message: LIST_ERROR_MESSAGE.to_string(),
        error: error.to_string(),
    }
}
