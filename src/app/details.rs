//! Visibility-gated detail loading for list cards

use super::Repaint;
use crate::error::QueryError;
use crate::query::CatalogQueries;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Starts one detail fetch per mounted card, the first time it becomes
/// visible. Scrolling a card away and back does not re-trigger it; unmounting
/// cancels the fetch and a later remount counts as a new card.
pub struct DetailLoader {
    queries: CatalogQueries,
    semaphore: Arc<Semaphore>,
    repaint: Repaint,
    // name -> cancellation for the card's fetch; presence is the latch
    mounted: HashMap<String, CancellationToken>,
}

impl DetailLoader {
    pub fn new(queries: CatalogQueries, concurrency: usize, repaint: Repaint) -> Self {
        Self {
            queries,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            repaint,
            mounted: HashMap::new(),
        }
    }

    /// Card `name` became visible. Returns true when this started a fetch.
    pub fn on_visible(&mut self, name: &str) -> bool {
        if self.mounted.contains_key(name) {
            return false;
        }
        let token = CancellationToken::new();
        self.mounted.insert(name.to_string(), token.clone());

        let queries = self.queries.clone();
        let semaphore = Arc::clone(&self.semaphore);
        let repaint = self.repaint.clone();
        let name = name.to_string();

        tokio::spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                permit = semaphore.acquire_owned() => permit.ok(),
            };
            match queries.pokemon_detail(&name, &token).await {
                Err(QueryError::Cancelled) => debug!(name = %name, "Detail fetch cancelled"),
                _ => repaint.request(),
            }
        });
        true
    }

    /// Card `name` was unmounted
    pub fn unmount(&mut self, name: &str) {
        if let Some(token) = self.mounted.remove(name) {
            token.cancel();
        }
    }

    /// Unmount every card not in `keep`
    pub fn retain_mounted(&mut self, keep: &[&str]) {
        let gone: Vec<String> = self
            .mounted
            .keys()
            .filter(|name| !keep.contains(&name.as_str()))
            .cloned()
            .collect();
        for name in gone {
            self.unmount(&name);
        }
    }

    pub fn unmount_all(&mut self) {
        for (_, token) in self.mounted.drain() {
            token.cancel();
        }
    }
}

impl Drop for DetailLoader {
    fn drop(&mut self) {
        self.unmount_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::query::QueryStatus;
    use crate::types::PokemonDetail;

    fn detail(name: &str, id: u32) -> PokemonDetail {
        serde_json::from_value(serde_json::json!({ "id": id, "name": name })).unwrap()
    }

    fn loader(queries: &CatalogQueries) -> DetailLoader {
        DetailLoader::new(queries.clone(), 2, Repaint::new())
    }

    #[tokio::test]
    async fn triggers_once_per_mount() {
        let queries = CatalogQueries::new(ApiClient::new(), 10);
        queries.seed_detail(detail("mew", 151));
        let mut loader = loader(&queries);

        assert!(loader.on_visible("mew"));
        assert!(!loader.on_visible("mew"));
        assert!(loader.mounted.contains_key("mew"));

        loader.unmount("mew");
        assert!(!loader.mounted.contains_key("mew"));
        assert!(loader.on_visible("mew"));
    }

    #[tokio::test]
    async fn completed_fetch_requests_repaint() {
        let queries = CatalogQueries::new(ApiClient::new(), 10);
        queries.seed_detail(detail("mew", 151));
        let repaint = Repaint::new();
        let mut frames = repaint.subscribe();
        let mut loader = DetailLoader::new(queries.clone(), 2, repaint);

        loader.on_visible("mew");
        frames.changed().await.unwrap();
        assert!(matches!(queries.peek_detail("mew"), QueryStatus::Ready { .. }));
    }

    #[tokio::test]
    async fn unmount_cancels_pending_fetch() {
        let queries = CatalogQueries::new(ApiClient::new(), 10);
        let mut loader = loader(&queries);

        loader.on_visible("missingno");
        loader.retain_mounted(&[]);
        tokio::task::yield_now().await;

        assert!(!loader.mounted.contains_key("missingno"));
        assert!(!matches!(
            queries.peek_detail("missingno"),
            QueryStatus::Ready { .. } | QueryStatus::Failed(_)
        ));
    }
}
