//! The four PokeAPI queries the explorer reads through the cache

use super::{QueryCache, QueryResult, QueryStatus, RetryPolicy, SharedFetch};
use crate::api::ApiClient;
use crate::constants::{
    DETAIL_STALE_TIME, LIST_STALE_TIME, TYPE_LIST_STALE_TIME, TYPE_MEMBERS_STALE_TIME,
};
use crate::error::QueryError;
use crate::types::{PokemonDetail, PokemonPage, TypeDetail, TypeList};
use futures::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct CatalogQueries {
    api: ApiClient,
    list_limit: u32,
    list: QueryCache<(), PokemonPage>,
    details: QueryCache<String, PokemonDetail>,
    types: QueryCache<(), TypeList>,
    members: QueryCache<String, TypeDetail>,
}

impl CatalogQueries {
    pub fn new(api: ApiClient, list_limit: u32) -> Self {
        let retry = RetryPolicy::default();
        Self {
            api,
            list_limit,
            list: QueryCache::new("pokemon-list", LIST_STALE_TIME, retry),
            details: QueryCache::new("pokemon-detail", DETAIL_STALE_TIME, retry),
            types: QueryCache::new("types", TYPE_LIST_STALE_TIME, retry),
            members: QueryCache::new("type", TYPE_MEMBERS_STALE_TIME, retry),
        }
    }

    // Base listing

    pub async fn pokemon_list(&self, cancel: &CancellationToken) -> QueryResult<PokemonPage> {
        self.list.fetch((), self.list_fetcher(), cancel).await
    }

    pub fn peek_list(&self) -> QueryStatus<PokemonPage> {
        self.list.peek(&())
    }

    pub fn refetch_list(&self) -> SharedFetch<PokemonPage> {
        self.list.refetch((), self.list_fetcher())
    }

    // Detail records

    pub async fn pokemon_detail(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<PokemonDetail> {
        self.details
            .fetch(name.to_string(), self.detail_fetcher(name), cancel)
            .await
    }

    pub fn peek_detail(&self, name: &str) -> QueryStatus<PokemonDetail> {
        self.details.peek(&name.to_string())
    }

    pub fn refetch_detail(&self, name: &str) -> SharedFetch<PokemonDetail> {
        self.details
            .refetch(name.to_string(), self.detail_fetcher(name))
    }

    // Types

    pub async fn type_list(&self, cancel: &CancellationToken) -> QueryResult<TypeList> {
        self.types.fetch((), self.type_list_fetcher(), cancel).await
    }

    pub async fn type_members(
        &self,
        type_name: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<TypeDetail> {
        self.members
            .fetch(type_name.to_string(), self.members_fetcher(type_name), cancel)
            .await
    }

    pub fn peek_members(&self, type_name: &str) -> QueryStatus<TypeDetail> {
        self.members.peek(&type_name.to_string())
    }

    pub fn refetch_members(&self, type_name: &str) -> SharedFetch<TypeDetail> {
        self.members
            .refetch(type_name.to_string(), self.members_fetcher(type_name))
    }

    #[cfg(test)]
    pub(crate) fn seed_list(&self, page: PokemonPage) {
        self.list.set_value((), page);
    }

    #[cfg(test)]
    pub(crate) fn seed_members(&self, detail: TypeDetail) {
        self.members.set_value(detail.name.clone(), detail);
    }

    #[cfg(test)]
    pub(crate) fn seed_detail(&self, detail: PokemonDetail) {
        self.details.set_value(detail.name.clone(), detail);
    }

    fn list_fetcher(
        &self,
    ) -> impl Fn(CancellationToken) -> BoxFuture<'static, Result<PokemonPage, QueryError>>
           + Send
           + Sync
           + 'static {
        let api = self.api.clone();
        let limit = self.list_limit;
        move |token| {
            let api = api.clone();
            async move { api.list_pokemon(limit, 0, &token).await }.boxed()
        }
    }

    fn detail_fetcher(
        &self,
        name: &str,
    ) -> impl Fn(CancellationToken) -> BoxFuture<'static, Result<PokemonDetail, QueryError>>
           + Send
           + Sync
           + 'static {
        let api = self.api.clone();
        let name = name.to_string();
        move |token| {
            let api = api.clone();
            let name = name.clone();
            async move { api.get_pokemon(&name, &token).await }.boxed()
        }
    }

    fn type_list_fetcher(
        &self,
    ) -> impl Fn(CancellationToken) -> BoxFuture<'static, Result<TypeList, QueryError>>
           + Send
           + Sync
           + 'static {
        let api = self.api.clone();
        move |token| {
            let api = api.clone();
            async move { api.list_types(&token).await }.boxed()
        }
    }

    fn members_fetcher(
        &self,
        type_name: &str,
    ) -> impl Fn(CancellationToken) -> BoxFuture<'static, Result<TypeDetail, QueryError>>
           + Send
           + Sync
           + 'static {
        let api = self.api.clone();
        let type_name = type_name.to_string();
        move |token| {
            let api = api.clone();
            let type_name = type_name.clone();
            async move { api.get_type(&type_name, &token).await }.boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_read_leaves_query_idle() {
        let queries = CatalogQueries::new(ApiClient::new(), 10);
        let token = CancellationToken::new();
        token.cancel();

        let result = queries.pokemon_detail("eevee", &token).await;

        assert_eq!(result.unwrap_err(), QueryError::Cancelled);
        assert!(matches!(queries.peek_detail("eevee"), QueryStatus::Idle));
    }

    #[tokio::test]
    async fn seeded_values_are_served_without_fetching() {
        let queries = CatalogQueries::new(ApiClient::new(), 10);
        queries.seed_members(TypeDetail {
            id: 10,
            name: "fire".into(),
            pokemon: Vec::new(),
        });

        let token = CancellationToken::new();
        let fire = queries.type_members("fire", &token).await.unwrap();
        assert_eq!(fire.id, 10);
        assert!(matches!(queries.peek_members("water"), QueryStatus::Idle));
    }
}
