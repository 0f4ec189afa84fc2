//! Application constants and configuration

use std::time::Duration;

pub const API_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const ARTWORK_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/other/official-artwork";
pub const SPRITE_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_DIR_NAME: &str = "Dex Explorer";

/// Cards per page in the list view
pub const PAGE_SIZE: usize = 24;
/// Size of the one-shot base listing used for client-side search and paging
pub const LIST_FETCH_LIMIT: u32 = 1000;

// Staleness windows per query kind
pub const LIST_STALE_TIME: Duration = Duration::from_secs(5 * 60);
pub const DETAIL_STALE_TIME: Duration = Duration::from_secs(10 * 60);
pub const TYPE_MEMBERS_STALE_TIME: Duration = Duration::from_secs(30 * 60);
pub const TYPE_LIST_STALE_TIME: Duration = Duration::from_secs(60 * 60);

// Retry policy for failed fetches
pub const RETRY_LIMIT: u32 = 3;
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Quiet period before search box input reaches the query string
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// Storage key holding the JSON array of favorited names
pub const FAVORITES_KEY: &str = "pokemon-favorites";

/// Max detail requests in flight at once
pub const DETAIL_FETCH_CONCURRENCY: usize = 8;
pub const STORAGE_POLL_INTERVAL_MS: u64 = 1000;

pub const POKEMON_TYPES: [&str; 18] = [
    "normal", "fire", "water", "electric", "grass", "ice", "fighting", "poison", "ground",
    "flying", "psychic", "bug", "rock", "ghost", "dragon", "dark", "steel", "fairy",
];
