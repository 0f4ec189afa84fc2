//! Utility functions

use crate::constants::{APP_DIR_NAME, ARTWORK_BASE_URL, SPRITE_BASE_URL};
use std::path::PathBuf;

/// Extract the trailing numeric segment of a resource URL.
///
/// `https://pokeapi.co/api/v2/pokemon/25/` gives `Some(25)`; a single
/// trailing slash is allowed. Returns `None` when the last segment is not a
/// number.
pub fn id_from_url(url: &str) -> Option<u32> {
    let trimmed = url.strip_suffix('/').unwrap_or(url);
    let (_, last) = trimmed.rsplit_once('/')?;
    if last.is_empty() || !last.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    last.parse().ok()
}

pub fn artwork_url(id: u32) -> String {
    format!("{}/{}.png", ARTWORK_BASE_URL, id)
}

pub fn sprite_url(id: u32) -> String {
    format!("{}/{}.png", SPRITE_BASE_URL, id)
}

/// `#025` style dex number, `#000` when unknown
pub fn format_dex_number(id: Option<u32>) -> String {
    format!("#{:03}", id.unwrap_or(0))
}

/// Get the app data directory path
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_from_trailing_segment() {
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/25/"), Some(25));
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/151"), Some(151));
        assert_eq!(id_from_url("/type/10/"), Some(10));
    }

    #[test]
    fn id_absent_without_number() {
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon"), None);
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/"), None);
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/25//"), None);
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/pikachu"), None);
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/25a/"), None);
        assert_eq!(id_from_url("25"), None);
        assert_eq!(id_from_url(""), None);
    }

    #[test]
    fn asset_urls() {
        assert!(artwork_url(6).ends_with("/official-artwork/6.png"));
        assert!(sprite_url(6).ends_with("/sprites/pokemon/6.png"));
    }

    #[test]
    fn dex_number_padding() {
        assert_eq!(format_dex_number(Some(7)), "#007");
        assert_eq!(format_dex_number(Some(1025)), "#1025");
        assert_eq!(format_dex_number(None), "#000");
    }
}
