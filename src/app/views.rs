//! View models handed to the renderer

use crate::types::{ListingEntry, PokemonDetail};
use crate::utils::{artwork_url, format_dex_number, sprite_url};

pub const LIST_ERROR_MESSAGE: &str = "Failed to load Pokémon.";
pub const EMPTY_MESSAGE: &str = "No Pokémon match your filters.";

#[derive(Debug, Clone, PartialEq)]
pub enum ListView {
    Loading,
    /// Base list or type membership failed after retries
    Failed { message: String, error: String },
    Page(PageView),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub cards: Vec<CardView>,
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
    pub has_prev: bool,
    pub has_next: bool,
    /// Type filter selected but its members are not loaded yet
    pub type_pending: bool,
}

/// One list card. Without a loaded detail record it shows name and id only.
#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    pub name: String,
    pub dex_number: String,
    pub image_url: String,
    pub href: String,
    pub types: Vec<String>,
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub favorite: bool,
    pub loaded: bool,
}

impl CardView {
    pub fn placeholder(entry: &ListingEntry, favorite: bool, href: String) -> Self {
        let id = entry.id();
        Self {
            name: entry.name.clone(),
            dex_number: format_dex_number(id),
            // unknown ids fall back to the first sprite
            image_url: id.map(artwork_url).unwrap_or_else(|| sprite_url(1)),
            href,
            types: Vec::new(),
            hp: 0,
            attack: 0,
            defense: 0,
            favorite,
            loaded: false,
        }
    }

    pub fn from_detail(
        entry: &ListingEntry,
        detail: &PokemonDetail,
        favorite: bool,
        href: String,
    ) -> Self {
        Self {
            name: detail.name.clone(),
            dex_number: format_dex_number(Some(detail.id)),
            image_url: entry
                .id()
                .map(artwork_url)
                .unwrap_or_else(|| artwork_url(detail.id)),
            href,
            types: detail.type_names().into_iter().map(String::from).collect(),
            hp: detail.stat("hp").unwrap_or(0),
            attack: detail.stat("attack").unwrap_or(0),
            defense: detail.stat("defense").unwrap_or(0),
            favorite,
            loaded: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub name: String,
    pub id: u32,
    pub image_url: Option<String>,
    pub height: u32,
    pub weight: u32,
    pub types: Vec<String>,
    pub stats: Vec<(String, u32)>,
    /// (ability, hidden)
    pub abilities: Vec<(String, bool)>,
    pub favorite: bool,
}

impl DetailView {
    pub fn new(detail: &PokemonDetail, favorite: bool) -> Self {
        Self {
            name: detail.name.clone(),
            id: detail.id,
            image_url: detail.image_url().map(String::from),
            height: detail.height,
            weight: detail.weight,
            types: detail.type_names().into_iter().map(String::from).collect(),
            stats: detail
                .stats
                .iter()
                .map(|s| (s.stat.name.clone(), s.base_stat))
                .collect(),
            abilities: detail
                .abilities
                .iter()
                .map(|a| (a.ability.name.clone(), a.is_hidden))
                .collect(),
            favorite,
        }
    }
}
