//! Common types and data structures

use crate::utils::id_from_url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A `{name, url}` pair as returned by every PokeAPI listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

/// One catalog item in the base listing
pub type ListingEntry = NamedResource;

impl NamedResource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Numeric id parsed from the resource URL
    pub fn id(&self) -> Option<u32> {
        id_from_url(&self.url)
    }
}

/// Paginated base listing (`GET /pokemon?limit&offset`)
#[derive(Debug, Clone, Deserialize)]
pub struct PokemonPage {
    pub count: u32,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<NamedResource>,
}

/// Full record for one entry (`GET /pokemon/{nameOrId}`)
#[derive(Debug, Clone, Deserialize)]
pub struct PokemonDetail {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub sprites: Sprites,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub stats: Vec<StatEntry>,
    #[serde(default)]
    pub abilities: Vec<AbilitySlot>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sprites {
    pub front_default: Option<String>,
    #[serde(default)]
    pub other: Option<OtherSprites>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork", default)]
    pub official_artwork: Option<Artwork>,
    #[serde(default)]
    pub home: Option<Artwork>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Artwork {
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeSlot {
    pub slot: u8,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatEntry {
    pub base_stat: u32,
    pub stat: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbilitySlot {
    pub is_hidden: bool,
    pub ability: NamedResource,
}

impl PokemonDetail {
    /// Best available image: official artwork, then home render, then sprite
    pub fn image_url(&self) -> Option<&str> {
        let other = self.sprites.other.as_ref();
        other
            .and_then(|o| o.official_artwork.as_ref())
            .and_then(|a| a.front_default.as_deref())
            .or_else(|| {
                other
                    .and_then(|o| o.home.as_ref())
                    .and_then(|a| a.front_default.as_deref())
            })
            .or(self.sprites.front_default.as_deref())
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.kind.name.as_str()).collect()
    }

    pub fn stat(&self, name: &str) -> Option<u32> {
        self.stats
            .iter()
            .find(|s| s.stat.name == name)
            .map(|s| s.base_stat)
    }
}

/// All type names (`GET /type`)
#[derive(Debug, Clone, Deserialize)]
pub struct TypeList {
    pub results: Vec<NamedResource>,
}

/// Members of one type (`GET /type/{name}`)
#[derive(Debug, Clone, Deserialize)]
pub struct TypeDetail {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub pokemon: Vec<TypeMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeMember {
    pub pokemon: NamedResource,
    pub slot: u8,
}

impl TypeDetail {
    pub fn member_names(&self) -> HashSet<&str> {
        self.pokemon.iter().map(|m| m.pokemon.name.as_str()).collect()
    }
}

/// Field to sort the list by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Name,
    #[default]
    Id,
}

impl SortField {
    /// Anything other than `name` sorts by id
    pub fn from_param(value: &str) -> Self {
        match value {
            "name" => SortField::Name,
            _ => SortField::Id,
        }
    }

    pub fn as_param(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Id => "id",
        }
    }
}

/// Sort direction for the list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn from_param(value: &str) -> Self {
        match value {
            "desc" => SortDirection::Descending,
            _ => SortDirection::Ascending,
        }
    }

    pub fn as_param(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// What the user currently wants to see, parsed from the query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Lower-cased and trimmed
    pub search: String,
    pub type_filter: Option<String>,
    pub sort: SortField,
    pub direction: SortDirection,
    /// 1-based, never below 1
    pub page: usize,
    pub favorites_only: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            type_filter: None,
            sort: SortField::Id,
            direction: SortDirection::Ascending,
            page: 1,
            favorites_only: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_deserializes_and_picks_artwork() {
        let json = r#"{
            "id": 25,
            "name": "pikachu",
            "height": 4,
            "weight": 60,
            "sprites": {
                "front_default": "https://img/sprite/25.png",
                "other": {
                    "official-artwork": { "front_default": "https://img/art/25.png" },
                    "home": { "front_default": null }
                }
            },
            "types": [{ "slot": 1, "type": { "name": "electric", "url": "https://pokeapi.co/api/v2/type/13/" } }],
            "stats": [
                { "base_stat": 35, "effort": 0, "stat": { "name": "hp", "url": "u" } },
                { "base_stat": 55, "effort": 0, "stat": { "name": "attack", "url": "u" } }
            ],
            "abilities": [
                { "is_hidden": false, "slot": 1, "ability": { "name": "static", "url": "u" } },
                { "is_hidden": true, "slot": 3, "ability": { "name": "lightning-rod", "url": "u" } }
            ],
            "moves": []
        }"#;

        let detail: PokemonDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.id, 25);
        assert_eq!(detail.image_url(), Some("https://img/art/25.png"));
        assert_eq!(detail.type_names(), vec!["electric"]);
        assert_eq!(detail.stat("attack"), Some(55));
        assert_eq!(detail.stat("defense"), None);
        assert!(detail.abilities[1].is_hidden);
    }

    #[test]
    fn image_falls_back_to_sprite() {
        let json = r#"{ "id": 1, "name": "bulbasaur", "sprites": { "front_default": "s.png" } }"#;
        let detail: PokemonDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.image_url(), Some("s.png"));
    }

    #[test]
    fn type_detail_members() {
        let json = r#"{ "id": 10, "name": "fire", "pokemon": [
            { "pokemon": { "name": "charmander", "url": "https://pokeapi.co/api/v2/pokemon/4/" }, "slot": 1 },
            { "pokemon": { "name": "vulpix", "url": "https://pokeapi.co/api/v2/pokemon/37/" }, "slot": 1 }
        ] }"#;
        let detail: TypeDetail = serde_json::from_str(json).unwrap();
        let names = detail.member_names();
        assert!(names.contains("charmander"));
        assert!(!names.contains("squirtle"));
    }

    #[test]
    fn sort_params_default_to_id_ascending() {
        assert_eq!(SortField::from_param("name"), SortField::Name);
        assert_eq!(SortField::from_param(""), SortField::Id);
        assert_eq!(SortField::from_param("weight"), SortField::Id);
        assert_eq!(SortDirection::from_param("desc"), SortDirection::Descending);
        assert_eq!(SortDirection::from_param("sideways"), SortDirection::Ascending);
    }
}
