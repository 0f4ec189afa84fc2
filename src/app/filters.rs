//! Filtering, sorting and paging of the base listing

use crate::types::{ListQuery, ListingEntry, SortDirection, SortField, TypeDetail};
use std::cmp::Ordering;
use std::collections::HashSet;

/// One page of the filtered and sorted listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedPage {
    pub items: Vec<ListingEntry>,
    /// Entries matching the filters, across all pages
    pub total: usize,
    /// Requested page, at least 1; may exceed `page_count`
    pub page: usize,
    pub page_count: usize,
}

impl DerivedPage {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }
}

/// Derive the visible page from the base listing.
///
/// Pure: the same inputs always give the same page. `membership` only narrows
/// the list when it belongs to the selected type, so a type whose members are
/// still loading shows the unfiltered list instead of an empty one.
pub fn derive_page(
    base: &[ListingEntry],
    membership: Option<&TypeDetail>,
    favorites: &HashSet<String>,
    query: &ListQuery,
    page_size: usize,
) -> DerivedPage {
    let allowed = match (&query.type_filter, membership) {
        (Some(type_name), Some(detail)) if detail.name == *type_name => {
            Some(detail.member_names())
        }
        _ => None,
    };
    let search = query.search.trim().to_lowercase();

    let mut matching: Vec<&ListingEntry> = base
        .iter()
        .filter(|entry| {
            allowed
                .as_ref()
                .map_or(true, |names| names.contains(entry.name.as_str()))
        })
        .filter(|entry| !query.favorites_only || favorites.contains(&entry.name))
        .filter(|entry| search.is_empty() || entry.name.to_lowercase().contains(&search))
        .collect();

    // sort_by is stable: ties keep fetch order in both directions
    matching.sort_by(|a, b| {
        let cmp = match query.sort {
            SortField::Name => compare_names(&a.name, &b.name),
            SortField::Id => a.id().unwrap_or(0).cmp(&b.id().unwrap_or(0)),
        };
        if query.direction == SortDirection::Descending {
            cmp.reverse()
        } else {
            cmp
        }
    });

    let page_size = page_size.max(1);
    let total = matching.len();
    let page_count = total.div_ceil(page_size).max(1);
    let page = query.page.max(1);
    let start = (page - 1).saturating_mul(page_size);

    let items = matching
        .into_iter()
        .skip(start)
        .take(page_size)
        .cloned()
        .collect();

    DerivedPage {
        items,
        total,
        page,
        page_count,
    }
}

/// Case-insensitive, lower case first on ties
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NamedResource, TypeMember};

    fn entry(name: &str, id: u32) -> ListingEntry {
        NamedResource::new(name, format!("https://pokeapi.co/api/v2/pokemon/{}/", id))
    }

    fn names(page: &DerivedPage) -> Vec<&str> {
        page.items.iter().map(|e| e.name.as_str()).collect()
    }

    fn type_detail(name: &str, members: &[&ListingEntry]) -> TypeDetail {
        TypeDetail {
            id: 1,
            name: name.into(),
            pokemon: members
                .iter()
                .map(|e| TypeMember {
                    pokemon: (*e).clone(),
                    slot: 1,
                })
                .collect(),
        }
    }

    fn catalog() -> Vec<ListingEntry> {
        vec![
            entry("charmander", 4),
            entry("squirtle", 7),
            entry("charizard", 6),
            entry("bulbasaur", 1),
            entry("vulpix", 37),
        ]
    }

    #[test]
    fn id_sort_both_directions() {
        let base = vec![entry("c", 3), entry("a", 1), entry("b", 2)];
        let mut query = ListQuery::default();

        let page = derive_page(&base, None, &HashSet::new(), &query, 24);
        let ids: Vec<_> = page.items.iter().map(|e| e.id().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        query.direction = SortDirection::Descending;
        let page = derive_page(&base, None, &HashSet::new(), &query, 24);
        let ids: Vec<_> = page.items.iter().map(|e| e.id().unwrap()).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn name_sort_ascending() {
        let base = vec![entry("bulbasaur", 1), entry("charmander", 4), entry("abra", 63)];
        let query = ListQuery {
            sort: SortField::Name,
            ..ListQuery::default()
        };
        let page = derive_page(&base, None, &HashSet::new(), &query, 24);
        assert_eq!(names(&page), vec!["abra", "bulbasaur", "charmander"]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        // ids missing from the URL all sort as 0
        let base = vec![
            NamedResource::new("zeta", "https://x/pokemon/"),
            entry("mid", 5),
            NamedResource::new("alpha", "https://x/pokemon/"),
        ];
        let mut query = ListQuery::default();
        let page = derive_page(&base, None, &HashSet::new(), &query, 24);
        assert_eq!(names(&page), vec!["zeta", "alpha", "mid"]);

        query.direction = SortDirection::Descending;
        let page = derive_page(&base, None, &HashSet::new(), &query, 24);
        assert_eq!(names(&page), vec!["mid", "zeta", "alpha"]);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let base = vec![entry("charmander", 4), entry("squirtle", 7), entry("charizard", 6)];
        for search in ["char", "CHAR", " Char "] {
            let query = ListQuery {
                search: search.into(),
                ..ListQuery::default()
            };
            let page = derive_page(&base, None, &HashSet::new(), &query, 24);
            assert_eq!(names(&page), vec!["charmander", "charizard"]);
        }

        let query = ListQuery {
            search: "zard".into(),
            ..ListQuery::default()
        };
        let page = derive_page(&base, None, &HashSet::new(), &query, 24);
        assert_eq!(names(&page), vec!["charizard"]);
    }

    #[test]
    fn favorites_only_with_no_favorites_is_empty() {
        let query = ListQuery {
            favorites_only: true,
            ..ListQuery::default()
        };
        let page = derive_page(&catalog(), None, &HashSet::new(), &query, 24);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.page_count, 1);
    }

    #[test]
    fn favorites_only_keeps_favorites() {
        let favorites: HashSet<String> = ["vulpix".to_string(), "squirtle".to_string()].into();
        let query = ListQuery {
            favorites_only: true,
            ..ListQuery::default()
        };
        let page = derive_page(&catalog(), None, &favorites, &query, 24);
        assert_eq!(names(&page), vec!["squirtle", "vulpix"]);
    }

    #[test]
    fn type_membership_narrows() {
        let base = catalog();
        let fire = type_detail("fire", &[&base[0], &base[2], &base[4]]);
        let query = ListQuery {
            type_filter: Some("fire".into()),
            ..ListQuery::default()
        };
        let page = derive_page(&base, Some(&fire), &HashSet::new(), &query, 24);
        assert_eq!(names(&page), vec!["charmander", "charizard", "vulpix"]);
    }

    #[test]
    fn pending_or_mismatched_membership_does_not_narrow() {
        let base = catalog();
        let query = ListQuery {
            type_filter: Some("water".into()),
            ..ListQuery::default()
        };

        let page = derive_page(&base, None, &HashSet::new(), &query, 24);
        assert_eq!(page.total, base.len());

        // stale data for the previously selected type is ignored
        let fire = type_detail("fire", &[&base[0]]);
        let page = derive_page(&base, Some(&fire), &HashSet::new(), &query, 24);
        assert_eq!(page.total, base.len());
    }

    #[test]
    fn filters_combine() {
        let base = catalog();
        let fire = type_detail("fire", &[&base[0], &base[2], &base[4]]);
        let favorites: HashSet<String> = ["charizard".to_string(), "vulpix".to_string()].into();
        let query = ListQuery {
            search: "char".into(),
            type_filter: Some("fire".into()),
            favorites_only: true,
            ..ListQuery::default()
        };
        let page = derive_page(&base, Some(&fire), &favorites, &query, 24);
        assert_eq!(names(&page), vec!["charizard"]);
    }

    #[test]
    fn pagination_slices() {
        let base: Vec<_> = (1..=50).map(|id| entry(&format!("mon{}", id), id)).collect();
        let mut query = ListQuery::default();

        let page = derive_page(&base, None, &HashSet::new(), &query, 24);
        assert_eq!(page.items.len(), 24);
        assert_eq!(page.page_count, 3);
        assert!(page.has_next() && !page.has_prev());

        query.page = 3;
        let page = derive_page(&base, None, &HashSet::new(), &query, 24);
        let ids: Vec<_> = page.items.iter().map(|e| e.id().unwrap()).collect();
        assert_eq!(ids, vec![49, 50]);
        assert!(!page.has_next());

        // past the last page: empty, not clamped back
        query.page = 4;
        let page = derive_page(&base, None, &HashSet::new(), &query, 24);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 50);
        assert_eq!(page.page, 4);
    }

    #[test]
    fn page_zero_is_page_one() {
        let query = ListQuery {
            page: 0,
            ..ListQuery::default()
        };
        let page = derive_page(&catalog(), None, &HashSet::new(), &query, 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn derivation_is_deterministic() {
        let base = catalog();
        let favorites: HashSet<String> = ["squirtle".to_string()].into();
        let query = ListQuery {
            sort: SortField::Name,
            direction: SortDirection::Descending,
            ..ListQuery::default()
        };
        let first = derive_page(&base, None, &favorites, &query, 2);
        let second = derive_page(&base, None, &favorites, &query, 2);
        assert_eq!(first, second);
    }
}
