//! URL query-state store
//!
//! The query string is the single source of truth for search, type filter,
//! sort and page. All changes go through [`UrlState::set_many`], which also
//! keeps a browser-style navigation history.

use crate::types::{ListQuery, SortDirection, SortField};
use tracing::debug;

pub const PARAM_SEARCH: &str = "q";
pub const PARAM_TYPE: &str = "type";
pub const PARAM_SORT: &str = "sort";
pub const PARAM_DIR: &str = "dir";
pub const PARAM_PAGE: &str = "page";
pub const PARAM_FAVORITES: &str = "fav";

/// Changing any of these sends the user back to page 1
const PAGE_RESET_KEYS: [&str; 5] = [
    PARAM_SEARCH,
    PARAM_TYPE,
    PARAM_FAVORITES,
    PARAM_SORT,
    PARAM_DIR,
];

/// How a change lands in history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// New history entry (page navigation)
    Push,
    /// Overwrite the current entry (typing, filter toggles)
    Replace,
}

/// Ordered query-string parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Parse `a=1&b=2`, with or without a leading `?`
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self(
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        )
    }

    /// First value for `key`, empty when absent
    pub fn get(&self, key: &str) -> &str {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Replace every occurrence of `key`, keeping the position of the first
    pub fn set(&mut self, key: &str, value: &str) {
        match self.0.iter().position(|(k, _)| k == key) {
            Some(pos) => {
                self.0[pos].1 = value.to_string();
                let mut index = 0;
                self.0.retain(|(k, _)| {
                    let keep = index <= pos || k != key;
                    index += 1;
                    keep
                });
            }
            None => self.0.push((key.to_string(), value.to_string())),
        }
    }

    pub fn delete(&mut self, key: &str) {
        self.0.retain(|(k, _)| k != key);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter())
            .finish()
    }
}

impl ListQuery {
    pub fn from_params(params: &QueryParams) -> Self {
        let page = params
            .get(PARAM_PAGE)
            .trim()
            .parse::<i64>()
            .map(|p| p.max(1) as usize)
            .unwrap_or(1);
        let type_filter = params.get(PARAM_TYPE).trim().to_lowercase();

        Self {
            search: params.get(PARAM_SEARCH).trim().to_lowercase(),
            type_filter: (!type_filter.is_empty()).then_some(type_filter),
            sort: SortField::from_param(params.get(PARAM_SORT)),
            direction: SortDirection::from_param(params.get(PARAM_DIR)),
            page,
            favorites_only: params.get(PARAM_FAVORITES) == "1",
        }
    }
}

pub struct UrlState {
    path: String,
    history: Vec<QueryParams>,
    index: usize,
}

impl UrlState {
    pub fn new(path: &str, query: &str) -> Self {
        Self {
            path: path.to_string(),
            history: vec![QueryParams::parse(query)],
            index: 0,
        }
    }

    pub fn params(&self) -> &QueryParams {
        &self.history[self.index]
    }

    pub fn get(&self, key: &str) -> String {
        self.params().get(key).to_string()
    }

    pub fn list_query(&self) -> ListQuery {
        ListQuery::from_params(self.params())
    }

    /// Current location as `path?query`
    pub fn location(&self) -> String {
        let params = self.params();
        if params.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, params.to_query_string())
        }
    }

    pub fn query_string(&self) -> String {
        self.params().to_query_string()
    }

    /// Apply `updates` on top of the current parameters.
    ///
    /// `None` or an empty value removes the parameter. A real change to a
    /// filter or sort parameter drops `page` unless `page` is itself updated.
    pub fn set_many(&mut self, updates: &[(&str, Option<&str>)], navigation: Navigation) {
        let current = self.params();
        let mut next = current.clone();
        for (key, value) in updates {
            match value {
                Some(v) if !v.is_empty() => next.set(key, v),
                _ => next.delete(key),
            }
        }

        let filter_changed = updates.iter().any(|(key, value)| {
            PAGE_RESET_KEYS.contains(key) && value.unwrap_or("") != current.get(key)
        });
        let page_updated = updates.iter().any(|(key, _)| *key == PARAM_PAGE);
        if filter_changed && !page_updated {
            next.delete(PARAM_PAGE);
        }

        match navigation {
            Navigation::Replace => self.history[self.index] = next,
            Navigation::Push => {
                self.history.truncate(self.index + 1);
                self.history.push(next);
                self.index += 1;
            }
        }
        debug!(location = %self.location(), ?navigation, "Query state updated");
    }

    pub fn can_go_back(&self) -> bool {
        self.index > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.index + 1 < self.history.len()
    }

    pub fn back(&mut self) -> bool {
        if !self.can_go_back() {
            return false;
        }
        self.index -= 1;
        true
    }

    pub fn forward(&mut self) -> bool {
        if !self.can_go_forward() {
            return false;
        }
        self.index += 1;
        true
    }
}
