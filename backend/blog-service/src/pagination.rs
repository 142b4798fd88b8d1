//! `page`/`limit` query handling and the paginated response envelope
//!
//! Responses look like `{page, counts, numberOfPages, hasMore, <items>}`
//! where `<items>` is named after the resource (`posts`, `comments`, ...).

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;

const MAX_LIMIT: i64 = 100;

/// Raw pagination query parameters
///
/// Values are parsed leniently: anything that is not a positive integer
/// falls back to the endpoint default.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn resolve(&self, default_limit: i64) -> PageRequest {
        let parse = |raw: &Option<String>| {
            raw.as_deref()
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|v| *v > 0)
        };

        PageRequest {
            page: parse(&self.page).unwrap_or(1),
            limit: parse(&self.limit).unwrap_or(default_limit).min(MAX_LIMIT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// One page of results plus the totals needed to render pagers
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub page: i64,
    pub counts: i64,
    pub number_of_pages: i64,
    pub has_more: bool,
    pub items: Vec<T>,
    key: &'static str,
}

impl<T> Page<T> {
    /// Wrap an already sliced page
    pub fn new(key: &'static str, request: PageRequest, counts: i64, items: Vec<T>) -> Self {
        let number_of_pages = if counts == 0 {
            0
        } else {
            (counts + request.limit - 1) / request.limit
        };

        Self {
            page: request.page,
            counts,
            number_of_pages,
            has_more: request.page * request.limit < counts,
            items,
            key,
        }
    }

    /// Slice a fully loaded, already filtered list
    pub fn from_vec(key: &'static str, request: PageRequest, all: Vec<T>) -> Self {
        let counts = all.len() as i64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit as usize)
            .collect();
        Self::new(key, request, counts, items)
    }
}

impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("page", &self.page)?;
        map.serialize_entry("counts", &self.counts)?;
        map.serialize_entry("numberOfPages", &self.number_of_pages)?;
        map.serialize_entry("hasMore", &self.has_more)?;
        map.serialize_entry(self.key, &self.items)?;
        map.end()
    }
}
