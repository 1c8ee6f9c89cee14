//! # Pagination
//!
//! Turns a 1-based page selector, a page size and an optional type-ahead
//! prefix into a window over a counted result set.
//!
//! ```text
//! PageRequest ──(count query)──→ total ──→ PagePlan { page, skip, limit }
//! ```
//!
//! `skip = (page - 1) * items_per_page` is the only place where 1-based
//! pages meet the engine's 0-based offsets.

use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::{Error, Result};

/// Which page a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSelector {
    #[default]
    First,
    Last,
    /// 1-based; `0` means the first page.
    Number(u64),
}

impl FromStr for PageSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "first" => Ok(PageSelector::First),
            "last" => Ok(PageSelector::Last),
            n => n.parse::<u64>().map(PageSelector::Number).map_err(|_| {
                Error::InvalidRequest(format!(
                    "page ({s}) must be either a number >= 0 or the words 'first' or 'last'"
                ))
            }),
        }
    }
}

/// A validated list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: PageSelector,
    items_per_page: u64,
    starts_with: String,
}

impl PageRequest {
    pub fn new(page: PageSelector, items_per_page: u64, starts_with: impl Into<String>) -> Result<Self> {
        if items_per_page == 0 {
            return Err(Error::InvalidRequest("items per page must be greater than zero".into()));
        }
        Ok(Self { page, items_per_page, starts_with: starts_with.into() })
    }

    /// Build from raw query-string values. Absent values take defaults;
    /// present ones must parse.
    pub fn parse(
        page: Option<&str>,
        items_per_page: Option<&str>,
        starts_with: Option<&str>,
        default_items_per_page: u64,
    ) -> Result<Self> {
        let page = match page {
            None => PageSelector::First,
            Some(p) => p.parse()?,
        };
        let items_per_page = match items_per_page {
            None => default_items_per_page,
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                Error::InvalidRequest(format!("items per page ({raw}) must be numeric"))
            })?,
        };
        Self::new(page, items_per_page, starts_with.unwrap_or_default())
    }

    pub fn page(&self) -> PageSelector {
        self.page
    }

    pub fn items_per_page(&self) -> u64 {
        self.items_per_page
    }

    /// The prefix as the caller sent it.
    pub fn starts_with(&self) -> &str {
        &self.starts_with
    }

    /// Case-folded prefix to bind, if any.
    pub fn prefix(&self) -> Option<String> {
        let p = self.starts_with.trim();
        (!p.is_empty()).then(|| p.to_lowercase())
    }
}

/// A request resolved against a total count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlan {
    pub page: u64,
    pub total_pages: u64,
    pub items_per_page: u64,
    pub total_count: u64,
    pub skip: u64,
}

impl PagePlan {
    /// Resolve `first`/`last`, default page 0 to 1, clamp past-the-end
    /// pages. An empty result set still has one page.
    pub fn resolve(request: &PageRequest, total_count: u64) -> Self {
        let per = request.items_per_page.max(1);
        let total_pages = total_count.div_ceil(per).max(1);
        let page = match request.page {
            PageSelector::First | PageSelector::Number(0) => 1,
            PageSelector::Last => total_pages,
            PageSelector::Number(n) => n.min(total_pages),
        };
        Self {
            page,
            total_pages,
            items_per_page: per,
            total_count,
            skip: (page - 1) * per,
        }
    }

    pub fn limit(&self) -> u64 {
        self.items_per_page
    }
}

/// Pagination block of a list envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub total_pages: u64,
    pub items_per_page: u64,
    pub starts_with: String,
    pub item_count: u64,
}

/// One page of items plus its pagination block, serialized as
/// `{"pagination": {...}, "<items_key>": [...]}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    pub pagination: Pagination,
    pub items_key: &'static str,
    pub items: Vec<T>,
}

impl<T> PageResult<T> {
    pub fn new(plan: &PagePlan, request: &PageRequest, items_key: &'static str, items: Vec<T>) -> Self {
        Self {
            pagination: Pagination {
                page: plan.page,
                total_pages: plan.total_pages,
                items_per_page: plan.items_per_page,
                starts_with: request.starts_with.clone(),
                item_count: plan.total_count,
            },
            items_key,
            items,
        }
    }
}

impl<T: Serialize> PageResult<T> {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl<T: Serialize> Serialize for PageResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("pagination", &self.pagination)?;
        map.serialize_entry(self.items_key, &self.items)?;
        map.end()
    }
}
