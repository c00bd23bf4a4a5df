//! Pagination types
//!
//! Feed pages are requested with `?page=N` (or `page=last`). Requests for a
//! page that does not exist are rejected; only the first page of an empty
//! listing is allowed.

use serde::{Deserialize, Serialize};

/// Pagination parameters for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Page number as requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(u32),
    Last,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::Number(1)
    }
}

/// The requested page is not a number or lies outside the listing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid page: {0}")]
pub struct InvalidPage(pub String);

impl PageRequest {
    /// Parse the raw `page` query value; a missing or blank value means page 1
    pub fn parse(raw: Option<&str>) -> Result<Self, InvalidPage> {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Ok(Self::default()),
            Some(raw) => raw,
        };
        if raw == "last" {
            return Ok(Self::Last);
        }
        match raw.parse::<u32>() {
            Ok(0) | Err(_) => Err(InvalidPage(raw.to_string())),
            Ok(n) => Ok(Self::Number(n)),
        }
    }

    /// Resolve against the total item count
    pub fn resolve(self, total: i64, per_page: u32) -> Result<ListParams, InvalidPage> {
        let pages = page_count(total, per_page);
        let page = match self {
            Self::Last => pages,
            Self::Number(n) if n <= pages => n,
            Self::Number(n) => return Err(InvalidPage(n.to_string())),
        };
        Ok(ListParams::new(page, per_page))
    }
}

/// Number of pages, never less than one
pub fn page_count(total: i64, per_page: u32) -> u32 {
    let per_page = per_page.max(1) as i64;
    let total = total.max(0);
    ((total + per_page - 1) / per_page).max(1) as u32
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        page_count(self.total, self.per_page)
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Paginator summary for templates
    pub fn page_info(&self) -> PageInfo {
        PageInfo {
            number: self.page,
            num_pages: self.total_pages(),
            total: self.total,
            has_next: self.has_next(),
            has_prev: self.has_prev(),
            next: self.has_next().then(|| self.page + 1),
            prev: self.has_prev().then(|| self.page - 1),
        }
    }
}

/// Serializable paginator state rendered by `includes/paginator.html`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageInfo {
    pub number: u32,
    pub num_pages: u32,
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
    pub next: Option<u32>,
    pub prev: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_offset_and_limit() {
        let params = ListParams::new(3, 10);
        assert_eq!(params.offset(), 20);
        assert_eq!(params.limit(), 10);
        assert_eq!(ListParams::new(0, 0), ListParams::new(1, 1));
    }

    #[test]
    fn test_parse_page_request() {
        assert_eq!(PageRequest::parse(None), Ok(PageRequest::Number(1)));
        assert_eq!(PageRequest::parse(Some("")), Ok(PageRequest::Number(1)));
        assert_eq!(PageRequest::parse(Some("4")), Ok(PageRequest::Number(4)));
        assert_eq!(PageRequest::parse(Some("last")), Ok(PageRequest::Last));
        assert!(PageRequest::parse(Some("0")).is_err());
        assert!(PageRequest::parse(Some("-1")).is_err());
        assert!(PageRequest::parse(Some("two")).is_err());
    }

    #[test]
    fn test_resolve_page_request() {
        // 25 items, 10 per page -> 3 pages
        assert_eq!(PageRequest::Number(3).resolve(25, 10).unwrap().page, 3);
        assert_eq!(PageRequest::Last.resolve(25, 10).unwrap().page, 3);
        assert!(PageRequest::Number(4).resolve(25, 10).is_err());

        // The first page of an empty listing exists, the second does not
        assert_eq!(PageRequest::Number(1).resolve(0, 10).unwrap().page, 1);
        assert_eq!(PageRequest::Last.resolve(0, 10).unwrap().page, 1);
        assert!(PageRequest::Number(2).resolve(0, 10).is_err());
    }

    #[test]
    fn test_page_info() {
        let params = ListParams::new(2, 10);
        let result = PagedResult::new(vec![1, 2, 3], 23, &params);
        let info = result.page_info();

        assert_eq!(info.num_pages, 3);
        assert_eq!(info.next, Some(3));
        assert_eq!(info.prev, Some(1));
        assert!(info.has_next && info.has_prev);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_every_item_lands_on_exactly_one_page(total in 0i64..500, per_page in 1u32..50) {
            let pages = page_count(total, per_page);
            let covered: i64 = (1..=pages)
                .map(|p| {
                    let params = ListParams::new(p, per_page);
                    (total - params.offset()).clamp(0, params.limit())
                })
                .sum();
            prop_assert_eq!(covered, total);
            prop_assert!(PageRequest::Number(pages).resolve(total, per_page).is_ok());
            prop_assert!(PageRequest::Number(pages + 1).resolve(total, per_page).is_err());
        }
    }
}
