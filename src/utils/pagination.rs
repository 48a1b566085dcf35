//! Page-number pagination shared by the listing endpoints.

use serde::Serialize;
use serde_json::json;

use shelf_http::AppError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 5;

/// 1-indexed page plus page size, both at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: u64, limit: u64) -> Result<Self, AppError> {
        if page == 0 {
            return Err(invalid_param("page"));
        }
        if limit == 0 {
            return Err(invalid_param("limit"));
        }
        Ok(Self { page, limit })
    }

    /// Parse raw query-string values; absent values fall back to the defaults.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Result<Self, AppError> {
        let page = parse_param("page", page, DEFAULT_PAGE)?;
        let limit = parse_param("limit", limit, DEFAULT_LIMIT)?;
        Self::new(page, limit)
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of records before this page.
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn meta(&self, total: u64) -> PageMeta {
        PageMeta {
            total_pages: total.div_ceil(self.limit),
            current_page: self.page,
            next_page_available: total > self.page.saturating_mul(self.limit),
            previous_page_available: self.page > 1,
        }
    }
}

/// Flags derived from the total count and the requested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_pages: u64,
    pub current_page: u64,
    pub next_page_available: bool,
    pub previous_page_available: bool,
}

fn parse_param(name: &str, raw: Option<&str>, default: u64) -> Result<u64, AppError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| invalid_param(name)),
    }
}

fn invalid_param(name: &str) -> AppError {
    AppError::validation(
        vec![json!({"field": name, "error": "must be a positive integer"})],
        format!("{} must be a positive integer", name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page_of_five() {
        let page = Pagination::from_query(None, None).unwrap();
        assert_eq!((page.page(), page.limit(), page.skip()), (1, 5, 0));
    }

    #[test]
    fn skip_is_previous_pages_times_limit() {
        assert_eq!(Pagination::new(3, 10).unwrap().skip(), 20);
    }

    #[test]
    fn flags_follow_total_page_and_limit() {
        for (total, page, limit) in [(0, 1, 5), (5, 1, 5), (6, 1, 5), (11, 2, 5), (11, 3, 5), (7, 9, 1)] {
            let meta = Pagination::new(page, limit).unwrap().meta(total);
            assert_eq!(meta.total_pages, total.div_ceil(limit));
            assert_eq!(meta.current_page, page);
            assert_eq!(meta.next_page_available, total > page * limit);
            assert_eq!(meta.previous_page_available, page > 1);
        }
    }

    #[test]
    fn eleven_items_in_pages_of_five() {
        let meta = Pagination::new(2, 5).unwrap().meta(11);
        assert_eq!(
            meta,
            PageMeta {
                total_pages: 3,
                current_page: 2,
                next_page_available: true,
                previous_page_available: true,
            }
        );
    }

    #[test]
    fn rejects_zero_and_garbage() {
        assert!(Pagination::from_query(Some("0"), None).is_err());
        assert!(Pagination::from_query(None, Some("0")).is_err());
        assert!(Pagination::from_query(Some("two"), None).is_err());
        assert!(Pagination::from_query(Some("-1"), None).is_err());
    }

    #[test]
    fn serializes_camel_case_flags() {
        let value = serde_json::to_value(Pagination::default().meta(6)).unwrap();
        assert_eq!(value["totalPages"], 2);
        assert_eq!(value["nextPageAvailable"], true);
        assert_eq!(value["previousPageAvailable"], false);
    }
}
