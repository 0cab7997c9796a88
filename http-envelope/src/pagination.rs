//! Offset pagination arithmetic
//!
//! A [`PaginationRequest`] is derived from the page/limit query parameters of
//! an incoming request; once the data layer knows the total row count, a
//! [`PaginationDescriptor`] is computed from it and attached to the handler
//! result so the envelope can inline the page counters.
//!
//! # Example
//!
//! ```rust
//! use http_envelope::pagination::{PaginationDescriptor, PaginationRequest};
//!
//! let request = PaginationRequest::compute(Some("2"), Some("10"), 10);
//! assert_eq!(request.offset, 10);
//!
//! let descriptor = PaginationDescriptor::compute(&request, 90);
//! assert_eq!(descriptor.current_page(), 2);
//! assert_eq!(descriptor.total_pages(), 9);
//! assert_eq!(descriptor.next_page(), 3);
//! ```

use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts, Query},
    http::{request::Parts, Uri},
};
use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Names of the query parameters pagination is read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationFields {
    /// Free-text filter parameter
    pub query: String,
    /// Comma-separated sort keys parameter
    pub sort: String,
    /// Page size parameter
    pub limit: String,
    /// One-based page number parameter
    pub page: String,
}

impl Default for PaginationFields {
    fn default() -> Self {
        Self {
            query: "search".to_string(),
            sort: "order".to_string(),
            limit: "page_size".to_string(),
            page: "page".to_string(),
        }
    }
}

/// Pagination parameters of a single request
///
/// When built through [`compute`](Self::compute) or [`from_uri`](Self::from_uri),
/// `limit` is at least 1 and `offset` is `(page - 1) * limit`. The fields are
/// public, so a hand-built value must keep `limit` non-zero itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationRequest {
    /// Free-text filter
    pub query: String,
    /// Sort keys in the order they were given
    pub sort: Vec<String>,
    /// Page size
    pub limit: u64,
    /// Zero-based row offset
    pub offset: u64,
}

impl PaginationRequest {
    /// Compute a request from raw page and limit parameters
    ///
    /// Values that are missing, non-numeric, zero or negative are treated as
    /// absent: the page falls back to 1 and the limit to `default_limit`.
    /// No upper bound is applied to the limit.
    ///
    /// # Example
    ///
    /// ```rust
    /// use http_envelope::pagination::PaginationRequest;
    ///
    /// let request = PaginationRequest::compute(Some("abc"), Some("0"), 25);
    /// assert_eq!(request.limit, 25);
    /// assert_eq!(request.offset, 0);
    /// ```
    #[must_use]
    pub fn compute(raw_page: Option<&str>, raw_limit: Option<&str>, default_limit: u64) -> Self {
        let page = parse_positive(raw_page).unwrap_or(1);
        let limit = parse_positive(raw_limit).unwrap_or(default_limit.max(1));

        Self {
            query: String::new(),
            sort: Vec::new(),
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }

    /// Read pagination parameters from a request URI
    ///
    /// A query string that cannot be decoded is treated as empty.
    #[must_use]
    pub fn from_uri(uri: &Uri, default_limit: u64, fields: &PaginationFields) -> Self {
        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri)
            .unwrap_or_else(|_| Query(HashMap::new()));
        let param = |name: &str| params.get(name).map(String::as_str);

        let mut request = Self::compute(
            param(fields.page.as_str()),
            param(fields.limit.as_str()),
            default_limit,
        );
        request.query = param(fields.query.as_str()).unwrap_or_default().to_string();
        request.sort = split_sort(param(fields.sort.as_str()).unwrap_or_default());
        request
    }

    /// Set the free-text filter
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Set the sort keys
    #[must_use]
    pub fn with_sort(mut self, sort: Vec<String>) -> Self {
        self.sort = sort;
        self
    }

    /// One-based page number this request points at
    #[must_use]
    pub fn page(&self) -> u64 {
        self.offset / self.limit.max(1) + 1
    }
}

impl<S> FromRequestParts<S> for PaginationRequest
where
    S: Send + Sync,
    PaginationConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = PaginationConfig::from_ref(state);
        Ok(Self::from_uri(
            &parts.uri,
            config.default_page_size,
            &config.fields,
        ))
    }
}

/// Page counters rendered into the response envelope
///
/// Only constructed through [`PaginationDescriptor::compute`], so
/// `current_page <= total_pages` and `next_page <= total_pages` always hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationDescriptor {
    page_size: u64,
    current_page: u64,
    #[serde(rename = "total_page")]
    total_pages: u64,
    next_page: u64,
    #[serde(rename = "total_data")]
    total_items: u64,
}

impl PaginationDescriptor {
    /// Compute page counters for `request` against `total_count` rows
    ///
    /// Both `current_page` and `next_page` saturate at `total_pages`: a page
    /// past the end reports the last page, and the last page reports itself
    /// as next. With no rows every counter except `page_size` is 0.
    ///
    /// `request.limit` must be at least 1; [`PaginationRequest`] guarantees
    /// this when built through its constructors.
    #[must_use]
    pub fn compute(request: &PaginationRequest, total_count: u64) -> Self {
        debug_assert!(request.limit > 0, "pagination limit must be at least 1");
        let limit = request.limit.max(1);

        let total_pages = calculate_total_pages(total_count, limit);
        let current_page = (request.offset / limit + 1).min(total_pages);
        let next_page = current_page.saturating_add(1).min(total_pages);

        Self {
            page_size: limit,
            current_page,
            total_pages,
            next_page,
            total_items: total_count,
        }
    }

    /// Number of items per page
    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// One-based current page, 0 when there are no rows
    #[must_use]
    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    /// Total number of pages
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// Page after the current one, saturating at the last page
    #[must_use]
    pub fn next_page(&self) -> u64 {
        self.next_page
    }

    /// Total number of rows across all pages
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.total_items
    }
}

/// Ceiling division without going through floating point
fn calculate_total_pages(total: u64, limit: u64) -> u64 {
    total / limit + u64::from(total % limit > 0)
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

fn split_sort(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_compute_offset_from_page_and_limit() {
        let request = PaginationRequest::compute(Some("2"), Some("10"), 10);
        assert_eq!(request.offset, 10);
        assert_eq!(request.limit, 10);
    }

    #[test]
    fn test_compute_defaults_when_absent() {
        let request = PaginationRequest::compute(None, None, 1);
        assert_eq!(request.offset, 0);
        assert_eq!(request.limit, 1);
    }

    #[test]
    fn test_compute_treats_invalid_values_as_absent() {
        for raw in ["0", "-3", "ten", ""] {
            let request = PaginationRequest::compute(Some(raw), Some(raw), 20);
            assert_eq!(request.limit, 20, "limit for {raw:?}");
            assert_eq!(request.offset, 0, "offset for {raw:?}");
        }
    }

    #[test]
    fn test_compute_zero_default_limit_floors_to_one() {
        let request = PaginationRequest::compute(Some("3"), None, 0);
        assert_eq!(request.limit, 1);
        assert_eq!(request.offset, 2);
    }

    #[test]
    fn test_from_uri_zero_limit_never_reaches_descriptor() {
        let uri: Uri = "/items?page=2&page_size=0".parse().unwrap();
        let request = PaginationRequest::from_uri(&uri, 0, &PaginationFields::default());
        assert_eq!(request.limit, 1);
        assert_eq!(request.offset, 1);

        let descriptor = PaginationDescriptor::compute(&request, 3);
        assert_eq!(descriptor.page_size(), 1);
        assert_eq!(descriptor.current_page(), 2);
        assert_eq!(descriptor.total_pages(), 3);
    }

    #[test]
    fn test_compute_has_no_upper_bound() {
        let request = PaginationRequest::compute(Some("1"), Some("100000"), 10);
        assert_eq!(request.limit, 100_000);
    }

    #[test]
    fn test_compute_saturates_huge_offsets() {
        let request = PaginationRequest::compute(Some(&u64::MAX.to_string()), Some("10"), 10);
        assert_eq!(request.offset, u64::MAX);
    }

    #[test]
    fn test_page_round_trips_through_offset() {
        for limit in 1..=12u64 {
            for page in 1..=30u64 {
                let request = PaginationRequest::compute(
                    Some(&page.to_string()),
                    Some(&limit.to_string()),
                    10,
                );
                assert_eq!(request.offset, (page - 1) * limit);
                assert_eq!(request.page(), page);
            }
        }
    }

    #[test]
    fn test_from_uri_uses_configured_field_names() {
        let fields = PaginationFields::default();
        let request = PaginationRequest::from_uri(
            &uri("/?page=2&page_size=10&search=alice&order=name,-created_at"),
            10,
            &fields,
        );
        assert_eq!(request.offset, 10);
        assert_eq!(request.limit, 10);
        assert_eq!(request.query, "alice");
        assert_eq!(request.sort, vec!["name", "-created_at"]);

        let renamed = PaginationFields {
            limit: "batas".to_string(),
            page: "hal".to_string(),
            ..PaginationFields::default()
        };
        let request = PaginationRequest::from_uri(&uri("/?page=2&page_size=10"), 1, &renamed);
        assert_eq!(request.offset, 0);
        assert_eq!(request.limit, 1);
    }

    #[test]
    fn test_from_uri_without_query_string() {
        let request = PaginationRequest::from_uri(&uri("/users"), 15, &PaginationFields::default());
        assert_eq!(request.limit, 15);
        assert_eq!(request.offset, 0);
        assert!(request.query.is_empty());
        assert!(request.sort.is_empty());
    }

    #[test]
    fn test_descriptor_first_page() {
        let request = PaginationRequest::compute(Some("1"), Some("10"), 10);
        let descriptor = PaginationDescriptor::compute(&request, 90);
        assert_eq!(descriptor.next_page(), 2);
        assert_eq!(descriptor.current_page(), 1);
        assert_eq!(descriptor.total_pages(), 9);
        assert_eq!(descriptor.page_size(), 10);
        assert_eq!(descriptor.total_items(), 90);
    }

    #[test]
    fn test_descriptor_middle_page() {
        let request = PaginationRequest::compute(Some("2"), Some("10"), 10);
        let descriptor = PaginationDescriptor::compute(&request, 90);
        assert_eq!(descriptor.current_page(), 2);
        assert_eq!(descriptor.total_pages(), 9);
        assert_eq!(descriptor.next_page(), 3);
        assert_eq!(descriptor.page_size(), 10);
    }

    #[test]
    fn test_descriptor_partial_last_page() {
        let request = PaginationRequest::compute(Some("3"), Some("5"), 10);
        let descriptor = PaginationDescriptor::compute(&request, 33);
        assert_eq!(descriptor.current_page(), 3);
        assert_eq!(descriptor.total_pages(), 7);
        assert_eq!(descriptor.next_page(), 4);
    }

    #[test]
    fn test_descriptor_last_page_reports_itself_as_next() {
        let request = PaginationRequest::compute(Some("7"), Some("5"), 10);
        let descriptor = PaginationDescriptor::compute(&request, 33);
        assert_eq!(descriptor.current_page(), 7);
        assert_eq!(descriptor.next_page(), 7);
    }

    #[test]
    fn test_descriptor_clamps_page_past_the_end() {
        let request = PaginationRequest::compute(Some("50"), Some("10"), 10);
        let descriptor = PaginationDescriptor::compute(&request, 25);
        assert_eq!(descriptor.total_pages(), 3);
        assert_eq!(descriptor.current_page(), 3);
        assert_eq!(descriptor.next_page(), 3);
    }

    #[test]
    fn test_descriptor_no_rows() {
        let request = PaginationRequest::compute(Some("1"), Some("10"), 10);
        let descriptor = PaginationDescriptor::compute(&request, 0);
        assert_eq!(descriptor.total_pages(), 0);
        assert_eq!(descriptor.current_page(), 0);
        assert_eq!(descriptor.next_page(), 0);
        assert_eq!(descriptor.page_size(), 10);
    }

    #[test]
    fn test_descriptor_bounds_hold() {
        for limit in 1..=9u64 {
            for total in 0..=60u64 {
                for page in 1..=15u64 {
                    let request = PaginationRequest::compute(
                        Some(&page.to_string()),
                        Some(&limit.to_string()),
                        10,
                    );
                    let descriptor = PaginationDescriptor::compute(&request, total);
                    assert_eq!(descriptor.total_pages(), total.div_ceil(limit));
                    assert!(descriptor.current_page() <= descriptor.total_pages());
                    assert!(descriptor.next_page() <= descriptor.total_pages());
                }
            }
        }
    }

    #[test]
    fn test_calculate_total_pages() {
        assert_eq!(calculate_total_pages(0, 20), 0);
        assert_eq!(calculate_total_pages(1, 20), 1);
        assert_eq!(calculate_total_pages(20, 20), 1);
        assert_eq!(calculate_total_pages(21, 20), 2);
        assert_eq!(calculate_total_pages(u64::MAX, 1), u64::MAX);
    }

    #[test]
    fn test_descriptor_wire_field_names() {
        let request = PaginationRequest::compute(Some("2"), Some("10"), 10);
        let json = serde_json::to_value(PaginationDescriptor::compute(&request, 90)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "page_size": 10,
                "current_page": 2,
                "total_page": 9,
                "next_page": 3,
                "total_data": 90
            })
        );
    }

    #[tokio::test]
    async fn test_extractor_reads_state_config() {
        let config = PaginationConfig {
            default_page_size: 5,
            ..PaginationConfig::default()
        };
        let request = axum::http::Request::builder()
            .uri("/items?page=4")
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();

        let pagination = PaginationRequest::from_request_parts(&mut parts, &config)
            .await
            .unwrap();
        assert_eq!(pagination.limit, 5);
        assert_eq!(pagination.offset, 15);
    }
}
