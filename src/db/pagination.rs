use serde::{Deserialize, Serialize};

use crate::config;

/// `page`/`limit` query parameters shared by every list endpoint.
/// Pages are 1-based; `limit` is clamped to the configured maximum.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        let api = &config::config().api;
        self.limit
            .unwrap_or(api.default_page_size)
            .clamp(1, api.max_page_size)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

/// Paginated response envelope: `pages == ceil(total / limit)`.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: &PageParams) -> Self {
        let limit = params.limit();
        Self {
            items,
            total,
            page: params.page(),
            pages: pages_for(total, limit),
            limit,
        }
    }
}

fn pages_for(total: i64, limit: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_and_limit_defaults() {
        let params = PageParams { page: None, limit: None };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), config::config().api.default_page_size);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn limit_is_clamped() {
        let max = config::config().api.max_page_size;
        let params = PageParams { page: Some(2), limit: Some(max + 500) };
        assert_eq!(params.limit(), max);
        assert_eq!(params.offset(), max);

        let params = PageParams { page: Some(0), limit: Some(-5) };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 1);
    }

    #[test]
    fn pages_is_ceil_of_total_over_limit() {
        assert_eq!(pages_for(0, 20), 0);
        assert_eq!(pages_for(1, 20), 1);
        assert_eq!(pages_for(20, 20), 1);
        assert_eq!(pages_for(21, 20), 2);
        assert_eq!(pages_for(199, 20), 10);
    }
}
