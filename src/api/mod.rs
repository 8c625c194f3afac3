pub mod handlers;
pub mod router;

use axum::Json;
use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 500;

/// Response envelope shared by every JSON endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

/// `?limit=&offset=` with sane bounds.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        let page = Page::default();
        assert_eq!((page.limit(), page.offset()), (100, 0));

        let page = Page {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!((page.limit(), page.offset()), (500, 0));

        let page = Page {
            limit: Some(0),
            offset: Some(20),
        };
        assert_eq!((page.limit(), page.offset()), (1, 20));
    }
}
