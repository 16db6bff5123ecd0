use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::models::OrderStatus;

pub const DEFAULT_ITEMS_PER_PAGE: i64 = 10;
pub const MAX_ITEMS_PER_PAGE: i64 = 100;
/// Largest page index whose offset still fits an `i64` at the widest page.
pub const MAX_PAGE_INDEX: i64 = i64::MAX / MAX_ITEMS_PER_PAGE;

/// Query-string pagination. `page_index` is 0-based.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub page_index: Option<i64>,
    pub items_per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> PageWindow {
        let page_index = self.page_index.unwrap_or(0).clamp(0, MAX_PAGE_INDEX);
        let items_per_page = self
            .items_per_page
            .unwrap_or(DEFAULT_ITEMS_PER_PAGE)
            .clamp(1, MAX_ITEMS_PER_PAGE);
        PageWindow {
            page_index,
            items_per_page,
        }
    }
}

/// A resolved page request. `items_per_page == 0` selects every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page_index: i64,
    pub items_per_page: i64,
}

impl PageWindow {
    pub fn new(page_index: i64, items_per_page: i64) -> Self {
        Self {
            page_index: page_index.max(0),
            items_per_page: items_per_page.max(0),
        }
    }

    pub fn all() -> Self {
        Self {
            page_index: 0,
            items_per_page: 0,
        }
    }

    pub fn limit(&self) -> Option<i64> {
        (self.items_per_page > 0).then_some(self.items_per_page)
    }

    /// Rows to skip. Saturates so a far-out page reads as empty.
    pub fn offset(&self) -> i64 {
        self.page_index.saturating_mul(self.items_per_page)
    }
}

/// Order listing filters. Flat: url-encoded numbers break under `#[serde(flatten)]`.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page_index: Option<i64>,
    pub items_per_page: Option<i64>,
    pub status: Option<OrderStatus>,
}

impl OrderListQuery {
    pub fn window(&self) -> PageWindow {
        Pagination {
            page_index: self.page_index,
            items_per_page: self.items_per_page,
        }
        .normalize()
    }
}
