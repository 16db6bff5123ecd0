use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub page_index: Option<i64>,
    pub items_per_page: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn new(page_index: i64, items_per_page: i64, total: i64) -> Self {
        Self {
            page_index: Some(page_index),
            items_per_page: Some(items_per_page),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self {
            page_index: None,
            items_per_page: None,
            total: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

/// One page of a listing together with the size of the unpaginated result.
#[derive(Debug, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page_index: i64,
    pub items_per_page: i64,
}

impl<T: Serialize> Page<T> {
    pub fn meta(&self) -> Meta {
        Meta::new(self.page_index, self.items_per_page, self.total)
    }
}
