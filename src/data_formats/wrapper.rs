use serde::{Deserialize, Serialize};

use super::PageWindow;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListWrapper<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> ListWrapper<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total: i64) -> ListWrapper<T> {
        let limit = window.limit as i64;
        ListWrapper {
            items,
            pagination: Pagination {
                page: window.page,
                limit: window.limit,
                total,
                total_pages: (total + limit - 1) / limit,
            },
        }
    }
}
