use serde::Deserialize;
use utoipa::ToSchema;

use crate::response::Meta;

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self { page, per_page }
    }

    /// `(page, per_page, offset)` with page ≥ 1 and per_page in `1..=100`.
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }

    /// `(skip, limit)` for slicing in-memory collections.
    pub fn window(&self) -> (usize, usize) {
        let (_, per_page, offset) = self.normalize();
        (offset as usize, per_page as usize)
    }

    pub fn meta(&self, total: usize) -> Meta {
        let (page, per_page, _) = self.normalize();
        Meta::new(page, per_page, total as i64)
    }
}
