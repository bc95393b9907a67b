use crate::domain::{NewStall, Page, PageRequest, Stall, StallChanges, StallFilter};
use crate::error::StallError;
use async_trait::async_trait;
use shared::StallStatus;

#[async_trait]
pub trait StallRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Stall>, StallError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Stall>, StallError>;

    /// Inserts an AVAILABLE stall. Fails with `DuplicateCode` when the code is taken.
    async fn insert(&self, stall: NewStall) -> Result<Stall, StallError>;

    /// Applies the changes and bumps `updated_at`. `None` when the id is unknown.
    async fn update(&self, id: i64, changes: StallChanges) -> Result<Option<Stall>, StallError>;

    /// Sets the status to `to` only while the stored status is still `from`,
    /// as a single conditional write. `None` when no row matched.
    async fn compare_and_set_status(
        &self,
        id: i64,
        from: StallStatus,
        to: StallStatus,
    ) -> Result<Option<Stall>, StallError>;

    async fn list(&self, filter: &StallFilter, page: &PageRequest) -> Result<Page<Stall>, StallError>;
}
