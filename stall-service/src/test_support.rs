//! In-memory adapters for exercising the service and router without
//! PostgreSQL or Kafka.

use crate::domain::{
    NewStall, Page, PageRequest, Sort, SortDirection, SortField, Stall, StallChanges, StallFilter,
};
use crate::error::StallError;
use crate::events::StallEventPublisher;
use crate::repository::StallRepository;
use async_trait::async_trait;
use chrono::Utc;
use shared::{StallEvent, StallEventKind, StallStatus};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Stall>,
}

impl Table {
    fn code_taken(&self, code: &str, except: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|stall| stall.code == code && Some(stall.id) != except)
    }
}

/// Mirrors the Diesel repository: ids count up from 1, codes are unique and
/// status writes are conditional on the expected current status.
#[derive(Default)]
pub struct InMemoryStallRepository {
    table: Mutex<Table>,
}

impl InMemoryStallRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a stall directly in the given status, bypassing the lifecycle.
    pub async fn seed(&self, stall: NewStall, status: StallStatus) -> Stall {
        let mut table = self.table.lock().await;
        table.last_id += 1;
        let now = Utc::now();
        let stall = Stall {
            id: table.last_id,
            code: stall.code,
            size: stall.size,
            location: stall.location,
            price: stall.price,
            status,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(stall.id, stall.clone());
        stall
    }
}

fn compare(sort: Sort, a: &Stall, b: &Stall) -> Ordering {
    let ordering = match sort.field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Code => a.code.cmp(&b.code),
        SortField::Location => a.location.cmp(&b.location),
        SortField::Price => a.price.cmp(&b.price),
        SortField::Status => a.status.as_str().cmp(b.status.as_str()),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    };
    let ordering = match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    };
    ordering.then(a.id.cmp(&b.id))
}

#[async_trait]
impl StallRepository for InMemoryStallRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Stall>, StallError> {
        Ok(self.table.lock().await.rows.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Stall>, StallError> {
        let table = self.table.lock().await;
        Ok(table.rows.values().find(|stall| stall.code == code).cloned())
    }

    async fn insert(&self, stall: NewStall) -> Result<Stall, StallError> {
        if self.table.lock().await.code_taken(&stall.code, None) {
            return Err(StallError::DuplicateCode(stall.code));
        }
        Ok(self.seed(stall, StallStatus::Available).await)
    }

    async fn update(&self, id: i64, changes: StallChanges) -> Result<Option<Stall>, StallError> {
        let mut table = self.table.lock().await;
        if let Some(code) = changes.code.as_deref() {
            if table.code_taken(code, Some(id)) {
                return Err(StallError::DuplicateCode(code.to_string()));
            }
        }

        let Some(stall) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(code) = changes.code {
            stall.code = code;
        }
        if let Some(size) = changes.size {
            stall.size = size;
        }
        if let Some(location) = changes.location {
            stall.location = location;
        }
        if let Some(price) = changes.price {
            stall.price = price;
        }
        stall.updated_at = Utc::now();
        Ok(Some(stall.clone()))
    }

    async fn compare_and_set_status(
        &self,
        id: i64,
        from: StallStatus,
        to: StallStatus,
    ) -> Result<Option<Stall>, StallError> {
        let mut table = self.table.lock().await;
        match table.rows.get_mut(&id) {
            Some(stall) if stall.status == from => {
                stall.status = to;
                stall.updated_at = Utc::now();
                Ok(Some(stall.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list(&self, filter: &StallFilter, page: &PageRequest) -> Result<Page<Stall>, StallError> {
        let table = self.table.lock().await;
        let mut matching: Vec<Stall> = table
            .rows
            .values()
            .filter(|stall| filter.matches(stall))
            .cloned()
            .collect();
        matching.sort_by(|a, b| compare(page.sort, a, b));

        let total = matching.len() as u64;
        let content = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.size as usize)
            .collect();
        Ok(Page::new(content, page, total))
    }
}

/// Captures published events; optionally fails every publish after recording it.
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<(StallEventKind, StallEvent)>>,
    fail: bool,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn published(&self) -> Vec<(StallEventKind, StallEvent)> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl StallEventPublisher for RecordingEventPublisher {
    async fn publish(&self, kind: StallEventKind, event: &StallEvent) -> anyhow::Result<()> {
        self.events.lock().await.push((kind, event.clone()));
        if self.fail {
            anyhow::bail!("event bus unavailable");
        }
        Ok(())
    }
}
