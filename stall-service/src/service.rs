use crate::domain::{NewStall, Page, PageRequest, Stall, StallChanges, StallFilter};
use crate::error::StallError;
use crate::events::StallEventPublisher;
use crate::lifecycle::{Step, Transition};
use crate::repository::StallRepository;
use shared::StallEventKind;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct StallService {
    repository: Arc<dyn StallRepository>,
    events: Arc<dyn StallEventPublisher>,
}

impl StallService {
    pub fn new(repository: Arc<dyn StallRepository>, events: Arc<dyn StallEventPublisher>) -> Self {
        Self { repository, events }
    }

    pub async fn list(&self, filter: StallFilter, page: PageRequest) -> Result<Page<Stall>, StallError> {
        info!(
            "Fetching stalls with filters - status: {:?}, size: {:?}, location: {:?}",
            filter.status, filter.size, filter.location
        );
        self.repository.list(&filter, &page).await
    }

    pub async fn get(&self, id: i64) -> Result<Stall, StallError> {
        info!("Fetching stall by id: {}", id);
        self.load(id).await
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Stall, StallError> {
        info!("Fetching stall by code: {}", code);
        self.repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| StallError::CodeNotFound(code.to_string()))
    }

    pub async fn create(&self, stall: NewStall) -> Result<Stall, StallError> {
        info!("Creating new stall with code: {}", stall.code);

        if self.repository.find_by_code(&stall.code).await?.is_some() {
            return Err(StallError::DuplicateCode(stall.code));
        }

        let created = self.repository.insert(stall).await?;
        info!("Created stall with id: {}", created.id);
        Ok(created)
    }

    pub async fn update(&self, id: i64, mut changes: StallChanges) -> Result<Stall, StallError> {
        info!("Updating stall with id: {}", id);

        let current = self.load(id).await?;
        match changes.code.take() {
            Some(code) if code != current.code => {
                if self.repository.find_by_code(&code).await?.is_some() {
                    return Err(StallError::DuplicateCode(code));
                }
                changes.code = Some(code);
            }
            _ => {}
        }

        let updated = self
            .repository
            .update(id, changes)
            .await?
            .ok_or(StallError::NotFound(id))?;
        info!("Updated stall with id: {}", updated.id);
        Ok(updated)
    }

    pub async fn hold(&self, id: i64) -> Result<Stall, StallError> {
        self.transition(id, Transition::Hold).await
    }

    pub async fn release(&self, id: i64) -> Result<Stall, StallError> {
        self.transition(id, Transition::Release).await
    }

    pub async fn reserve(&self, id: i64) -> Result<Stall, StallError> {
        self.transition(id, Transition::Reserve).await
    }

    async fn load(&self, id: i64) -> Result<Stall, StallError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(StallError::NotFound(id))
    }

    async fn transition(&self, id: i64, transition: Transition) -> Result<Stall, StallError> {
        info!("Attempting to {} stall with id: {}", transition.action(), id);

        let stall = self.load(id).await?;
        let target = match transition.plan(stall.status)? {
            Step::AlreadyInTarget => {
                info!("Stall {} is already {}", id, transition.outcome());
                return Ok(stall);
            }
            Step::Move(target) => target,
        };

        let updated = match self
            .repository
            .compare_and_set_status(id, stall.status, target)
            .await?
        {
            Some(updated) => updated,
            None => return self.replan_after_conflict(id, transition).await,
        };

        if let Some(kind) = transition.event() {
            self.publish(kind, &updated).await;
        }

        info!("Stall {} {} successfully", id, transition.outcome());
        Ok(updated)
    }

    /// The conditional write lost to a concurrent change; decide again against
    /// the fresh record without writing.
    async fn replan_after_conflict(&self, id: i64, transition: Transition) -> Result<Stall, StallError> {
        let current = self.load(id).await?;
        match transition.plan(current.status)? {
            Step::AlreadyInTarget => {
                info!("Stall {} became {} concurrently", id, transition.outcome());
                Ok(current)
            }
            Step::Move(_) => {
                warn!("Stall {} changed status concurrently during {}", id, transition.action());
                Err(StallError::ConcurrentModification(id))
            }
        }
    }

    /// Best-effort: the committed status change stands even if publishing fails.
    async fn publish(&self, kind: StallEventKind, stall: &Stall) {
        if let Err(e) = self.events.publish(kind, &stall.to_event()).await {
            warn!("Failed to publish {:?} event for stall {}: {:#}", kind, stall.id, e);
        }
    }
}
