use crate::domain::{
    NewStall, Page, PageRequest, Sort, SortDirection, SortField, Stall, StallChanges, StallFilter,
};
use crate::error::StallError;
use crate::models::{NewStallRow, StallChangeset, StallRow};
use crate::repository::StallRepository;
use crate::schema::stalls;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use shared::StallStatus;
use tracing::debug;

pub type DbPool = Pool<AsyncPgConnection>;

const CODE_UNIQUE_CONSTRAINT: &str = "stalls_code_key";

pub struct DieselStallRepository {
    pool: DbPool,
}

impl DieselStallRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, StallError> {
        self.pool
            .get()
            .await
            .map_err(|e| StallError::Storage(anyhow!("failed to get connection from pool: {}", e)))
    }
}

/// Maps a failed write; a unique violation on the code index becomes `DuplicateCode`.
fn map_write_error(error: DieselError, code: Option<&str>) -> StallError {
    match (&error, code) {
        (DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info), Some(code))
            if info.constraint_name().map_or(true, |name| name == CODE_UNIQUE_CONSTRAINT) =>
        {
            StallError::DuplicateCode(code.to_string())
        }
        _ => map_query_error(error),
    }
}

fn map_query_error(error: DieselError) -> StallError {
    if let DieselError::DatabaseError(kind, info) = &error {
        debug!(?kind, message = info.message(), "diesel operation failed");
    }
    StallError::Storage(anyhow::Error::new(error).context("stall query failed"))
}

fn into_stall(row: StallRow) -> Result<Stall, StallError> {
    Ok(Stall::try_from(row)?)
}

/// Escapes LIKE wildcards so user input matches literally.
fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn filtered(filter: &StallFilter) -> stalls::BoxedQuery<'static, Pg> {
    let mut query = stalls::table.into_boxed();
    if let Some(status) = filter.status {
        query = query.filter(stalls::status.eq(status.as_str()));
    }
    if let Some(size) = filter.size {
        query = query.filter(stalls::size.eq(size.as_str()));
    }
    if let Some(location) = filter.location_pattern() {
        query = query.filter(stalls::location.ilike(like_pattern(location)));
    }
    query
}

macro_rules! order_by {
    ($query:expr, $column:expr, $direction:expr) => {
        match $direction {
            SortDirection::Asc => $query.order_by($column.asc()),
            SortDirection::Desc => $query.order_by($column.desc()),
        }
    };
}

fn ordered(query: stalls::BoxedQuery<'static, Pg>, sort: Sort) -> stalls::BoxedQuery<'static, Pg> {
    let query = match sort.field {
        SortField::Id => order_by!(query, stalls::id, sort.direction),
        SortField::Code => order_by!(query, stalls::code, sort.direction),
        SortField::Location => order_by!(query, stalls::location, sort.direction),
        SortField::Price => order_by!(query, stalls::price, sort.direction),
        SortField::Status => order_by!(query, stalls::status, sort.direction),
        SortField::CreatedAt => order_by!(query, stalls::created_at, sort.direction),
        SortField::UpdatedAt => order_by!(query, stalls::updated_at, sort.direction),
    };
    query.then_order_by(stalls::id.asc())
}

#[async_trait]
impl StallRepository for DieselStallRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Stall>, StallError> {
        let mut conn = self.connection().await?;
        stalls::table
            .find(id)
            .first::<StallRow>(&mut conn)
            .await
            .optional()
            .map_err(map_query_error)?
            .map(into_stall)
            .transpose()
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Stall>, StallError> {
        let mut conn = self.connection().await?;
        stalls::table
            .filter(stalls::code.eq(code))
            .first::<StallRow>(&mut conn)
            .await
            .optional()
            .map_err(map_query_error)?
            .map(into_stall)
            .transpose()
    }

    async fn insert(&self, stall: NewStall) -> Result<Stall, StallError> {
        let mut conn = self.connection().await?;
        let new_row = NewStallRow::from(stall);
        let row = diesel::insert_into(stalls::table)
            .values(&new_row)
            .get_result::<StallRow>(&mut conn)
            .await
            .map_err(|e| map_write_error(e, Some(&new_row.code)))?;
        into_stall(row)
    }

    async fn update(&self, id: i64, changes: StallChanges) -> Result<Option<Stall>, StallError> {
        let mut conn = self.connection().await?;
        let changeset = StallChangeset::from(changes);
        diesel::update(stalls::table.find(id))
            .set(&changeset)
            .get_result::<StallRow>(&mut conn)
            .await
            .optional()
            .map_err(|e| map_write_error(e, changeset.code.as_deref()))?
            .map(into_stall)
            .transpose()
    }

    async fn compare_and_set_status(
        &self,
        id: i64,
        from: StallStatus,
        to: StallStatus,
    ) -> Result<Option<Stall>, StallError> {
        let mut conn = self.connection().await?;
        diesel::update(
            stalls::table
                .filter(stalls::id.eq(id))
                .filter(stalls::status.eq(from.as_str())),
        )
        .set((
            stalls::status.eq(to.as_str()),
            stalls::updated_at.eq(Utc::now()),
        ))
        .get_result::<StallRow>(&mut conn)
        .await
        .optional()
        .map_err(map_query_error)?
        .map(into_stall)
        .transpose()
    }

    async fn list(&self, filter: &StallFilter, page: &PageRequest) -> Result<Page<Stall>, StallError> {
        let mut conn = self.connection().await?;

        let total = filtered(filter)
            .count()
            .get_result::<i64>(&mut conn)
            .await
            .map_err(map_query_error)?;

        let rows = ordered(filtered(filter), page.sort)
            .limit(page.limit())
            .offset(page.offset())
            .load::<StallRow>(&mut conn)
            .await
            .map_err(map_query_error)?;

        let content = rows
            .into_iter()
            .map(into_stall)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(content, page, u64::try_from(total).unwrap_or_default()))
    }
}
