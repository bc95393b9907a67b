use crate::domain::{NewStall, Stall, StallChanges};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use shared::StallStatus;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::stalls)]
pub struct StallRow {
    pub id: i64,
    pub code: String,
    pub size: String,
    pub location: String,
    pub price: BigDecimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::stalls)]
pub struct NewStallRow {
    pub code: String,
    pub size: String,
    pub location: String,
    pub price: BigDecimal,
    pub status: String,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::stalls)]
pub struct StallChangeset {
    pub code: Option<String>,
    pub size: Option<String>,
    pub location: Option<String>,
    pub price: Option<BigDecimal>,
    pub updated_at: DateTime<Utc>,
}

impl From<NewStall> for NewStallRow {
    fn from(stall: NewStall) -> Self {
        Self {
            code: stall.code,
            size: stall.size.as_str().to_string(),
            location: stall.location,
            price: stall.price,
            status: StallStatus::Available.as_str().to_string(),
        }
    }
}

impl From<StallChanges> for StallChangeset {
    fn from(changes: StallChanges) -> Self {
        Self {
            code: changes.code,
            size: changes.size.map(|size| size.as_str().to_string()),
            location: changes.location,
            price: changes.price,
            updated_at: Utc::now(),
        }
    }
}

impl TryFrom<StallRow> for Stall {
    type Error = anyhow::Error;

    fn try_from(row: StallRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            code: row.code,
            size: row.size.parse()?,
            location: row.location,
            price: row.price,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
