use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{ser, Serialize, Serializer};
use serde_json::value::RawValue;
use shared::{StallEvent, StallSize, StallStatus};
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stall {
    pub id: i64,
    pub code: String,
    pub size: StallSize,
    pub location: String,
    #[serde(serialize_with = "serialize_price")]
    pub price: BigDecimal,
    pub status: StallStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stall {
    pub fn to_event(&self) -> StallEvent {
        StallEvent {
            stall_id: self.id,
            code: self.code.clone(),
            status: self.status,
            location: self.location.clone(),
        }
    }
}

/// Writes the price as a JSON number with its stored scale (`500.00`).
fn serialize_price<S>(price: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let number = RawValue::from_string(price.to_string()).map_err(ser::Error::custom)?;
    number.serialize(serializer)
}

/// A validated stall ready for insertion. New stalls always start AVAILABLE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStall {
    pub code: String,
    pub size: StallSize,
    pub location: String,
    pub price: BigDecimal,
}

/// Partial update of the non-status fields; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StallChanges {
    pub code: Option<String>,
    pub size: Option<StallSize>,
    pub location: Option<String>,
    pub price: Option<BigDecimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StallFilter {
    pub status: Option<StallStatus>,
    pub size: Option<StallSize>,
    pub location: Option<String>,
}

impl StallFilter {
    /// The location substring to match, if any. A blank location matches everything.
    pub fn location_pattern(&self) -> Option<&str> {
        self.location
            .as_deref()
            .filter(|location| !location.trim().is_empty())
    }

    pub fn matches(&self, stall: &Stall) -> bool {
        self.status.map_or(true, |status| stall.status == status)
            && self.size.map_or(true, |size| stall.size == size)
            && self.location_pattern().map_or(true, |pattern| {
                stall
                    .location
                    .to_lowercase()
                    .contains(&pattern.to_lowercase())
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Code,
    Location,
    Price,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: SortField::Id,
            direction: SortDirection::Asc,
        }
    }
}

impl FromStr for Sort {
    type Err = String;

    /// Parses `field` or `field,asc|desc`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.split_once(',') {
            Some((field, direction)) => (field.trim(), Some(direction.trim())),
            None => (s.trim(), None),
        };

        let field = match field {
            "id" => SortField::Id,
            "code" => SortField::Code,
            "location" => SortField::Location,
            "price" => SortField::Price,
            "status" => SortField::Status,
            "createdAt" => SortField::CreatedAt,
            "updatedAt" => SortField::UpdatedAt,
            other => return Err(format!("unsupported sort field: {}", other)),
        };

        let direction = match direction.map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(other) => return Err(format!("unsupported sort direction: {}", other)),
        };

        Ok(Self { field, direction })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: Sort,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: Sort::default(),
        }
    }
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: total_elements.div_ceil(u64::from(request.size.max(1))),
        }
    }
}
