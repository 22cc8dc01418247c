use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A creation timestamp as it arrives from upstream: either already typed
/// (database rows), raw text (snapshot files, CSV imports), or any other
/// JSON value, which never resolves to a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Instant(DateTime<Utc>),
    Text(String),
    Other(serde_json::Value),
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        RawTimestamp::Instant(value)
    }
}

impl From<&str> for RawTimestamp {
    fn from(value: &str) -> Self {
        RawTimestamp::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserStatus {
    Pending,
    Active,
    Rejected,
    Unrecognized(String),
}

impl From<String> for UserStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => UserStatus::Pending,
            "ACTIVE" => UserStatus::Active,
            "REJECTED" => UserStatus::Rejected,
            _ => UserStatus::Unrecognized(value),
        }
    }
}

impl From<UserStatus> for String {
    fn from(value: UserStatus) -> Self {
        match value {
            UserStatus::Pending => "PENDING".to_string(),
            UserStatus::Active => "ACTIVE".to_string(),
            UserStatus::Rejected => "REJECTED".to_string(),
            UserStatus::Unrecognized(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
    Unrecognized(String),
}

impl From<String> for ListingStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => ListingStatus::Pending,
            "APPROVED" => ListingStatus::Approved,
            "REJECTED" => ListingStatus::Rejected,
            _ => ListingStatus::Unrecognized(value),
        }
    }
}

impl From<ListingStatus> for String {
    fn from(value: ListingStatus) -> Self {
        match value {
            ListingStatus::Pending => "PENDING".to_string(),
            ListingStatus::Approved => "APPROVED".to_string(),
            ListingStatus::Rejected => "REJECTED".to_string(),
            ListingStatus::Unrecognized(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: Uuid,
    pub full_name: String,
    #[serde(default)]
    pub created_at: Option<RawTimestamp>,
    #[serde(default)]
    pub join_date: Option<RawTimestamp>,
    pub user_status: UserStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<RawTimestamp>,
    #[serde(default)]
    pub date: Option<RawTimestamp>,
    pub listing_status: ListingStatus,
}

/// Everything the aggregator needs, as loaded from Postgres or a snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub listings: Vec<ListingRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthResult {
    pub percentage: u32,
    pub is_increase: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
    pub week_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub day_of_week: u32,
    pub day_name: &'static str,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub id: String,
    pub text: String,
    pub time: String,
    pub color: &'static str,
    #[serde(skip)]
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    User,
    Listing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "raw", rename_all = "camelCase")]
pub enum SkipReason {
    MissingDate,
    UnparseableDate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub kind: RecordKind,
    pub id: Uuid,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub skipped: Vec<SkippedRecord>,
    #[serde(skip)]
    seen: HashSet<(RecordKind, Uuid)>,
}

impl Diagnostics {
    /// Records a skipped record once, however many stages drop it.
    pub fn skip(&mut self, kind: RecordKind, id: Uuid, reason: SkipReason) {
        if !self.seen.insert((kind, id)) {
            return;
        }
        self.skipped.push(SkippedRecord { kind, id, reason });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUsersPoint {
    pub day: &'static str,
    pub users: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalSegment {
    pub name: &'static str,
    pub value: u32,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyListingsPoint {
    pub week: String,
    #[serde(rename = "Active")]
    pub active: u32,
    #[serde(rename = "Waiting Approval")]
    pub waiting_approval: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingStats {
    #[serde(flatten)]
    pub growth: GrowthResult,
    pub active_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub generated_at: DateTime<Utc>,
    pub total_users: usize,
    pub user_growth: GrowthResult,
    pub listing_stats: ListingStats,
    pub new_users_data: Vec<NewUsersPoint>,
    pub user_approval_data: Vec<ApprovalSegment>,
    pub business_listings_data: Vec<WeeklyListingsPoint>,
    pub recent_activity: Vec<ActivityEntry>,
    pub diagnostics: Diagnostics,
}
