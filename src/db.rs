use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{ListingRecord, ListingStatus, RawTimestamp, Snapshot, UserRecord, UserStatus};
use crate::period::parse_timestamp;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let now = Utc::now();
    let users = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery Lee",
            "avery.lee@biznest.io",
            UserStatus::Active,
            now - Duration::hours(3),
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Jules Moreno",
            "jules.moreno@biznest.io",
            UserStatus::Pending,
            now - Duration::days(2),
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara Patel",
            "kiara.patel@biznest.io",
            UserStatus::Active,
            now - Duration::days(10),
        ),
    ];

    for (id, name, email, status, created_at) in users {
        upsert_user(pool, id, name, email, status, Some(created_at), None).await?;
    }

    let listings = vec![
        (
            "seed-listing-001",
            "Corner Bakery & Cafe",
            ListingStatus::Approved,
            now - Duration::hours(20),
        ),
        (
            "seed-listing-002",
            "Harborview Fitness Studio",
            ListingStatus::Pending,
            now - Duration::days(1),
        ),
        (
            "seed-listing-003",
            "Maple Street Auto Repair",
            ListingStatus::Approved,
            now - Duration::days(9),
        ),
        (
            "seed-listing-004",
            "Bright Smile Dental Practice",
            ListingStatus::Rejected,
            now - Duration::days(4),
        ),
    ];

    for (source_key, title, status, created_at) in listings {
        insert_listing(pool, source_key, title, status, Some(created_at), None).await?;
    }

    Ok(())
}

/// Re-imports refresh name, status and any date the new row carries; a
/// missing date keeps the stored one. `inserted` is false for updates.
const UPSERT_USER_SQL: &str = r#"
    INSERT INTO biznest.users (id, full_name, email, user_status, created_at, join_date)
    VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT (email) DO UPDATE
    SET full_name = EXCLUDED.full_name,
        user_status = EXCLUDED.user_status,
        created_at = COALESCE(EXCLUDED.created_at, users.created_at),
        join_date = COALESCE(EXCLUDED.join_date, users.join_date)
    RETURNING (xmax = 0) AS inserted
    "#;

async fn upsert_user(
    pool: &PgPool,
    id: Uuid,
    full_name: &str,
    email: &str,
    status: UserStatus,
    created_at: Option<DateTime<Utc>>,
    join_date: Option<DateTime<Utc>>,
) -> anyhow::Result<bool> {
    let inserted: bool = sqlx::query(UPSERT_USER_SQL)
        .bind(id)
        .bind(full_name)
        .bind(email)
        .bind(String::from(status))
        .bind(created_at)
        .bind(join_date)
        .fetch_one(pool)
        .await?
        .get("inserted");

    Ok(inserted)
}

async fn insert_listing(
    pool: &PgPool,
    source_key: &str,
    title: &str,
    status: ListingStatus,
    created_at: Option<DateTime<Utc>>,
    listing_date: Option<DateTime<Utc>>,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO biznest.listings
        (id, title, listing_status, created_at, listing_date, source_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(title)
    .bind(String::from(status))
    .bind(created_at)
    .bind(listing_date)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_users(pool: &PgPool) -> anyhow::Result<Vec<UserRecord>> {
    let rows = sqlx::query(
        "SELECT id, full_name, user_status, created_at, join_date FROM biznest.users",
    )
    .fetch_all(pool)
    .await?;

    let mut users = Vec::with_capacity(rows.len());
    for row in rows {
        let created_at: Option<DateTime<Utc>> = row.get("created_at");
        let join_date: Option<DateTime<Utc>> = row.get("join_date");
        let status: String = row.get("user_status");
        users.push(UserRecord {
            id: row.get("id"),
            full_name: row.get("full_name"),
            created_at: created_at.map(RawTimestamp::Instant),
            join_date: join_date.map(RawTimestamp::Instant),
            user_status: UserStatus::from(status),
        });
    }

    Ok(users)
}

pub async fn fetch_listings(pool: &PgPool) -> anyhow::Result<Vec<ListingRecord>> {
    let rows = sqlx::query(
        "SELECT id, title, listing_status, created_at, listing_date FROM biznest.listings",
    )
    .fetch_all(pool)
    .await?;

    let mut listings = Vec::with_capacity(rows.len());
    for row in rows {
        let created_at: Option<DateTime<Utc>> = row.get("created_at");
        let listing_date: Option<DateTime<Utc>> = row.get("listing_date");
        let status: String = row.get("listing_status");
        listings.push(ListingRecord {
            id: row.get("id"),
            title: row.get("title"),
            created_at: created_at.map(RawTimestamp::Instant),
            date: listing_date.map(RawTimestamp::Instant),
            listing_status: ListingStatus::from(status),
        });
    }

    Ok(listings)
}

pub async fn fetch_snapshot(pool: &PgPool) -> anyhow::Result<Snapshot> {
    let users = fetch_users(pool).await.context("failed to fetch users")?;
    let listings = fetch_listings(pool).await.context("failed to fetch listings")?;
    info!(users = users.len(), listings = listings.len(), "loaded dashboard records");
    Ok(Snapshot { users, listings })
}

/// Parses an imported date column; bad values are logged and stored as NULL.
fn import_timestamp(field: &str, value: Option<String>) -> Option<DateTime<Utc>> {
    let text = value.filter(|text| !text.trim().is_empty())?;
    let parsed = parse_timestamp(&RawTimestamp::Text(text.clone()));
    if parsed.is_none() {
        warn!(field, value = %text, "unparseable date in import, storing NULL");
    }
    parsed
}

pub async fn import_users_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        user_status: String,
        created_at: Option<String>,
        join_date: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let created_at = import_timestamp("created_at", row.created_at);
        let join_date = import_timestamp("join_date", row.join_date);

        if upsert_user(
            pool,
            Uuid::new_v4(),
            &row.full_name,
            &row.email,
            UserStatus::from(row.user_status),
            created_at,
            join_date,
        )
        .await?
        {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn import_listings_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        title: String,
        listing_status: String,
        created_at: Option<String>,
        date: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_listing(
            pool,
            &source_key,
            &row.title,
            ListingStatus::from(row.listing_status),
            import_timestamp("created_at", row.created_at),
            import_timestamp("date", row.date),
        )
        .await?
        {
            inserted += 1;
        }
    }

    Ok(inserted)
}
