use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::diary::{DiaryError, DiaryResult, EntryEdit, EntryStore};
use crate::models::{DayWindow, DiaryEntry};

pub struct DiaryRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct DiaryEntryRow {
    id: String,
    day: String,
    date_time: String,
    foods: String,
    stats: String,
}

/// Fixed-width UTC timestamps so text comparison orders them correctly.
fn timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn write_error(err: sqlx::Error, day: NaiveDate) -> DiaryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => DiaryError::DuplicateEntry(day),
        _ => DiaryError::Store(err),
    }
}

impl DiaryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Entries for the days `from..=to`, oldest first. Days are matched on
    /// the calendar date they were logged for.
    pub async fn list_days(&self, from: NaiveDate, to: NaiveDate) -> DiaryResult<Vec<DiaryEntry>> {
        let rows: Vec<DiaryEntryRow> = sqlx::query_as(
            "SELECT id, day, date_time, foods, stats FROM diary_entries WHERE day >= ? AND day <= ? ORDER BY day",
        )
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(hydrate_entry).collect()
    }

    async fn fetch_in_window(
        conn: &mut SqliteConnection,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DiaryResult<Option<DiaryEntry>> {
        let rows: Vec<DiaryEntryRow> = sqlx::query_as(
            "SELECT id, day, date_time, foods, stats FROM diary_entries WHERE date_time >= ? AND date_time < ? ORDER BY date_time, id",
        )
        .bind(timestamp(from))
        .bind(timestamp(to))
        .fetch_all(&mut *conn)
        .await?;

        if rows.len() > 1 {
            tracing::warn!(
                "{} diary entries found between {} and {}, using the first",
                rows.len(),
                timestamp(from),
                timestamp(to)
            );
        }

        rows.into_iter().next().map(hydrate_entry).transpose()
    }

    /// The entry recorded for `window.date`, whatever offset wrote it.
    async fn fetch_day(
        conn: &mut SqliteConnection,
        window: &DayWindow,
    ) -> DiaryResult<Option<DiaryEntry>> {
        let row: Option<DiaryEntryRow> = sqlx::query_as(
            "SELECT id, day, date_time, foods, stats FROM diary_entries WHERE day = ?",
        )
        .bind(window.date.to_string())
        .fetch_optional(&mut *conn)
        .await?;

        let entry = row.map(hydrate_entry).transpose()?;
        if let Some(entry) = &entry {
            if !window.contains(entry.date_time) {
                tracing::debug!(
                    "Diary entry {} was stored under a different UTC offset ({})",
                    entry.date,
                    timestamp(entry.date_time)
                );
            }
        }
        Ok(entry)
    }

    async fn upsert(conn: &mut SqliteConnection, entry: &DiaryEntry) -> DiaryResult<()> {
        let foods = serde_json::to_string(&entry.foods)?;
        let stats = serde_json::to_string(&entry.stats)?;

        sqlx::query(
            r#"
            INSERT INTO diary_entries (id, day, date_time, foods, stats, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                day = excluded.day,
                date_time = excluded.date_time,
                foods = excluded.foods,
                stats = excluded.stats,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.date.to_string())
        .bind(timestamp(entry.date_time))
        .bind(&foods)
        .bind(&stats)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *conn)
        .await
        .map_err(|e| write_error(e, entry.date))?;

        tracing::debug!(
            "Stored diary entry {} ({} item(s))",
            entry.date,
            entry.foods.len()
        );
        Ok(())
    }
}

fn hydrate_entry(row: DiaryEntryRow) -> DiaryResult<DiaryEntry> {
    let id = Uuid::parse_str(&row.id)
        .map_err(|e| DiaryError::CorruptRecord(format!("id '{}': {}", row.id, e)))?;
    let date = NaiveDate::parse_from_str(&row.day, "%Y-%m-%d")
        .map_err(|e| DiaryError::CorruptRecord(format!("day '{}': {}", row.day, e)))?;
    let date_time = DateTime::parse_from_rfc3339(&row.date_time)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DiaryError::CorruptRecord(format!("date_time '{}': {}", row.date_time, e)))?;

    Ok(DiaryEntry {
        id,
        date,
        date_time,
        foods: serde_json::from_str(&row.foods)?,
        stats: serde_json::from_str(&row.stats)?,
    })
}

#[async_trait]
impl EntryStore for DiaryRepository {
    async fn get_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DiaryResult<Option<DiaryEntry>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_in_window(&mut conn, from, to).await
    }

    async fn get_day(&self, window: &DayWindow) -> DiaryResult<Option<DiaryEntry>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_day(&mut conn, window).await
    }

    async fn put(&self, entry: &DiaryEntry) -> DiaryResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert(&mut conn, entry).await
    }

    async fn update(
        &self,
        window: &DayWindow,
        edit: EntryEdit,
    ) -> DiaryResult<Option<DiaryEntry>> {
        let mut tx = self.pool.begin().await?;

        let current = Self::fetch_day(&mut tx, window).await?;
        // Dropping `tx` on error rolls back
        let edited = edit(current)?;

        if let Some(entry) = &edited {
            Self::upsert(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(edited)
    }
}
