use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::diary::{DiaryResult, Preferences};

const WEIGHT_KEY: &str = "weight";

/// Key/value settings that outlive a single day, e.g. the last weight.
pub struct PreferenceRepository {
    pool: SqlitePool,
}

impl PreferenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO preferences (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Preferences for PreferenceRepository {
    async fn last_weight(&self) -> DiaryResult<Option<String>> {
        Ok(self.get(WEIGHT_KEY).await?)
    }

    async fn remember_weight(&self, value: &str) -> DiaryResult<()> {
        self.set(WEIGHT_KEY, value).await?;
        Ok(())
    }
}
