use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::SortPreference;

/// Storage key for the serialized sort preference.
pub const SORT_PREFERENCE_KEY: &str = "escola_sort_preference";

/// Persists the user's last sort choice across sessions.
///
/// `get` never fails: missing or unreadable values fall back to
/// [`SortPreference::default`].
#[async_trait]
pub trait SortPreferenceStore: Send + Sync {
    async fn get(&self) -> SortPreference;
    async fn set(&self, pref: &SortPreference) -> Result<(), AppError>;
}

fn decode(raw: Option<&str>) -> SortPreference {
    match raw {
        None => SortPreference::default(),
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!("stored sort preference is unreadable ({}), using default", e);
            SortPreference::default()
        }),
    }
}

pub struct SqlitePreferenceStore {
    db: SqlitePool,
}

impl SqlitePreferenceStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Opens (creating if needed) the database at `url` and applies migrations.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::new(pool))
    }

    async fn load_raw(&self) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT value FROM preferences WHERE key = ?")
            .bind(SORT_PREFERENCE_KEY)
            .fetch_optional(&self.db)
            .await
    }

    /// Writes a raw value under the preference key, bypassing serialization.
    pub async fn store_raw(&self, value: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO preferences (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE \
             SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(SORT_PREFERENCE_KEY)
        .bind(value)
        .bind(now)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SortPreferenceStore for SqlitePreferenceStore {
    async fn get(&self) -> SortPreference {
        match self.load_raw().await {
            Ok(raw) => decode(raw.as_deref()),
            Err(e) => {
                warn!("failed to read sort preference: {}", e);
                SortPreference::default()
            }
        }
    }

    async fn set(&self, pref: &SortPreference) -> Result<(), AppError> {
        let value = serde_json::to_string(pref)?;
        self.store_raw(&value).await?;
        debug!("sort preference saved: {}", value);
        Ok(())
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    raw: Mutex<Option<String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.raw
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SortPreferenceStore for MemoryPreferenceStore {
    async fn get(&self) -> SortPreference {
        decode(self.raw().as_deref())
    }

    async fn set(&self, pref: &SortPreference) -> Result<(), AppError> {
        let value = serde_json::to_string(pref)?;
        *self.raw.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        Ok(())
    }
}
