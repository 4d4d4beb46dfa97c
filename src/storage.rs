use crate::models::{UserHistory, UserStats};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::{path::Path, sync::Arc};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Журнал запросов: только дописываем, читаем статистику и историю.
#[async_trait]
pub trait UsageLog: Send + Sync {
    async fn add_request(&self, user_id: u64, movie: &str, date: i64) -> Result<(), StorageError>;
    async fn stats(&self, user_id: u64) -> Result<UserStats, StorageError>;
    async fn history(&self, user_id: u64) -> Result<UserHistory, StorageError>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS Bebrabot_users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        movie TEXT NOT NULL,
        date INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_bebrabot_users_user_id ON Bebrabot_users(user_id);
";

/// Одно соединение на весь процесс; доступ сериализуется мьютексом,
/// а сами запросы выполняются в blocking-пуле tokio.
#[derive(Clone)]
pub struct SqliteUsageLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUsageLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::init(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone().lock_owned().await;
        Ok(tokio::task::spawn_blocking(move || f(&conn)).await??)
    }
}

#[async_trait]
impl UsageLog for SqliteUsageLog {
    async fn add_request(&self, user_id: u64, movie: &str, date: i64) -> Result<(), StorageError> {
        let movie = movie.to_string();
        self.with_conn(move |conn| {
            // autocommit: каждая запись сразу на диске
            conn.execute(
                "INSERT INTO Bebrabot_users (user_id, movie, date) VALUES (?1, ?2, ?3)",
                params![user_id as i64, movie, date],
            )?;
            Ok(())
        })
        .await
    }

    async fn stats(&self, user_id: u64) -> Result<UserStats, StorageError> {
        let counts = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT movie, COUNT(*) FROM Bebrabot_users
                     WHERE user_id = ?1 GROUP BY movie ORDER BY MIN(id)",
                )?;
                let rows = stmt.query_map(params![user_id as i64], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await?;
        Ok(UserStats::from_counts(counts))
    }

    async fn history(&self, user_id: u64) -> Result<UserHistory, StorageError> {
        let requests = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT date, movie FROM Bebrabot_users WHERE user_id = ?1 ORDER BY id",
                )?;
                let rows = stmt.query_map(params![user_id as i64], |row| Ok((row.get(0)?, row.get(1)?)))?;
                rows.collect::<rusqlite::Result<Vec<(i64, String)>>>()
            })
            .await?;
        let num_requests = requests.len() as u64;
        Ok(UserHistory { requests, num_requests })
    }
}
