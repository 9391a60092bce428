//! Database module
//!
//! Local key-value persistence for the profile, marketplace listings and the
//! cached alert feed.

mod schema;

pub use schema::*;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Raw Documents ====================

    fn get_document<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        let raw: Option<String> = self
            .conn()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;

        // A document that no longer parses is treated as absent
        Ok(raw.and_then(|value| match serde_json::from_str(&value) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding unparsable stored document");
                None
            }
        }))
    }

    fn put_document<T: Serialize + ?Sized>(&self, key: &str, doc: &T) -> DbResult<()> {
        let value = serde_json::to_string(doc)?;
        self.conn().execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove_document(&self, key: &str) -> DbResult<()> {
        self.conn()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    // ==================== Profile ====================

    pub fn get_profile(&self) -> DbResult<UserProfile> {
        Ok(self.get_document(keys::PROFILE)?.unwrap_or_default())
    }

    pub fn save_profile(&self, profile: &UserProfile) -> DbResult<()> {
        self.put_document(keys::PROFILE, profile)
    }

    // ==================== Listings ====================

    /// Buy offers from traders (read-only seed data unless replaced)
    pub fn get_trader_listings(&self) -> DbResult<Vec<Listing>> {
        Ok(self
            .get_document(keys::TRADERS)?
            .unwrap_or_else(default_traders))
    }

    /// Produce listed by farmers, newest first
    pub fn get_farmer_listings(&self) -> DbResult<Vec<Listing>> {
        Ok(self
            .get_document(keys::FARMER_PRODUCE)?
            .unwrap_or_else(default_farmer_produce))
    }

    /// Prepend a listing and return the updated list
    pub fn add_farmer_listing(&self, listing: Listing) -> DbResult<Vec<Listing>> {
        let mut updated = vec![listing];
        updated.extend(self.get_farmer_listings()?);
        self.put_document(keys::FARMER_PRODUCE, &updated)?;
        Ok(updated)
    }

    /// Remove a listing by id and return the updated list
    pub fn delete_farmer_listing(&self, id: i64) -> DbResult<Vec<Listing>> {
        let mut updated = self.get_farmer_listings()?;
        updated.retain(|item| item.id != id);
        self.put_document(keys::FARMER_PRODUCE, &updated)?;
        Ok(updated)
    }

    // ==================== Alerts ====================

    pub fn get_alerts(&self) -> DbResult<Vec<AlertItem>> {
        Ok(self.get_document(keys::ALERTS)?.unwrap_or_default())
    }

    pub fn save_alerts(&self, alerts: &[AlertItem]) -> DbResult<()> {
        self.put_document(keys::ALERTS, alerts)
    }

    pub fn clear_alerts(&self) -> DbResult<()> {
        self.remove_document(keys::ALERTS)
    }
}
