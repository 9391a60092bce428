//! Storage abstractions over the local key-value database
//!
//! These traits let actions and the marketplace run against mock stores in
//! tests.

use crate::db::{AlertItem, Database, DbError, Listing, UserProfile};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Storage unavailable: {0}")]
    #[allow(dead_code)] // Constructed by test stores
    Unavailable(String),
}

/// The farmer profile
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self) -> Result<UserProfile, StoreError>;

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), StoreError>;
}

/// Marketplace listings
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Produce listed by farmers, newest first
    async fn farmer_listings(&self) -> Result<Vec<Listing>, StoreError>;

    /// Prepend a listing, returning the updated list
    async fn add_listing(&self, listing: Listing) -> Result<Vec<Listing>, StoreError>;

    /// Remove a listing by id, returning the updated list
    async fn delete_listing(&self, id: i64) -> Result<Vec<Listing>, StoreError>;

    /// Buy offers from traders
    async fn trader_listings(&self) -> Result<Vec<Listing>, StoreError>;
}

/// Cached alert feed
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn get_alerts(&self) -> Result<Vec<AlertItem>, StoreError>;

    async fn save_alerts(&self, alerts: &[AlertItem]) -> Result<(), StoreError>;

    async fn clear_alerts(&self) -> Result<(), StoreError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ProfileStore + ?Sized> ProfileStore for Arc<T> {
    async fn get_profile(&self) -> Result<UserProfile, StoreError> {
        (**self).get_profile().await
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        (**self).save_profile(profile).await
    }
}

#[async_trait]
impl<T: ListingStore + ?Sized> ListingStore for Arc<T> {
    async fn farmer_listings(&self) -> Result<Vec<Listing>, StoreError> {
        (**self).farmer_listings().await
    }

    async fn add_listing(&self, listing: Listing) -> Result<Vec<Listing>, StoreError> {
        (**self).add_listing(listing).await
    }

    async fn delete_listing(&self, id: i64) -> Result<Vec<Listing>, StoreError> {
        (**self).delete_listing(id).await
    }

    async fn trader_listings(&self) -> Result<Vec<Listing>, StoreError> {
        (**self).trader_listings().await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

/// Adapter to use Database as the profile, listing and alert store
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for DatabaseStorage {
    async fn get_profile(&self) -> Result<UserProfile, StoreError> {
        Ok(self.db.get_profile()?)
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        Ok(self.db.save_profile(profile)?)
    }
}

#[async_trait]
impl ListingStore for DatabaseStorage {
    async fn farmer_listings(&self) -> Result<Vec<Listing>, StoreError> {
        Ok(self.db.get_farmer_listings()?)
    }

    async fn add_listing(&self, listing: Listing) -> Result<Vec<Listing>, StoreError> {
        Ok(self.db.add_farmer_listing(listing)?)
    }

    async fn delete_listing(&self, id: i64) -> Result<Vec<Listing>, StoreError> {
        Ok(self.db.delete_farmer_listing(id)?)
    }

    async fn trader_listings(&self) -> Result<Vec<Listing>, StoreError> {
        Ok(self.db.get_trader_listings()?)
    }
}

#[async_trait]
impl AlertStore for DatabaseStorage {
    async fn get_alerts(&self) -> Result<Vec<AlertItem>, StoreError> {
        Ok(self.db.get_alerts()?)
    }

    async fn save_alerts(&self, alerts: &[AlertItem]) -> Result<(), StoreError> {
        Ok(self.db.save_alerts(alerts)?)
    }

    async fn clear_alerts(&self) -> Result<(), StoreError> {
        Ok(self.db.clear_alerts()?)
    }
}
