//! Marketplace listings with change notification
//!
//! Every successful mutation is followed by exactly one [`ListingChange`]
//! on the broadcast channel. Subscribers re-read the listings they display.

use crate::db::Listing;
use crate::store::{ListingStore, StoreError};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// A mutation of the farmer listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListingChange {
    Added { id: i64 },
    Removed { id: i64 },
}

pub struct Marketplace {
    store: Arc<dyn ListingStore>,
    changes: broadcast::Sender<ListingChange>,
}

impl Marketplace {
    pub fn new(store: Arc<dyn ListingStore>) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self { store, changes }
    }

    /// Subscribe to listing changes
    pub fn subscribe(&self) -> broadcast::Receiver<ListingChange> {
        self.changes.subscribe()
    }

    pub async fn listings(&self) -> Result<Vec<Listing>, StoreError> {
        self.store.farmer_listings().await
    }

    pub async fn trader_listings(&self) -> Result<Vec<Listing>, StoreError> {
        self.store.trader_listings().await
    }

    /// Persist a new listing and notify subscribers
    pub async fn add(&self, listing: Listing) -> Result<Listing, StoreError> {
        self.store.add_listing(listing.clone()).await?;
        tracing::info!(id = listing.id, crop = %listing.crop, "Listing added");
        self.notify(ListingChange::Added { id: listing.id });
        Ok(listing)
    }

    /// Remove a listing and notify subscribers
    pub async fn delete(&self, id: i64) -> Result<Vec<Listing>, StoreError> {
        let remaining = self.store.delete_listing(id).await?;
        tracing::info!(id, "Listing removed");
        self.notify(ListingChange::Removed { id });
        Ok(remaining)
    }

    fn notify(&self, change: ListingChange) {
        // No subscribers is fine
        let _ = self.changes.send(change);
    }
}

/// Case-insensitive search over crop, location and owner name
pub fn filter_listings(listings: Vec<Listing>, query: &str) -> Vec<Listing> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return listings;
    }
    listings
        .into_iter()
        .filter(|l| {
            l.crop.to_lowercase().contains(&query)
                || l.location.to_lowercase().contains(&query)
                || l.owner_name.to_lowercase().contains(&query)
        })
        .collect()
}
