//! Database schema and stored document types

use serde::{Deserialize, Serialize};

/// SQL schema for initialization
///
/// Every document lives under a fixed key as JSON, mirroring the
/// per-device key-value storage the web client was built around.
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Storage keys
pub mod keys {
    pub const PROFILE: &str = "agriassist_profile";
    /// Traders looking to buy (shown to farmers)
    pub const TRADERS: &str = "agriassist_traders";
    /// Farmers selling crops (shown to consumers)
    pub const FARMER_PRODUCE: &str = "agriassist_farmer_produce";
    pub const ALERTS: &str = "agriassist_alerts";
}

/// The farmer using this device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub farmer_id: String,
    pub location: String,
    pub land_area: String,
    pub primary_crop: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "Rajesh Kumar".to_string(),
            farmer_id: "#AGRI-8821".to_string(),
            location: "Nagpur, Maharashtra".to_string(),
            land_area: "5.2 Acres".to_string(),
            primary_crop: "Cotton".to_string(),
        }
    }
}

impl UserProfile {
    /// Town part of the location ("Nagpur" for "Nagpur, Maharashtra")
    pub fn town(&self) -> &str {
        self.location
            .split(',')
            .next()
            .map_or("", str::trim)
    }
}

/// A marketplace listing, either a trader's buy offer or a farmer's produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    #[serde(rename = "name")]
    pub owner_name: String,
    pub location: String,
    pub crop: String,
    /// Display price, e.g. `₹1,200/q`
    pub price: String,
    #[serde(rename = "distance")]
    pub distance_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
}

impl Listing {
    fn seeded(
        id: i64,
        owner_name: &str,
        location: &str,
        crop: &str,
        price: &str,
        distance_label: &str,
        date: &str,
    ) -> Self {
        Self {
            id,
            owner_name: owner_name.to_string(),
            location: location.to_string(),
            crop: crop.to_string(),
            price: price.to_string(),
            distance_label: distance_label.to_string(),
            date: Some(date.to_string()),
            quantity: None,
        }
    }
}

pub fn default_traders() -> Vec<Listing> {
    vec![
        Listing::seeded(1, "Fresh Agro Traders", "Nashik, MH", "Onion", "₹1,200/q", "12 km", "Yesterday"),
        Listing::seeded(2, "Global Grain Exports", "Pune, MH", "Wheat", "₹2,650/q", "45 km", "2 Oct"),
        Listing::seeded(3, "Organic Hub", "Mumbai, MH", "Tomato", "₹3,000/q", "120 km", "1 Oct"),
    ]
}

pub fn default_farmer_produce() -> Vec<Listing> {
    vec![
        Listing::seeded(101, "Rajesh Kumar", "Nagpur", "Fresh Cotton", "₹5,500/q", "5 km", "Today"),
        Listing::seeded(102, "Suresh Patil", "Solapur", "Pomegranate", "₹8,000/q", "150 km", "Yesterday"),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Weather,
    Pest,
    Market,
    Irrigation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A farming alert generated for the farmer's location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub date: String,
}
