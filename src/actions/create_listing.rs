//! Create-listing action: put the farmer's produce on the marketplace

use super::{Action, ActionContext, ActionDescriptor, ActionResult, ParameterSchema, PropertySpec};
use crate::db::Listing;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

pub const CREATE_LISTING: &str = "add_market_listing";

#[derive(Debug, Deserialize)]
pub struct CreateListingInput {
    pub crop: String,
    /// Rupees per quintal
    pub price: f64,
    #[serde(default)]
    pub quantity: Option<String>,
}

pub struct CreateListingAction;

#[async_trait]
impl Action for CreateListingAction {
    fn descriptor(&self) -> ActionDescriptor {
        ActionDescriptor {
            name: CREATE_LISTING.to_string(),
            description: "List a crop for sale in the marketplace. Use this when the user wants to sell a crop."
                .to_string(),
            parameters: ParameterSchema::new()
                .required(
                    "crop",
                    PropertySpec::string("Name of the crop (e.g., Wheat, Onion)"),
                )
                .required("price", PropertySpec::number("Price per quintal in Rupees"))
                .optional(
                    "quantity",
                    PropertySpec::string("Quantity available (e.g., 10 Quintals)"),
                ),
        }
    }

    async fn run(&self, arguments: Value, ctx: &ActionContext) -> ActionResult {
        let input: CreateListingInput = match serde_json::from_value(arguments) {
            Ok(input) => input,
            Err(e) => return failure(format!("Invalid listing details: {e}")),
        };

        let crop = input.crop.trim();
        if crop.is_empty() {
            return failure("Crop name must not be empty.".to_string());
        }
        if !input.price.is_finite() || input.price <= 0.0 {
            return failure(format!("Price must be a positive number (got {}).", input.price));
        }

        let profile = match ctx.profiles.get_profile().await {
            Ok(profile) => profile,
            Err(e) => return failure(format!("Could not read the farmer profile: {e}")),
        };
        let existing = match ctx.marketplace.listings().await {
            Ok(listings) => listings,
            Err(e) => return failure(format!("Could not read the marketplace: {e}")),
        };

        let price = format_price(input.price);
        let listing = Listing {
            id: next_listing_id(&existing, Utc::now().timestamp_millis()),
            owner_name: profile.name.clone(),
            location: profile.town().to_string(),
            crop: crop.to_string(),
            price: price.clone(),
            distance_label: "0 km".to_string(),
            date: None,
            quantity: input.quantity.filter(|q| !q.trim().is_empty()),
        };

        match ctx.marketplace.add(listing).await {
            Ok(_) => ActionResult::success(
                CREATE_LISTING,
                format!("Successfully listed {crop} for {price}."),
            ),
            Err(e) => failure(format!("Failed to list {crop}: {e}")),
        }
    }
}

fn failure(outcome: String) -> ActionResult {
    ActionResult::failure(CREATE_LISTING, outcome)
}

/// `₹1800/q` for 1800, `₹1850.5/q` for 1850.5
fn format_price(price: f64) -> String {
    format!("₹{price}/q")
}

/// Millisecond timestamp, bumped past any id already in use
fn next_listing_id(existing: &[Listing], now_millis: i64) -> i64 {
    match existing.iter().map(|l| l.id).max() {
        Some(max) if max >= now_millis => max.saturating_add(1),
        _ => now_millis,
    }
}
