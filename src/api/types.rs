//! Request and response types for the API

use crate::db::{AlertItem, Listing};
use crate::history::DisplayMessage;
use crate::language::Language;
use crate::speech::Voice;
use crate::state_machine::Phase;
use serde::{Deserialize, Serialize};

// ============================================================
// Chat
// ============================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub queued: bool,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub messages: Vec<DisplayMessage>,
    pub phase: Phase,
    pub language: Language,
}

// ============================================================
// Language and voices
// ============================================================

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub languages: Vec<Language>,
    pub current: Language,
}

#[derive(Debug, Deserialize)]
pub struct SetLanguageRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct LanguageResponse {
    pub language: Language,
}

#[derive(Debug, Deserialize)]
pub struct VoicesRequest {
    pub voices: Vec<Voice>,
}

// ============================================================
// Marketplace and alerts
// ============================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListingsQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListingsResponse {
    pub listings: Vec<Listing>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<AlertItem>,
}

// ============================================================
// Advisor
// ============================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub soil_type: String,
    pub season: String,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SoilReportRequest {
    pub report: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SchemesQuery {
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GuideQuery {
    pub crop: Option<String>,
    pub aspect: Option<String>,
}

/// HTML fragment produced by an advisor call
#[derive(Debug, Serialize)]
pub struct AdvisorResponse {
    pub html: String,
}

// ============================================================
// Generic
// ============================================================

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
