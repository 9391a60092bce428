//! HTTP request handlers

use super::sse::{sse_stream, InitState, StreamSources};
use super::types::{
    AdvisorResponse, AlertsQuery, AlertsResponse, ChatRequest, ChatResponse, ErrorResponse,
    GuideQuery, LanguageResponse, LanguagesResponse, ListingsQuery, ListingsResponse,
    RecommendationRequest, SchemesQuery, SetLanguageRequest, SoilReportRequest, SuccessResponse,
    TranscriptResponse, VoicesRequest,
};
use super::AppState;
use crate::db::{Listing, UserProfile};
use crate::language::LANGUAGES;
use crate::market::filter_listings;
use crate::runtime::SubmitError;
use crate::store::{AlertStore, ProfileStore, StoreError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Assistant conversation
        .route("/api/chat", post(send_chat))
        .route("/api/chat/messages", get(get_transcript))
        .route("/api/chat/reset", post(reset_chat))
        .route("/api/stream", get(stream_events))
        // Language and voices
        .route("/api/languages", get(list_languages))
        .route("/api/language", put(set_language))
        .route("/api/voices", put(set_voices))
        // Marketplace
        .route("/api/listings", get(list_listings))
        .route("/api/listings/:id", delete(delete_listing))
        .route("/api/traders", get(list_traders))
        // Profile and alerts
        .route("/api/profile", get(get_profile).put(save_profile))
        .route("/api/alerts", get(get_alerts).delete(clear_alerts))
        // Advisor
        .route("/api/advisor/recommendation", post(crop_recommendation))
        .route("/api/advisor/soil", post(soil_analysis))
        .route("/api/advisor/schemes", get(government_schemes))
        .route("/api/advisor/guide", get(crop_guide))
        .with_state(state)
}

// ============================================================
// Assistant
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<(StatusCode, Json<ChatResponse>), AppError> {
    state.assistant.send_message(&req.text).await?;
    Ok((StatusCode::ACCEPTED, Json(ChatResponse { queued: true })))
}

async fn get_transcript(State(state): State<AppState>) -> Json<TranscriptResponse> {
    Json(TranscriptResponse {
        messages: state.assistant.transcript(),
        phase: state.assistant.phase(),
        language: state.assistant.language().current(),
    })
}

async fn reset_chat(State(state): State<AppState>) -> Result<Json<SuccessResponse>, AppError> {
    state.assistant.reset().await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn stream_events(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before taking the snapshot so nothing falls in between
    let sources = StreamSources {
        assistant: state.assistant.subscribe(),
        screens: state.navigator.subscribe(),
        listings: state.marketplace.subscribe(),
        speech: state.utterances.subscribe(),
    };
    let init = InitState {
        messages: state.assistant.transcript(),
        phase: state.assistant.phase(),
        language: state.assistant.language().current(),
    };
    sse_stream(init, sources)
}

// ============================================================
// Language and voices
// ============================================================

async fn list_languages(State(state): State<AppState>) -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: LANGUAGES.to_vec(),
        current: state.assistant.language().current(),
    })
}

async fn set_language(
    State(state): State<AppState>,
    Json(req): Json<SetLanguageRequest>,
) -> Result<Json<LanguageResponse>, AppError> {
    let language = state
        .assistant
        .language()
        .set(&req.code)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(Json(LanguageResponse { language }))
}

async fn set_voices(
    State(state): State<AppState>,
    Json(req): Json<VoicesRequest>,
) -> Json<SuccessResponse> {
    tracing::debug!(count = req.voices.len(), "Voice catalog updated");
    state.speech.set_voices(req.voices);
    Json(SuccessResponse { success: true })
}

// ============================================================
// Marketplace
// ============================================================

async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingsQuery>,
) -> Result<Json<ListingsResponse>, AppError> {
    let listings = state.marketplace.listings().await?;
    Ok(Json(ListingsResponse {
        listings: apply_query(listings, query.q.as_deref()),
    }))
}

async fn delete_listing(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ListingsResponse>, AppError> {
    let listings = state.marketplace.delete(id).await?;
    Ok(Json(ListingsResponse { listings }))
}

async fn list_traders(
    State(state): State<AppState>,
    Query(query): Query<ListingsQuery>,
) -> Result<Json<ListingsResponse>, AppError> {
    let listings = state.marketplace.trader_listings().await?;
    Ok(Json(ListingsResponse {
        listings: apply_query(listings, query.q.as_deref()),
    }))
}

fn apply_query(listings: Vec<Listing>, query: Option<&str>) -> Vec<Listing> {
    match query {
        Some(q) => filter_listings(listings, q),
        None => listings,
    }
}

// ============================================================
// Profile and alerts
// ============================================================

async fn get_profile(State(state): State<AppState>) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.storage.get_profile().await?))
}

async fn save_profile(
    State(state): State<AppState>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<UserProfile>, AppError> {
    if profile.name.trim().is_empty() {
        return Err(AppError::BadRequest("Profile name is required".to_string()));
    }
    state.storage.save_profile(&profile).await?;
    tracing::info!(name = %profile.name, "Profile saved");
    Ok(Json(profile))
}

/// Cached alerts unless empty or a refresh is requested.
/// An empty fetch keeps the previous feed.
async fn get_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<AlertsResponse>, AppError> {
    let cached = state.storage.get_alerts().await?;
    if !cached.is_empty() && !query.refresh {
        return Ok(Json(AlertsResponse { alerts: cached }));
    }

    let profile = state.storage.get_profile().await?;
    let fetched = state.advisor.farming_alerts(&profile.location).await;
    if fetched.is_empty() {
        return Ok(Json(AlertsResponse { alerts: cached }));
    }
    state.storage.save_alerts(&fetched).await?;
    Ok(Json(AlertsResponse { alerts: fetched }))
}

async fn clear_alerts(State(state): State<AppState>) -> Result<Json<SuccessResponse>, AppError> {
    state.storage.clear_alerts().await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Advisor
// ============================================================

async fn crop_recommendation(
    State(state): State<AppState>,
    Json(req): Json<RecommendationRequest>,
) -> Result<Json<AdvisorResponse>, AppError> {
    if req.soil_type.trim().is_empty() || req.season.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Soil type and season are required".to_string(),
        ));
    }
    let location = match non_empty(req.location) {
        Some(location) => location,
        None => state.storage.get_profile().await?.location,
    };
    let html = state
        .advisor
        .crop_recommendation(&req.soil_type, &req.season, &location)
        .await;
    Ok(Json(AdvisorResponse { html }))
}

async fn soil_analysis(
    State(state): State<AppState>,
    Json(req): Json<SoilReportRequest>,
) -> Result<Json<AdvisorResponse>, AppError> {
    if req.report.trim().is_empty() {
        return Err(AppError::BadRequest("Soil report is empty".to_string()));
    }
    let html = state.advisor.analyze_soil_report(&req.report).await;
    Ok(Json(AdvisorResponse { html }))
}

async fn government_schemes(
    State(state): State<AppState>,
    Query(query): Query<SchemesQuery>,
) -> Result<Json<AdvisorResponse>, AppError> {
    let location = match non_empty(query.location) {
        Some(location) => location,
        None => state.storage.get_profile().await?.location,
    };
    let html = state.advisor.government_schemes(&location).await;
    Ok(Json(AdvisorResponse { html }))
}

async fn crop_guide(
    State(state): State<AppState>,
    Query(query): Query<GuideQuery>,
) -> Result<Json<AdvisorResponse>, AppError> {
    let crop = match non_empty(query.crop) {
        Some(crop) => crop,
        None => non_empty(Some(state.storage.get_profile().await?.primary_crop))
            .unwrap_or_else(|| "Farming".to_string()),
    };
    let html = state
        .advisor
        .crop_guide(&crop, non_empty(query.aspect).as_deref())
        .await;
    Ok(Json(AdvisorResponse { html }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl From<SubmitError> for AppError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Empty => AppError::BadRequest(e.to_string()),
            SubmitError::Busy | SubmitError::Rejected(_) => AppError::Conflict(e.to_string()),
            SubmitError::Stopped => AppError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "Storage failure");
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
