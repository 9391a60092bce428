//! One-shot AI helpers behind the home, guide and alerts screens
//!
//! Each call is a single prompt without tools or history. Failures never
//! propagate: the caller gets a fixed fallback text (or an empty alert list).

use crate::db::AlertItem;
use crate::llm::{LlmRequest, LlmResponse};
use crate::runtime::LlmClient;
use serde_json::{json, Value};
use std::sync::Arc;

const CROP_RECOMMENDATION_ERROR: &str =
    "Sorry, I couldn't connect to the AgriAssist AI. Please try again later.";
const CROP_RECOMMENDATION_EMPTY: &str = "Unable to generate recommendation at this time.";
const SOIL_ANALYSIS_ERROR: &str = "Unable to analyze report. Please check your connection.";
const SOIL_ANALYSIS_EMPTY: &str = "Analysis complete.";
const SCHEMES_ERROR: &str = "Could not fetch schemes. Please try again.";
const SCHEMES_EMPTY: &str = "No schemes found at the moment.";
const CROP_GUIDE_ERROR: &str = "Could not generate crop guide.";
const CROP_GUIDE_EMPTY: &str = "Guide unavailable.";

/// Fallback texts for one advisor call
struct Fallback {
    on_error: &'static str,
    on_empty: &'static str,
}

pub struct Advisor {
    llm: Arc<dyn LlmClient>,
}

impl Advisor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Top three crops for the soil, season and place, as an HTML fragment
    pub async fn crop_recommendation(
        &self,
        soil_type: &str,
        season: &str,
        location: &str,
    ) -> String {
        let prompt = format!(
            "Act as an expert agronomist.
I am a farmer with {soil_type} soil in {location} during the {season} season.
Recommend the top 3 best crops for me to grow.
For each crop, provide:
1. Crop Name
2. Brief reason why it fits my soil/weather.
3. Estimated duration to harvest.

Format the output as a clean HTML string (using <ul>, <li>, <strong>, <p> tags only) suitable for displaying inside a card. Do not use markdown code blocks.
Keep it concise and encouraging."
        );
        self.ask(
            "crop_recommendation",
            prompt,
            Fallback {
                on_error: CROP_RECOMMENDATION_ERROR,
                on_empty: CROP_RECOMMENDATION_EMPTY,
            },
        )
        .await
    }

    /// Structured summary of a free-text soil report
    pub async fn analyze_soil_report(&self, report: &str) -> String {
        let prompt = format!(
            "Analyze the following soil details provided by a farmer:
\"{report}\"

Provide a structured summary in HTML format (no markdown blocks):
<h3>Soil Status: [Good/Average/Poor]</h3>
<p>Summary of issues...</p>
<h4>Suggested Actions:</h4>
<ul>
  <li>[Action 1]</li>
  <li>[Action 2]</li>
</ul>
<h4>Suitable Crops:</h4>
<p>[List of crops]</p>"
        );
        self.ask(
            "soil_analysis",
            prompt,
            Fallback {
                on_error: SOIL_ANALYSIS_ERROR,
                on_empty: SOIL_ANALYSIS_EMPTY,
            },
        )
        .await
    }

    pub async fn government_schemes(&self, location: &str) -> String {
        let prompt = format!(
            "List 3 top active government agricultural schemes available for farmers in {location} (India).
Focus on subsidies, insurance, or loans.

Format as a clean HTML list (<ul>, <li>, <strong>, <br>) without markdown blocks.
For each scheme include: Name, Benefit, and How to Apply."
        );
        self.ask(
            "government_schemes",
            prompt,
            Fallback {
                on_error: SCHEMES_ERROR,
                on_empty: SCHEMES_EMPTY,
            },
        )
        .await
    }

    /// Farming guide for a crop; `aspect` narrows it (default "general")
    pub async fn crop_guide(&self, crop: &str, aspect: Option<&str>) -> String {
        let aspect = aspect.filter(|a| !a.trim().is_empty()).unwrap_or("general");
        let prompt = format!(
            "Create a comprehensive farming guide for \"{crop}\".
Focus on aspect: {aspect} (if general, cover all basics).

Include:
1. Best Sowing Time
2. Soil & Water Requirements
3. Fertilizer Schedule
4. Common Disease Management

Format as clean HTML (<h3>, <ul>, <li>, <p>) without markdown blocks."
        );
        self.ask(
            "crop_guide",
            prompt,
            Fallback {
                on_error: CROP_GUIDE_ERROR,
                on_empty: CROP_GUIDE_EMPTY,
            },
        )
        .await
    }

    /// Four alerts for the location. Empty on any failure.
    pub async fn farming_alerts(&self, location: &str) -> Vec<AlertItem> {
        let prompt = format!(
            "Generate 4 realistic farming alerts for a farmer in {location} based on current typical weather patterns for this time of year in India.
Include a mix of Weather, Pest, and Market alerts.

Return JSON only."
        );
        let request = LlmRequest::prompt(prompt).with_response_schema(alert_schema());

        match self.llm.complete(&request).await {
            Ok(response) => parse_alerts(&response),
            Err(e) => {
                tracing::warn!(
                    advisor = "farming_alerts",
                    error = %e.message,
                    "Advisor request failed"
                );
                vec![]
            }
        }
    }

    async fn ask(&self, advisor: &'static str, prompt: String, fallback: Fallback) -> String {
        match self.llm.complete(&LlmRequest::prompt(prompt)).await {
            Ok(response) => response
                .text_opt()
                .unwrap_or_else(|| fallback.on_empty.to_string()),
            Err(e) => {
                tracing::warn!(advisor, error = %e.message, "Advisor request failed");
                fallback.on_error.to_string()
            }
        }
    }
}

fn alert_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "type": { "type": "string", "enum": ["weather", "pest", "market", "irrigation"] },
                "title": { "type": "string" },
                "description": { "type": "string" },
                "severity": { "type": "string", "enum": ["low", "medium", "high"] },
                "date": { "type": "string" }
            },
            "required": ["id", "type", "title", "description", "severity", "date"]
        }
    })
}

fn parse_alerts(response: &LlmResponse) -> Vec<AlertItem> {
    let text = response.text();
    let text = text.trim();
    if text.is_empty() {
        return vec![];
    }
    serde_json::from_str(text).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Discarding malformed alert feed");
        vec![]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AlertKind, Severity};
    use crate::llm::LlmError;
    use crate::runtime::testing::{text_response, MockLlmClient};

    fn advisor_with(llm: MockLlmClient) -> (Advisor, Arc<MockLlmClient>) {
        let llm = Arc::new(llm);
        (Advisor::new(llm.clone()), llm)
    }

    #[tokio::test]
    async fn test_recommendation_returns_model_text() {
        let llm = MockLlmClient::default();
        llm.queue_response(text_response("<ul><li>Soybean</li></ul>"));
        let (advisor, llm) = advisor_with(llm);

        let html = advisor.crop_recommendation("Black", "Kharif", "Nagpur").await;

        assert_eq!(html, "<ul><li>Soybean</li></ul>");
        let request = &llm.recorded_requests()[0];
        assert!(request.tools.is_empty());
        assert!(request.response_schema.is_none());
    }

    #[tokio::test]
    async fn test_fallbacks() {
        let llm = MockLlmClient::default();
        llm.queue_error(LlmError::network("offline"));
        llm.queue_response(text_response("  "));
        llm.queue_error(LlmError::network("offline"));
        llm.queue_error(LlmError::network("offline"));
        let (advisor, _) = advisor_with(llm);

        assert_eq!(advisor.analyze_soil_report("pH 6.5").await, SOIL_ANALYSIS_ERROR);
        assert_eq!(advisor.government_schemes("Nagpur").await, SCHEMES_EMPTY);
        assert_eq!(advisor.crop_guide("Cotton", None).await, CROP_GUIDE_ERROR);
        assert_eq!(
            advisor.crop_recommendation("Red", "Rabi", "Pune").await,
            CROP_RECOMMENDATION_ERROR
        );
    }

    #[tokio::test]
    async fn test_crop_guide_defaults_to_general() {
        let llm = MockLlmClient::default();
        llm.queue_response(text_response("<h3>Cotton</h3>"));
        let (advisor, llm) = advisor_with(llm);

        advisor.crop_guide("Cotton", Some(" ")).await;

        let request = &llm.recorded_requests()[0];
        assert!(prompt_of(request).contains("Focus on aspect: general"));
    }

    #[tokio::test]
    async fn test_alerts_parsed_with_schema() {
        let llm = MockLlmClient::default();
        llm.queue_response(text_response(
            r#"[{"id":"1","type":"pest","title":"Whitefly","description":"Spray neem oil","severity":"high","date":"Today"}]"#,
        ));
        let (advisor, llm) = advisor_with(llm);

        let alerts = advisor.farming_alerts("Nagpur, Maharashtra").await;

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Pest);
        assert_eq!(alerts[0].severity, Severity::High);
        let schema = llm.recorded_requests()[0].response_schema.clone().unwrap();
        // Same lowercase type names as the action parameter schemas
        assert_eq!(schema["type"], "array");
        assert_eq!(schema["items"]["type"], "object");
        assert_eq!(schema["items"]["properties"]["severity"]["type"], "string");
    }

    #[tokio::test]
    async fn test_malformed_alerts_yield_empty_list() {
        let llm = MockLlmClient::default();
        llm.queue_response(text_response("Here are your alerts: none"));
        llm.queue_response(text_response(r#"[{"id":"1","type":"flood"}]"#));
        llm.queue_error(LlmError::network("offline"));
        let (advisor, _) = advisor_with(llm);

        assert!(advisor.farming_alerts("Nagpur").await.is_empty());
        assert!(advisor.farming_alerts("Nagpur").await.is_empty());
        assert!(advisor.farming_alerts("Nagpur").await.is_empty());
    }

    fn prompt_of(request: &LlmRequest) -> String {
        match &request.messages[0].content[0] {
            crate::llm::ContentBlock::Text { text } => text.clone(),
            other => panic!("unexpected block {other:?}"),
        }
    }
}
