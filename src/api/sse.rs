//! Server-Sent Events support
//!
//! One stream per client merges the assistant events with the side channels
//! the actions and speech controller publish on.

use crate::actions::Screen;
use crate::history::DisplayMessage;
use crate::language::Language;
use crate::market::ListingChange;
use crate::runtime::AssistantEvent;
use crate::speech::Utterance;
use crate::state_machine::Phase;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Snapshot sent as the first event of every stream
pub struct InitState {
    pub messages: Vec<DisplayMessage>,
    pub phase: Phase,
    pub language: Language,
}

/// Broadcast receivers feeding one client stream
pub struct StreamSources {
    pub assistant: broadcast::Receiver<AssistantEvent>,
    pub screens: broadcast::Receiver<Screen>,
    pub listings: broadcast::Receiver<ListingChange>,
    pub speech: broadcast::Receiver<Utterance>,
}

pub fn sse_stream(
    init: InitState,
    sources: StreamSources,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move {
        Ok::<_, Infallible>(event(
            "init",
            json!({
                "messages": init.messages,
                "phase": init.phase,
                "language": init.language,
            }),
        ))
    });

    // Lagged receivers skip what they missed
    let assistant = BroadcastStream::new(sources.assistant)
        .filter_map(|result| result.ok().map(assistant_event));
    let screens = BroadcastStream::new(sources.screens).filter_map(|result| {
        result
            .ok()
            .map(|screen| event("navigate", json!({ "screen": screen })))
    });
    let listings = BroadcastStream::new(sources.listings).filter_map(|result| {
        result
            .ok()
            .map(|change| event("listings_updated", json!({ "change": change })))
    });
    let speech = BroadcastStream::new(sources.speech).filter_map(|result| {
        result.ok().map(|utterance| {
            event(
                "speak",
                json!({
                    "text": utterance.text,
                    "locale": utterance.locale,
                    "voice": utterance.voice,
                }),
            )
        })
    });

    let live = assistant
        .merge(screens)
        .merge(listings)
        .merge(speech)
        .map(Ok);

    Sse::new(init.chain(live)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn assistant_event(event_in: AssistantEvent) -> Event {
    match event_in {
        AssistantEvent::Message { message } => event("message", json!({ "message": message })),
        AssistantEvent::StateChange { phase } => {
            event("state_change", json!({ "phase": phase }))
        }
        AssistantEvent::TurnComplete => event("turn_complete", json!({})),
        AssistantEvent::Reset => event("reset", json!({})),
        AssistantEvent::Error { message } => event("error", json!({ "message": message })),
    }
}

/// Build an SSE event whose payload carries its own `type` field
fn event(event_type: &str, mut data: Value) -> Event {
    if let Value::Object(map) = &mut data {
        map.insert("type".to_string(), Value::String(event_type.to_string()));
    }
    Event::default().event(event_type).data(data.to_string())
}
