//! Speech output
//!
//! Replies are read aloud in the selected language. At most one utterance is
//! active: starting a new one cancels whatever is still playing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A voice offered by the playback device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// Locale code, e.g. `kn-IN`
    pub locale: String,
}

/// Pick the voice for `locale`: an exact match first, then any voice of the
/// same base language (`kn` for `kn-IN`).
pub fn select_voice<'a>(voices: &'a [Voice], locale: &str) -> Option<&'a Voice> {
    voices.iter().find(|v| v.locale == locale).or_else(|| {
        let base = locale.split('-').next().unwrap_or(locale);
        voices.iter().find(|v| v.locale.starts_with(base))
    })
}

/// One piece of text to read aloud
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Utterance {
    pub text: String,
    pub locale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpeechError {
    #[error("Speech cancelled")]
    Cancelled,
    #[error("Speech output unavailable: {0}")]
    Unavailable(String),
}

/// Plays utterances on some output device
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Play `utterance`, stopping early when `cancel` fires
    async fn synthesize(
        &self,
        utterance: Utterance,
        cancel: CancellationToken,
    ) -> Result<(), SpeechError>;
}

/// Hands utterances to connected clients, which play them with the
/// platform's speech engine
pub struct ClientSynthesizer {
    tx: broadcast::Sender<Utterance>,
}

impl ClientSynthesizer {
    pub fn new(tx: broadcast::Sender<Utterance>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl SpeechSynthesizer for ClientSynthesizer {
    async fn synthesize(
        &self,
        utterance: Utterance,
        cancel: CancellationToken,
    ) -> Result<(), SpeechError> {
        if cancel.is_cancelled() {
            return Err(SpeechError::Cancelled);
        }
        // Clients cancel their own playback when a newer utterance arrives
        self.tx
            .send(utterance)
            .map(|_| ())
            .map_err(|_| SpeechError::Unavailable("no client connected".to_string()))
    }
}

/// Enforces the at-most-one-active policy over a synthesizer
pub struct SpeechController {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    voices: Mutex<Vec<Voice>>,
    active: Mutex<Option<CancellationToken>>,
}

impl SpeechController {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            synthesizer,
            voices: Mutex::new(Vec::new()),
            active: Mutex::new(None),
        }
    }

    /// Replace the voice catalog reported by the playback device
    pub fn set_voices(&self, voices: Vec<Voice>) {
        *self.voices.lock().unwrap_or_else(PoisonError::into_inner) = voices;
    }

    /// Start reading `text`, cancelling any utterance still in flight
    pub fn speak(&self, text: &str, locale: &str) -> JoinHandle<Result<(), SpeechError>> {
        let voice = {
            let voices = self.voices.lock().unwrap_or_else(PoisonError::into_inner);
            select_voice(&voices, locale).map(|v| v.name.clone())
        };
        let utterance = Utterance {
            text: text.to_string(),
            locale: locale.to_string(),
            voice,
        };

        let token = CancellationToken::new();
        if let Some(previous) = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone())
        {
            previous.cancel();
        }

        let synthesizer = self.synthesizer.clone();
        tokio::spawn(async move {
            let result = synthesizer.synthesize(utterance, token).await;
            match &result {
                Ok(()) | Err(SpeechError::Cancelled) => {}
                Err(e) => tracing::debug!(error = %e, "Speech output skipped"),
            }
            result
        })
    }

    /// Stop whatever is playing
    pub fn cancel(&self) {
        if let Some(token) = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            token.cancel();
        }
    }
}
