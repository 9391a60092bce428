//! Supported reply languages
//!
//! The selection is process-wide and read on every model request. It is not
//! persisted: a restart goes back to the configured default.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    /// BCP-47 locale code, also used for voice selection
    pub code: &'static str,
    /// Human label used in the instruction layer
    pub label: &'static str,
}

pub const DEFAULT_LANGUAGE: &str = "kn-IN";

pub const LANGUAGES: [Language; 9] = [
    Language { code: "kn-IN", label: "Kannada (ಕನ್ನಡ)" },
    Language { code: "en-IN", label: "English" },
    Language { code: "hi-IN", label: "Hindi (हिंदी)" },
    Language { code: "mr-IN", label: "Marathi (मराठी)" },
    Language { code: "te-IN", label: "Telugu (తెలుగు)" },
    Language { code: "ta-IN", label: "Tamil (தமிழ்)" },
    Language { code: "gu-IN", label: "Gujarati (ગુજરાતી)" },
    Language { code: "pa-IN", label: "Punjabi (ਪੰਜਾਬੀ)" },
    Language { code: "bn-IN", label: "Bengali (বাংলা)" },
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unsupported language '{0}'")]
pub struct UnsupportedLanguage(pub String);

pub fn find_language(code: &str) -> Option<Language> {
    LANGUAGES.iter().copied().find(|l| l.code == code)
}

/// Current language, shared between the API and the runtime
#[derive(Clone)]
pub struct LanguageSelection {
    tx: Arc<watch::Sender<Language>>,
}

impl LanguageSelection {
    pub fn new(code: &str) -> Result<Self, UnsupportedLanguage> {
        let language = find_language(code).ok_or_else(|| UnsupportedLanguage(code.to_string()))?;
        let (tx, _) = watch::channel(language);
        Ok(Self { tx: Arc::new(tx) })
    }

    pub fn current(&self) -> Language {
        *self.tx.borrow()
    }

    pub fn set(&self, code: &str) -> Result<Language, UnsupportedLanguage> {
        let language = find_language(code).ok_or_else(|| UnsupportedLanguage(code.to_string()))?;
        self.tx.send_replace(language);
        tracing::info!(code = language.code, "Language changed");
        Ok(language)
    }
}

impl Default for LanguageSelection {
    fn default() -> Self {
        let (tx, _) = watch::channel(LANGUAGES[0]);
        Self { tx: Arc::new(tx) }
    }
}
