//! Contract for the natural-language query translator
//!
//! Translation (typically backed by a language model) lives outside this
//! crate. The gateway only consumes the resulting query string.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// Target query language for a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryLanguage {
    PromQl,
    LogQl,
}

impl fmt::Display for QueryLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PromQl => write!(f, "PromQL"),
            Self::LogQl => write!(f, "LogQL"),
        }
    }
}

/// Hints handed to the translator alongside the user's text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryContext {
    pub language: QueryLanguage,
    /// Lookback such as `1h`
    pub time_range: Option<String>,
    pub service: Option<String>,
    /// Metric names known to exist, to steer the translation
    pub metrics: Vec<String>,
}

impl QueryContext {
    pub fn new(language: QueryLanguage) -> Self {
        Self {
            language,
            time_range: None,
            service: None,
            metrics: Vec::new(),
        }
    }

    pub fn with_time_range(mut self, time_range: impl Into<String>) -> Self {
        self.time_range = Some(time_range.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

/// Turns natural language into a backend query, and explains queries back
#[async_trait]
pub trait QueryTranslator: Send + Sync {
    async fn translate(&self, text: &str, context: &QueryContext) -> anyhow::Result<String>;

    async fn explain(&self, query: &str, language: QueryLanguage) -> anyhow::Result<String>;
}
