use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }
}

/// Log entries sharing one label set, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogStream {
    labels: BTreeMap<String, String>,
    entries: Vec<LogEntry>,
}

impl LogStream {
    /// Entries are sorted ascending by timestamp; equal timestamps keep the
    /// order they were given in.
    pub fn new(labels: BTreeMap<String, String>, mut entries: Vec<LogEntry>) -> Self {
        entries.sort_by_key(|e| e.timestamp);
        Self { labels, entries }
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}

/// Normalized answer to a logs query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogsResponse {
    streams: Vec<LogStream>,
}

impl LogsResponse {
    pub fn new(streams: Vec<LogStream>) -> Self {
        Self { streams }
    }

    pub fn streams(&self) -> &[LogStream] {
        &self.streams
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.streams.iter().map(|s| s.entries.len()).sum()
    }

    /// All entries across streams in timestamp order, each with its stream labels
    ///
    /// Ties keep stream order, then entry order.
    pub fn merged_entries(&self) -> Vec<(&BTreeMap<String, String>, &LogEntry)> {
        let mut merged: Vec<_> = self
            .streams
            .iter()
            .flat_map(|s| s.entries.iter().map(move |e| (&s.labels, e)))
            .collect();
        merged.sort_by_key(|(_, e)| e.timestamp);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn labels(app: &str) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), app.to_string());
        labels
    }

    #[test]
    fn test_stream_sort_is_stable() {
        let stream = LogStream::new(
            labels("api"),
            vec![
                LogEntry::new(ts(2), "second"),
                LogEntry::new(ts(1), "first-a"),
                LogEntry::new(ts(1), "first-b"),
            ],
        );

        let messages: Vec<_> = stream.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first-a", "first-b", "second"]);
    }

    #[test]
    fn test_merged_entries_interleaves_streams() {
        let response = LogsResponse::new(vec![
            LogStream::new(
                labels("api"),
                vec![LogEntry::new(ts(1), "a1"), LogEntry::new(ts(3), "a3")],
            ),
            LogStream::new(labels("db"), vec![LogEntry::new(ts(2), "d2")]),
        ]);

        let merged: Vec<_> = response
            .merged_entries()
            .into_iter()
            .map(|(l, e)| (l["app"].as_str(), e.message.as_str()))
            .collect();
        assert_eq!(merged, vec![("api", "a1"), ("db", "d2"), ("api", "a3")]);
        assert_eq!(response.entry_count(), 3);
    }
}
