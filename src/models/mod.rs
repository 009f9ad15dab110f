//! Canonical, backend-independent query results
//!
//! Every adapter normalizes its wire format into these types. Values are built
//! once by an adapter's parse step and only read afterwards.

pub mod logs;
pub mod metrics;
pub mod time;

pub use logs::{LogEntry, LogStream, LogsResponse};
pub use metrics::{MetricResult, MetricSample, MetricSeries, MetricsResponse, ResultKind};
pub use time::{parse_lookback, TimeRange};
