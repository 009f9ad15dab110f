use serde_json::{json, Value};

pub const QUERY_PATH: &str = "/loki/api/v1/query";
pub const QUERY_RANGE_PATH: &str = "/loki/api/v1/query_range";

/// Two streams with interleaved timestamps, newest first as Loki returns them
pub fn api_streams() -> Value {
    json!([
        {
            "stream": { "app": "api", "level": "error" },
            "values": [
                ["1700000030000000000", "upstream timeout"],
                ["1700000010000000000", "connection reset"]
            ]
        },
        {
            "stream": { "app": "api", "level": "info" },
            "values": [
                ["1700000020000000000", "request served"]
            ]
        }
    ])
}

/// `count_over_time` per level, two one-minute buckets each
pub fn level_counts_matrix() -> Value {
    json!([
        {
            "metric": { "level": "error" },
            "values": [[1700000060, "3"], [1700000120, "5"]]
        },
        {
            "metric": { "level": "info" },
            "values": [[1700000060, "40"], [1700000120, "42"]]
        }
    ])
}
