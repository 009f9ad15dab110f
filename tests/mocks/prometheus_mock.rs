use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer,
};

pub const QUERY_PATH: &str = "/api/v1/query";
pub const QUERY_RANGE_PATH: &str = "/api/v1/query_range";

/// One `up` series per job, all reporting 1
pub fn up_vector(jobs: &[&str]) -> Value {
    Value::Array(
        jobs.iter()
            .map(|job| {
                json!({
                    "metric": { "__name__": "up", "job": job },
                    "value": [1700000000, "1"]
                })
            })
            .collect(),
    )
}

/// `series` series of `samples` points each, 15s apart, starting at 1700000000
pub fn request_matrix(series: usize, samples: usize) -> Value {
    Value::Array(
        (0..series)
            .map(|i| {
                let values: Vec<Value> = (0..samples)
                    .map(|j| json!([1700000000 + (j as i64) * 15, format!("{}", j * 10)]))
                    .collect();
                json!({
                    "metric": {
                        "__name__": "http_requests_total",
                        "instance": format!("node-{}", i)
                    },
                    "values": values
                })
            })
            .collect(),
    )
}

/// Prometheus answering instant queries with `up` for the given jobs
pub async fn setup_prometheus_mock(jobs: &[&str]) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(super::success("vector", up_vector(jobs)))
        .mount(&mock_server)
        .await;

    mock_server
}
