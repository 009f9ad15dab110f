//! Prometheus and Loki adapters against mock HTTP servers

mod mocks;

use chrono::{TimeZone, Utc};
use mocks::{api_error, loki_mock, prometheus_mock, success};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use telemetry_gateway::backends::{LokiBackend, PrometheusBackend};
use telemetry_gateway::models::ResultKind;
use telemetry_gateway::{BackendError, ErrorKind, LogsBackend, MetricsBackend};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn prometheus(server: &MockServer) -> PrometheusBackend {
    PrometheusBackend::new(&server.uri(), TIMEOUT).unwrap()
}

fn loki(server: &MockServer) -> LokiBackend {
    LokiBackend::new(&server.uri(), TIMEOUT).unwrap()
}

#[tokio::test]
async fn test_prometheus_instant_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(prometheus_mock::QUERY_PATH))
        .and(query_param("query", "up"))
        .respond_with(success("vector", prometheus_mock::up_vector(&["api", "db"])))
        .expect(1)
        .mount(&server)
        .await;

    let response = prometheus(&server).query("up").await.unwrap();

    assert_eq!(response.result_kind(), ResultKind::Instant);
    assert_eq!(response.len(), 2);
    let result = &response.results()[0];
    assert_eq!(result.series().name(), "up");
    assert_eq!(result.series().label("job"), Some("api"));
    assert_eq!(result.samples()[0].value, 1.0);
    assert_eq!(
        result.samples()[0].timestamp,
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    );
}

#[tokio::test]
async fn test_prometheus_range_query_sends_unix_seconds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(prometheus_mock::QUERY_RANGE_PATH))
        .and(query_param("query", "rate(http_requests_total[5m])"))
        .and(query_param("start", "1700000000"))
        .and(query_param("end", "1700003600"))
        .and(query_param("step", "15"))
        .respond_with(success("matrix", prometheus_mock::request_matrix(3, 4)))
        .expect(1)
        .mount(&server)
        .await;

    let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let end = Utc.timestamp_opt(1_700_003_600, 0).unwrap();
    let response = prometheus(&server)
        .query_range("rate(http_requests_total[5m])", start, end, Duration::from_secs(15))
        .await
        .unwrap();

    assert_eq!(response.result_kind(), ResultKind::Range);
    assert_eq!(response.len(), 3);
    assert_eq!(response.sample_count(), 12);
    for result in response.results() {
        assert!(result
            .samples()
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
    }
}

#[tokio::test]
async fn test_loki_range_query_sends_unix_nanoseconds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(loki_mock::QUERY_RANGE_PATH))
        .and(query_param("query", "{app=\"api\"}"))
        .and(query_param("start", "1700000000000000000"))
        .and(query_param("end", "1700003600000000000"))
        .respond_with(success("streams", loki_mock::api_streams()))
        .expect(1)
        .mount(&server)
        .await;

    let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let end = Utc.timestamp_opt(1_700_003_600, 0).unwrap();
    let response = loki(&server)
        .query_range("{app=\"api\"}", start, end)
        .await
        .unwrap();

    assert_eq!(response.streams().len(), 2);
    assert_eq!(response.entry_count(), 3);

    let errors = &response.streams()[0];
    assert_eq!(errors.labels()["level"], "error");
    assert_eq!(errors.entries()[0].message, "connection reset");
    assert_eq!(errors.entries()[1].message, "upstream timeout");

    let merged: Vec<&str> = response
        .merged_entries()
        .into_iter()
        .map(|(_, entry)| entry.message.as_str())
        .collect();
    assert_eq!(merged, vec!["connection reset", "request served", "upstream timeout"]);
}

#[tokio::test]
async fn test_loki_instant_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(loki_mock::QUERY_PATH))
        .and(query_param("query", "{app=\"api\"}"))
        .respond_with(success("streams", json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let response = loki(&server).query("{app=\"api\"}").await.unwrap();
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_server_error_is_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(prometheus_mock::QUERY_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
        .mount(&server)
        .await;

    let err = prometheus(&server).query("up").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_bad_request_is_query_error_with_api_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(prometheus_mock::QUERY_PATH))
        .respond_with(api_error(
            400,
            "bad_data",
            "parse error at char 5: unclosed left parenthesis",
        ))
        .mount(&server)
        .await;

    match prometheus(&server).query("rate(").await.unwrap_err() {
        BackendError::Query { message, query } => {
            assert!(message.contains("400"));
            assert!(message.contains("unclosed left parenthesis"));
            assert_eq!(query, "rate(");
        }
        other => panic!("expected Query, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_status_in_success_response_is_query_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(loki_mock::QUERY_PATH))
        .respond_with(api_error(200, "execution", "too many outstanding requests"))
        .mount(&server)
        .await;

    let err = loki(&server).query("{app=\"api\"}").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);
    assert!(err.to_string().contains("too many outstanding requests"));
}

#[tokio::test]
async fn test_malformed_body_is_query_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(prometheus_mock::QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy login</html>"))
        .mount(&server)
        .await;

    let err = prometheus(&server).query("up").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);
}

#[tokio::test]
async fn test_slow_response_times_out_as_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(prometheus_mock::QUERY_PATH))
        .respond_with(
            success("vector", json!([])).set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let backend = PrometheusBackend::new(&server.uri(), Duration::from_millis(200)).unwrap();
    let err = backend.query("up").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[tokio::test]
async fn test_unreachable_host_is_connection_error() {
    let backend = PrometheusBackend::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
    let err = backend.query("up").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[tokio::test]
async fn test_loki_metric_range_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(loki_mock::QUERY_RANGE_PATH))
        .and(query_param("query", "sum by (level) (count_over_time({app=\"api\"}[1m]))"))
        .and(query_param("start", "1700000000000000000"))
        .and(query_param("end", "1700003600000000000"))
        .and(query_param("step", "60"))
        .respond_with(success("matrix", loki_mock::level_counts_matrix()))
        .expect(1)
        .mount(&server)
        .await;

    let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let end = Utc.timestamp_opt(1_700_003_600, 0).unwrap();
    let response = loki(&server)
        .query_metrics_range(
            "sum by (level) (count_over_time({app=\"api\"}[1m]))",
            start,
            end,
            Duration::from_secs(60),
        )
        .await
        .unwrap();

    assert_eq!(response.result_kind(), ResultKind::Range);
    assert_eq!(response.len(), 2);
    let errors = &response.results()[0];
    assert_eq!(errors.series().name(), "");
    assert_eq!(errors.series().label("level"), Some("error"));
    let values: Vec<f64> = errors.samples().iter().map(|s| s.value).collect();
    assert_eq!(values, vec![3.0, 5.0]);
}

#[tokio::test]
async fn test_loki_metric_instant_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(loki_mock::QUERY_PATH))
        .and(query_param("query", "rate({app=\"api\"}[5m])"))
        .respond_with(success(
            "vector",
            json!([{ "metric": { "app": "api" }, "value": [1700000000, "0.25"] }]),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let response = loki(&server)
        .query_metrics("rate({app=\"api\"}[5m])")
        .await
        .unwrap();

    assert_eq!(response.result_kind(), ResultKind::Instant);
    assert_eq!(response.results()[0].samples()[0].value, 0.25);
}

#[tokio::test]
async fn test_loki_metric_query_rejects_stream_selector() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(loki_mock::QUERY_PATH))
        .respond_with(success("streams", loki_mock::api_streams()))
        .mount(&server)
        .await;

    let err = loki(&server).query_metrics("{app=\"api\"}").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);
}

/// Serve exactly one request with a keep-alive response, then report whether
/// the client closed the socket within three seconds.
async fn serve_once(
    status_line: &'static str,
    body: &'static str,
) -> (SocketAddr, JoinHandle<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let mut request = Vec::new();
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return true;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: keep-alive\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();

        // EOF (or a reset) means the client let go of the connection
        match tokio::time::timeout(Duration::from_secs(3), socket.read(&mut buf)).await {
            Ok(Ok(0)) | Ok(Err(_)) => true,
            Ok(Ok(_)) | Err(_) => false,
        }
    });

    (addr, handle)
}

#[tokio::test]
async fn test_connection_released_after_success() {
    let (addr, closed) = serve_once(
        "HTTP/1.1 200 OK",
        r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#,
    )
    .await;

    let backend = PrometheusBackend::new(&format!("http://{}", addr), TIMEOUT).unwrap();
    let response = backend.query("up").await.unwrap();
    assert!(response.is_empty());

    assert!(closed.await.unwrap(), "connection still open after the response");
}

#[tokio::test]
async fn test_connection_released_after_error() {
    let (addr, closed) = serve_once(
        "HTTP/1.1 400 Bad Request",
        r#"{"status":"error","errorType":"bad_data","error":"parse error"}"#,
    )
    .await;

    let backend = LokiBackend::new(&format!("http://{}", addr), TIMEOUT).unwrap();
    let err = backend.query("{app=").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);

    assert!(closed.await.unwrap(), "connection still open after the error response");
}
