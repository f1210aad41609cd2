use super::*;
use crate::usage_reset::ResetTimestamp;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

/// A canned response for one request path.
struct Route {
    path: &'static str,
    status: u16,
    body: String,
}

fn route(path: &'static str, status: u16, body: impl Into<String>) -> Route {
    Route {
        path,
        status,
        body: body.into(),
    }
}

/// Minimal HTTP/1.1 server on the loopback interface. Serves
/// `expected_requests` connections, then exits. Every request head is
/// recorded, lowercased, for header assertions.
struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

fn serve(routes: Vec<Route>, expected_requests: usize) -> StubServer {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);

    thread::spawn(move || {
        for _ in 0..expected_requests {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => head.extend_from_slice(&buf[..n]),
                }
            }
            let head = String::from_utf8_lossy(&head).to_string();
            let path = head
                .lines()
                .next()
                .and_then(|line| line.split_whitespace().nth(1))
                .unwrap_or("")
                .to_string();
            recorded.lock().unwrap().push(head.to_lowercase());

            let (status, body) = routes
                .iter()
                .find(|r| r.path == path)
                .map(|r| (r.status, r.body.clone()))
                .unwrap_or((404, "{}".to_string()));
            let response = format!(
                "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });

    StubServer { base_url, requests }
}

fn creds() -> SessionCredentials {
    SessionCredentials::new("sk-test", None)
}

const ORGS: &str = r#"[{"uuid": "org-123", "name": "Personal"}, {"uuid": "org-456"}]"#;

#[test]
fn test_fetch_usage_success() {
    let server = serve(
        vec![
            route("/api/organizations", 200, ORGS),
            route(
                "/api/organizations/org-123/usage",
                200,
                r#"{"five_hour": {"utilization": 42.5, "resets_at": "2030-01-01T00:00:00+00:00"},
                    "seven_day": {"utilization": 10, "resets_at": null}}"#,
            ),
        ],
        2,
    );

    let client = ApiClient::new(server.base_url.clone());
    let report = client.fetch_usage(&creds()).unwrap();

    assert_eq!(report.organization_id, "org-123");
    assert_eq!(report.session_window.utilization, 42.5);
    assert_eq!(
        report.session_window.resets_at,
        ResetTimestamp::parse("2030-01-01T00:00:00+00:00")
    );
    assert_eq!(report.session_window.window_span, UsageWindowSpan::Hours(5));

    let weekly = report.weekly_window.unwrap();
    assert_eq!(weekly.utilization, 10.0);
    assert_eq!(weekly.resets_at, None);
    assert_eq!(weekly.window_span, UsageWindowSpan::Days(7));

    let requests = server.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("get /api/organizations "));
    assert!(requests[1].starts_with("get /api/organizations/org-123/usage "));
    for request in requests.iter() {
        assert!(request.contains("cookie: sessionkey=sk-test"));
        assert!(request.contains("accept: application/json"));
        assert!(request.contains("/chats"));
    }
}

#[test]
fn test_fetch_usage_sends_full_cookie_string() {
    let server = serve(
        vec![
            route("/api/organizations", 200, ORGS),
            route("/api/organizations/org-123/usage", 200, "{}"),
        ],
        2,
    );

    let creds = SessionCredentials::new("sk-test", Some("sessionKey=sk-test; cf=abc".into()));
    ApiClient::new(server.base_url.clone())
        .fetch_usage(&creds)
        .unwrap();

    let requests = server.requests.lock().unwrap();
    assert!(requests[0].contains("cookie: sessionkey=sk-test; cf=abc"));
}

#[test]
fn test_fetch_usage_401_is_session_expired() {
    let server = serve(vec![route("/api/organizations", 401, "{}")], 1);
    let err = ApiClient::new(server.base_url.clone())
        .fetch_usage(&creds())
        .unwrap_err();
    assert_eq!(err, FetchError::SessionExpired);
    assert!(err.is_auth_failure());
}

#[test]
fn test_fetch_usage_401_on_usage_endpoint() {
    let server = serve(
        vec![
            route("/api/organizations", 200, ORGS),
            route("/api/organizations/org-123/usage", 401, ""),
        ],
        2,
    );
    let err = ApiClient::new(server.base_url.clone())
        .fetch_usage(&creds())
        .unwrap_err();
    assert_eq!(err, FetchError::SessionExpired);
}

#[test]
fn test_fetch_usage_403_keeps_truncated_body() {
    let body = "x".repeat(800);
    let server = serve(vec![route("/api/organizations", 403, body)], 1);
    let err = ApiClient::new(server.base_url.clone())
        .fetch_usage(&creds())
        .unwrap_err();
    match err {
        FetchError::Forbidden { snippet } => assert_eq!(snippet.len(), 500),
        other => panic!("expected Forbidden, got {:?}", other),
    }
}

#[test]
fn test_fetch_usage_other_status() {
    let server = serve(vec![route("/api/organizations", 503, "down")], 1);
    let err = ApiClient::new(server.base_url.clone())
        .fetch_usage(&creds())
        .unwrap_err();
    assert_eq!(err, FetchError::Http { status: 503 });
    assert!(!err.is_auth_failure());
}

#[test]
fn test_fetch_usage_without_organizations() {
    let server = serve(vec![route("/api/organizations", 200, "[]")], 1);
    let err = ApiClient::new(server.base_url.clone())
        .fetch_usage(&creds())
        .unwrap_err();
    assert_eq!(err, FetchError::NoOrganization);
}

#[test]
fn test_fetch_usage_organizations_not_a_list() {
    let server = serve(
        vec![route("/api/organizations", 200, r#"{"error": "nope"}"#)],
        1,
    );
    let err = ApiClient::new(server.base_url.clone())
        .fetch_usage(&creds())
        .unwrap_err();
    assert!(matches!(err, FetchError::Malformed(_)));
}

#[test]
fn test_fetch_usage_connection_refused_is_network_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = ApiClient::new(format!("http://127.0.0.1:{}", port));
    let err = client.fetch_usage(&creds()).unwrap_err();
    assert!(matches!(err, FetchError::Network(_)), "got {:?}", err);
}

#[test]
fn test_new_trims_trailing_slash() {
    assert_eq!(
        ApiClient::new("http://localhost:8080/").base_url(),
        "http://localhost:8080"
    );
    assert_eq!(ApiClient::default().base_url(), DEFAULT_BASE_URL);
}

#[test]
fn test_parse_usage_body_missing_five_hour() {
    let report = parse_usage_body("{}", "org").unwrap();
    assert_eq!(report.session_window.utilization, 0.0);
    assert_eq!(report.session_window.resets_at, None);
    assert_eq!(report.session_window.window_span, UsageWindowSpan::Hours(5));
    assert_eq!(report.weekly_window, None);
    assert_eq!(
        report.session_window.countdown_label_at(chrono::Utc::now()),
        "No usage in current period"
    );
}

#[test]
fn test_parse_usage_body_null_five_hour() {
    let report = parse_usage_body(r#"{"five_hour": null}"#, "org").unwrap();
    assert_eq!(report.session_window.utilization, 0.0);
}

#[test]
fn test_parse_usage_body_clamps_and_keeps_raw_reset() {
    let report = parse_usage_body(
        r#"{"five_hour": {"utilization": 150, "resets_at": "tomorrow-ish"}}"#,
        "org",
    )
    .unwrap();
    assert_eq!(report.session_window.utilization, 100.0);
    assert_eq!(report.session_window.resets_at, None);
    assert_eq!(
        report.session_window.countdown_label_at(chrono::Utc::now()),
        "Resets at: tomorrow-ish"
    );
}

#[test]
fn test_parse_usage_body_non_numeric_utilization() {
    let report =
        parse_usage_body(r#"{"five_hour": {"utilization": "high"}}"#, "org").unwrap();
    assert_eq!(report.session_window.utilization, 0.0);
}

#[test]
fn test_parse_usage_body_rejects_non_object() {
    assert!(matches!(
        parse_usage_body("[1, 2]", "org"),
        Err(FetchError::Malformed(_))
    ));
    assert!(matches!(
        parse_usage_body("not json", "org"),
        Err(FetchError::Malformed(_))
    ));
}
