//! Fetch pipeline tests against a local canned-HTTP server.
//!
//! A TCP listener on 127.0.0.1 plays one scripted response per path and
//! logs every request line. The reqwest client is pinned to the listener
//! with `resolve()` while a scripted resolver answers the guard's lookups,
//! so the whole redirect loop runs offline:
//!
//! 1. plain fetches return status, body, and lowercased headers
//! 2. redirect chains are followed hop by hop, absolute or relative
//! 3. the hop limit cuts chains at the configured maximum
//! 4. a hop to a private host is refused before any connection to it
//! 5. redirects without a Location header fail closed
//! 6. redirect following can be switched off per fetch
//! 7. every ruling along the way lands in the session log
//! 8. slow responses surface as the guard's timeout error

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use pagewarden::audit::{CheckPhase, DecisionLogger, DecisionReader};
use pagewarden::config::ScanConfig;
use pagewarden::fetch::PageFetcher;
use pagewarden::guard::{GuardError, Resolver};
use pagewarden::session::Session;

/// Resolver script: the test host is public, the internal host is not.
struct ScriptedResolver;

#[async_trait]
impl Resolver for ScriptedResolver {
    async fn resolve(&self, hostname: &str) -> Result<Vec<IpAddr>, GuardError> {
        match hostname {
            "fetch.test" => Ok(vec!["93.184.216.34".parse().unwrap()]),
            "internal.test" => Ok(vec!["10.0.0.5".parse().unwrap()]),
            other => Err(GuardError::ResolutionFailed {
                hostname: other.to_string(),
                cause: "NXDOMAIN".to_string(),
            }),
        }
    }
}

/// Canned HTTP server: one scripted response per path, all requests logged.
/// `/hang` never answers, for timeout tests.
struct TestServer {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Bind before building routes, so absolute URLs can embed the port.
    async fn bind() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    fn start(listener: TcpListener, routes: HashMap<String, String>) -> TestServer {
        let port = listener.local_addr().unwrap().port();
        let requests: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let mut head = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => head.extend_from_slice(&buf[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&head).to_string();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                    log.lock().unwrap().push(path.clone());
                    if path == "/hang" {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        return;
                    }
                    let reply = routes
                        .get(&path)
                        .cloned()
                        .unwrap_or_else(|| canned(404, "Not Found", &[], "no such route"));
                    let _ = socket.write_all(reply.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        TestServer { port, requests }
    }

    async fn serve(routes: HashMap<String, String>) -> TestServer {
        let (listener, _) = Self::bind().await;
        Self::start(listener, routes)
    }

    fn url(&self, path: &str) -> String {
        format!("http://fetch.test:{}{}", self.port, path)
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn canned(status: u16, reason: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut raw = format!("HTTP/1.1 {status} {reason}\r\n");
    for (name, value) in headers {
        raw.push_str(&format!("{name}: {value}\r\n"));
    }
    raw.push_str(&format!("content-length: {}\r\n", body.len()));
    raw.push_str("connection: close\r\n\r\n");
    raw.push_str(body);
    raw
}

fn redirect_to(location: &str) -> String {
    canned(302, "Found", &[("location", location)], "")
}

fn page(body: &str) -> String {
    canned(200, "OK", &[("content-type", "text/html; charset=utf-8")], body)
}

/// Client wired to the local listener. The guard still sees `fetch.test`
/// resolve to a public address; only the connection is diverted.
fn fetcher_for(server: &TestServer) -> PageFetcher {
    PageFetcher::with_client(pinned_client(server.port, Duration::from_secs(5)))
}

fn pinned_client(port: u16, timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .resolve("fetch.test", SocketAddr::from(([127, 0, 0, 1], port)))
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .build()
        .unwrap()
}

fn scan_session(config: ScanConfig) -> Session {
    Session::with_resolver("fetch", config, Arc::new(ScriptedResolver)).unwrap()
}

#[tokio::test]
async fn test_fetch_returns_final_response() {
    let server = TestServer::serve(HashMap::from([(
        "/".to_string(),
        canned(
            200,
            "OK",
            &[
                ("content-type", "text/html; charset=utf-8"),
                ("x-scan-check", "present"),
            ],
            "<html><body>hello</body></html>",
        ),
    )]))
    .await;

    let session = scan_session(ScanConfig::default());
    let response = fetcher_for(&server)
        .fetch(&session, &server.url("/"))
        .await
        .unwrap();

    assert_eq!(response.status_code, 200);
    assert!(response.is_success());
    assert_eq!(response.content, "<html><body>hello</body></html>");
    assert_eq!(response.url, server.url("/"));
    assert!(response.redirect_chain.is_empty());
    // Keys are lowercased on collection, lookups fold case themselves.
    assert_eq!(response.header("X-Scan-Check"), Some("present"));
    assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
}

#[tokio::test]
async fn test_redirect_chain_followed_hop_by_hop() {
    let (listener, port) = TestServer::bind().await;
    let absolute = format!("http://fetch.test:{port}/c");
    let server = TestServer::start(
        listener,
        HashMap::from([
            ("/a".to_string(), redirect_to("/b")),
            ("/b".to_string(), redirect_to(&absolute)),
            ("/c".to_string(), page("landed")),
        ]),
    );

    let session = scan_session(ScanConfig::default());
    let response = fetcher_for(&server)
        .fetch(&session, &server.url("/a"))
        .await
        .unwrap();

    assert_eq!(response.status_code, 200);
    assert_eq!(response.content, "landed");
    assert_eq!(response.url, server.url("/c"));
    // The relative hop is resolved against the URL it came from.
    assert_eq!(
        response.redirect_chain,
        vec![server.url("/b"), server.url("/c")]
    );
    assert_eq!(server.requests(), vec!["/a", "/b", "/c"]);
}

#[tokio::test]
async fn test_hop_limit_allows_exactly_max_redirects() {
    let server = TestServer::serve(HashMap::from([
        ("/1".to_string(), redirect_to("/2")),
        ("/2".to_string(), redirect_to("/3")),
        ("/3".to_string(), page("made it")),
    ]))
    .await;

    let config = ScanConfig {
        max_redirects: 2,
        ..ScanConfig::default()
    };
    let session = scan_session(config);
    let response = fetcher_for(&server)
        .fetch(&session, &server.url("/1"))
        .await
        .unwrap();

    assert_eq!(response.content, "made it");
    assert_eq!(response.redirect_chain.len(), 2);
}

#[tokio::test]
async fn test_hop_limit_cuts_longer_chains() {
    let server = TestServer::serve(HashMap::from([
        ("/1".to_string(), redirect_to("/2")),
        ("/2".to_string(), redirect_to("/3")),
        ("/3".to_string(), redirect_to("/4")),
        ("/4".to_string(), page("too far")),
    ]))
    .await;

    let config = ScanConfig {
        max_redirects: 2,
        ..ScanConfig::default()
    };
    let session = scan_session(config);
    let err = fetcher_for(&server)
        .fetch(&session, &server.url("/1"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Too many redirects (max 2)");
    assert_eq!(err.kind(), "too_many_redirects");
    // The hop past the limit is never requested.
    assert_eq!(server.requests(), vec!["/1", "/2", "/3"]);
}

#[tokio::test]
async fn test_private_redirect_target_refused_without_contact() {
    let server = TestServer::serve(HashMap::from([
        ("/a".to_string(), redirect_to("/b")),
        ("/b".to_string(), redirect_to("http://internal.test/private")),
        ("/private".to_string(), page("never served")),
    ]))
    .await;

    let session = scan_session(ScanConfig::default());
    let err = fetcher_for(&server)
        .fetch(&session, &server.url("/a"))
        .await
        .unwrap_err();

    // The public first hop goes through; the second names the hop that
    // failed, and the private host is ruled out before any connection.
    assert_eq!(
        err.to_string(),
        "Blocked redirect target (hop 2): Blocked non-public IP for internal.test: 10.0.0.5"
    );
    assert_eq!(err.kind(), "blocked_redirect");
    assert_eq!(server.requests(), vec!["/a", "/b"]);
}

#[tokio::test]
async fn test_redirect_without_location_fails_closed() {
    let server = TestServer::serve(HashMap::from([(
        "/lost".to_string(),
        canned(302, "Found", &[], ""),
    )]))
    .await;

    let session = scan_session(ScanConfig::default());
    let err = fetcher_for(&server)
        .fetch(&session, &server.url("/lost"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Redirect response missing Location header");
    assert_eq!(err.kind(), "redirect_missing_location");
}

#[tokio::test]
async fn test_redirect_following_can_be_disabled() {
    let server = TestServer::serve(HashMap::from([
        ("/a".to_string(), redirect_to("/b")),
        ("/b".to_string(), page("should not get here")),
    ]))
    .await;

    let session = scan_session(ScanConfig::default());
    let response = fetcher_for(&server)
        .follow_redirects(false)
        .fetch(&session, &server.url("/a"))
        .await
        .unwrap();

    assert_eq!(response.status_code, 302);
    assert_eq!(response.header("location"), Some("/b"));
    assert!(response.redirect_chain.is_empty());
    assert_eq!(server.requests(), vec!["/a"]);
}

#[tokio::test]
async fn test_fetch_leaves_a_decision_record_per_hop() {
    let server = TestServer::serve(HashMap::from([
        ("/a".to_string(), redirect_to("/b")),
        ("/b".to_string(), page("done")),
    ]))
    .await;

    let tmp = TempDir::new().unwrap();
    let session = scan_session(ScanConfig::default());
    let id = session.id().to_string();
    let session = session.with_logger(DecisionLogger::in_dir(tmp.path(), &id).unwrap());

    fetcher_for(&server)
        .fetch(&session, &server.url("/a"))
        .await
        .unwrap();

    let records = DecisionReader::with_dir(tmp.path()).read_session(&id).unwrap();
    let phases: Vec<CheckPhase> = records.iter().map(|r| r.phase).collect();
    assert_eq!(
        phases,
        vec![
            CheckPhase::Navigation,
            CheckPhase::Redirect,
            CheckPhase::FinalUrl
        ]
    );
    assert!(records.iter().all(|r| r.outcome.is_allowed()));
    assert!(records.iter().all(|r| r.command == "fetch"));
    assert_eq!(records[1].url, server.url("/b"));
}

#[tokio::test]
async fn test_slow_responses_surface_as_timeout() {
    let server = TestServer::serve(HashMap::new()).await;

    let config = ScanConfig {
        timeout_secs: 1,
        ..ScanConfig::default()
    };
    let session = scan_session(config);
    let fetcher =
        PageFetcher::with_client(pinned_client(server.port, Duration::from_millis(200)));
    let err = fetcher
        .fetch(&session, &server.url("/hang"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Timed out after 1000ms");
    assert_eq!(err.kind(), "timeout");
}
