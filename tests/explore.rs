//! Explorer tests against local mock servers.
//!
//! Hostnames in these tests resolve to 127.0.0.1 through the fake resolver,
//! so no real network access is needed.

mod helpers;

use http::HeaderMap;
use httptest::{matchers::*, responders::*, Expectation, Server};
use tokio_util::sync::CancellationToken;
use url::Url;

use helpers::{
    closed_port, start_h3_server, start_tls_server_with_headers, test_config, test_pki, FakeResolver,
};
use websteps_helper::explore::{DefaultExplorer, Explorer};
use websteps_helper::{ExploreError, Operation};

fn explorer(server: &Server, domains: &[&str]) -> DefaultExplorer {
    let resolver = FakeResolver::to(server.addr().ip(), domains);
    DefaultExplorer::new(&test_config(resolver)).expect("explorer")
}

/// A three hop redirect chain comes back oldest hop first.
#[tokio::test]
async fn test_redirect_chain_is_oldest_first() {
    let server = Server::run();
    let port = server.addr().port();
    server.expect(
        Expectation::matching(request::method_path("GET", "/a")).respond_with(
            status_code(302).append_header("Location", format!("http://b.test:{port}/b")),
        ),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/b"))
            .respond_with(status_code(301).append_header("Location", "/c")),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/c"))
            .respond_with(status_code(200).body("done")),
    );

    let start = Url::parse(&format!("http://a.test:{port}/a")).expect("valid url");
    let round_trips = explorer(&server, &["a.test", "b.test"])
        .explore(&start, &HeaderMap::new(), &CancellationToken::new())
        .await
        .expect("explore should succeed");

    let urls: Vec<String> = round_trips
        .iter()
        .map(|rt| rt.request.url.to_string())
        .collect();
    assert_eq!(
        urls,
        vec![
            format!("http://a.test:{port}/a"),
            format!("http://b.test:{port}/b"),
            format!("http://b.test:{port}/c"),
        ]
    );
    let statuses: Vec<u16> = round_trips.iter().map(|rt| rt.response.status_code).collect();
    assert_eq!(statuses, vec![302, 301, 200]);
    let indexes: Vec<usize> = round_trips.iter().map(|rt| rt.sort_index).collect();
    assert_eq!(indexes, vec![2, 1, 0]);
    assert!(round_trips.iter().all(|rt| rt.protocol == "http"));
}

/// Cookies set on one hop are sent on the next.
#[tokio::test]
async fn test_cookies_follow_the_chain() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/login")).respond_with(
            status_code(302)
                .append_header("Set-Cookie", "session=abc; Path=/")
                .append_header("Location", "/home"),
        ),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/home"),
            request::headers(contains(("cookie", "session=abc"))),
        ])
        .respond_with(status_code(200)),
    );

    let start = Url::parse(&format!("http://site.test:{}/login", server.addr().port()))
        .expect("valid url");
    let round_trips = explorer(&server, &["site.test"])
        .explore(&start, &HeaderMap::new(), &CancellationToken::new())
        .await
        .expect("explore should succeed");
    assert_eq!(round_trips.len(), 2);
    assert!(round_trips[1].request.headers.contains_key("cookie"));
}

/// The submitted headers are sent on every hop.
#[tokio::test]
async fn test_request_headers_are_sent() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/"),
            request::headers(contains(("user-agent", "probe/1.0"))),
        ])
        .respond_with(status_code(200)),
    );

    let mut headers = HeaderMap::new();
    headers.insert("user-agent", "probe/1.0".parse().expect("header value"));
    let start = Url::parse(&format!("http://site.test:{}/", server.addr().port()))
        .expect("valid url");
    let round_trips = explorer(&server, &["site.test"])
        .explore(&start, &headers, &CancellationToken::new())
        .await
        .expect("explore should succeed");
    assert_eq!(round_trips.len(), 1);
    assert_eq!(round_trips[0].request.headers["user-agent"], "probe/1.0");
}

/// A redirect loop stops at the redirect limit.
#[tokio::test]
async fn test_redirect_loop_is_an_error() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/loop"))
            .times(1..)
            .respond_with(status_code(302).append_header("Location", "/loop")),
    );

    let mut config = test_config(FakeResolver::to(server.addr().ip(), &["loop.test"]));
    config.max_redirects = 3;
    let explorer = DefaultExplorer::new(&config).expect("explorer");
    let start = Url::parse(&format!("http://loop.test:{}/loop", server.addr().port()))
        .expect("valid url");
    let err = explorer
        .explore(&start, &HeaderMap::new(), &CancellationToken::new())
        .await
        .expect_err("loop should fail");
    assert!(matches!(err, ExploreError::TooManyRedirects(3)));
}

/// An unreachable server aborts exploration with no round trips.
#[tokio::test]
async fn test_unreachable_server_is_an_error() {
    let port = closed_port().await;
    let start = Url::parse(&format!("http://down.test:{port}/")).expect("valid url");
    let explorer = DefaultExplorer::new(&test_config(FakeResolver::loopback(&["down.test"])))
        .expect("explorer");
    let err = explorer
        .explore(&start, &HeaderMap::new(), &CancellationToken::new())
        .await
        .expect_err("fetch should fail");
    assert!(matches!(err, ExploreError::Fetch { .. }));
    assert!(err.partial_round_trips().is_empty());
}

/// HTTP/3 is only looked for when the submitted URL is HTTPS.
#[tokio::test]
async fn test_alt_svc_ignored_for_plain_http() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/"))
            .respond_with(status_code(200).append_header("Alt-Svc", r#"h3=":443"; ma=86400"#)),
    );

    let start = Url::parse(&format!("http://site.test:{}/", server.addr().port()))
        .expect("valid url");
    let round_trips = explorer(&server, &["site.test"])
        .explore(&start, &HeaderMap::new(), &CancellationToken::new())
        .await
        .expect("explore should succeed");
    assert_eq!(round_trips.len(), 1);
    assert_eq!(round_trips[0].protocol, "http");
}

/// A cancelled measurement stops exploring.
#[tokio::test]
async fn test_cancelled_exploration() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/"))
            .times(0..)
            .respond_with(delay_and_then(
                std::time::Duration::from_secs(5),
                status_code(200),
            )),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let start = Url::parse(&format!("http://site.test:{}/", server.addr().port()))
        .expect("valid url");
    let err = explorer(&server, &["site.test"])
        .explore(&start, &HeaderMap::new(), &cancel)
        .await
        .expect_err("should be interrupted");
    assert!(matches!(err, ExploreError::Interrupted(_)));
    assert_eq!(websteps_helper::classify(&err), "interrupted");
}

/// An HTTPS response advertising `h3` is repeated over QUIC; the HTTP/3 hop
/// comes after the HTTPS one.
#[tokio::test]
async fn test_alt_svc_h3_is_followed() {
    let pki = test_pki("quic.test");
    let udp = start_h3_server(&pki).await;
    let tcp =
        start_tls_server_with_headers(&pki, &[("alt-svc", format!("h3=\":{}\"; ma=60", udp.port()))])
            .await;
    let config = test_config(FakeResolver::loopback(&["quic.test"])).with_root_store(pki.roots);
    let start = Url::parse(&format!("https://quic.test:{}/", tcp.port())).expect("valid url");

    let round_trips = DefaultExplorer::new(&config)
        .expect("explorer")
        .explore(&start, &HeaderMap::new(), &CancellationToken::new())
        .await
        .expect("explore should succeed");

    let protocols: Vec<&str> = round_trips.iter().map(|rt| rt.protocol.as_str()).collect();
    assert_eq!(protocols, vec!["https", "h3"]);
    assert_eq!(
        round_trips[1].request.url.as_str(),
        format!("https://quic.test:{}/", udp.port())
    );
    assert!(round_trips.iter().all(|rt| rt.response.status_code == 200));
    assert!(round_trips.iter().all(|rt| rt.sort_index == 0));
}

/// A failed HTTP/3 repetition keeps the HTTPS round trips already collected.
#[tokio::test]
async fn test_h3_failure_keeps_https_round_trips() {
    let pki = test_pki("quic.test");
    let udp_port = closed_port().await;
    let tcp =
        start_tls_server_with_headers(&pki, &[("alt-svc", format!("h3=\":{udp_port}\""))]).await;
    let config = test_config(FakeResolver::loopback(&["quic.test"])).with_root_store(pki.roots);
    let start = Url::parse(&format!("https://quic.test:{}/", tcp.port())).expect("valid url");

    let err = DefaultExplorer::new(&config)
        .expect("explorer")
        .explore(&start, &HeaderMap::new(), &CancellationToken::new())
        .await
        .expect_err("HTTP/3 should fail");

    let ExploreError::Http3 { url, round_trips, source } = &err else {
        panic!("expected an HTTP/3 error, got {err:?}");
    };
    assert_eq!(url, &format!("https://quic.test:{udp_port}/"));
    assert_eq!(round_trips.len(), 1);
    assert_eq!(round_trips[0].protocol, "https");
    assert_eq!(round_trips[0].response.status_code, 200);
    assert_eq!(source.operation(), Operation::QuicHandshake);
    assert_eq!(err.partial_round_trips().len(), 1);
}
