//! HTTP tests driving the router in-process with `tower::ServiceExt::oneshot`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use conclave_governance::{CategoryRegistry, GovernanceEngine, GovernanceParams};
use conclave_nullables::{NullClock, NullRandom, NullStore};
use conclave_rpc::{build_router, AppState, GovernanceMetrics};
use conclave_types::{Member, MemberId, Origin, Rank, Timestamp, SECS_PER_HOUR};
use serde_json::{json, Value};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const T0: u64 = 1_700_000_000;

struct TestApp {
    router: Router,
    store: Arc<NullStore>,
    clock: Arc<NullClock>,
}

fn app_with_metrics(metrics: bool) -> TestApp {
    app_with(metrics, Vec::new())
}

fn app_with(metrics: bool, trusted_proxies: Vec<IpAddr>) -> TestApp {
    let store = Arc::new(NullStore::new());
    let clock = Arc::new(NullClock::new(T0));
    let params = GovernanceParams::default();
    let engine = GovernanceEngine::new(
        store.clone(),
        CategoryRegistry::standard(&params).unwrap(),
        params,
        clock.clone(),
        Arc::new(NullRandom::first()),
    );
    let state = Arc::new(
        AppState::new(engine, metrics.then(GovernanceMetrics::new))
            .with_trusted_proxies(trusted_proxies),
    );
    TestApp {
        router: build_router(state),
        store,
        clock,
    }
}

fn app() -> TestApp {
    seed(app_with_metrics(true))
}

fn seed(app: TestApp) -> TestApp {
    let now = Timestamp::new(T0);
    for (id, rank) in [
        ("inquisitor", Rank::Golden),
        ("silver1", Rank::Silver),
        ("mason", Rank::Mason),
    ] {
        app.store
            .seed_member(Member::new(MemberId::new(id), id, now).with_rank(rank));
    }
    app.store.seed_member(
        Member::new(MemberId::new("target"), "target", now)
            .with_rank(Rank::Silver)
            .with_origin(Origin::new("10.0.0.9")),
    );
    app
}

fn get(uri: &str, member: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(member) = member {
        builder = builder.header("x-member-id", member);
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, member: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(member) = member {
        builder = builder.header("x-member-id", member);
    }
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    builder.body(body).unwrap()
}

/// Attach the TCP peer address the server would see.
fn from_peer(mut req: Request<Body>, peer: &str) -> Request<Body> {
    let ip: IpAddr = peer.parse().unwrap();
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::new(ip, 50_000)));
    req
}

fn forwarded(mut req: Request<Body>, chain: &str) -> Request<Body> {
    req.headers_mut()
        .insert("x-forwarded-for", chain.parse().unwrap());
    req
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Rotate the Inquisitor and nominate `target`; returns the vote id.
async fn open_ban_vote(app: &TestApp) -> u64 {
    let (status, body) = send(app, post("/scheduler/inquisitor", None, None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"], "selected");

    let (status, body) = send(
        app,
        post(
            "/nominations",
            Some("inquisitor"),
            Some(json!({ "target": "target" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ACTIVE");
    body["id"].as_u64().unwrap()
}

// ---------------------------------------------------------------------------
// Identity and liveness
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_open() {
    let app = app();
    let (status, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn member_routes_require_identity() {
    let app = app();
    let (status, body) = send(&app, get("/votes", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "authentication required");
}

#[tokio::test]
async fn unknown_member_is_forbidden() {
    let app = app();
    let (status, _) = send(&app, get("/votes", Some("stranger"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Ban flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ban_vote_end_to_end() {
    let app = app();
    let id = open_ban_vote(&app).await;

    let (status, body) = send(
        &app,
        post(
            &format!("/votes/{id}/ballots"),
            Some("silver1"),
            Some(json!({ "decision": "AGREE" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tally"]["agree"], 1);
    assert_eq!(body["has_voted"], true);

    let (status, body) = send(
        &app,
        post(
            &format!("/votes/{id}/ballots"),
            Some("silver1"),
            Some(json!({ "decision": "DISAGREE" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("already voted"));

    app.clock.advance(4 * SECS_PER_HOUR);
    let (status, body) = send(
        &app,
        post(&format!("/scheduler/votes/{id}/close"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transition"]["transition"], "tallied");
    assert_eq!(body["transition"]["outcome"], "PASSED");
    assert_eq!(body["consequence"]["consequence"], "banned");
    assert_eq!(body["vote"]["status"], "CLOSED");

    let (status, body) = send(&app, from_peer(get("/health", None), "10.0.0.9")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Access denied");

    let (status, body) = send(&app, get("/blacklist/10.0.0.9", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["blacklisted"], true);
}

#[tokio::test]
async fn invisible_vote_is_not_found() {
    let app = app();
    let id = open_ban_vote(&app).await;

    let (status, body) = send(&app, get(&format!("/votes/{id}"), Some("mason"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], format!("vote {id} not found"));

    let (status, _) = send(
        &app,
        post(
            &format!("/votes/{id}/ballots"),
            Some("mason"),
            Some(json!({ "decision": "AGREE" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, get("/votes", Some("silver1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["votes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_ballots_are_bad_requests() {
    let app = app();
    let id = open_ban_vote(&app).await;

    let (status, _) = send(
        &app,
        post(
            &format!("/votes/{id}/ballots"),
            Some("silver1"),
            Some(json!({ "decision": "agree" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post(
            &format!("/votes/{id}/ballots"),
            Some("silver1"),
            Some(json!({ "choice": "AGREE" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post(
            "/votes/not-a-number/ballots",
            Some("silver1"),
            Some(json!({ "decision": "AGREE" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Nominations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn nomination_errors_map_to_status() {
    let app = app();
    send(&app, post("/scheduler/inquisitor", None, None)).await;

    let nominate = |member: &str, target: &str| {
        post(
            "/nominations",
            Some(member),
            Some(json!({ "target": target })),
        )
    };
    let (status, _) = send(&app, nominate("silver1", "target")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, nominate("inquisitor", "nobody")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(&app, nominate("inquisitor", "inquisitor")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "you cannot nominate yourself");
}

#[tokio::test]
async fn candidates_exclude_the_inquisitor() {
    let app = app();
    send(&app, post("/scheduler/inquisitor", None, None)).await;

    let (status, body) = send(&app, get("/nominations/candidates", Some("inquisitor"))).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["mason", "silver1", "target"]);

    let (status, _) = send(&app, get("/nominations/candidates", Some("mason"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Promotions and scheduler
// ---------------------------------------------------------------------------

#[tokio::test]
async fn promotion_is_created_then_cooled_down() {
    let app = app();
    let (status, body) = send(&app, post("/promotions", Some("mason"), None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["category"], "PROMOTE_SILVER");
    assert_eq!(body["target"], "mason");

    let (status, body) = send(&app, post("/promotions", Some("mason"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["detail"].as_str().unwrap().contains("cooldown"));
}

#[tokio::test]
async fn selection_without_candidates_is_ok() {
    let app = app_with_metrics(true);
    let (status, body) = send(&app, post("/scheduler/inquisitor", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "no_candidates");
    assert_eq!(app.store.vote_count(), 0);
}

#[tokio::test]
async fn close_unknown_vote_is_not_found() {
    let app = app();
    let (status, _) = send(&app, post("/scheduler/votes/99/close", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn close_due_and_retirements_report_counts() {
    let app = app();
    send(&app, post("/scheduler/inquisitor", None, None)).await;
    app.clock.advance(20 * SECS_PER_HOUR);

    let (status, body) = send(&app, post("/scheduler/votes/close-due", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["closed"].as_array().unwrap().len(), 1);
    assert_eq!(body["closed"][0]["transition"]["transition"], "expired");

    let (status, body) = send(&app, post("/scheduler/retirements", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["retired"], 0);
}

// ---------------------------------------------------------------------------
// Origin tracking and metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn identified_requests_record_origin() {
    let app = app();
    let req = from_peer(get("/votes", Some("silver1")), "198.51.100.20");
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.store.member("silver1").unwrap().last_known_origin,
        Some(Origin::new("198.51.100.20"))
    );
}

#[tokio::test]
async fn unchanged_origin_is_not_rewritten() {
    let app = app();
    let req = || from_peer(get("/votes", Some("silver1")), "198.51.100.20");
    send(&app, req()).await;
    let commits = app.store.commits();

    let (status, _) = send(&app, req()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, req()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.commits(), commits);
}

#[tokio::test]
async fn forwarded_header_from_untrusted_peer_is_ignored() {
    let app = app();
    let id = open_ban_vote(&app).await;
    send(
        &app,
        post(
            &format!("/votes/{id}/ballots"),
            Some("silver1"),
            Some(json!({ "decision": "AGREE" })),
        ),
    )
    .await;
    app.clock.advance(4 * SECS_PER_HOUR);
    let (_, body) = send(&app, post(&format!("/scheduler/votes/{id}/close"), None, None)).await;
    assert_eq!(body["consequence"]["consequence"], "banned");

    let spoofed = forwarded(from_peer(get("/health", None), "10.0.0.9"), "1.2.3.4");
    let (status, body) = send(&app, spoofed).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Access denied");

    let req = forwarded(
        from_peer(get("/votes", Some("silver1")), "198.51.100.20"),
        "203.0.113.77",
    );
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.store.member("silver1").unwrap().last_known_origin,
        Some(Origin::new("198.51.100.20"))
    );
}

#[tokio::test]
async fn trusted_proxy_reports_the_client_origin() {
    let app = seed(app_with(true, vec!["172.16.0.1".parse().unwrap()]));

    let req = forwarded(
        from_peer(get("/votes", Some("silver1")), "172.16.0.1"),
        "198.51.100.30, 172.16.0.1",
    );
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.store.member("silver1").unwrap().last_known_origin,
        Some(Origin::new("198.51.100.30"))
    );

    let bare = from_peer(get("/votes", Some("mason")), "172.16.0.1");
    send(&app, bare).await;
    assert_eq!(
        app.store.member("mason").unwrap().last_known_origin,
        Some(Origin::new("172.16.0.1"))
    );
}

#[tokio::test]
async fn metrics_count_activity() {
    let app = app();
    let id = open_ban_vote(&app).await;
    send(
        &app,
        post(
            &format!("/votes/{id}/ballots"),
            Some("silver1"),
            Some(json!({ "decision": "AGREE" })),
        ),
    )
    .await;
    send(
        &app,
        post(
            &format!("/votes/{id}/ballots"),
            Some("mason"),
            Some(json!({ "decision": "AGREE" })),
        ),
    )
    .await;
    app.clock.advance(4 * SECS_PER_HOUR);
    send(&app, post("/scheduler/votes/close-due", None, None)).await;
    send(&app, post("/scheduler/votes/close-due", None, None)).await;
    send(&app, post(&format!("/scheduler/votes/{id}/close"), None, None)).await;

    let response = app
        .router
        .clone()
        .oneshot(get("/metrics", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("conclave_ballots_cast_total 1"));
    assert!(text.contains("conclave_ballots_rejected_total 1"));
    assert!(text.contains("conclave_nominations_total 1"));
    assert!(text.contains("conclave_inquisitor_rotations_total 1"));
    assert!(text.contains("conclave_votes_closed_total 1"));
}

#[tokio::test]
async fn metrics_can_be_disabled() {
    let app = app_with_metrics(false);
    let (status, _) = send(&app, get("/metrics", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
