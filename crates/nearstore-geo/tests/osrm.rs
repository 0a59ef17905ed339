//! Integration tests for `OsrmClient` using wiremock HTTP mocks.

use std::time::Duration;

use nearstore_core::{Coordinate, LogStatus};
use nearstore_geo::{NoRouteReason, OsrmClient, RouteError, RouteOutcome, RouteProvider};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> OsrmClient {
    OsrmClient::with_base_url(base_url, 1, "nearstore-test/0.1")
        .expect("client construction should not fail")
}

fn origin() -> Coordinate {
    Coordinate::new(-19.92, -43.94).unwrap()
}

fn destination() -> Coordinate {
    Coordinate::new(-19.85, -43.95).unwrap()
}

const ROUTE_PATH: &str = "/route/v1/driving/-43.94,-19.92;-43.95,-19.85";


/// Base URL of a loopback port with nothing listening on it.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

#[tokio::test]
async fn route_parses_distance_duration_and_geometry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ROUTE_PATH))
        .and(query_param("overview", "full"))
        .and(query_param("geometries", "geojson"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "Ok",
            "routes": [{
                "distance": 8432.1,
                "duration": 905.3,
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[-43.94, -19.92], [-43.945, -19.88], [-43.95, -19.85]]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let outcome = client.route(origin(), destination()).await.unwrap();

    let RouteOutcome::Found(route) = outcome else {
        panic!("expected a route, got {outcome:?}");
    };
    assert!((route.distance_km - 8.4321).abs() < 1e-9);
    assert!((route.duration_secs - 905.3).abs() < 1e-9);
    assert_eq!(route.path.len(), 3);
    assert_eq!(route.path[0], [-43.94, -19.92]);
    assert_eq!(route.display_path()[0], [-19.92, -43.94]);
}

#[tokio::test]
async fn route_empty_routes_is_no_route() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ROUTE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "code": "Ok", "routes": [] })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let outcome = client.route(origin(), destination()).await.unwrap();
    assert_eq!(outcome, RouteOutcome::NoRoute(NoRouteReason::NoRoutes));
}

#[tokio::test]
async fn route_osrm_no_route_code_is_no_route() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ROUTE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": "NoRoute",
            "message": "Impossible route between points"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let outcome = client.route(origin(), destination()).await.unwrap();
    assert_eq!(outcome, RouteOutcome::NoRoute(NoRouteReason::NoRoutes));
}

#[tokio::test]
async fn route_missing_geometry_is_missing_field() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ROUTE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "Ok",
            "routes": [{ "distance": 100.0, "duration": 20.0 }]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let outcome = client.route(origin(), destination()).await.unwrap();
    assert_eq!(
        outcome,
        RouteOutcome::NoRoute(NoRouteReason::MissingField("geometry"))
    );
}

#[tokio::test]
async fn route_server_error_is_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ROUTE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.route(origin(), destination()).await.unwrap_err();
    assert!(matches!(err, RouteError::Status { status: 500, .. }));
    assert_eq!(err.log_status(), LogStatus::RouteHttpError);
}

#[tokio::test]
async fn route_malformed_body_is_unexpected_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ROUTE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.route(origin(), destination()).await.unwrap_err();
    assert_eq!(err.log_status(), LogStatus::RouteUnexpectedError);
}

#[tokio::test]
async fn route_slow_server_is_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ROUTE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "code": "Ok", "routes": [] }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.route(origin(), destination()).await.unwrap_err();
    assert!(matches!(err, RouteError::Timeout(_)));
    assert_eq!(err.log_status(), LogStatus::RouteTimeout);
}

#[tokio::test]
async fn route_unreachable_server_is_connection_error() {
    let client = test_client(&closed_port_url());
    let err = client.route(origin(), destination()).await.unwrap_err();
    assert!(matches!(err, RouteError::Connect(_)));
    assert_eq!(err.log_status(), LogStatus::RouteConnectionError);
}

#[tokio::test]
async fn route_truncated_body_is_not_a_connection_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = [0_u8; 1024];
        let _ = socket.read(&mut request).await;
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 500\r\n\r\n{\"code\":\"Ok\"")
            .await
            .expect("write partial response");
    });

    let client = test_client(&format!("http://{addr}"));
    let err = client.route(origin(), destination()).await.unwrap_err();
    assert!(matches!(err, RouteError::Transport(_)));
    assert_eq!(err.log_status(), LogStatus::RouteUnexpectedError);
}
