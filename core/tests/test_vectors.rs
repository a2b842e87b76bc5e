//! Check request building and status classification against the JSON
//! vectors in `test-vectors/`.
//!
//! Bodies are compared as parsed JSON so field order does not matter.

use std::sync::Arc;

use async_trait::async_trait;
use cycle_core::{
    ApiClient, ApiError, HttpMethod, HttpRequest, HttpResponse, Transport, TransportError, User,
};

/// Build/parse never touch the network; any call here is a test bug.
struct NoTransport;

#[async_trait]
impl Transport for NoTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        panic!("unexpected network call: {} {}", request.method, request.url);
    }
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(base_url, Arc::new(NoTransport))
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

#[test]
fn request_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();
    let base_url = vectors["base_url"].as_str().unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let c = client(base_url);
        c.set_auth_token(case["token"].as_str().map(str::to_string));

        let method = parse_method(case["method"].as_str().unwrap());
        let path = case["path"].as_str().unwrap();
        let body = case.get("body").filter(|b| !b.is_null());

        let req = c.build_request(method, path, body).unwrap();
        let expected = &case["expected_request"];

        assert_eq!(req.method, method, "{name}: method");
        assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");

        let expected_headers: Vec<(String, String)> = expected["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let pair = h.as_array().unwrap();
                (pair[0].as_str().unwrap().to_string(), pair[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");

        match (&req.body, &expected["body"]) {
            (None, serde_json::Value::Null) => {}
            (Some(sent), want) => {
                let sent: serde_json::Value = serde_json::from_str(sent).unwrap();
                assert_eq!(&sent, want, "{name}: body");
            }
            (None, want) => panic!("{name}: expected body {want}, sent none"),
        }
    }
}

#[test]
fn status_vectors() {
    let raw = include_str!("../../test-vectors/status.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();
    let c = client("http://localhost:5000/api");

    for case in vectors["cases"].as_array().unwrap() {
        let status = case["status"].as_u64().unwrap() as u16;
        let response = HttpResponse::new(status, case["body"].as_str().unwrap());
        let result: Result<User, ApiError> = c.parse_response(response);

        match case["expected"].as_str().unwrap() {
            "ok" => assert!(result.is_ok(), "{status}: {result:?}"),
            "decoding_failed" => {
                assert!(matches!(result, Err(ApiError::DecodingFailed(_))), "{status}: {result:?}")
            }
            "unauthorized" => assert_eq!(result, Err(ApiError::Unauthorized), "{status}"),
            "client_error" => assert_eq!(result, Err(ApiError::ClientError(status)), "{status}"),
            "server_error" => assert_eq!(result, Err(ApiError::ServerError(status)), "{status}"),
            "unexpected_status" => {
                assert_eq!(result, Err(ApiError::UnexpectedStatus(status)), "{status}")
            }
            other => panic!("{status}: unknown expectation {other}"),
        }
    }
}

#[test]
fn relative_base_is_invalid_address() {
    let c = client("api.example.com");
    let err = c
        .build_request::<()>(HttpMethod::Get, "/cycles", None)
        .unwrap_err();
    assert_eq!(err, ApiError::InvalidAddress);
}
