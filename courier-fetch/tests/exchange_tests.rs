//! Integration tests for the request and response chains.

mod common;

use std::sync::Arc;

use common::{HarnessBuilder, MockTransport, jwt};
use courier_core::{Codec, KeyMap, RequestSpec, ResponseBody, TypedSchema};
use courier_fetch::host::storage::keys;
use courier_fetch::{
    ExchangeClient, ExchangeContext, ExchangeError, RawResponse, StoredToken,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_url_template_and_body_routing() {
    let h = HarnessBuilder::new(MockTransport::ok(json!({}))).build();

    h.client
        .exchange(RequestSpec::put("/users/{id}").with_payload(json!({ "id": 5, "name": "x" })))
        .await
        .unwrap();
    h.client
        .exchange(
            RequestSpec::put("/users/{id}")
                .with_payload(json!({ "id": 6, "name": "y" }))
                .keep_url_params(),
        )
        .await
        .unwrap();
    h.client
        .exchange(RequestSpec::get("/search").with_payload(json!({ "q": "tea", "page": 2 })))
        .await
        .unwrap();

    let requests = h.transport.requests();
    assert_eq!(requests[0].url, "/users/5");
    assert_eq!(requests[0].body, Some(json!({ "name": "x" })));
    assert_eq!(requests[0].query, None);

    assert_eq!(requests[1].url, "/users/6");
    assert_eq!(requests[1].body, Some(json!({ "id": 6, "name": "y" })));

    assert_eq!(requests[2].body, None);
    assert_eq!(
        requests[2].query_pairs(),
        vec![
            ("page".to_string(), "2".to_string()),
            ("q".to_string(), "tea".to_string())
        ]
    );
}

#[tokio::test]
async fn test_preference_and_token_headers() {
    let h = HarnessBuilder::new(MockTransport::ok(json!({}))).build();
    h.session.set(keys::CURRENCY, "TWD");
    h.local.set(keys::LANGUAGE, "zh-TW");
    h.client.credentials().store_tokens("abc", "r").await.unwrap();

    h.client.exchange(RequestSpec::get("/cart")).await.unwrap();

    let sent = &h.transport.requests()[0];
    assert_eq!(sent.header("currency"), Some("TWD"));
    assert_eq!(sent.header("x-locale"), Some("zh-TW"));
    assert_eq!(sent.header("authorization"), Some("Bearer abc"));
}

#[tokio::test]
async fn test_offline_never_reaches_transport() {
    let h = HarnessBuilder::new(MockTransport::ok(json!({}))).build();
    h.network.set_online(false);

    let err = h.client.exchange(RequestSpec::get("/cart")).await.unwrap_err();

    assert!(matches!(err, ExchangeError::Offline { .. }));
    assert_eq!(h.transport.calls(), 0);
    assert_eq!(h.refresher.calls(), 0);
}

#[tokio::test]
async fn test_envelope_added_unless_present() {
    let h = HarnessBuilder::new(MockTransport::new(|request| {
        let body = if request.url == "/flagged" {
            json!({ "success": false, "code": 7 })
        } else {
            json!({ "items": [] })
        };
        Ok(RawResponse::json(200, body))
    }))
    .build();

    let body = h.client.exchange(RequestSpec::get("/plain")).await.unwrap();
    assert_eq!(body.into_json(), json!({ "items": [], "success": true }));

    let body = h.client.exchange(RequestSpec::get("/flagged")).await.unwrap();
    assert_eq!(body.into_json(), json!({ "success": false, "code": 7 }));
}

#[tokio::test]
async fn test_binary_body_passes_through() {
    let h = HarnessBuilder::new(MockTransport::new(|_| {
        Ok(RawResponse {
            status: 200,
            body: ResponseBody::Binary(vec![0x89, 0x50, 0x4e, 0x47]),
            ..Default::default()
        })
    }))
    .build();

    let body = h.client.exchange(RequestSpec::get("/logo.png")).await.unwrap();
    assert_eq!(body, ResponseBody::Binary(vec![0x89, 0x50, 0x4e, 0x47]));
}

#[tokio::test]
async fn test_tokens_in_response_are_stored() {
    let refresh = jwt(&json!({ "sub": "u1", "exp": 4_102_444_800_i64 }));
    let body = json!({ "accessToken": "a1", "refreshToken": refresh });
    let h = HarnessBuilder::new(MockTransport::ok(body)).build();

    let response = h.client.exchange(RequestSpec::post("/login")).await.unwrap();
    assert_eq!(response.as_json().unwrap()["success"], json!(true));

    assert_eq!(h.client.credentials().access_token().await.as_deref(), Some("a1"));
    let StoredToken { expires_at, .. } = h.tokens.entry("refreshToken").await.unwrap();
    assert_eq!(expires_at.unwrap().timestamp(), 4_102_444_800);
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Order {
    order_id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct OrderRow {
    order_id: u64,
}

fn order_codec() -> Arc<Codec> {
    Arc::new(
        Codec::new()
            .with_response(TypedSchema::<Order>::new(), TypedSchema::<OrderRow>::new())
            .with_key_map(KeyMap::new().with("order_id", "orderId")),
    )
}

#[tokio::test]
async fn test_response_codec_remaps_and_keeps_envelope() {
    let h = HarnessBuilder::new(MockTransport::ok(json!({ "order_id": 7 }))).build();

    let order: Order = h
        .client
        .exchange_json(RequestSpec::get("/orders/7").with_codec(order_codec()))
        .await
        .unwrap();
    assert_eq!(order.order_id, 7);

    let body = h
        .client
        .exchange(RequestSpec::get("/orders/7").with_codec(order_codec()))
        .await
        .unwrap();
    assert_eq!(body.into_json(), json!({ "orderId": 7, "success": true }));
}

#[tokio::test]
async fn test_response_codec_mismatch_is_lenient() {
    let h = HarnessBuilder::new(MockTransport::ok(json!({ "unexpected": "shape" }))).build();

    let body = h
        .client
        .exchange(RequestSpec::get("/orders/7").with_codec(order_codec()))
        .await
        .unwrap();

    assert_eq!(body.into_json(), json!({ "unexpected": "shape", "success": true }));
}

#[tokio::test]
async fn test_end_to_end_guest_token_bootstrap() {
    let server = MockServer::start().await;
    let refresh = jwt(&json!({ "exp": 4_102_444_800_i64 }));

    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "orders": [] })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "expired" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/authorization/initializeToken"))
        .and(header("authorization", "Bearer noAccess"))
        .and(header("x-refresh-token", "Bearer noRefresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "refresh_token": refresh,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = ExchangeContext::builder()
        .base_url(format!("{}/api", server.uri()))
        .build()
        .unwrap();
    let client = ExchangeClient::new(ctx);

    let body = client.exchange(RequestSpec::get("/orders")).await.unwrap();

    assert_eq!(body.into_json(), json!({ "orders": [], "success": true }));
    let credential = client.credentials().current().await.unwrap();
    assert_eq!(credential.access_token, "fresh");
    assert_eq!(credential.refresh_expiry.unwrap().timestamp(), 4_102_444_800);
}
