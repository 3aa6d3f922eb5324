use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{
    app, app_with_prefix, app_with_state, new_db, AccessKey, AccessKeyList, MetricsSetting,
    ServerInfo, UsageMetrics,
};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

// --- server ---

#[tokio::test]
async fn get_server_returns_metadata() {
    let resp = app().oneshot(empty_request("GET", "/server")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let info: ServerInfo = body_json(resp).await;
    assert_eq!(info.name, "Outline Server");
    assert!(!info.metrics_enabled);
    assert_eq!(info.port_for_new_access_keys, 443);
}

#[tokio::test]
async fn rename_server_returns_204() {
    let db = new_db("127.0.0.1", 443);
    let resp = app_with_state(db.clone())
        .oneshot(json_request("PUT", "/name", r#"{"name":"Renamed"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(db.read().await.info.name, "Renamed");
}

#[tokio::test]
async fn rename_server_rejects_blank_name() {
    let resp = app()
        .oneshot(json_request("PUT", "/name", r#"{"name":"  "}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rename_server_malformed_json_returns_422() {
    let resp = app()
        .oneshot(json_request("PUT", "/name", r#"{"title":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- metrics ---

#[tokio::test]
async fn metrics_setting_round_trip() {
    let db = new_db("127.0.0.1", 443);

    let resp = app_with_state(db.clone())
        .oneshot(json_request("PUT", "/metrics/enabled", r#"{"metricsEnabled":true}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app_with_state(db)
        .oneshot(empty_request("GET", "/metrics/enabled"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let setting: MetricsSetting = body_json(resp).await;
    assert!(setting.metrics_enabled);
}

#[tokio::test]
async fn transfer_metrics_reports_recorded_bytes() {
    let db = new_db("127.0.0.1", 443);
    db.write().await.record_transfer("0", 1024);

    let resp = app_with_state(db)
        .oneshot(empty_request("GET", "/metrics/transfer"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let usage: UsageMetrics = body_json(resp).await;
    assert_eq!(usage.bytes_transferred_by_user_id["0"], 1024);
}

// --- access keys ---

#[tokio::test]
async fn list_access_keys_empty() {
    let resp = app().oneshot(empty_request("GET", "/access-keys")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let list: AccessKeyList = body_json(resp).await;
    assert!(list.access_keys.is_empty());
}

#[tokio::test]
async fn create_access_key_returns_201() {
    let resp = app().oneshot(empty_request("POST", "/access-keys")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let key: AccessKey = body_json(resp).await;
    assert_eq!(key.id, "0");
    assert_eq!(key.method, "chacha20-ietf-poly1305");
    assert!(key.access_url.starts_with("ss://"));
}

#[tokio::test]
async fn delete_access_key_not_found() {
    let resp = app()
        .oneshot(empty_request("DELETE", "/access-keys/42"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rename_access_key_not_found() {
    let resp = app()
        .oneshot(json_request("PUT", "/access-keys/42/name", r#"{"name":"x"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn encoded_slash_id_is_one_segment() {
    let db = new_db("127.0.0.1", 443);
    {
        let mut state = db.write().await;
        let mut key = state.create_access_key();
        key.id = "a/b".to_string();
        state.insert_access_key(key);
    }

    let resp = app_with_state(db.clone())
        .oneshot(empty_request("DELETE", "/access-keys/a%2Fb"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(db.read().await.access_keys().iter().all(|k| k.id != "a/b"));
}

// --- prefix ---

#[tokio::test]
async fn prefixed_router_hides_api() {
    let db = new_db("127.0.0.1", 443);

    let resp = app_with_prefix("SECRET", db.clone())
        .oneshot(empty_request("GET", "/SECRET/server"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app_with_prefix("SECRET", db)
        .oneshot(empty_request("GET", "/server"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full access-key lifecycle ---

#[tokio::test]
async fn access_key_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create two keys
    let mut ids = Vec::new();
    for _ in 0..2 {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(empty_request("POST", "/access-keys"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let key: AccessKey = body_json(resp).await;
        ids.push(key.id);
    }

    // rename the first
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/access-keys/{}/name", ids[0]),
            r#"{"name":"laptop"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // list keeps creation order and shows the new name
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/access-keys"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let list: AccessKeyList = body_json(resp).await;
    let listed: Vec<&str> = list.access_keys.iter().map(|k| k.id.as_str()).collect();
    assert_eq!(listed, vec![ids[0].as_str(), ids[1].as_str()]);
    assert_eq!(list.access_keys[0].name, "laptop");
    assert_eq!(list.access_keys[1].name, "");

    // delete the first
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/access-keys/{}", ids[0])))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let body = body_bytes(resp).await;
    assert!(body.is_empty());

    // delete again — 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/access-keys/{}", ids[0])))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // list — only the second remains
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/access-keys"))
        .await
        .unwrap();
    let list: AccessKeyList = body_json(resp).await;
    assert_eq!(list.access_keys.len(), 1);
    assert_eq!(list.access_keys[0].id, ids[1]);
}
