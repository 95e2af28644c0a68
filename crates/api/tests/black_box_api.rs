use std::sync::Arc;

use partforge_api::app::services::AppServices;
use partforge_infra::alerts::InMemoryNotifier;
use partforge_infra::config::AppConfig;
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    notifier: Arc<InMemoryNotifier>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        partforge_observability::init();

        // Same router as prod, in-memory stores, ephemeral port.
        let notifier = Arc::new(InMemoryNotifier::new());
        let services = AppServices::in_memory(&AppConfig::default(), notifier.clone());
        let app = partforge_api::app::build_app(Arc::new(services));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            notifier,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_part(client: &reqwest::Client, srv: &TestServer, body: Value) -> Value {
    let res = client.post(srv.url("/parts")).json(&body).send().await.unwrap();
    if res.status() != StatusCode::CREATED {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        panic!("expected 201 from create, got {status} body={body}");
    }
    res.json().await.unwrap()
}

async fn get_part(client: &reqwest::Client, srv: &TestServer, code: &str) -> Value {
    let res = client
        .get(srv.url(&format!("/parts/{code}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

/// CHAIR = 2 x BRACKET + 8 x SCREW-10MM.
async fn seed_chair(client: &reqwest::Client, srv: &TestServer, brackets: i64, screws: i64) {
    create_part(client, srv, json!({"code": "CHAIR", "name": "Chair"})).await;
    create_part(
        client,
        srv,
        json!({"code": "BRACKET", "name": "Bracket", "quantity": brackets, "min_quantity": 4}),
    )
    .await;
    create_part(
        client,
        srv,
        json!({"code": "SCREW-10MM", "name": "Screw 10mm", "quantity": screws}),
    )
    .await;

    let res = client
        .put(srv.url("/bom/CHAIR"))
        .json(&json!({"components": [
            {"component_code": "BRACKET", "units_per_parent": 2},
            {"component_code": "SCREW-10MM", "units_per_parent": 8},
        ]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["parent_code"], "CHAIR");
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn health_reports_store_kind() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["store"], "memory");
    assert!(body["time"].is_string());
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/nope")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn part_lifecycle_create_get_duplicate() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create_part(
        &client,
        &srv,
        json!({"code": "BRACKET", "name": "Bracket", "quantity": "5", "min_quantity": 10}),
    )
    .await;
    assert_eq!(created["code"], "BRACKET");
    assert_eq!(created["quantity"], 5);

    let fetched = get_part(&client, &srv, "BRACKET").await;
    assert_eq!(fetched["name"], "Bracket");
    assert_eq!(fetched["min_quantity"], 10);

    let res = client
        .post(srv.url("/parts"))
        .json(&json!({"code": "BRACKET", "name": "Other"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "ALREADY_EXISTS");

    let res = reqwest::get(srv.url("/parts/MISSING")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn validation_errors_name_the_field() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/parts"))
        .json(&json!({"code": "A", "name": "A", "quantity": -1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["field"], "quantity");

    let res = reqwest::get(srv.url("/parts?below_min=maybe")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_applies_delta_and_lists_below_min() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    create_part(
        &client,
        &srv,
        json!({"code": "BRACKET", "name": "Bracket", "quantity": 5, "min_quantity": 10}),
    )
    .await;
    create_part(&client, &srv, json!({"code": "NUT", "name": "Nut", "quantity": 50})).await;

    let res = reqwest::get(srv.url("/parts?below_min=true")).await.unwrap();
    let low: Vec<Value> = res.json().await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["code"], "BRACKET");

    let res = client
        .patch(srv.url("/parts/BRACKET"))
        .json(&json!({"quantity_delta": 7}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["quantity"], 12);

    let res = client
        .patch(srv.url("/parts/BRACKET"))
        .json(&json!({"quantity_delta": -20}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "INSUFFICIENT_STOCK");

    let res = reqwest::get(srv.url("/parts?below_min=true")).await.unwrap();
    let low: Vec<Value> = res.json().await.unwrap();
    assert!(low.is_empty());
}

#[tokio::test]
async fn bom_replace_and_build() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    seed_chair(&client, &srv, 10, 100).await;

    let res = reqwest::get(srv.url("/bom/CHAIR")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bom: Vec<Value> = res.json().await.unwrap();
    assert_eq!(bom.len(), 2);
    assert_eq!(bom[0]["component_code"], "BRACKET");
    assert_eq!(bom[1]["units_per_parent"], 8);

    let res = client
        .post(srv.url("/assemblies/CHAIR/build"))
        .json(&json!({"quantity": 3}))
        .send()
        .await
        .unwrap();
    if res.status() != StatusCode::OK {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        panic!("expected 200 OK from build, got {status} body={body}");
    }
    let chair: Value = res.json().await.unwrap();
    assert_eq!(chair["code"], "CHAIR");
    assert_eq!(chair["quantity"], 3);

    assert_eq!(get_part(&client, &srv, "BRACKET").await["quantity"], 4);
    assert_eq!(get_part(&client, &srv, "SCREW-10MM").await["quantity"], 76);
}

#[tokio::test]
async fn build_with_short_stock_reports_missing_and_writes_nothing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    seed_chair(&client, &srv, 3, 100).await;

    let res = client
        .post(srv.url("/assemblies/CHAIR/build"))
        .json(&json!({"quantity": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "INSUFFICIENT_STOCK");
    let missing = body["missing"].as_array().unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0]["code"], "BRACKET");
    assert_eq!(missing[0]["need"], 4);
    assert_eq!(missing[0]["have"], 3);

    assert_eq!(get_part(&client, &srv, "CHAIR").await["quantity"], 0);
    assert_eq!(get_part(&client, &srv, "BRACKET").await["quantity"], 3);
    assert_eq!(get_part(&client, &srv, "SCREW-10MM").await["quantity"], 100);
}

#[tokio::test]
async fn build_without_bom_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    create_part(&client, &srv, json!({"code": "TABLE", "name": "Table"})).await;

    let res = client
        .post(srv.url("/assemblies/TABLE/build"))
        .json(&json!({"quantity": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "NO_BOM_DEFINED");

    let res = client
        .post(srv.url("/assemblies/TABLE/build"))
        .json(&json!({"quantity": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["field"], "quantity");
}

#[tokio::test]
async fn low_stock_scan_is_debounced() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    create_part(
        &client,
        &srv,
        json!({"code": "BRACKET", "name": "Bracket", "quantity": 1, "min_quantity": 10}),
    )
    .await;

    let res = client.post(srv.url("/alerts/low-stock/scan")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let first: Value = res.json().await.unwrap();
    assert_eq!(first["ok"], true);
    assert_eq!(first["changed"], true);
    assert_eq!(first["count"], 1);

    let res = client.post(srv.url("/alerts/low-stock/scan")).send().await.unwrap();
    let second: Value = res.json().await.unwrap();
    assert_eq!(second["changed"], false);

    assert_eq!(srv.notifier.sent().len(), 1);
    assert!(srv.notifier.sent()[0].message.contains("BRACKET"));
}
