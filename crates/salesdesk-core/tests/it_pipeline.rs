//! Integration tests for credential attachment and silent refresh

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use mockito::{Matcher, Server, ServerGuard};
use salesdesk_core::auth::store::{ACCESS_KEY, REFRESH_KEY};
use salesdesk_core::auth::{KeyValueStore, MemoryStore};
use salesdesk_core::models::ProductInput;
use salesdesk_core::{ApiClient, ApiError, ListQuery, Session};
use serde_json::json;

const PRODUCTS_BODY: &str = r#"{"count": 1, "results": [
    {"id": 1, "nombre": "Pan", "descripcion": "", "precio": "1.20", "stock": 30}
]}"#;

fn token(user: &str, expires_in_secs: i64) -> String {
    let exp = (Utc::now() + Duration::seconds(expires_in_secs)).timestamp();
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({ "exp": exp, "user_id": 1, "username": user }).to_string(),
    );
    format!("{}.{}.signature", header, payload)
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

fn client_for(server: &ServerGuard, session: Arc<Session>) -> ApiClient {
    ApiClient::new(&format!("{}/api", server.url()), session).expect("client")
}

fn logged_in(access: &str, refresh: &str) -> Arc<Session> {
    let session = Session::in_memory();
    session.set_session(access, refresh);
    Arc::new(session)
}

#[tokio::test]
async fn valid_access_is_attached_as_bearer() {
    //* Given
    let mut server = Server::new_async().await;
    let access = token("ana", 300);

    let products = server
        .mock("GET", "/api/productos/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("search".into(), "pan".into()),
            Matcher::UrlEncoded("ordering".into(), "nombre".into()),
        ]))
        .match_header("authorization", bearer(&access).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PRODUCTS_BODY)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, logged_in(&access, "r1"));

    //* When
    let items = client
        .list_products(&ListQuery::default().search("pan").ordering("nombre"))
        .await
        .expect("list products");

    //* Then
    products.assert_async().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].price, 1.2);
}

#[tokio::test]
async fn no_header_without_stored_access() {
    //* Given
    let mut server = Server::new_async().await;
    let customers = server
        .mock("GET", "/api/clientes/")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, Arc::new(Session::in_memory()));

    //* When
    let items = client
        .list_customers(&ListQuery::default())
        .await
        .expect("list customers");

    //* Then
    customers.assert_async().await;
    assert!(items.is_empty());
}

#[tokio::test]
async fn expired_access_is_not_attached() {
    //* Given
    let mut server = Server::new_async().await;
    let customers = server
        .mock("GET", "/api/clientes/")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, logged_in(&token("ana", -60), "r1"));

    //* When
    let result = client.list_customers(&ListQuery::default()).await;

    //* Then
    customers.assert_async().await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn denial_then_refresh_then_single_retry() {
    //* Given
    let mut server = Server::new_async().await;
    let old_access = token("ana", 300);
    let new_access = token("ana", 600);

    let denied = server
        .mock("GET", "/api/productos/")
        .match_header("authorization", bearer(&old_access).as_str())
        .with_status(401)
        .with_body(r#"{"detail": "Token is invalid or expired"}"#)
        .expect(1)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/api/token/refresh/")
        .match_body(Matcher::Json(json!({ "refresh": "r1" })))
        .with_status(200)
        .with_body(json!({ "access": new_access }).to_string())
        .expect(1)
        .create_async()
        .await;

    let retried = server
        .mock("GET", "/api/productos/")
        .match_header("authorization", bearer(&new_access).as_str())
        .with_status(200)
        .with_body(PRODUCTS_BODY)
        .expect(1)
        .create_async()
        .await;

    let session = logged_in(&old_access, "r1");
    let client = client_for(&server, Arc::clone(&session));

    //* When
    let items = client
        .list_products(&ListQuery::default())
        .await
        .expect("request should recover");

    //* Then
    denied.assert_async().await;
    refresh.assert_async().await;
    retried.assert_async().await;
    assert_eq!(items[0].name, "Pan");
    assert_eq!(session.current_access(), Some(new_access));
    assert_eq!(session.current_refresh().as_deref(), Some("r1"));
    assert!(session.identity().is_some());
}

#[tokio::test]
async fn denial_after_retry_is_final() {
    //* Given
    let mut server = Server::new_async().await;
    let old_access = token("ana", 300);
    let new_access = token("ana", 600);

    let denied = server
        .mock("GET", "/api/ventas/")
        .match_query(Matcher::UrlEncoded("ordering".into(), "-fecha".into()))
        .match_header("authorization", bearer(&old_access).as_str())
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/api/token/refresh/")
        .with_status(200)
        .with_body(json!({ "access": new_access }).to_string())
        .expect(1)
        .create_async()
        .await;

    let denied_again = server
        .mock("GET", "/api/ventas/")
        .match_query(Matcher::UrlEncoded("ordering".into(), "-fecha".into()))
        .match_header("authorization", bearer(&new_access).as_str())
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let session = logged_in(&old_access, "r1");
    let client = client_for(&server, Arc::clone(&session));

    //* When
    let result = client.list_sales(None).await;

    //* Then
    denied.assert_async().await;
    refresh.assert_async().await;
    denied_again.assert_async().await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
    // The refresh itself succeeded, so the session is kept
    assert_eq!(session.current_access(), Some(new_access));
}

#[tokio::test]
async fn denial_without_refresh_credential_skips_refresh() {
    //* Given
    let mut server = Server::new_async().await;
    let access = token("ana", 300);

    let denied = server
        .mock("GET", "/api/productos/")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/api/token/refresh/")
        .with_status(200)
        .with_body(r#"{"access": "unused"}"#)
        .expect(0)
        .create_async()
        .await;

    let store = MemoryStore::with_entries([(ACCESS_KEY, access.clone())]);
    let session = Arc::new(Session::load(Box::new(store)));
    let client = client_for(&server, Arc::clone(&session));

    //* When
    let result = client.list_products(&ListQuery::default()).await;

    //* Then
    denied.assert_async().await;
    refresh.assert_async().await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert_eq!(session.current_access(), Some(access));
}

#[tokio::test]
async fn refresh_failure_clears_session() {
    //* Given
    let mut server = Server::new_async().await;
    let access = token("ana", 300);

    let denied = server
        .mock("DELETE", "/api/productos/4/")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/api/token/refresh/")
        .with_status(401)
        .with_body(r#"{"detail": "Token is blacklisted"}"#)
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    let session = Arc::new(Session::load(Box::new(SharedStore(Arc::clone(&store)))));
    session.set_session(&access, "r1");
    let client = client_for(&server, Arc::clone(&session));

    //* When
    let result = client.delete_product(4).await;

    //* Then
    denied.assert_async().await;
    refresh.assert_async().await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert!(session.snapshot().is_empty());
    assert!(!client.is_authenticated());
    assert_eq!(store.get(ACCESS_KEY).unwrap(), None);
    assert_eq!(store.get(REFRESH_KEY).unwrap(), None);
}

#[tokio::test]
async fn unreadable_refresh_response_clears_session() {
    //* Given
    let mut server = Server::new_async().await;
    let denied = server
        .mock("GET", "/api/clientes/")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/token/refresh/")
        .with_status(200)
        .with_body("<html>oops</html>")
        .expect(1)
        .create_async()
        .await;

    let session = logged_in(&token("ana", 300), "r1");
    let client = client_for(&server, Arc::clone(&session));

    //* When
    let result = client.list_customers(&ListQuery::default()).await;

    //* Then
    denied.assert_async().await;
    refresh.assert_async().await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert!(session.snapshot().is_empty());
}

#[tokio::test]
async fn validation_errors_pass_through_without_refresh() {
    //* Given
    let mut server = Server::new_async().await;
    let body = r#"{"precio": ["Ensure this value is greater than or equal to 0."]}"#;

    let create = server
        .mock("POST", "/api/productos/")
        .match_body(Matcher::PartialJson(json!({ "nombre": "Pan" })))
        .with_status(400)
        .with_body(body)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/token/refresh/")
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server, logged_in(&token("ana", 300), "r1"));
    let input = ProductInput {
        name: "Pan".to_string(),
        description: String::new(),
        price: -1.0,
        stock: 1,
    };

    //* When
    let result = client.create_product(&input).await;

    //* Then
    create.assert_async().await;
    refresh.assert_async().await;
    match result {
        Err(ApiError::Validation(b)) => assert_eq!(b, body),
        other => panic!("unexpected {:?}", other),
    }
}

/// Lets the test inspect the store after handing it to the session.
struct SharedStore(Arc<MemoryStore>);

impl KeyValueStore for SharedStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.0.set(key, value)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.0.remove(key)
    }
}
