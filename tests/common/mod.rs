#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use clubsphere::config::Config;
use clubsphere::db::{Booking, BookingStatus, NewBooking, Party};
use clubsphere::identity::TokenVerifier;
use clubsphere::payments::{CheckoutRequest, CheckoutSession, PaymentGateway};
use clubsphere::AppState;

pub const JWT_SECRET: &str = "test-secret";

/// In-memory gateway: sessions start unpaid until `mark_paid`
#[derive(Default)]
pub struct StubGateway {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
    counter: Mutex<u32>,
    pub fail: Mutex<bool>,
}

impl StubGateway {
    pub fn mark_paid(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.get_mut(session_id).expect("unknown session");
        session.payment_status = "paid".to_string();
        session.payment_intent = Some(format!("pi_{}", session_id));
    }

    pub fn session(&self, session_id: &str) -> CheckoutSession {
        self.sessions.lock().unwrap()[session_id].clone()
    }

    pub fn created(&self) -> u32 {
        *self.counter.lock().unwrap()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        if *self.fail.lock().unwrap() {
            anyhow::bail!("Stripe API error: 500 - boom");
        }
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let id = format!("cs_test_{}", *counter);
        let session = CheckoutSession {
            id: id.clone(),
            url: Some(format!("https://checkout.stripe.test/{}", id)),
            payment_status: "unpaid".to_string(),
            payment_intent: None,
            amount_total: Some(request.unit_amount * request.quantity),
            customer_email: Some(request.customer.email.clone()),
            metadata: request
                .metadata()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        };
        self.sessions.lock().unwrap().insert(id, session.clone());
        Ok(session)
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Stripe API error: 404 - No such checkout.session"))
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
    pub gateway: Arc<StubGateway>,
}

pub async fn setup() -> TestApp {
    setup_with(|_| {}).await
}

pub async fn setup_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let mut config = Config::default();
    config.server.database_url = "sqlite::memory:".to_string();
    config.auth.jwt_secret = Some(JWT_SECRET.to_string());
    configure(&mut config);

    let db = clubsphere::db::init(&config.server.database_url)
        .await
        .expect("Failed to create test database");
    let tokens = TokenVerifier::from_config(&config.auth).expect("Failed to build verifier");
    let gateway = Arc::new(StubGateway::default());

    let state = Arc::new(AppState::new(config, db, tokens, gateway.clone()));
    let router = clubsphere::api::create_router(state.clone());

    TestApp {
        state,
        router,
        gateway,
    }
}

/// Sign an identity token for `email`
pub fn token(email: &str) -> String {
    encode(
        &Header::default(),
        &json!({
            "sub": format!("uid-{}", email),
            "email": email,
            "name": email.split('@').next().unwrap_or(email),
            "exp": chrono::Utc::now().timestamp() + 3600,
        }),
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(email) = auth {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(email)));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, uri: &str, auth: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, auth, None).await
    }

    pub async fn post(&self, uri: &str, auth: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, auth, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, auth: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, auth, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, auth: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, auth, None).await
    }

    /// Insert a user with a fixed role
    pub async fn create_user(&self, email: &str, role: &str) {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (email, name, role, created_at, last_logged_in) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(email)
        .bind(email.split('@').next().unwrap_or(email))
        .bind(role)
        .bind(&now)
        .bind(&now)
        .execute(&self.state.db)
        .await
        .expect("Failed to create test user");
    }

    /// Create a club through the API as `manager` and return its id
    pub async fn create_club(&self, manager: &str, name: &str, price: f64) -> String {
        let (status, body) = self
            .post(
                "/clubs",
                Some(manager),
                json!({
                    "name": name,
                    "description": "A club for testing",
                    "category": "Sports",
                    "location": "Dhaka",
                    "price": price,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create club failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Create an event through the API as `manager` and return its id
    pub async fn create_event(
        &self,
        manager: &str,
        club_id: &str,
        title: &str,
        max_attendees: Option<i64>,
    ) -> String {
        let date = (chrono::Utc::now() + chrono::Duration::days(7)).to_rfc3339();
        let mut body = json!({
            "clubId": club_id,
            "title": title,
            "description": "Bring water",
            "eventDate": date,
            "location": "Club house",
        });
        if let Some(max) = max_attendees {
            body["maxAttendees"] = json!(max);
        }
        let (status, body) = self.post("/events", Some(manager), body).await;
        assert_eq!(status, StatusCode::CREATED, "create event failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Insert a booking row directly in the given status
    pub async fn insert_booking(
        &self,
        club_id: &str,
        customer: &str,
        seller: &str,
        status: BookingStatus,
        price: f64,
    ) -> Booking {
        NewBooking {
            session_id: Some(format!("cs_seed_{}", uuid::Uuid::new_v4())),
            club_id: club_id.to_string(),
            transaction_id: None,
            customer: Party {
                email: customer.to_string(),
                name: None,
                image: None,
            },
            seller: Party {
                email: seller.to_string(),
                name: None,
                image: None,
            },
            club_name: "Seeded club".to_string(),
            category: Some("Sports".to_string()),
            image: None,
            status,
            price,
            quantity: 1,
        }
        .insert(&self.state.db)
        .await
        .expect("Failed to insert booking")
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar(sql)
            .fetch_one(&self.state.db)
            .await
            .expect("count query failed")
    }
}
