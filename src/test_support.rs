//! Shared fixtures for unit and HTTP tests.

use actix_http::Request;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    body::MessageBody,
    cookie::{Cookie, Key},
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test, web,
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;

use crate::auth::{session_middleware, SESSION_COOKIE};
use crate::db::init_schema;
use crate::domain::message::create_message;
use crate::domain::user::{signup, NewUser};
use crate::entity::{message, user};
use crate::password::{PasswordHasher, MIN_BCRYPT_COST};
use crate::{build_app, AppDependencies};

pub const PASSWORD: &str = "password";

/// Fresh in-memory database. One pooled connection, so the app under test
/// and the test body see the same data.
pub async fn test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.expect("in-memory database");
    init_schema(&db).await.expect("schema");
    db
}

pub fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(MIN_BCRYPT_COST).expect("hasher")
}

pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    session_middleware(Key::generate(), false)
}

pub fn new_user(name: &str) -> NewUser {
    NewUser {
        username: name.to_string(),
        email: format!("{}@email.com", name),
        password: PASSWORD.to_string(),
        image_url: None,
    }
}

pub async fn seed_user(db: &DatabaseConnection, hasher: &PasswordHasher, name: &str) -> user::Model {
    signup(db, hasher, new_user(name)).await.expect("seed user")
}

pub async fn seed_message(db: &DatabaseConnection, user_id: i32, text: &str) -> message::Model {
    create_message(db, user_id, text.to_string()).await.expect("seed message")
}

pub async fn init_app(
    db: &DatabaseConnection,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    test::init_service(build_app(AppDependencies {
        db: web::Data::new(db.clone()),
        hasher: web::Data::new(test_hasher()),
        key: Key::generate(),
        cookie_secure: false,
    }))
    .await
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    pub fn code(&self) -> i64 {
        self.body["code"].as_i64().unwrap_or(-1)
    }

    pub fn msg(&self) -> &str {
        self.body["msg"].as_str().unwrap_or_default()
    }

    pub fn page(&self) -> Option<&str> {
        self.body["page"].as_str()
    }

    pub fn redirect(&self) -> Option<&str> {
        self.body["redirect"].as_str()
    }

    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn flashes(&self) -> Vec<String> {
        self.body["flashes"]
            .as_array()
            .map(|v| v.iter().filter_map(|f| f.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

/// Drives the app like a browser: keeps the session cookie between calls and
/// can follow envelope redirects.
pub struct TestClient<S> {
    app: S,
    cookie: Option<Cookie<'static>>,
}

impl<S> TestClient<S> {
    pub fn new(app: S) -> Self {
        Self { app, cookie: None }
    }

    pub async fn send<B>(&mut self, req: test::TestRequest) -> TestResponse
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        let req = match &self.cookie {
            Some(cookie) => req.cookie(cookie.clone()),
            None => req,
        };
        let resp = test::call_service(&self.app, req.to_request()).await;
        let status = resp.status();
        let updated = resp
            .response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .map(|c| c.into_owned());
        if let Some(cookie) = updated {
            self.cookie = if cookie.value().is_empty() { None } else { Some(cookie) };
        }
        let bytes = test::read_body(resp).await;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse { status, body }
    }

    pub async fn get<B>(&mut self, path: &str) -> TestResponse
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        self.send(test::TestRequest::get().uri(path)).await
    }

    pub async fn post<B>(&mut self, path: &str, form: &[(&str, &str)]) -> TestResponse
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        self.send(test::TestRequest::post().uri(path).set_form(form)).await
    }

    /// Follows the envelope redirect of `resp` with a GET.
    pub async fn follow<B>(&mut self, resp: &TestResponse) -> TestResponse
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        let to = resp.redirect().expect("response has a redirect").to_string();
        self.get(&to).await
    }

    /// Logs in and lands on the home page, which drains the greeting flash.
    pub async fn login<B>(&mut self, username: &str) -> TestResponse
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        let resp = self.post("/login", &[("username", username), ("password", PASSWORD)]).await;
        assert_eq!(resp.code(), 0, "login as {} failed: {}", username, resp.msg());
        self.follow(&resp).await
    }
}
