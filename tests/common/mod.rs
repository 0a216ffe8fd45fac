//! Shared harness: an in-memory app driven through `App::handle`, with a
//! client that carries the session cookie between requests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::{COOKIE, REFERER};
use pathfork::auth::KIND_CSRF;
use pathfork::forms::FormData;
use pathfork::mailer::MemoryMailer;
use pathfork::{App, Database, Request, Response, Settings};

pub const PASSWORD: &str = "correct horse battery";

pub fn test_app(mailer: MemoryMailer) -> (Arc<App>, Arc<MemoryMailer>) {
    let settings = Settings::new(vec![7u8; 32], vec![9u8; 32]);
    let db = Database::in_memory().expect("in-memory database");
    let mailer = Arc::new(mailer);
    let app = App::new(settings, db, Box::new(Arc::clone(&mailer)));
    (Arc::new(app), mailer)
}

pub struct TestClient {
    pub app: Arc<App>,
    pub mailer: Arc<MemoryMailer>,
    cookie: Option<String>,
    email: String,
}

impl TestClient {
    pub fn new() -> Self {
        Self::with_mailer(MemoryMailer::new())
    }

    pub fn with_mailer(mailer: MemoryMailer) -> Self {
        let (app, mailer) = test_app(mailer);
        Self {
            app,
            mailer,
            cookie: None,
            email: String::new(),
        }
    }

    /// A second browser against the same app, with no session.
    pub fn other(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
            mailer: Arc::clone(&self.mailer),
            cookie: None,
            email: String::new(),
        }
    }

    pub fn get(&mut self, uri: &str) -> Response {
        self.send(Request::get(uri))
    }

    pub fn post(&mut self, uri: &str, pairs: &[(&str, &str)]) -> Response {
        self.send(Request::post(uri, FormData::from_pairs(pairs.iter().copied())))
    }

    pub fn post_with_referer(&mut self, uri: &str, referer: &str) -> Response {
        self.send(Request::post(uri, FormData::default()).with_header(REFERER, referer))
    }

    pub fn send(&mut self, mut request: Request) -> Response {
        if let Some(cookie) = &self.cookie {
            request = request.with_header(COOKIE, cookie);
        }
        let response = self.app.handle(request);
        if let Some(set) = response.set_cookie() {
            self.cookie = set.split(';').next().map(str::to_string);
        }
        response
    }

    /// Follows a redirect with a GET.
    pub fn follow(&mut self, response: &Response) -> Response {
        let location = response.location().expect("redirect location").to_string();
        self.get(&location)
    }

    /// A valid CSRF token for whoever is signed in.
    pub fn csrf(&self) -> String {
        self.app
            .signer()
            .sign_timestamped(&self.email, KIND_CSRF)
            .expect("csrf token")
    }

    /// Signs up, follows the emailed verification link, and logs in.
    pub fn sign_in_as(&mut self, email: &str) {
        self.post(
            "/",
            &[
                ("email", email),
                ("password", PASSWORD),
                ("repeatPassword", PASSWORD),
            ],
        );
        let link = self.verification_link(email);
        self.get(&link);

        let response = self.post("/auth?action=login", &[("email", email), ("password", PASSWORD)]);
        assert_eq!(response.location(), Some("/dashboard"));
        self.email = email.to_string();
    }

    /// The path of the last verification link mailed to `email`.
    pub fn verification_link(&self, email: &str) -> String {
        let sent = self.mailer.sent();
        let message = sent
            .iter()
            .rev()
            .find(|message| message.to.email == email)
            .expect("verification email");
        let start = message.body.find("/auth?").expect("link in body");
        message.body[start..].trim().to_string()
    }
}

/// The trailing id of a redirect such as `/work/view/3`.
pub fn redirect_id(response: &Response) -> i64 {
    response
        .location()
        .and_then(|location| location.rsplit('/').next())
        .and_then(|id| id.parse().ok())
        .expect("redirect to an entity")
}
