//! The application object and its request/response types.
//!
//! [`App::handle`] is the single entry point: it loads the session, applies
//! the method and sign-in gates, runs the route's handler, and persists the
//! session into the response.

use anyhow::Result;
use axum::http::header::{COOKIE, LOCATION, REFERER, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use rusqlite::Connection;

use crate::auth::{KIND_CSRF, TokenSigner};
use crate::config::Settings;
use crate::db::Database;
use crate::forms::{CsrfContext, FormData};
use crate::mailer::{Email, MailError, Mailer};
use crate::pages::WebPage;
use crate::render::Renderer;
use crate::routes::Routes;
use crate::session::{Session, SessionCodec};

/// Signature every route handler has.
pub type Handler = fn(&App, &Request, &mut Session) -> Response;

pub const NOT_ALLOWED_MESSAGE: &str = "Sorry, you're not allowed to access that.";
pub const SERVER_ERROR_MESSAGE: &str = "Looks like something went wrong with our server. Sorry.";

/// An incoming request, with its query string and body already decoded.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: FormData,
    pub form: FormData,
    pub headers: HeaderMap,
    /// Trailing path segment captured by a prefix route.
    pub param: String,
}

impl Request {
    /// Builds a request for `uri`, which may carry a query string.
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = uri.split_once('?').unwrap_or((uri, ""));
        Self {
            method,
            path: path.to_string(),
            query: FormData::parse(query.as_bytes()),
            form: FormData::default(),
            headers: HeaderMap::new(),
            param: String::new(),
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str, form: FormData) -> Self {
        Self {
            form,
            ..Self::new(Method::POST, uri)
        }
    }

    /// Adds a header; values that are not valid header text are dropped.
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn header(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn is_post(&self) -> bool {
        self.method == Method::POST
    }

    /// The captured path parameter as an id.
    pub fn param_id(&self) -> Option<i64> {
        self.param.parse().ok()
    }
}

/// A finished response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Response {
    pub fn html(body: String) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("content-type"),
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        Self {
            status: StatusCode::OK,
            headers,
            body,
        }
    }

    /// A 302 to `location`. Locations that are not valid header text fall
    /// back to the site root.
    pub fn redirect(location: &str) -> Self {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(location).unwrap_or_else(|_| {
            tracing::warn!("Unusable redirect location {:?}", location);
            HeaderValue::from_static("/")
        });
        headers.insert(LOCATION, value);
        Self {
            status: StatusCode::FOUND,
            headers,
            body: String::new(),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|value| value.to_str().ok())
    }

    /// The session cookie set by this response, if any.
    pub fn set_cookie(&self) -> Option<&str> {
        self.headers.get(SET_COOKIE).and_then(|value| value.to_str().ok())
    }
}

/// Shared, immutable application state.
pub struct App {
    settings: Settings,
    db: Database,
    routes: Routes,
    signer: TokenSigner,
    sessions: SessionCodec,
    mailer: Box<dyn Mailer>,
}

impl App {
    pub fn new(settings: Settings, db: Database, mailer: Box<dyn Mailer>) -> Self {
        let signer = TokenSigner::new(&settings.token_secret);
        let sessions = SessionCodec::new(&settings.session_secret);
        Self {
            settings,
            db,
            routes: Routes::site(),
            signer,
            sessions,
            mailer,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    pub fn send_mail(&self, email: &Email) -> Result<(), MailError> {
        self.mailer.send(email).inspect_err(|e| {
            tracing::error!("Failed to send {:?} to {}: {}", email.subject, email.to.email, e);
        })
    }

    /// Runs read-only queries against the connection.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.db.connection();
        f(&conn)
    }

    /// Path registered under `name`; unknown names fall back to the root.
    pub fn url_for(&self, name: &str) -> &'static str {
        self.routes.url_for(name).unwrap_or_else(|| {
            tracing::warn!("No route named {:?}", name);
            "/"
        })
    }

    pub fn redirect_to(&self, name: &str) -> Response {
        Response::redirect(self.url_for(name))
    }

    /// A fresh CSRF token bound to the signed-in user.
    pub fn csrf_token(&self, session: &Session) -> String {
        self.signer
            .sign_timestamped(session.user_email(), KIND_CSRF)
            .unwrap_or_else(|e| {
                tracing::error!("Failed to sign CSRF token: {}", e);
                String::new()
            })
    }

    pub fn csrf_context<'a>(&'a self, session: &'a Session) -> CsrfContext<'a> {
        CsrfContext {
            signer: &self.signer,
            email: session.user_email(),
            max_age_minutes: self.settings.csrf_max_age_minutes,
        }
    }

    /// Renders a page. A render failure is logged and the user is sent
    /// somewhere safe.
    pub fn render(&self, session: &mut Session, page: &WebPage) -> Response {
        match Renderer::new(&self.routes).render(page) {
            Ok(html) => Response::html(html),
            Err(e) => {
                tracing::error!("Failed to render {:?}: {}", page.title, e);
                if session.is_authenticated() {
                    session.add_flash(SERVER_ERROR_MESSAGE);
                    self.redirect_to("dashboard")
                } else {
                    Response::html(format!("<h2>{SERVER_ERROR_MESSAGE}</h2>"))
                        .with_status(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
    }

    /// Handles one request end to end.
    pub fn handle(&self, mut request: Request) -> Response {
        tracing::info!(
            "{} {} (referer {:?})",
            request.method,
            request.path,
            request.header(REFERER).unwrap_or("")
        );

        let mut session = self.sessions.load(request.header(COOKIE));
        let mut response = self.dispatch(&mut request, &mut session);

        if session.is_dirty() {
            match self.sessions.set_cookie(&session) {
                Ok(cookie) => match HeaderValue::from_str(&cookie) {
                    Ok(value) => {
                        response.headers.append(SET_COOKIE, value);
                    }
                    Err(e) => tracing::error!("Session cookie is not a valid header: {}", e),
                },
                Err(e) => tracing::error!("Failed to seal session: {}", e),
            }
        }
        response
    }

    fn dispatch(&self, request: &mut Request, session: &mut Session) -> Response {
        let Some((route, param)) = self.routes.resolve(&request.path) else {
            tracing::info!("No route for {}", request.path);
            return Response::html("<h2>Sorry, there's nothing here.</h2>".to_string())
                .with_status(StatusCode::NOT_FOUND);
        };
        let param = param.to_string();

        if !route.allow.permits(&request.method) {
            let back = request
                .header(REFERER)
                .unwrap_or_else(|| self.url_for("home"))
                .to_string();
            tracing::warn!(
                "Unallowed request method {} sent from {:?} to {}",
                request.method,
                back,
                request.path
            );
            return Response::redirect(&back);
        }

        if !route.public && !session.is_authenticated() {
            session.add_flash(NOT_ALLOWED_MESSAGE);
            return self.redirect_to("home");
        }

        request.param = param;
        (route.handler)(self, request, session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_splits_query() {
        let request = Request::get("/section/new?workId=4&x=1");

        assert_eq!(request.path, "/section/new");
        assert_eq!(request.query.get("workId"), Some("4"));
        assert!(!request.is_post());
    }

    #[test]
    fn param_id_rejects_garbage() {
        let mut request = Request::get("/work/view/abc");
        request.param = "abc".to_string();
        assert_eq!(request.param_id(), None);

        request.param = "12".to_string();
        assert_eq!(request.param_id(), Some(12));
    }

    #[test]
    fn redirect_sets_location() {
        let response = Response::redirect("/dashboard");

        assert_eq!(response.status, StatusCode::FOUND);
        assert_eq!(response.location(), Some("/dashboard"));
    }

    #[test]
    fn bad_redirect_location_falls_back_to_root() {
        let response = Response::redirect("/bad\nlocation");
        assert_eq!(response.location(), Some("/"));
    }
}
