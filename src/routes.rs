//! The route table.
//!
//! Built once at startup and shared through the [`App`](crate::app::App).
//! Patterns ending in `/` (other than the root) match by prefix; the rest of
//! the path is handed to the handler as its parameter, usually an entity id.

use axum::http::Method;

use crate::app::Handler;
use crate::handlers::{dashboard, elements, public, sections, works};

/// Methods a route accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allow {
    Get,
    Post,
    GetPost,
}

impl Allow {
    pub fn permits(self, method: &Method) -> bool {
        match self {
            Allow::Get => *method == Method::GET,
            Allow::Post => *method == Method::POST,
            Allow::GetPost => *method == Method::GET || *method == Method::POST,
        }
    }
}

pub struct Route {
    pub name: &'static str,
    pub pattern: &'static str,
    /// Reachable without signing in.
    pub public: bool,
    pub allow: Allow,
    pub handler: Handler,
}

impl Route {
    fn is_prefix(&self) -> bool {
        self.pattern.len() > 1 && self.pattern.ends_with('/')
    }
}

/// Name → pattern → handler table.
pub struct Routes {
    routes: Vec<Route>,
}

impl Routes {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Every route the site serves.
    pub fn site() -> Self {
        use Allow::{Get, GetPost, Post};

        Self::new(vec![
            route("home", "/", true, GetPost, public::home),
            route("about", "/about", true, GetPost, public::about),
            route("contact", "/contact", true, GetPost, public::contact),
            route("auth", "/auth", true, GetPost, public::auth),
            route("reset", "/reset", true, GetPost, public::reset),
            route("dashboard", "/dashboard", false, Get, dashboard::dashboard),
            route("work_new", "/work/new", false, GetPost, works::new),
            route("work_view", "/work/view/", false, Get, works::view),
            route("work_edit", "/work/edit/", false, GetPost, works::edit),
            route("work_delete", "/work/delete/", false, Post, works::delete),
            route("work_export", "/work/export/", false, Get, works::export),
            route("work_reorder", "/work/reorder/", false, GetPost, sections::reorder),
            route("section_new", "/section/new", false, GetPost, sections::new),
            route("section_view", "/section/view/", false, Get, sections::view),
            route("section_edit", "/section/edit/", false, GetPost, sections::edit),
            route("section_delete", "/section/delete/", false, Post, sections::delete),
            route("character_new", "/character/new", false, GetPost, elements::character_new),
            route("character_view", "/character/view/", false, Get, elements::character_view),
            route("character_edit", "/character/edit/", false, GetPost, elements::character_edit),
            route("character_index", "/character/index/", false, Get, elements::character_index),
            route("character_delete", "/character/delete/", false, Post, elements::character_delete),
            route("setting_new", "/setting/new", false, GetPost, elements::setting_new),
            route("setting_view", "/setting/view/", false, Get, elements::setting_view),
            route("setting_edit", "/setting/edit/", false, GetPost, elements::setting_edit),
            route("setting_index", "/setting/index/", false, Get, elements::setting_index),
            route("setting_delete", "/setting/delete/", false, Post, elements::setting_delete),
        ])
    }

    /// Path pattern registered under `name`.
    pub fn url_for(&self, name: &str) -> Option<&'static str> {
        self.routes
            .iter()
            .find(|route| route.name == name)
            .map(|route| route.pattern)
    }

    /// Finds the route for `path` and the trailing parameter, if any.
    ///
    /// Exact patterns win; otherwise the longest matching prefix pattern.
    pub fn resolve<'p>(&self, path: &'p str) -> Option<(&Route, &'p str)> {
        if let Some(route) = self.routes.iter().find(|route| route.pattern == path) {
            return Some((route, ""));
        }

        self.routes
            .iter()
            .filter(|route| route.is_prefix() && path.starts_with(route.pattern))
            .max_by_key(|route| route.pattern.len())
            .map(|route| (route, &path[route.pattern.len()..]))
    }
}

fn route(
    name: &'static str,
    pattern: &'static str,
    public: bool,
    allow: Allow,
    handler: Handler,
) -> Route {
    Route {
        name,
        pattern,
        public,
        allow,
        handler,
    }
}
