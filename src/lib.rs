//! Pathfork: a small web app for organizing fiction.
//!
//! Writers keep works, split into ordered sections and unordered snippets,
//! and the characters and settings that appear in them. Pages are rendered
//! on the server from plain HTML forms.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod forms;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod pages;
pub mod render;
pub mod routes;
pub mod server;
pub mod session;

pub use app::{App, Request, Response};
pub use config::{Config, Settings};
pub use db::Database;
