//! Blogicum - a blog publishing platform
//!
//! Users publish posts (optionally scheduled, filed under a category and a
//! location) and comment on each other's posts. This library provides the
//! storage, the visibility and ownership rules, and the HTTP layer.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
