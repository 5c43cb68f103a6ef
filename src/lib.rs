// src/lib.rs
pub mod app;
pub mod config;
pub mod content;
pub mod content_download;
pub mod content_factory;
pub mod errors;
pub mod feed;
pub mod logging;
pub mod routes;
pub mod store;
