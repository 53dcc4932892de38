pub mod access;
pub mod api;
pub mod config;
pub mod control;
pub mod dashboard;
pub mod error;
pub mod feed;
pub mod model;
pub mod snapshot;
pub mod tui;
pub mod window;
