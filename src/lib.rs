pub mod app;
pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod follows;
pub mod graphql;
pub mod posts;
pub mod state;
pub mod store;
pub mod users;
