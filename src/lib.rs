pub mod app;
pub mod auth;
pub mod authz;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod realtime;
pub mod reconcile;
pub mod services;
pub mod session;
pub mod validation;
