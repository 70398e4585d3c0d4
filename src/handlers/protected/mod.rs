// handlers/protected/mod.rs - Protected handlers (session required)
//
// Every handler here receives the `Session` extension injected by
// `middleware::session_middleware` and passes it to the service call.
pub mod auth;
pub mod messages;
pub mod profiles;
pub mod projects;
