// handlers/mod.rs - HTTP handlers by security tier
//
// Public (no auth) → Protected (bearer session, see middleware::auth)
pub mod protected;
pub mod public;
