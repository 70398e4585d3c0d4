pub mod auth;
pub mod response;

pub use auth::{session_middleware, BearerToken};
pub use response::{ApiResponse, ApiResult};
