pub mod gateway;
pub mod manager;
pub mod memory;
pub mod models;
pub mod notifying;
pub mod postgres;
pub mod repository;

pub use gateway::{from_row, tables, to_row, Gateway, GatewayOp, Row};
pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryGateway;
pub use notifying::NotifyingGateway;
pub use postgres::PgGateway;
pub use repository::Repository;
