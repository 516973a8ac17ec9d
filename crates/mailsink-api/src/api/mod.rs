/// API endpoint modules
pub mod health;
pub mod v1;
pub mod v2;
