// handlers/public/mod.rs - endpoints reachable without a token.
pub mod auth;
pub mod health;

pub use auth::token;
pub use health::get as health;
