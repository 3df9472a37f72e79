//! Transport helpers shared by handlers and middleware.

pub mod cookies;
pub mod credentials;
