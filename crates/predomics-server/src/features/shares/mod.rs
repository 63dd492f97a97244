//! Share links
//!
//! A share is a random token granting read access to one project without
//! an account. Tokens may expire; expired and unknown tokens both resolve
//! to 404.

pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

pub use routes::{project_share_routes, public_routes, shares_routes};
pub use types::{Share, SharePermission};
