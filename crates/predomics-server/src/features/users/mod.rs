//! User accounts
//!
//! Accounts own projects and datasets. Passwords are stored as Argon2 PHC
//! strings and never leave the database.

pub mod commands;
pub mod password;
pub mod queries;
pub mod routes;
pub mod types;

pub use commands::{CreateUserCommand, CreateUserError};
pub use queries::{GetUserError, GetUserQuery, ListUsersError, ListUsersQuery};
pub use routes::users_routes;
pub use types::User;
