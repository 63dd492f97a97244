pub mod create;
pub mod revoke;

pub use create::{CreateShareCommand, CreateShareError};
pub use revoke::{RevokeShareCommand, RevokeShareError, RevokeShareResponse};
