pub mod list;
pub mod resolve;

pub use list::{ListSharesError, ListSharesQuery};
pub use resolve::{ResolveShareError, ResolveShareQuery, SharedProject};
