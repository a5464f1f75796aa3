pub mod auth;
pub mod rate_limit;

pub use auth::{optional_auth, require_auth, CurrentUser};
pub use rate_limit::{rate_limit, RateLimiter};
