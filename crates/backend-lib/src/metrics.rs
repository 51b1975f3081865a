// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const USER_CREATED: &str = "user.created";
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_DELETED: &str = "session.deleted";
pub const AUTH_REJECTED: &str = "auth.rejected";
pub const RATELIMIT_REJECTED: &str = "ratelimit.rejected";
pub const RATELIMIT_BUCKETS: &str = "ratelimit.buckets";
