//! Access control for the admin settings surface.
//!
//! The host platform normally fronts these routes with its own admin gate;
//! the standalone sidecar uses an admin key header instead.

pub mod admin_auth;

pub use admin_auth::AdminAuth;
