//! Session-backed OAuth 2.0 / OpenID Connect client for the Xero API.
//!
//! A browser is sent through Xero's authorization-code flow, the resulting
//! tokens are kept in a server-side [`session::Session`], refreshed when they
//! expire, and mirrored into cookies for the frontend.

pub mod auth;
pub mod core;
pub mod error;
pub mod http;
pub mod provider;
pub mod session;
pub mod util;

pub use error::Error;
