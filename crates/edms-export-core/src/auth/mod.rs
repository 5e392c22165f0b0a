//! Authentication module for login credentials and session cookies.
//!
//! This module provides:
//! - `Credentials`: username/password pair used to obtain a session
//! - `SessionToken`: the `.SharedCookie` session cookie in header form
//! - `CredentialStore`: OS-level password storage via keyring
//!
//! Session cookies have no known lifetime. They are replaced only after the
//! server rejects one.

pub mod credentials;
pub mod session;

pub use credentials::{CredentialStore, Credentials};
pub use session::{SessionToken, SESSION_COOKIE_NAME};
