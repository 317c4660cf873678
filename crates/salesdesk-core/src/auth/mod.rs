//! Authentication module for managing credentials and the user session.
//!
//! This module provides:
//! - `Session`: the process-wide credential store (access, refresh, identity)
//! - `KeyValueStore`: durable backends for the two credential strings
//!   (session file, OS keychain, in-memory)
//! - `TokenEndpoint`: the login and refresh exchanges
//!
//! Credentials are JWT-shaped; their expiry is read from the payload on every
//! check rather than tracked separately.

pub mod endpoint;
pub mod error;
pub mod session;
pub mod store;
pub mod token;

pub use endpoint::{TokenEndpoint, TokenPair};
pub use error::AuthError;
pub use session::{Session, SessionState};
pub use store::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StoreKind};
pub use token::{decode_claims, Claims};
