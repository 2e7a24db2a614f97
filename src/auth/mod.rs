//! JWT authentication with a dual-token scheme.
//!
//! Short-lived access tokens carry full identity claims and are checked
//! statelessly by the extractors. Long-lived refresh tokens carry only
//! the user id, are persisted per session and can therefore be revoked;
//! they are only good for minting new access tokens. Each kind is
//! signed with its own secret, so one can never stand in for the other.

mod credentials;
mod errors;
mod extractors;
mod session;
mod state;

pub use credentials::{CredentialService, NewUser};
pub use errors::AuthError;
pub use extractors::{AdminAuth, Auth, SelfOrAdmin};
pub use session::{SessionController, TokenPair};
pub use state::HasTokenCodec;
