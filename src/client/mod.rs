//! Client-side data layer: token storage, a typed GraphQL client and a
//! normalized cache driven by [`Session`].

pub mod api;
pub mod cache;
pub mod credentials;
pub mod gate;
pub mod model;
pub mod session;

pub use api::{ApiClient, ClientError};
pub use cache::ClientCache;
pub use credentials::{CredentialStore, MemoryCredentialStore, TOKEN_KEY};
pub use gate::AuthGate;
pub use session::Session;
