pub mod claims;
pub mod context;
pub mod jwt;
pub mod password;

pub use context::AuthContext;
pub use jwt::JwtKeys;
