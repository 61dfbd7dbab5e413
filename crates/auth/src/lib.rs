//! `bookstore-auth`: authentication and authorization boundary (fail closed).
//!
//! This crate is decoupled from HTTP and storage: it signs and checks session
//! tokens, hashes passwords, and evaluates role/ownership guards over an
//! already-resolved [`Principal`]. Resolving a token to a directory record is
//! the service layer's job.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod principal;
pub mod roles;
pub mod token;

pub use authorize::{
    AuthzError, Requirement, authorize, require_order_viewer, require_owner_or_admin, require_role,
    require_store_owner_or_admin,
};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use password::{Argon2PasswordService, PasswordError, PasswordService};
pub use principal::Principal;
pub use roles::Role;
pub use token::{DEFAULT_TOKEN_TTL_MINUTES, Hs256TokenService, IssuedToken, TokenError, TokenService};
