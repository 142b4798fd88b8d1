//! Cryptographic primitives shared by the blog backend
//!
//! - `jwt`: HS256 session tokens
//! - `password`: Argon2 password hashing
//! - `hash`: digests, HMAC signatures and random tokens

pub mod hash;
pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtManager, TokenError};
pub use password::{hash_password, verify_password, PasswordError};
