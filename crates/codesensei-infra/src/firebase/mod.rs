//! Firebase Authentication ID-token verification.

pub mod verifier;

pub use verifier::{FirebaseTokenVerifier, FirebaseVerifierConfig, Jwk, JwkSource};
