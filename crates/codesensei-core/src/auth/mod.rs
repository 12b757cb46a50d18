//! Bearer-token verification port.

pub mod verifier;
