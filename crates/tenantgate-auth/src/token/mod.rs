//! Bearer token verification.
//!
//! This module provides:
//!
//! - Unverified header and payload parsing
//! - Signature and claim verification against tenant keys

pub mod verify;

pub use verify::{
    Audience, TokenVerifier, VerificationConfig, VerifiedClaims, VerifiedToken, parse_unverified,
};
