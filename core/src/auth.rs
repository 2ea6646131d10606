//! Credential verification for protected operations.
//!
//! Update and delete are the destructive operations of the API and require
//! HTTP Basic credentials; list, get and create are open. The credential
//! set is fixed at process start. Verification sits behind the
//! [`CredentialVerifier`] trait so the static pair can later be swapped
//! for a real credential store without touching the gate's call sites.

use crate::error::AuthError;
use std::sync::Arc;

/// A capability that can verify a presented credential pair.
pub trait CredentialVerifier: Send + Sync {
    /// Returns `true` if the presented pair matches a known credential.
    fn verify(&self, username: &str, secret: &str) -> bool;
}

/// The single static credential pair recognized by the service.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    username: String,
    secret: String,
}

impl StaticCredentials {
    /// Creates a credential pair.
    #[must_use]
    pub const fn new(username: String, secret: String) -> Self {
        Self { username, secret }
    }
}

impl Default for StaticCredentials {
    fn default() -> Self {
        Self::new("admin".to_string(), "admin".to_string())
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify(&self, username: &str, secret: &str) -> bool {
        username == self.username && secret == self.secret
    }
}

/// Gate applied before protected store operations.
///
/// Stateless beyond the verifier it wraps; performs no I/O beyond
/// comparison. Success is a pass-through, failure is
/// [`AuthError::InvalidCredentials`].
#[derive(Clone)]
pub struct AuthGate {
    verifier: Arc<dyn CredentialVerifier>,
}

impl AuthGate {
    /// Creates a gate over the given verifier.
    #[must_use]
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }

    /// Checks a presented credential pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the pair does not
    /// match any known credential.
    pub fn check(&self, username: &str, secret: &str) -> Result<(), AuthError> {
        if self.verifier.verify(username, secret) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate").finish_non_exhaustive()
    }
}
