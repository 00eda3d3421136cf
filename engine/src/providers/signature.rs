//! Offline signature verifier trait.

use super::{SignatureType, SignatureVerification};
use crate::error::Result;

/// External signing service verifying offline signatures for
/// possession-based methods (QR-code approval on a mobile device).
pub trait SignatureVerifier: Send + Sync {
    /// Verify an offline signature computed over the given payload.
    ///
    /// # Errors
    ///
    /// Returns error if the collaborator is unreachable. An invalid
    /// signature is a successful call returning `valid: false`.
    fn verify_offline_signature(
        &self,
        activation_id: &str,
        payload: &str,
        auth_code: &str,
        signature_type: SignatureType,
    ) -> impl std::future::Future<Output = Result<SignatureVerification>> + Send;
}
