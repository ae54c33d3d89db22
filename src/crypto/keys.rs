//! ECDSA (secp256k1) key generation, signing, and verification.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};

use crate::error::WalletError;

/// An ECDSA signature as the `(r, s)` big-integer pair, matching the shape
/// the rest of the network wire-transmits a signature as.
pub type SignaturePair = (Vec<u8>, Vec<u8>);

/// Generate a fresh secp256k1 signing key.
pub fn generate_signing_key() -> SigningKey {
    SigningKey::random(&mut rand::rngs::OsRng)
}

/// Export a verifying key as a PEM-encoded SubjectPublicKeyInfo string.
pub fn export_public_key_pem(signing_key: &SigningKey) -> Result<String, WalletError> {
    let verifying_key = VerifyingKey::from(signing_key);
    verifying_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| WalletError::KeyEncoding(e.to_string()))
}

/// Sign pre-serialized data (SHA-256 digest under the hood), returning the
/// signature as an `(r, s)` pair.
pub fn sign(signing_key: &SigningKey, data: &[u8]) -> Result<SignaturePair, WalletError> {
    let signature: Signature = signing_key
        .try_sign(data)
        .map_err(|e| WalletError::Signing(e.to_string()))?;
    let (r, s) = signature.split_bytes();
    Ok((r.to_vec(), s.to_vec()))
}

/// Verify a signature given a PEM-encoded public key, an `(r, s)` pair, and
/// the original (pre-serialized) data. Returns `false` rather than an error
/// on an invalid signature, mirroring the rest of the network's
/// verify-then-drop policy for untrusted peer data.
pub fn verify(public_key_pem: &str, signature: &SignaturePair, data: &[u8]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_public_key_pem(public_key_pem) else {
        return false;
    };
    let Ok(r) = <[u8; 32]>::try_from(signature.0.as_slice()) else {
        return false;
    };
    let Ok(s) = <[u8; 32]>::try_from(signature.1.as_slice()) else {
        return false;
    };
    let Ok(signature) = Signature::from_scalars(r, s) else {
        return false;
    };
    verifying_key.verify(data, &signature).is_ok()
}
