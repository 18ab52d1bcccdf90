//! ReceiptSigner: hashes a receipt's canonical payload and
//! produces a detached signature. Referenced only by trait; key material
//! lifecycle is external.

pub mod ethers_signer;
pub mod memory;

use async_trait::async_trait;

use crate::models::receipt::Receipt;

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),
}

#[async_trait]
pub trait ReceiptSigner: Send + Sync {
    /// Returns the hex-encoded signature over `receipt.canonical_payload()`.
    /// Does not mutate `receipt`; the caller assigns the result to
    /// `Receipt::signature`.
    async fn sign(&self, receipt: &Receipt) -> Result<String, SigningError>;
}
