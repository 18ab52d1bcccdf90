//! Fake `ReceiptSigner` for tests.

use async_trait::async_trait;
use sha3::{Digest, Keccak256};

use crate::models::receipt::Receipt;

use super::{ReceiptSigner, SigningError};

/// Signs with a fixed, non-secret "key" — a hash of the payload prefixed
/// with a marker, so tests can assert on signature presence/determinism
/// without pulling in `ethers`.
pub struct FakeSigner;

impl FakeSigner {
    pub fn new() -> Self {
        FakeSigner
    }
}

impl Default for FakeSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReceiptSigner for FakeSigner {
    async fn sign(&self, receipt: &Receipt) -> Result<String, SigningError> {
        let digest = Keccak256::digest(receipt.canonical_payload().as_bytes());
        Ok(format!("fake:{:x}", digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{OrderSide, OrderStatus};
    use crate::models::market::Outcome;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[tokio::test]
    async fn fake_signer_is_deterministic() {
        let signer = FakeSigner::new();
        let receipt = Receipt {
            order_id: Uuid::new_v4(),
            market_id: Uuid::new_v4(),
            side: OrderSide::Buy,
            outcome: Outcome::Yes,
            price: dec!(0.5),
            quantity: 5,
            filled_quantity: 5,
            status: OrderStatus::Filled,
            trades: vec![],
            timestamp: Utc::now(),
            signature: String::new(),
        };
        let a = signer.sign(&receipt).await.unwrap();
        let b = signer.sign(&receipt).await.unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("fake:"));
    }
}
