//! Concrete `ReceiptSigner`: Keccak256 over the canonical payload, signed
//! with an `ethers::signers::LocalWallet` loaded from `SIGNING_PRIVATE_KEY`
//! — the same primitive used elsewhere for
//! `WithdrawService`/`ReferralService` (`LocalWallet` parsed from a
//! configured private key, `wallet.address()`), generalized here from
//! signing a withdrawal struct to signing a receipt.

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::H256;
use sha3::{Digest, Keccak256};

use crate::models::receipt::Receipt;

use super::{ReceiptSigner, SigningError};

pub struct EthersReceiptSigner {
    wallet: LocalWallet,
}

impl EthersReceiptSigner {
    pub fn from_private_key(private_key: &str) -> Result<Self, SigningError> {
        let wallet: LocalWallet = private_key
            .parse()
            .map_err(|e: ethers::signers::WalletError| SigningError::KeyUnavailable(e.to_string()))?;
        Ok(EthersReceiptSigner { wallet })
    }

    pub fn signer_address(&self) -> String {
        format!("{:?}", self.wallet.address())
    }
}

#[async_trait]
impl ReceiptSigner for EthersReceiptSigner {
    async fn sign(&self, receipt: &Receipt) -> Result<String, SigningError> {
        let digest = Keccak256::digest(receipt.canonical_payload().as_bytes());
        let hash = H256::from_slice(&digest);
        let signature = self
            .wallet
            .sign_hash(hash)
            .map_err(|e| SigningError::KeyUnavailable(e.to_string()))?;
        Ok(format!("0x{}", signature))
    }
}
