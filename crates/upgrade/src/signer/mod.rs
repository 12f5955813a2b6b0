//! Signing capabilities for wallet owners.
//!
//! A [`SignatureProvider`] signs a digest for a wallet. Callers hand it the digest and an
//! [`OwnerContext`] and receive bytes the proxy and the wallet accept, whichever kind of key
//! sits behind it.

mod passkey;

pub use passkey::{PasskeyAuthenticator, PasskeySigner, SoftwarePasskey};

use std::fmt;

use alloy::{
    primitives::{Address, B256, Bytes, U256},
    signers::{SignerSync, local::PrivateKeySigner},
};
use wallet_primitives::{OwnerCredential, pack_ecdsa, replay_safe_hash, wrap_owner_signature};

use crate::error::SignerError;

/// The wallet a signature is produced for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnerContext {
    pub wallet: Address,
    pub chain_id: u64,
    /// Index of the signing owner in the wallet's owner set.
    ///
    /// `None` asks a raw key controlling `wallet` itself to sign the bare digest, which the
    /// proxy accepts regardless of which implementation is installed.
    pub owner_index: Option<U256>,
}

#[derive(Clone)]
pub enum SignatureProvider {
    /// A secp256k1 private key.
    RawKey(PrivateKeySigner),
    /// A P-256 passkey held by an authenticator.
    Passkey(PasskeySigner),
}

impl SignatureProvider {
    /// Credential the wallet must have registered to accept this provider's signatures.
    pub fn credential(&self) -> OwnerCredential {
        match self {
            Self::RawKey(signer) => OwnerCredential::address(signer.address()),
            Self::Passkey(passkey) => passkey.credential(),
        }
    }

    /// Whether this provider can sign as the account key itself.
    pub fn controls(&self, account: Address) -> bool {
        matches!(self, Self::RawKey(signer) if signer.address() == account)
    }

    pub async fn sign(&self, digest: B256, context: &OwnerContext) -> Result<Bytes, SignerError> {
        match self {
            Self::RawKey(signer) => match context.owner_index {
                None if signer.address() == context.wallet => {
                    Ok(pack_ecdsa(&signer.sign_hash_sync(&digest)?))
                }
                None => Err(SignerError::MissingOwnerIndex),
                Some(index) => {
                    let hash = replay_safe_hash(context.wallet, context.chain_id, digest);
                    let signature = pack_ecdsa(&signer.sign_hash_sync(&hash)?);
                    Ok(wrap_owner_signature(index, signature))
                }
            },
            Self::Passkey(passkey) => {
                let index = context.owner_index.ok_or(SignerError::MissingOwnerIndex)?;
                let hash = replay_safe_hash(context.wallet, context.chain_id, digest);
                let auth = passkey.sign(hash).await?;
                Ok(wrap_owner_signature(index, auth))
            }
        }
    }
}

impl fmt::Debug for SignatureProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::RawKey(_) => "RawKey",
            Self::Passkey(_) => "Passkey",
        };
        f.debug_struct("SignatureProvider")
            .field("kind", &kind)
            .field("credential", &self.credential())
            .finish()
    }
}

impl From<PrivateKeySigner> for SignatureProvider {
    fn from(signer: PrivateKeySigner) -> Self {
        Self::RawKey(signer)
    }
}

impl From<PasskeySigner> for SignatureProvider {
    fn from(signer: PasskeySigner) -> Self {
        Self::Passkey(signer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolValue;
    use wallet_contracts::{SignatureWrapper, WebAuthnAuth};
    use wallet_primitives::signature::{recover_packed, unwrap_owner_signature};

    fn key() -> PrivateKeySigner {
        "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
            .parse()
            .unwrap()
    }

    #[tokio::test]
    async fn test_raw_key_signs_bare_digest_for_own_account() {
        let signer = key();
        let provider = SignatureProvider::from(signer.clone());
        let digest = B256::repeat_byte(0x42);
        let context = OwnerContext {
            wallet: signer.address(),
            chain_id: 1,
            owner_index: None,
        };

        let signature = provider.sign(digest, &context).await.unwrap();
        assert_eq!(signature.len(), 65);
        assert_eq!(recover_packed(&digest, &signature), Some(signer.address()));
        assert!(provider.controls(signer.address()));
    }

    #[tokio::test]
    async fn test_raw_key_owner_signature_is_wrapped() {
        let signer = key();
        let provider = SignatureProvider::from(signer.clone());
        let digest = B256::repeat_byte(0x42);
        let wallet = Address::repeat_byte(0x77);
        let context = OwnerContext {
            wallet,
            chain_id: 10,
            owner_index: Some(U256::from(2)),
        };

        let signature = provider.sign(digest, &context).await.unwrap();
        let SignatureWrapper {
            ownerIndex,
            signatureData,
        } = unwrap_owner_signature(&signature).unwrap();
        assert_eq!(ownerIndex, U256::from(2));

        let hash = replay_safe_hash(wallet, 10, digest);
        assert_eq!(recover_packed(&hash, &signatureData), Some(signer.address()));
        assert!(!provider.controls(wallet));

        let no_index = OwnerContext {
            owner_index: None,
            ..context
        };
        assert!(matches!(
            provider.sign(digest, &no_index).await,
            Err(SignerError::MissingOwnerIndex)
        ));
    }

    #[tokio::test]
    async fn test_passkey_signature_verifies() {
        let passkey = SoftwarePasskey::from_slice(&[0x33; 32], "keys.example").unwrap();
        let credential = passkey.credential();
        let provider = SignatureProvider::from(PasskeySigner::new(passkey));
        assert_eq!(provider.credential(), credential);

        let digest = B256::repeat_byte(0x01);
        let wallet = Address::repeat_byte(0x55);
        let context = OwnerContext {
            wallet,
            chain_id: 8453,
            owner_index: Some(U256::from(1)),
        };

        let signature = provider.sign(digest, &context).await.unwrap();
        let wrapper = unwrap_owner_signature(&signature).unwrap();
        let auth = WebAuthnAuth::abi_decode(&wrapper.signatureData).unwrap();

        let OwnerCredential::PublicKey { x, y } = credential else {
            panic!("passkey credential must be a public key");
        };
        let challenge = replay_safe_hash(wallet, 8453, digest);
        assert!(wallet_primitives::webauthn::verify(&auth, &challenge, &x, &y, true));

        let no_index = OwnerContext {
            owner_index: None,
            ..context
        };
        assert!(matches!(
            provider.sign(digest, &no_index).await,
            Err(SignerError::MissingOwnerIndex)
        ));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let provider = SignatureProvider::from(key());
        let debug = format!("{provider:?}");
        assert!(debug.contains("RawKey"));
        assert!(!debug.contains("59c6995e"));
    }
}
