use std::{fmt, sync::Arc};

use alloy::{
    primitives::{B256, Bytes},
    sol_types::SolValue,
};
use async_trait::async_trait;
use auto_impl::auto_impl;
use p256::ecdsa::{Signature, SigningKey, signature::Signer as _};
use sha2::{Digest as _, Sha256};
use wallet_primitives::{
    OwnerCredential, WebAuthnAssertion,
    webauthn::{FLAG_USER_PRESENT, FLAG_USER_VERIFIED, client_data_json, signed_message},
};

use crate::error::SignerError;

/// A WebAuthn authenticator holding a P-256 credential.
#[async_trait]
#[auto_impl(&, Arc, Box)]
pub trait PasskeyAuthenticator: Send + Sync {
    /// The credential's public key.
    fn credential(&self) -> OwnerCredential;

    /// Produce an assertion over `challenge`.
    async fn get_assertion(&self, challenge: B256) -> Result<WebAuthnAssertion, SignerError>;
}

/// Signs through a [`PasskeyAuthenticator`], producing ABI-encoded `WebAuthnAuth` payloads.
#[derive(Clone)]
pub struct PasskeySigner {
    authenticator: Arc<dyn PasskeyAuthenticator>,
}

impl PasskeySigner {
    pub fn new(authenticator: impl PasskeyAuthenticator + 'static) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
        }
    }

    pub fn credential(&self) -> OwnerCredential {
        self.authenticator.credential()
    }

    pub(super) async fn sign(&self, challenge: B256) -> Result<Bytes, SignerError> {
        let assertion = self.authenticator.get_assertion(challenge).await?;
        Ok(assertion.into_auth()?.abi_encode().into())
    }
}

/// Software authenticator backed by an in-memory P-256 key.
pub struct SoftwarePasskey {
    key: SigningKey,
    rp_id_hash: B256,
    origin: String,
}

impl SoftwarePasskey {
    pub fn new(key: SigningKey, rp_id: &str) -> Self {
        Self {
            key,
            rp_id_hash: B256::from_slice(&Sha256::digest(rp_id.as_bytes())),
            origin: format!("https://{rp_id}"),
        }
    }

    pub fn from_slice(secret: &[u8], rp_id: &str) -> Result<Self, SignerError> {
        let key = SigningKey::from_slice(secret)
            .map_err(|err| SignerError::Authenticator(err.to_string()))?;
        Ok(Self::new(key, rp_id))
    }

    pub fn random(rp_id: &str) -> Self {
        Self::new(SigningKey::random(&mut rand::rngs::OsRng), rp_id)
    }

    /// `rpIdHash || flags || signCount`
    fn authenticator_data(&self) -> Bytes {
        let mut data = Vec::with_capacity(37);
        data.extend_from_slice(self.rp_id_hash.as_slice());
        data.push(FLAG_USER_PRESENT | FLAG_USER_VERIFIED);
        data.extend_from_slice(&0u32.to_be_bytes());
        data.into()
    }
}

impl fmt::Debug for SoftwarePasskey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwarePasskey")
            .field("credential", &self.credential())
            .field("origin", &self.origin)
            .finish()
    }
}

#[async_trait]
impl PasskeyAuthenticator for SoftwarePasskey {
    fn credential(&self) -> OwnerCredential {
        OwnerCredential::from_verifying_key(self.key.verifying_key())
    }

    async fn get_assertion(&self, challenge: B256) -> Result<WebAuthnAssertion, SignerError> {
        let authenticator_data = self.authenticator_data();
        let client_data_json = client_data_json(&challenge, &self.origin);
        let signature: Signature = self
            .key
            .try_sign(&signed_message(&authenticator_data, &client_data_json))
            .map_err(|err| SignerError::Authenticator(err.to_string()))?;

        Ok(WebAuthnAssertion {
            authenticator_data,
            client_data_json,
            signature,
        })
    }
}
