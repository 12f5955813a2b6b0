//! WebAuthn assertions for P-256 passkey owners.
//!
//! The wallet verifies `ecdsa_p256(sha256(authenticatorData || sha256(clientDataJSON)))` and
//! locates the `type` and `challenge` members of `clientDataJSON` through indices supplied in
//! the signature, so the JSON must be passed through byte-for-byte as the authenticator made it.

use alloy_primitives::{B256, Bytes, U256};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use p256::ecdsa::{Signature, VerifyingKey, signature::Verifier as _};
use sha2::{Digest as _, Sha256};
use wallet_contracts::WebAuthnAuth;

const TYPE_MEMBER: &str = "\"type\":\"webauthn.get\"";

/// Authenticator flag: user present.
pub const FLAG_USER_PRESENT: u8 = 0x01;
/// Authenticator flag: user verified.
pub const FLAG_USER_VERIFIED: u8 = 0x04;

/// Raw assertion returned by a platform or hardware authenticator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebAuthnAssertion {
    pub authenticator_data: Bytes,
    pub client_data_json: String,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum WebAuthnError {
    #[display("clientDataJSON has no webauthn.get type member")]
    MissingType,
    #[display("clientDataJSON has no challenge member")]
    MissingChallenge,
}

impl core::error::Error for WebAuthnError {}

impl WebAuthnAssertion {
    /// Convert into the on-chain representation, normalizing `s` into the lower half order.
    pub fn into_auth(self) -> Result<WebAuthnAuth, WebAuthnError> {
        let type_index = self
            .client_data_json
            .find(TYPE_MEMBER)
            .ok_or(WebAuthnError::MissingType)?;
        let challenge_index = self
            .client_data_json
            .find("\"challenge\":\"")
            .ok_or(WebAuthnError::MissingChallenge)?;

        let signature = self.signature.normalize_s().unwrap_or(self.signature);
        let (r, s) = signature.split_bytes();

        Ok(WebAuthnAuth {
            authenticatorData: self.authenticator_data,
            clientDataJSON: self.client_data_json,
            challengeIndex: U256::from(challenge_index),
            typeIndex: U256::from(type_index),
            r: U256::from_be_slice(&r),
            s: U256::from_be_slice(&s),
        })
    }
}

/// The challenge as it appears in `clientDataJSON`: base64url without padding.
pub fn encode_challenge(challenge: &B256) -> String {
    URL_SAFE_NO_PAD.encode(challenge)
}

/// `clientDataJSON` for an assertion over `challenge`.
pub fn client_data_json(challenge: &B256, origin: &str) -> String {
    format!(
        r#"{{"type":"webauthn.get","challenge":"{}","origin":"{}","crossOrigin":false}}"#,
        encode_challenge(challenge),
        origin
    )
}

/// Message the authenticator signs: `authenticatorData || sha256(clientDataJSON)`.
pub fn signed_message(authenticator_data: &[u8], client_data_json: &str) -> Vec<u8> {
    let mut message = Vec::with_capacity(authenticator_data.len() + 32);
    message.extend_from_slice(authenticator_data);
    message.extend_from_slice(&Sha256::digest(client_data_json.as_bytes()));
    message
}

/// Verify an on-chain WebAuthn payload against a public key, mirroring the wallet's checks.
pub fn verify(auth: &WebAuthnAuth, challenge: &B256, x: &B256, y: &B256, require_uv: bool) -> bool {
    let json = auth.clientDataJSON.as_str();

    let Ok(type_index) = usize::try_from(auth.typeIndex) else {
        return false;
    };
    if json.get(type_index..type_index.saturating_add(TYPE_MEMBER.len())) != Some(TYPE_MEMBER) {
        return false;
    }

    let expected_challenge = format!("\"challenge\":\"{}\"", encode_challenge(challenge));
    let Ok(challenge_index) = usize::try_from(auth.challengeIndex) else {
        return false;
    };
    if json.get(challenge_index..challenge_index.saturating_add(expected_challenge.len()))
        != Some(expected_challenge.as_str())
    {
        return false;
    }

    let Some(flags) = auth.authenticatorData.get(32).copied() else {
        return false;
    };
    if flags & FLAG_USER_PRESENT == 0 || (require_uv && flags & FLAG_USER_VERIFIED == 0) {
        return false;
    }

    let Ok(signature) =
        Signature::from_scalars(auth.r.to_be_bytes::<32>(), auth.s.to_be_bytes::<32>())
    else {
        return false;
    };
    // High-s signatures are malleable and rejected on-chain.
    if signature.normalize_s().is_some() {
        return false;
    }

    let point = p256::EncodedPoint::from_affine_coordinates(&x.0.into(), &y.0.into(), false);
    let Ok(key) = VerifyingKey::from_encoded_point(&point) else {
        return false;
    };

    key.verify(&signed_message(&auth.authenticatorData, json), &signature)
        .is_ok()
}
