//! Signature encodings accepted by the proxy and the wallet validator.

use alloy_primitives::{Address, B256, Bytes, Signature, U256};
use alloy_sol_types::SolValue;
use wallet_contracts::SignatureWrapper;

/// Pack a recoverable ECDSA signature as `r || s || v`, with `v` in `{27, 28}`.
pub fn pack_ecdsa(signature: &Signature) -> Bytes {
    Bytes::copy_from_slice(&signature.as_bytes())
}

/// Recover the signer of a packed `r || s || v` signature over an unprefixed digest.
pub fn recover_packed(hash: &B256, packed: &[u8]) -> Option<Address> {
    if packed.len() != 65 {
        return None;
    }
    Signature::from_raw(packed)
        .ok()?
        .recover_address_from_prehash(hash)
        .ok()
}

/// Wrap owner signature data with the index of the signing owner.
pub fn wrap_owner_signature(owner_index: U256, signature_data: Bytes) -> Bytes {
    SignatureWrapper {
        ownerIndex: owner_index,
        signatureData: signature_data,
    }
    .abi_encode()
    .into()
}

/// Decode a wrapped owner signature.
pub fn unwrap_owner_signature(signature: &[u8]) -> Result<SignatureWrapper, alloy_sol_types::Error> {
    SignatureWrapper::abi_decode(signature)
}
