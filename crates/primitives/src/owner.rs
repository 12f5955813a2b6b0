use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use wallet_contracts::MULTI_OWNABLE_STORAGE_ROOT;

/// A credential registered in the wallet's owner set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum OwnerCredential {
    /// An Ethereum address, validated through `ecrecover`.
    Address { address: Address },
    /// An uncompressed P-256 public key, validated through WebAuthn.
    PublicKey { x: B256, y: B256 },
}

impl OwnerCredential {
    /// Credential for an address owner.
    pub const fn address(address: Address) -> Self {
        Self::Address { address }
    }

    /// Credential for a P-256 public key.
    pub fn from_verifying_key(key: &p256::ecdsa::VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        // Uncompressed points always carry both coordinates.
        let x = point.x().map(|x| B256::from_slice(x)).unwrap_or_default();
        let y = point.y().map(|y| B256::from_slice(y)).unwrap_or_default();
        Self::PublicKey { x, y }
    }

    /// Owner bytes as stored on-chain: `abi.encode(address)` or `x || y`.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Address { address } => Bytes::copy_from_slice(address.into_word().as_slice()),
            Self::PublicKey { x, y } => {
                let mut buf = Vec::with_capacity(64);
                buf.extend_from_slice(x.as_slice());
                buf.extend_from_slice(y.as_slice());
                buf.into()
            }
        }
    }

    /// Parse owner bytes read from the wallet.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OwnerBytesError> {
        match bytes.len() {
            32 => {
                let word = B256::from_slice(bytes);
                if word[..12].iter().any(|b| *b != 0) {
                    return Err(OwnerBytesError::InvalidAddressOwner(word));
                }
                Ok(Self::address(Address::from_word(word)))
            }
            64 => Ok(Self::PublicKey {
                x: B256::from_slice(&bytes[..32]),
                y: B256::from_slice(&bytes[32..]),
            }),
            len => Err(OwnerBytesError::InvalidLength(len)),
        }
    }

    /// Returns the owner address, if this is an address credential.
    pub const fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address { address } => Some(*address),
            Self::PublicKey { .. } => None,
        }
    }
}

impl core::fmt::Display for OwnerCredential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Address { address } => write!(f, "address {address}"),
            Self::PublicKey { x, .. } => write!(f, "passkey {x}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum OwnerBytesError {
    #[display("owner bytes must be 32 or 64 bytes, got {_0}")]
    InvalidLength(usize),
    #[display("32-byte owner is not a left-padded address: {_0}")]
    InvalidAddressOwner(B256),
    #[display("stored bytes length {_0} is not a valid storage encoding")]
    MalformedStorage(U256),
}

impl core::error::Error for OwnerBytesError {}

/// Storage layout of the wallet's owner set.
///
/// ```text
/// root + 0  nextOwnerIndex      uint256
/// root + 1  removedOwnersCount  uint256
/// root + 2  ownerAtIndex        mapping(uint256 => bytes)
/// root + 3  isOwner             mapping(bytes => bool)
/// ```
///
/// Reading these slots directly keeps ownership observable even when the account's delegate
/// no longer routes calls to the wallet code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnerSetLayout {
    root: U256,
}

impl Default for OwnerSetLayout {
    fn default() -> Self {
        Self::new(MULTI_OWNABLE_STORAGE_ROOT)
    }
}

impl OwnerSetLayout {
    pub fn new(root: B256) -> Self {
        Self {
            root: U256::from_be_bytes(root.0),
        }
    }

    fn field(&self, offset: u64) -> B256 {
        B256::from(self.root.wrapping_add(U256::from(offset)))
    }

    pub fn next_owner_index_slot(&self) -> B256 {
        self.field(0)
    }

    /// Head slot of `ownerAtIndex[index]`.
    pub fn owner_at_index_slot(&self, index: U256) -> B256 {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&index.to_be_bytes::<32>());
        buf[32..].copy_from_slice(self.field(2).as_slice());
        keccak256(buf)
    }

    /// Slot of `isOwner[owner]`; bytes keys are hashed unpadded.
    pub fn is_owner_slot(&self, owner: &[u8]) -> B256 {
        let mut buf = Vec::with_capacity(owner.len() + 32);
        buf.extend_from_slice(owner);
        buf.extend_from_slice(self.field(3).as_slice());
        keccak256(buf)
    }
}

/// Decoded head word of a `bytes` value in storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoredBytes {
    /// Up to 31 bytes packed into the head word itself.
    Short(Bytes),
    /// 32 bytes or more, stored in consecutive words starting at `data_slot`.
    Long { len: usize, data_slot: B256 },
}

impl StoredBytes {
    /// Decode the head word found at `slot`.
    pub fn decode_head(slot: B256, head: B256) -> Result<Self, OwnerBytesError> {
        let value = U256::from_be_bytes(head.0);
        if !value.bit(0) {
            let len = (head[31] / 2) as usize;
            if len > 31 {
                return Err(OwnerBytesError::MalformedStorage(value));
            }
            return Ok(Self::Short(Bytes::copy_from_slice(&head[..len])));
        }

        let len: usize = (value >> 1usize)
            .try_into()
            .map_err(|_| OwnerBytesError::MalformedStorage(value))?;
        if len < 32 {
            return Err(OwnerBytesError::MalformedStorage(value));
        }
        Ok(Self::Long {
            len,
            data_slot: keccak256(slot),
        })
    }

    /// Slots holding the data words of a long value, in order.
    pub fn data_slots(&self) -> Vec<B256> {
        match self {
            Self::Short(_) => Vec::new(),
            Self::Long { len, data_slot } => {
                let start = U256::from_be_bytes(data_slot.0);
                (0..len.div_ceil(32))
                    .map(|i| B256::from(start.wrapping_add(U256::from(i))))
                    .collect()
            }
        }
    }

    /// Assemble the value from the data words read at [`Self::data_slots`].
    pub fn assemble(self, words: &[B256]) -> Bytes {
        match self {
            Self::Short(bytes) => bytes,
            Self::Long { len, .. } => {
                let mut out: Vec<u8> = words.iter().flat_map(|w| w.0).collect();
                out.truncate(len);
                out.into()
            }
        }
    }
}
