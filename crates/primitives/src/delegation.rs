use alloy_primitives::{Address, Bytes};
use wallet_contracts::{DELEGATION_CODE_LEN, DELEGATION_PREFIX};

/// EIP-7702 delegation designation: `0xef0100 || delegate`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
#[display("delegation to {_0}")]
pub struct DelegationDesignation(Address);

impl DelegationDesignation {
    /// Create a designation pointing at `delegate`.
    pub const fn new(delegate: Address) -> Self {
        Self(delegate)
    }

    /// The address the account's execution is routed to.
    pub const fn delegate(&self) -> Address {
        self.0
    }

    /// Code an account carries once this designation is installed.
    pub fn to_code(&self) -> Bytes {
        let mut code = Vec::with_capacity(DELEGATION_CODE_LEN);
        code.extend_from_slice(&DELEGATION_PREFIX);
        code.extend_from_slice(self.0.as_slice());
        code.into()
    }
}

/// Classification of an account's deployed code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DelegateCode {
    /// No code, the account was never delegated.
    Empty,
    /// A well-formed delegation designation.
    Designation(DelegationDesignation),
    /// Anything else: foreign prefix or wrong length.
    Unrecognized(Bytes),
}

impl DelegateCode {
    /// Classify raw account code.
    pub fn classify(code: &[u8]) -> Self {
        if code.is_empty() {
            return Self::Empty;
        }

        // EIP-7702 only ever writes `0xef0100 || address`, so a designation is exactly 23 bytes.
        // Prefixed code of any other length is reported as unrecognized.
        if code.len() == DELEGATION_CODE_LEN && code.starts_with(&DELEGATION_PREFIX) {
            let delegate = Address::from_slice(&code[DELEGATION_PREFIX.len()..]);
            return Self::Designation(DelegationDesignation::new(delegate));
        }

        Self::Unrecognized(Bytes::copy_from_slice(code))
    }

    /// Compare against the delegate the account is expected to point at.
    pub fn check(&self, expected: Address) -> Result<(), DelegateMismatch> {
        match self {
            Self::Empty => Err(DelegateMismatch::NotDelegated),
            Self::Designation(designation) if designation.delegate() == expected => Ok(()),
            Self::Designation(designation) => Err(DelegateMismatch::WrongDelegate {
                found: designation.delegate(),
            }),
            Self::Unrecognized(code) => Err(DelegateMismatch::MalformedDesignation {
                code_len: code.len(),
            }),
        }
    }
}

/// Why an account's code does not match the expected delegate.
///
/// This is reported alongside the issue vector, never raised as an error.
#[derive(Clone, Debug, PartialEq, Eq, derive_more::Display)]
pub enum DelegateMismatch {
    #[display("account has no code")]
    NotDelegated,
    #[display("code is not a delegation designation ({code_len} bytes)")]
    MalformedDesignation { code_len: usize },
    #[display("delegated to {found}")]
    WrongDelegate { found: Address },
}
