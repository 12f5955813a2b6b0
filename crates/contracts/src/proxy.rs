pub use IEIP7702Proxy::IEIP7702ProxyErrors as ProxyError;

crate::sol! {
    /// Proxy template installed on an EOA through an EIP-7702 delegation designation.
    ///
    /// The template keeps the live logic contract in the ERC-1967 implementation slot of the
    /// delegating account. Its first initialization is authorized by a signature of the EOA key
    /// over the initialization commitment; every later implementation change is authorized by a
    /// signature over a set-implementation commitment bound to the nonce tracker.
    #[derive(Debug, PartialEq, Eq)]
    #[sol(abi)]
    interface IEIP7702Proxy {
        /// Initialize the account: install the default implementation and run its initializer.
        ///
        /// @param args ABI-encoded initializer arguments forwarded to the implementation
        /// @param signature EOA signature over keccak256(abi.encode(proxy, args))
        function initialize(bytes calldata args, bytes calldata signature) external;

        /// Point the account at a new implementation.
        ///
        /// @param newImplementation The logic contract to install
        /// @param callData Optional call made on the new implementation after the switch
        /// @param validator Contract checking the resulting wallet state
        /// @param signature Signature over the set-implementation commitment
        /// @param allowCrossChainReplay Whether the commitment was built with chainId = 0
        function setImplementation(
            address newImplementation,
            bytes calldata callData,
            address validator,
            bytes calldata signature,
            bool allowCrossChainReplay
        ) external;

        /// ERC-1271 entry point, falling back to the EOA key when the implementation rejects.
        function isValidSignature(bytes32 hash, bytes calldata signature) external view returns (bytes4 magicValue);

        error InvalidSignature();
        error InvalidValidation();
        error InvalidImplementation();
        error AlreadyInitialized();
    }

    /// Validator consulted by the proxy after an implementation change.
    #[derive(Debug, PartialEq, Eq)]
    #[sol(abi)]
    interface IWalletValidator {
        /// Reverts if the wallet is not in a usable state.
        function validateWalletState(address wallet) external view;

        error Uninitialized();
    }
}

// `invalid_signature()`, `invalid_validation()` and `already_initialized()` constructors are
// generated by `sol!` on `IEIP7702ProxyErrors`.
impl ProxyError {
    /// Returns true if the proxy rejected the signature itself.
    pub const fn is_signature_rejection(&self) -> bool {
        matches!(self, Self::InvalidSignature(_))
    }
}

/// Decodes revert data returned by the proxy, if it matches one of its errors.
pub fn decode_proxy_revert(data: &[u8]) -> Option<ProxyError> {
    use alloy_sol_types::SolInterface;
    ProxyError::abi_decode(data).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::{SolError, SolInterface};

    #[test]
    fn test_decode_proxy_revert() {
        let encoded = ProxyError::invalid_signature().abi_encode();
        let decoded = decode_proxy_revert(&encoded).unwrap();
        assert!(decoded.is_signature_rejection());

        let encoded = IEIP7702Proxy::InvalidValidation {}.abi_encode();
        assert_eq!(
            decode_proxy_revert(&encoded),
            Some(ProxyError::invalid_validation())
        );

        assert_eq!(decode_proxy_revert(&[0xde, 0xad, 0xbe, 0xef]), None);
        assert_eq!(decode_proxy_revert(&[]), None);
    }
}
