crate::sol! {
    /// Signature envelope understood by the wallet's `isValidSignature`.
    ///
    /// `signatureData` is `r || s || v` for address owners and an ABI-encoded [`WebAuthnAuth`]
    /// for public-key owners.
    #[derive(Debug, PartialEq, Eq)]
    struct SignatureWrapper {
        uint256 ownerIndex;
        bytes signatureData;
    }

    /// WebAuthn assertion as verified on-chain for P-256 passkey owners.
    #[derive(Debug, PartialEq, Eq)]
    struct WebAuthnAuth {
        bytes authenticatorData;
        string clientDataJSON;
        uint256 challengeIndex;
        uint256 typeIndex;
        uint256 r;
        uint256 s;
    }

    /// EIP-712 message type the wallet wraps every ERC-1271 hash in.
    #[derive(Debug, PartialEq, Eq)]
    struct CoinbaseSmartWalletMessage {
        bytes32 hash;
    }

    /// Multi-owner smart wallet running behind the proxy.
    #[derive(Debug, PartialEq, Eq)]
    #[sol(abi)]
    interface ISmartWallet {
        function isOwnerAddress(address account) external view returns (bool);
        function isOwnerPublicKey(bytes32 x, bytes32 y) external view returns (bool);

        function isValidSignature(bytes32 hash, bytes calldata signature) external view returns (bytes4 result);
    }
}

/// ERC-1271 magic value for a valid signature.
/// bytes4(keccak256("isValidSignature(bytes32,bytes)"))
pub const ERC1271_MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];
