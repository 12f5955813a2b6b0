crate::sol! {
    /// Per-account replay protection for `setImplementation`.
    ///
    /// The proxy consumes the caller's current nonce while verifying a set-implementation
    /// signature, so a commitment is only ever valid for the nonce it was built with.
    #[derive(Debug, PartialEq, Eq)]
    #[sol(abi)]
    interface INonceTracker {
        /// Current nonce for an account, i.e. the value the next commitment must carry.
        function nonces(address account) external view returns (uint256 nonce);
    }
}
