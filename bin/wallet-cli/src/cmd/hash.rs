use alloy::primitives::{Address, B256, Bytes, U256};
use clap::{Args, Subcommand};
use eyre::Result;
use wallet_primitives::{
    InitializationCommitment, OwnerCredential, SetImplementationCommitment, replay_safe_hash,
};

use crate::opts::parse_owner;

#[derive(Args, Debug)]
pub struct HashArgs {
    #[command(subcommand)]
    kind: HashKind,
}

#[derive(Subcommand, Debug)]
enum HashKind {
    /// Digest authorizing a `setImplementation` call
    SetImplementation {
        #[arg(long)]
        chain_id: u64,
        /// Proxy template address
        #[arg(long)]
        proxy: Address,
        /// Current nonce tracker value for the account
        #[arg(long)]
        nonce: U256,
        #[arg(long)]
        current_implementation: Address,
        #[arg(long)]
        new_implementation: Address,
        /// Call made on the new implementation after the switch
        #[arg(long, default_value = "0x")]
        call_data: Bytes,
        #[arg(long)]
        validator: Address,
        /// Encode the chain id as zero
        #[arg(long)]
        allow_cross_chain_replay: bool,
    },

    /// Digest authorizing the first initialization
    Init {
        /// Proxy template address
        #[arg(long)]
        proxy: Address,
        /// Owner to register, as an address or 64-byte public key; repeatable
        #[arg(long = "owner", value_parser = parse_owner, required = true)]
        owners: Vec<OwnerCredential>,
    },

    /// Digest an owner signs for the wallet's ERC-1271 check
    ReplaySafe {
        #[arg(long)]
        wallet: Address,
        #[arg(long)]
        chain_id: u64,
        #[arg(long)]
        digest: B256,
    },
}

impl HashArgs {
    pub fn run(self) -> Result<()> {
        println!("{}", self.kind.digest());
        Ok(())
    }
}

impl HashKind {
    fn digest(self) -> B256 {
        match self {
            Self::SetImplementation {
                chain_id,
                proxy,
                nonce,
                current_implementation,
                new_implementation,
                call_data,
                validator,
                allow_cross_chain_replay,
            } => SetImplementationCommitment {
                chain_id,
                proxy,
                nonce,
                current_implementation,
                new_implementation,
                call_data,
                validator,
                allow_cross_chain_replay,
            }
            .signature_hash(),
            Self::Init { proxy, owners } => {
                InitializationCommitment::for_owners(proxy, &owners).signature_hash()
            }
            Self::ReplaySafe {
                wallet,
                chain_id,
                digest,
            } => replay_safe_hash(wallet, chain_id, digest),
        }
    }
}
