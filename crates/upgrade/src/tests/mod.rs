//! Upgrade and recovery flows driven end to end against [`fixtures::MockChain`].

mod fixtures;
