use ITaikoL2::ITaikoL2Instance;
use alloy::{contract::Result as ContractResult, eips::BlockId};
use alloy_primitives::{Address, B256, U256};
use alloy_sol_macro::sol;
use derive_more::derive::Deref;
use url::Url;

use crate::{DefaultProvider, new_default_provider};

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug, Default, PartialEq, Eq)]
    interface ITaikoL2 {
        /// @notice Anchors the latest L1 block details to L2 for cross-layer message
        /// verification. Always the first transaction of an L2 block, sent by the golden touch
        /// account.
        /// @param l1Hash The hash of the L1 block that contains the proposal.
        /// @param l1Height The height of the L1 block that contains the proposal.
        /// @param parentGasUsed The gas used in the parent L2 block.
        function anchor(bytes32 l1Hash, uint64 l1Height, uint32 parentGasUsed) external;

        /// @notice Returns the base fee of the next L2 block.
        /// @param timeSinceParent Seconds elapsed since the parent block.
        /// @param parentGasUsed The gas used in the parent L2 block.
        function getBasefee(uint64 timeSinceParent, uint32 parentGasUsed)
            external
            view
            returns (uint256 basefee);
    }
}

/// A wrapper over the L2 `TaikoL2.sol` contract that exposes various utility methods.
#[derive(Debug, Clone, Deref)]
pub struct TaikoL2(ITaikoL2Instance<DefaultProvider>);

impl TaikoL2 {
    /// Create a new `TaikoL2` instance at the given contract address.
    pub fn new<U: Into<Url>>(el_client_url: U, address: Address) -> Self {
        Self(ITaikoL2Instance::new(address, new_default_provider(el_client_url)))
    }

    /// Returns the base fee of a block built on top of `parent_hash`, evaluated against the
    /// parent state.
    pub async fn base_fee(
        &self,
        parent_hash: B256,
        time_since_parent: u64,
        parent_gas_used: u32,
    ) -> ContractResult<U256> {
        self.0
            .getBasefee(time_since_parent, parent_gas_used)
            .call()
            .block(BlockId::hash(parent_hash))
            .await
    }
}
