use std::ops::Range;

use ITaikoL1::{Config, ITaikoL1Instance, StateVariables, proposeBlockCall};
use alloy::contract::Result as ContractResult;
use alloy_primitives::{Address, B256, Bytes};
use alloy_sol_macro::sol;
use alloy_sol_types::{Result as SolResult, SolCall};
use derive_more::derive::Deref;
use url::Url;

use crate::{DefaultProvider, new_default_provider};

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug, Default, PartialEq, Eq)]
    interface ITaikoL1 {
        /// The metadata of a proposed L2 block.
        struct BlockMetadata {
            uint64 id;
            uint64 timestamp;
            uint64 l1Height;
            bytes32 l1Hash;
            bytes32 mixHash;
            bytes32 txListHash;
            uint24 txListByteStart;
            uint24 txListByteEnd;
            uint32 gasLimit;
            address beneficiary;
            bytes32 extraData;
            bool blobUsed;
        }

        /// The protocol state counters.
        struct StateVariables {
            uint64 genesisHeight;
            uint64 genesisTimestamp;
            uint64 numBlocks;
            uint64 lastVerifiedBlockId;
        }

        /// The protocol limits applied to proposed blocks.
        struct Config {
            uint64 chainId;
            uint64 maxNumProposedBlocks;
            uint32 blockMaxGasLimit;
            uint64 maxTransactionsPerBlock;
            uint64 maxBytesPerTxList;
            uint64 minTxGasLimit;
        }

        /// Emitted when a block is proposed.
        event BlockProposed(
            uint256 indexed blockId,
            address indexed assignedProver,
            uint96 livenessBond,
            BlockMetadata meta
        );

        /// Emitted when a block is proven.
        event BlockProven(
            uint256 indexed blockId,
            bytes32 parentHash,
            bytes32 blockHash,
            bytes32 signalRoot,
            address prover
        );

        /// Emitted when a block is verified.
        event BlockVerified(uint256 indexed blockId, address indexed prover, bytes32 blockHash);

        /// Emitted when an L2 block hash is synced to L1.
        event CrossChainSynced(uint64 indexed srcHeight, bytes32 blockHash, bytes32 signalRoot);

        /// Proposes a Taiko L2 block.
        function proposeBlock(bytes calldata params, bytes calldata txList)
            external
            payable
            returns (BlockMetadata memory meta);

        /// Returns the protocol state counters.
        function getStateVariables() external view returns (StateVariables memory);

        /// Returns the L2 block hash synced to L1 for the given block ID. Zero means the
        /// latest synced one.
        function getCrossChainBlockHash(uint64 blockId) external view returns (bytes32);

        /// Returns the protocol configuration.
        function getConfig() external pure returns (Config memory);
    }
}

/// A wrapper over the L1 `TaikoL1.sol` contract that exposes various utility methods.
#[derive(Debug, Clone, Deref)]
pub struct TaikoL1(ITaikoL1Instance<DefaultProvider>);

impl TaikoL1 {
    /// Create a new `TaikoL1` instance at the given contract address.
    pub fn new<U: Into<Url>>(el_client_url: U, address: Address) -> Self {
        Self(ITaikoL1Instance::new(address, new_default_provider(el_client_url)))
    }

    /// Returns the protocol state counters.
    pub async fn state_variables(&self) -> ContractResult<StateVariables> {
        self.0.getStateVariables().call().await
    }

    /// Returns the L2 block hash recorded on L1 for the given block ID.
    pub async fn cross_chain_block_hash(&self, block_id: u64) -> ContractResult<B256> {
        self.0.getCrossChainBlockHash(block_id).call().await
    }

    /// Returns the protocol configuration.
    pub async fn protocol_config(&self) -> ContractResult<Config> {
        self.0.getConfig().call().await
    }
}

/// The decoded input of a `proposeBlock` transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposeBlockInput {
    /// The ABI-encoded block params.
    pub params: Bytes,
    /// The transaction list bytes as submitted in calldata.
    pub tx_list: Bytes,
}

impl ProposeBlockInput {
    /// Decode the calldata of a `proposeBlock` transaction.
    pub fn decode(input: &[u8]) -> SolResult<Self> {
        let call = proposeBlockCall::abi_decode(input)?;
        Ok(Self { params: call.params, tx_list: call.txList })
    }

    /// Returns the slice of the transaction list selected by the block metadata, or an empty
    /// slice if the range is out of bounds.
    pub fn tx_list_slice(&self, range: Range<usize>) -> &[u8] {
        self.tx_list.get(range).unwrap_or_default()
    }
}

impl ITaikoL1::BlockMetadata {
    /// The byte range of the transaction list this block uses in the proposal calldata.
    pub fn tx_list_range(&self) -> Range<usize> {
        self.txListByteStart.to::<usize>()..self.txListByteEnd.to::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::aliases::U24;

    use super::*;

    #[test]
    fn decodes_propose_block_calldata() {
        let call = proposeBlockCall {
            params: Bytes::from_static(&[1, 2, 3]),
            txList: Bytes::from_static(&[0xc0, 0xaa, 0xbb]),
        };

        let input = ProposeBlockInput::decode(&call.abi_encode()).unwrap();

        assert_eq!(input.params, call.params);
        assert_eq!(input.tx_list_slice(0..1), &[0xc0]);
        assert!(input.tx_list_slice(2..10).is_empty(), "out of bounds ranges select nothing");
    }

    #[test]
    fn metadata_selects_tx_list_range() {
        let meta = ITaikoL1::BlockMetadata {
            txListByteStart: U24::from(4),
            txListByteEnd: U24::from(12),
            ..Default::default()
        };

        assert_eq!(meta.tx_list_range(), 4..12);
    }
}
