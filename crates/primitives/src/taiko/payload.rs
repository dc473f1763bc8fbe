use alloy_primitives::{Address, B256, Bytes, U64, U256};
use alloy_rpc_types_engine::PayloadAttributes;
use serde::{Deserialize, Serialize};

use super::L1Origin;

/// The Taiko block metadata sent along the payload attributes of `engine_forkchoiceUpdatedV1`.
///
/// taiko-geth builds the block from these fields instead of its own transaction pool.
///
/// Ref: <https://github.com/taikoxyz/taiko-geth/blob/v0.1.0/beacon/engine/types.go#L45>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    /// The block beneficiary (coinbase).
    pub beneficiary: Address,
    /// The block gas limit, including the anchor transaction gas limit.
    pub gas_limit: U64,
    /// The block timestamp.
    pub timestamp: U64,
    /// The RLP-encoded transaction list, with the anchor transaction first.
    pub tx_list: Bytes,
    /// The block `mixHash`.
    pub mix_hash: B256,
    /// The block extra data.
    pub extra_data: Bytes,
    /// The highest proposed block ID at the time this block is built.
    #[serde(rename = "highestBlockID")]
    pub highest_block_id: U256,
}

/// Engine API payload attributes extended with the Taiko [`BlockMetadata`] and [`L1Origin`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaikoPayloadAttributes {
    /// The standard Engine API payload attributes.
    #[serde(flatten)]
    pub payload_attributes: PayloadAttributes,
    /// The base fee of the block to build.
    pub base_fee_per_gas: U256,
    /// The block metadata.
    pub block_metadata: BlockMetadata,
    /// The L1 origin to store with the new block.
    pub l1_origin: L1Origin,
}
