use alloy_primitives::{Address, B256, address, b256};

/// The address of the "golden touch" account, used to sign the `anchor` L2 transactions.
///
/// Ref: <https://github.com/taikoxyz/taiko-mono/blob/v0.18.0/packages/protocol/contracts/L2/TaikoL2.sol#L33>
pub const TAIKO_GOLDEN_TOUCH_ACCOUNT: Address =
    address!("0000777735367b36bC9B61C50022d9D0700dB4Ec");

/// The publicly known private key of the "golden touch" account.
///
/// It corresponds to the address: `0x0000777735367b36bC9B61C50022d9D0700dB4Ec`.
///
/// Ref: <https://github.com/taikoxyz/taiko-mono/blob/v0.18.0/packages/taiko-client/bindings/encoding/struct.go#L21>
pub const TAIKO_GOLDEN_TOUCH_PRIVATE_KEY: B256 =
    b256!("92954368afd3caa1f3ce3ead0069c1af414054aefe1ef9aeacc1bf426222ce38");

/// The gas limit of the `anchor` L2 transaction. The proposed block gas limit is extended by this
/// amount when building the block.
///
/// Ref: <https://github.com/taikoxyz/taiko-geth/blob/v0.1.0/consensus/taiko/consensus.go#L30>
pub const TAIKO_ANCHOR_GAS_LIMIT: u64 = 250_000;

/// The error message returned by taiko-geth when a resource (L1 origin, header) is missing.
pub const NOT_FOUND_ERROR: &str = "not found";
