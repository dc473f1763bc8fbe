/// `TaikoL1.sol` L1 protocol contract bindings
///
/// Ref: <https://github.com/taikoxyz/taiko-mono/blob/v0.18.0/packages/protocol/contracts/L1/TaikoL1.sol>
pub mod l1;

/// `TaikoL2.sol` L2 contract bindings
///
/// Ref: <https://github.com/taikoxyz/taiko-mono/blob/v0.18.0/packages/protocol/contracts/L2/TaikoL2.sol>
pub mod l2;

/// Deterministic construction of the `anchor` system transaction.
pub mod anchor;
