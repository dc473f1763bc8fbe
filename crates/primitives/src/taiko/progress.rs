use alloy_primitives::U64;
use serde::{Deserialize, Serialize};

/// The snap-sync progress counters reported by `eth_syncing` while a node is syncing.
///
/// Every field is optional, since different node versions report different subsets of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    /// Block number where the sync started.
    #[serde(default)]
    pub starting_block: Option<U64>,
    /// Current block number of the sync.
    #[serde(default)]
    pub current_block: Option<U64>,
    /// Highest block number known to the node.
    #[serde(default)]
    pub highest_block: Option<U64>,
    /// Number of state entries downloaded.
    #[serde(default)]
    pub pulled_states: Option<U64>,
    /// Number of state entries known.
    #[serde(default)]
    pub known_states: Option<U64>,
    /// Number of accounts downloaded.
    #[serde(default)]
    pub synced_accounts: Option<U64>,
    /// Number of account trie bytes persisted.
    #[serde(default)]
    pub synced_account_bytes: Option<U64>,
    /// Number of bytecodes downloaded.
    #[serde(default)]
    pub synced_bytecodes: Option<U64>,
    /// Number of bytecode bytes downloaded.
    #[serde(default)]
    pub synced_bytecode_bytes: Option<U64>,
    /// Number of storage slots downloaded.
    #[serde(default)]
    pub synced_storage: Option<U64>,
    /// Number of storage trie bytes persisted.
    #[serde(default)]
    pub synced_storage_bytes: Option<U64>,
    /// Number of state trie nodes healed.
    #[serde(default)]
    pub healed_trienodes: Option<U64>,
    /// Number of state trie bytes healed.
    #[serde(default)]
    pub healed_trienode_bytes: Option<U64>,
    /// Number of bytecodes healed.
    #[serde(default)]
    pub healed_bytecodes: Option<U64>,
    /// Number of bytecode bytes healed.
    #[serde(default)]
    pub healed_bytecode_bytes: Option<U64>,
    /// Number of state trie nodes pending healing.
    #[serde(default)]
    pub healing_trienodes: Option<U64>,
    /// Number of bytecodes pending healing.
    #[serde(default)]
    pub healing_bytecode: Option<U64>,
}

impl SyncProgress {
    /// Returns `true` if the node imported anything since the `prev` snapshot, i.e. if the current
    /// block or any of the downloaded or healed counters increased. The highest block and the
    /// known and pending counters follow the network and are ignored.
    pub fn has_progressed(&self, prev: &Self) -> bool {
        self.current_block > prev.current_block ||
            self.pulled_states > prev.pulled_states ||
            self.synced_accounts > prev.synced_accounts ||
            self.synced_account_bytes > prev.synced_account_bytes ||
            self.synced_bytecodes > prev.synced_bytecodes ||
            self.synced_bytecode_bytes > prev.synced_bytecode_bytes ||
            self.synced_storage > prev.synced_storage ||
            self.synced_storage_bytes > prev.synced_storage_bytes ||
            self.healed_trienodes > prev.healed_trienodes ||
            self.healed_trienode_bytes > prev.healed_trienode_bytes ||
            self.healed_bytecodes > prev.healed_bytecodes ||
            self.healed_bytecode_bytes > prev.healed_bytecode_bytes
    }
}

/// The response of `eth_syncing`: `false` when the node is not syncing, or the progress counters
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SyncingResponse {
    /// The node is not syncing. Always `false`.
    NotSyncing(bool),
    /// The node is syncing.
    Progress(SyncProgress),
}

impl SyncingResponse {
    /// Returns the sync progress, if the node is syncing.
    pub const fn into_progress(self) -> Option<SyncProgress> {
        match self {
            Self::NotSyncing(_) => None,
            Self::Progress(progress) => Some(progress),
        }
    }
}
