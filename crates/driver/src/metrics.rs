use std::time::Duration;

use metrics::{counter, gauge, histogram};

#[derive(Debug, Clone, Copy)]
pub(crate) struct DriverMetrics;

impl DriverMetrics {
    // ################ COUNTERS ################ //

    // ============= L1 / L2 STATE ================ //

    /// Sets the L1 execution client head (aka: latest block number)
    pub(crate) fn set_l1_head(value: u64) {
        counter!("driver_l1_head").absolute(value);
    }

    /// Sets the L2 execution client head (aka: latest block number)
    pub(crate) fn set_l2_head(value: u64) {
        counter!("driver_l2_head").absolute(value);
    }

    /// Sets the L1 block up to which proposals have been replayed.
    pub(crate) fn set_l1_current(value: u64) {
        counter!("driver_l1_current").absolute(value);
    }

    /// Sets the ID of the latest proposed L2 block.
    pub(crate) fn set_head_block_id(value: u64) {
        counter!("driver_head_block_id").absolute(value);
    }

    /// Sets the ID of the latest verified L2 block.
    pub(crate) fn set_verified_block_id(value: u64) {
        counter!("driver_verified_block_id").absolute(value);
    }

    /// Increments the amount of L1 reorgs seen on the head subscription.
    pub(crate) fn increment_l1_reorgs() {
        counter!("driver_l1_reorgs").increment(1);
    }

    // ============= SYNC ================ //

    /// Increments the amount of L1 reorgs that invalidated inserted L2 blocks.
    pub(crate) fn increment_reorgs_detected(reset_to_block_id: u64) {
        counter!("driver_reorgs_detected", "reset_to" => reset_to_block_id.to_string())
            .increment(1);
    }

    /// Increments the amount of beacon syncs triggered.
    pub(crate) fn increment_beacon_syncs() {
        counter!("driver_beacon_syncs").increment(1);
    }

    /// Increments the amount of beacon syncs abandoned after the engine went out of sync.
    pub(crate) fn increment_beacon_syncs_abandoned() {
        counter!("driver_beacon_syncs_abandoned").increment(1);
    }

    /// Increments the amount of failed sync cycles by reason
    pub(crate) fn increment_sync_failures(reason: &'static str) {
        counter!("driver_sync_failures", "reason" => reason).increment(1);
    }

    // ============ L2 BLOCKS ================ //

    /// Increments the amount of L2 blocks inserted from L1 calldata
    pub(crate) fn increment_blocks_inserted() {
        counter!("driver_blocks_inserted").increment(1);
    }

    /// Increments the amount of proposed transaction lists replaced by an empty one, by reason
    pub(crate) fn increment_invalid_tx_lists(reason: &'static str) {
        counter!("driver_invalid_tx_lists", "reason" => reason).increment(1);
    }

    // ################ GAUGES ################ //

    /// Sets the version of the syncer driver.
    pub(crate) fn set_version(tag: String) {
        gauge!("driver_version", "tag" => tag).set(1.0);
    }

    /// Sets the amount of transactions included in an inserted L2 block, anchor excluded
    pub(crate) fn set_block_tx_count(value: usize) {
        gauge!("driver_block_tx_count").set(value as f64);
    }

    // ################ HISTOGRAMS ################ //

    /// Records the time it took to insert an L2 block through the Engine API
    pub(crate) fn record_block_insertion_time(time_elapsed: Duration) {
        histogram!("driver_block_insertion_time").record(time_elapsed.as_secs_f64());
    }
}
