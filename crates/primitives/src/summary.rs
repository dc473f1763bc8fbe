use alloy::rpc::types::Header;

/// A compact, single line description of a value for the logs, when `Debug` is too noisy.
pub trait Summary {
    /// Returns the summary line.
    fn summary(&self) -> String;
}

impl Summary for Header {
    fn summary(&self) -> String {
        format!("#{} {} (parent {}, ts {})", self.number, self.hash, self.parent_hash, self.timestamp)
    }
}
