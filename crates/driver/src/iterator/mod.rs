use alloy::rpc::types::Header;
use thiserror::Error;

mod chain;
pub(crate) use chain::{BatchHandler, ChainIterator, IterParams};

mod event;
pub(crate) use event::{EventHandler, EventIterator};

/// Errors of the chain and event iterators.
#[derive(Debug, Error)]
pub enum IteratorError {
    #[error("start height {start} is above end height {end}")]
    StartAboveEnd { start: u64, end: u64 },
    #[error("reverse iteration requires an end height")]
    ReverseWithoutEnd,
    #[error("epoch size must be greater than zero")]
    ZeroEpochSize,
    #[error("block {0} not found")]
    BlockNotFound(u64),
}

/// The direction in which a block range is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Direction {
    /// From the lowest to the highest block.
    #[default]
    Forward,
    /// From the highest to the lowest block.
    Reverse,
}

/// The last block an iteration has fully handled.
///
/// Handlers move it forward while processing a batch, so that a retried batch resumes after the
/// work already done.
#[derive(Debug, Clone)]
pub(crate) struct Cursor {
    header: Header,
}

impl Cursor {
    pub(crate) const fn new(header: Header) -> Self {
        Self { header }
    }

    /// Returns the header the cursor points at.
    pub(crate) const fn header(&self) -> &Header {
        &self.header
    }

    pub(crate) fn number(&self) -> u64 {
        self.header.number
    }

    /// Move the cursor to the given header.
    pub(crate) fn update(&mut self, header: Header) {
        self.header = header;
    }
}
