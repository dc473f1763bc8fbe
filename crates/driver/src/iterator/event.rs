use std::{
    fmt::Debug,
    future::Future,
    ops::{ControlFlow, RangeInclusive},
};

use alloy::{
    rpc::types::{Filter, Header, Log},
    transports::TransportError,
};
use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolEvent;
use syncer_primitives::retries::Retryable;
use tracing::{trace, warn};

use super::{BatchHandler, ChainIterator, Cursor, Direction, IterParams, IteratorError};
use crate::rpc::ChainReader;

/// Consumes the events found by an [`EventIterator`].
pub(crate) trait EventHandler: Send {
    /// The contract event to look for.
    type Event: SolEvent + Send;
    /// The value returned when the handler stops the iteration early.
    type Break: Send;
    /// The handler error.
    type Error: From<TransportError> + From<IteratorError> + Retryable + Debug + Send;

    /// Handle one event. Returning [`ControlFlow::Break`] ends the whole iteration.
    fn on_event(
        &mut self,
        event: Self::Event,
        log: &Log,
    ) -> impl Future<Output = Result<ControlFlow<Self::Break>, Self::Error>> + Send;

    /// Called when the L1 cursor was reorged out and the iteration moved back to `cursor`.
    fn on_rewind(&mut self, _cursor: &Header) -> ControlFlow<Self::Break> {
        ControlFlow::Continue(())
    }
}

/// Iterates over the logs of one contract event, batch by batch, on top of a [`ChainIterator`].
///
/// Logs are delivered in chain order (reversed when iterating backwards) and removed logs are
/// skipped. When walking forward, the cursor follows the block of the last handled event.
#[derive(Debug)]
pub(crate) struct EventIterator<'a, C> {
    chain: ChainIterator<'a, C>,
    client: &'a C,
    address: Address,
    reverse: bool,
    ids: Vec<B256>,
}

impl<'a, C: ChainReader> EventIterator<'a, C> {
    /// Create a new iterator over the events emitted by `address`.
    pub(crate) fn new(
        client: &'a C,
        params: IterParams,
        address: Address,
    ) -> Result<Self, IteratorError> {
        let chain = ChainIterator::new(client, params)?;
        let reverse = params.direction == Direction::Reverse;

        Ok(Self { chain, client, address, reverse, ids: Vec::new() })
    }

    /// Only deliver events whose first indexed topic is one of the given block IDs.
    pub(crate) fn with_ids(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.ids = ids.into_iter().map(|id| B256::from(U256::from(id))).collect();
        self
    }

    /// Run the iteration. Returns the break value of the handler, if any.
    pub(crate) async fn run<H: EventHandler>(
        &self,
        handler: &mut H,
    ) -> Result<Option<H::Break>, H::Error> {
        let mut batches = EventBatches { iter: self, handler };
        self.chain.run(&mut batches).await
    }
}

/// Adapts an [`EventHandler`] to the batches of the underlying [`ChainIterator`].
struct EventBatches<'i, 'a, C, H> {
    iter: &'i EventIterator<'a, C>,
    handler: &'i mut H,
}

impl<C: ChainReader, H: EventHandler> BatchHandler for EventBatches<'_, '_, C, H> {
    type Break = H::Break;
    type Error = H::Error;

    async fn on_batch(
        &mut self,
        range: RangeInclusive<u64>,
        cursor: &mut Cursor,
    ) -> Result<ControlFlow<H::Break>, H::Error> {
        let mut filter = Filter::new()
            .address(self.iter.address)
            .event_signature(H::Event::SIGNATURE_HASH)
            .from_block(*range.start())
            .to_block(*range.end());
        if !self.iter.ids.is_empty() {
            filter = filter.topic1(self.iter.ids.clone());
        }

        let mut logs = self.iter.client.logs(&filter).await?;
        logs.retain(|log| !log.removed);
        logs.sort_by_key(|log| (log.block_number, log.log_index));
        if self.iter.reverse {
            logs.reverse();
        }

        trace!(?range, count = logs.len(), "Fetched event logs");

        for log in logs {
            let event = match log.log_decode::<H::Event>() {
                Ok(decoded) => decoded.inner.data,
                Err(err) => {
                    warn!(?err, tx = ?log.transaction_hash, "Failed to decode event log, skipping");
                    continue;
                }
            };

            if let ControlFlow::Break(value) = self.handler.on_event(event, &log).await? {
                return Ok(ControlFlow::Break(value));
            }

            if self.iter.reverse {
                continue;
            }

            let Some(block_hash) = log.block_hash else { continue };
            if block_hash != cursor.header().hash {
                if let Some(header) = self.iter.client.header_by_hash(block_hash).await? {
                    cursor.update(header);
                }
            }
        }

        Ok(ControlFlow::Continue(()))
    }

    fn on_rewind(&mut self, cursor: &Header) -> ControlFlow<H::Break> {
        self.handler.on_rewind(cursor)
    }
}
