use std::{
    fmt::Debug,
    future::Future,
    ops::{ControlFlow, RangeInclusive},
};

use alloy::{rpc::types::Header, transports::TransportError};
use syncer_primitives::retries::{RetryConfig, Retryable};
use tokio::time::sleep;
use tokio_retry::RetryIf;
use tracing::{debug, warn};

use super::{Cursor, Direction, IteratorError};
use crate::rpc::ChainReader;

/// Consumes the block batches walked by a [`ChainIterator`].
pub(crate) trait BatchHandler: Send {
    /// The value returned when the handler stops the iteration early.
    type Break: Send;
    /// The handler error. Retryable errors make the iterator retry the batch.
    type Error: From<TransportError> + From<IteratorError> + Retryable + Debug + Send;

    /// Handle the blocks in `range`. The handler can move `cursor` to the last block it fully
    /// handled, so that a retry of the batch doesn't start over.
    fn on_batch(
        &mut self,
        range: RangeInclusive<u64>,
        cursor: &mut Cursor,
    ) -> impl Future<Output = Result<ControlFlow<Self::Break>, Self::Error>> + Send;

    /// Called when the cursor was reorged out and the iteration moved back to `cursor`.
    fn on_rewind(&mut self, _cursor: &Header) -> ControlFlow<Self::Break> {
        ControlFlow::Continue(())
    }
}

/// The parameters of a [`ChainIterator`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct IterParams {
    /// The first block of the range.
    pub(crate) start: u64,
    /// The last block of the range. `None` follows the chain head.
    pub(crate) end: Option<u64>,
    /// The number of blocks handed to the handler at once.
    pub(crate) epoch_size: u64,
    pub(crate) direction: Direction,
    /// How many blocks to go back when the cursor is reorged out.
    pub(crate) reorg_rewind_depth: u64,
    /// Backoff applied to retryable handler errors.
    pub(crate) retry: RetryConfig,
}

/// Walks a block range of one chain in batches of `epoch_size` blocks.
///
/// Before each batch the cursor is re-fetched by hash. If the chain no longer knows it, the
/// cursor went through a reorg and the iteration rewinds `reorg_rewind_depth` blocks (never
/// before `start`). Dropping the future returned by [`ChainIterator::run`] cancels the iteration.
#[derive(Debug)]
pub(crate) struct ChainIterator<'a, C> {
    client: &'a C,
    params: IterParams,
}

impl<'a, C: ChainReader> ChainIterator<'a, C> {
    /// Create a new iterator, validating its parameters.
    pub(crate) fn new(client: &'a C, params: IterParams) -> Result<Self, IteratorError> {
        if params.epoch_size == 0 {
            return Err(IteratorError::ZeroEpochSize);
        }

        match (params.direction, params.end) {
            (Direction::Reverse, None) => return Err(IteratorError::ReverseWithoutEnd),
            (_, Some(end)) if params.start > end => {
                return Err(IteratorError::StartAboveEnd { start: params.start, end });
            }
            _ => {}
        }

        Ok(Self { client, params })
    }

    /// Run the iteration to the end of the range, or until the handler breaks. Returns the break
    /// value, if any.
    pub(crate) async fn run<H: BatchHandler>(
        &self,
        handler: &mut H,
    ) -> Result<Option<H::Break>, H::Error> {
        let first = match (self.params.direction, self.params.end) {
            (Direction::Reverse, Some(end)) => end,
            _ => self.params.start,
        };

        let header = RetryIf::spawn(
            self.params.retry.strategy(),
            || self.header_at::<H::Error>(first),
            <H::Error as Retryable>::is_retryable,
        )
        .await?;

        let mut cursor = Cursor::new(header);
        let mut next = first;
        let mut delays = self.params.retry.strategy();

        loop {
            let step = match self.params.direction {
                Direction::Forward => self.forward_batch(handler, &mut cursor, &mut next).await,
                Direction::Reverse => self.reverse_batch(handler, &mut cursor, &mut next).await,
            };

            match step {
                Ok(ControlFlow::Continue(())) => delays = self.params.retry.strategy(),
                Ok(ControlFlow::Break(value)) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    let Some(delay) = delays.next() else { return Err(err) };
                    warn!(?err, ?delay, next, "Failed to handle block batch, retrying");
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Handle the next forward batch. `next` is the lowest block not handled yet.
    async fn forward_batch<H: BatchHandler>(
        &self,
        handler: &mut H,
        cursor: &mut Cursor,
        next: &mut u64,
    ) -> Result<ControlFlow<Option<H::Break>>, H::Error> {
        let end = match self.params.end {
            Some(end) => end,
            None => self.client.latest_header().await?.number,
        };

        if self.client.header_by_hash(cursor.header().hash).await?.is_none() {
            let rewound =
                cursor.number().saturating_sub(self.params.reorg_rewind_depth).max(self.params.start);
            warn!(cursor = cursor.number(), rewound, "Iterator cursor reorged out, rewinding");

            cursor.update(self.header_at::<H::Error>(rewound).await?);
            *next = (*next).min(rewound);

            if let ControlFlow::Break(value) = handler.on_rewind(cursor.header()) {
                return Ok(ControlFlow::Break(Some(value)));
            }
        }

        // A retried batch resumes at the last block its handler completed.
        let from = (*next).max(cursor.number());
        if from > end {
            return Ok(ControlFlow::Break(None));
        }

        let to = end.min(from.saturating_add(self.params.epoch_size - 1));
        debug!(from, to, "Handling forward block batch");

        if let ControlFlow::Break(value) = handler.on_batch(from..=to, cursor).await? {
            return Ok(ControlFlow::Break(Some(value)));
        }

        if cursor.number() < to {
            cursor.update(self.header_at::<H::Error>(to).await?);
        }
        *next = to + 1;

        Ok(ControlFlow::Continue(()))
    }

    /// Handle the next reverse batch. `next` is the highest block not handled yet.
    async fn reverse_batch<H: BatchHandler>(
        &self,
        handler: &mut H,
        cursor: &mut Cursor,
        next: &mut u64,
    ) -> Result<ControlFlow<Option<H::Break>>, H::Error> {
        if self.client.header_by_hash(cursor.header().hash).await?.is_none() {
            warn!(cursor = cursor.number(), "Iterator cursor reorged out, refetching");
            cursor.update(self.header_at::<H::Error>(cursor.number()).await?);

            if let ControlFlow::Break(value) = handler.on_rewind(cursor.header()) {
                return Ok(ControlFlow::Break(Some(value)));
            }
        }

        let to = *next;
        let from = to.saturating_sub(self.params.epoch_size - 1).max(self.params.start);
        debug!(from, to, "Handling reverse block batch");

        if let ControlFlow::Break(value) = handler.on_batch(from..=to, cursor).await? {
            return Ok(ControlFlow::Break(Some(value)));
        }

        if from == self.params.start {
            return Ok(ControlFlow::Break(None));
        }

        cursor.update(self.header_at::<H::Error>(from).await?);
        *next = from - 1;

        Ok(ControlFlow::Continue(()))
    }

    async fn header_at<E>(&self, number: u64) -> Result<Header, E>
    where
        E: From<TransportError> + From<IteratorError>,
    {
        self.client
            .header_by_number(number)
            .await?
            .ok_or_else(|| IteratorError::BlockNotFound(number).into())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy::transports::TransportErrorKind;

    use super::*;
    use crate::{error::SyncError, test_utils::MockL1};

    const RETRY: RetryConfig =
        RetryConfig { initial_ms: 1, max_delay: Duration::from_millis(5), max_retries: 3 };

    fn params(start: u64, end: Option<u64>, epoch_size: u64, direction: Direction) -> IterParams {
        IterParams { start, end, epoch_size, direction, reorg_rewind_depth: 2, retry: RETRY }
    }

    /// Records the batches it receives and moves the cursor to the end of each one.
    #[derive(Debug, Default)]
    struct Recorder {
        l1: Option<MockL1>,
        batches: Vec<RangeInclusive<u64>>,
        break_at: Option<u64>,
        fail_once_at: Option<u64>,
        reorg_once_at: Option<u64>,
        rewinds: Vec<u64>,
        break_on_rewind: bool,
    }

    impl BatchHandler for Recorder {
        type Break = u64;
        type Error = SyncError;

        async fn on_batch(
            &mut self,
            range: RangeInclusive<u64>,
            cursor: &mut Cursor,
        ) -> Result<ControlFlow<u64>, SyncError> {
            self.batches.push(range.clone());

            if let Some(at) = self.break_at.filter(|at| range.contains(at)) {
                return Ok(ControlFlow::Break(at));
            }

            if let Some(at) = self.fail_once_at.take_if(|at| range.contains(at)) {
                let l1 = self.l1.as_ref().unwrap();
                cursor.update(l1.header(at));
                return Err(TransportErrorKind::backend_gone().into());
            }

            if let Some(l1) = &self.l1 {
                cursor.update(l1.header(*range.end()));

                if let Some(at) = self.reorg_once_at.take() {
                    l1.reorg_from(at);
                }
            }

            Ok(ControlFlow::Continue(()))
        }

        fn on_rewind(&mut self, cursor: &Header) -> ControlFlow<u64> {
            self.rewinds.push(cursor.number);
            if self.break_on_rewind {
                ControlFlow::Break(cursor.number)
            } else {
                ControlFlow::Continue(())
            }
        }
    }

    #[test]
    fn rejects_invalid_parameters() {
        let l1 = MockL1::with_blocks(10);

        let err = ChainIterator::new(&l1, params(5, Some(4), 1, Direction::Forward)).unwrap_err();
        assert!(matches!(err, IteratorError::StartAboveEnd { start: 5, end: 4 }));

        let err = ChainIterator::new(&l1, params(0, None, 1, Direction::Reverse)).unwrap_err();
        assert!(matches!(err, IteratorError::ReverseWithoutEnd));

        let err = ChainIterator::new(&l1, params(0, Some(4), 0, Direction::Forward)).unwrap_err();
        assert!(matches!(err, IteratorError::ZeroEpochSize));
    }

    #[tokio::test]
    async fn walks_forward_in_epochs() {
        let l1 = MockL1::with_blocks(10);
        let iter = ChainIterator::new(&l1, params(0, Some(9), 4, Direction::Forward)).unwrap();

        let mut handler = Recorder::default();
        let res = iter.run(&mut handler).await.unwrap();

        assert_eq!(res, None);
        assert_eq!(handler.batches, vec![0..=3, 4..=7, 8..=9]);
    }

    #[tokio::test]
    async fn follows_the_head_when_unbounded() {
        let l1 = MockL1::with_blocks(6);
        let iter = ChainIterator::new(&l1, params(2, None, 10, Direction::Forward)).unwrap();

        let mut handler = Recorder::default();
        iter.run(&mut handler).await.unwrap();

        assert_eq!(handler.batches, vec![2..=5]);
    }

    #[tokio::test]
    async fn walks_in_reverse() {
        let l1 = MockL1::with_blocks(10);
        let iter = ChainIterator::new(&l1, params(0, Some(9), 4, Direction::Reverse)).unwrap();

        let mut handler = Recorder::default();
        iter.run(&mut handler).await.unwrap();

        assert_eq!(handler.batches, vec![6..=9, 2..=5, 0..=1]);
    }

    #[tokio::test]
    async fn break_value_is_returned() {
        let l1 = MockL1::with_blocks(10);
        let iter = ChainIterator::new(&l1, params(0, Some(9), 4, Direction::Forward)).unwrap();

        let mut handler = Recorder { break_at: Some(5), ..Default::default() };
        let res = iter.run(&mut handler).await.unwrap();

        assert_eq!(res, Some(5));
        assert_eq!(handler.batches, vec![0..=3, 4..=7], "no batch is handled after a break");
    }

    #[tokio::test]
    async fn retried_batch_resumes_at_cursor() {
        let l1 = MockL1::with_blocks(10);
        let iter = ChainIterator::new(&l1, params(0, Some(9), 4, Direction::Forward)).unwrap();

        let mut handler =
            Recorder { l1: Some(l1.clone()), fail_once_at: Some(2), ..Default::default() };
        iter.run(&mut handler).await.unwrap();

        assert_eq!(handler.batches, vec![0..=3, 2..=5, 6..=9]);
    }

    #[tokio::test]
    async fn rewinds_when_cursor_is_reorged_out() {
        let l1 = MockL1::with_blocks(10);
        let iter = ChainIterator::new(&l1, params(0, Some(9), 4, Direction::Forward)).unwrap();

        // The first batch moves the cursor to block 3, which the reorg then replaces.
        let mut handler =
            Recorder { l1: Some(l1.clone()), reorg_once_at: Some(2), ..Default::default() };
        iter.run(&mut handler).await.unwrap();

        assert_eq!(handler.batches, vec![0..=3, 1..=4, 5..=8, 9..=9]);
        assert_eq!(handler.rewinds, vec![1]);
    }

    #[tokio::test]
    async fn handler_can_stop_on_rewind() {
        let l1 = MockL1::with_blocks(10);
        let iter = ChainIterator::new(&l1, params(0, Some(9), 4, Direction::Forward)).unwrap();

        let mut handler = Recorder {
            l1: Some(l1.clone()),
            reorg_once_at: Some(2),
            break_on_rewind: true,
            ..Default::default()
        };
        let res = iter.run(&mut handler).await.unwrap();

        assert_eq!(res, Some(1), "the iteration ends at the rewound block");
        assert_eq!(handler.batches, vec![0..=3]);
    }

    #[tokio::test]
    async fn non_retryable_errors_are_returned() {
        let l1 = MockL1::with_blocks(3);
        let iter = ChainIterator::new(&l1, params(0, Some(5), 10, Direction::Forward)).unwrap();

        let err = iter.run(&mut Recorder::default()).await.unwrap_err();
        assert!(matches!(err, SyncError::Iterator(IteratorError::BlockNotFound(5))));
    }
}
