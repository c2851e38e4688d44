//! Live trade sources
//!
//! A live source yields one trade at a time from an external transport. The
//! transport itself (socket handling, credentials, reconnects) lives outside
//! this crate and only needs a [`ChannelTradeSource`] sender or a
//! [`futures::Stream`] of trades.

use crate::errors::StreamError;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tickbars_core::Trade;
use tokio::sync::mpsc;

/// Default capacity of the trade channel between transport and engine
pub const DEFAULT_TRADE_CHANNEL_CAPACITY: usize = 1000;

/// Unified interface for live trade feeds
#[async_trait]
pub trait LiveTradeSource: Send {
    /// Wait for the next trade
    ///
    /// `Ok(None)` is a clean end of data (finite feeds only);
    /// `Err(StreamError::Disconnected)` means the transport went away.
    async fn next_trade(&mut self) -> Result<Option<Trade>, StreamError>;
}

#[async_trait]
impl<S: LiveTradeSource + ?Sized> LiveTradeSource for Box<S> {
    async fn next_trade(&mut self) -> Result<Option<Trade>, StreamError> {
        (**self).next_trade().await
    }
}

/// Trade source backed by a bounded tokio channel
///
/// The transport pushes trades through a sender from [`trade_sender`]. Once
/// the engine starts reading, the source drops its own sender, so the channel
/// closes (and the source reports `Disconnected`) as soon as every handed-out
/// sender is gone.
///
/// [`trade_sender`]: ChannelTradeSource::trade_sender
#[derive(Debug)]
pub struct ChannelTradeSource {
    trade_rx: mpsc::Receiver<Trade>,
    trade_tx: Option<mpsc::Sender<Trade>>,
    received: u64,
}

impl ChannelTradeSource {
    pub fn new(capacity: usize) -> Self {
        let (trade_tx, trade_rx) = mpsc::channel(capacity.max(1));
        Self {
            trade_rx,
            trade_tx: Some(trade_tx),
            received: 0,
        }
    }

    /// Wrap a receiver whose senders are managed elsewhere
    pub fn from_receiver(trade_rx: mpsc::Receiver<Trade>) -> Self {
        Self {
            trade_rx,
            trade_tx: None,
            received: 0,
        }
    }

    /// Sender for the transport; `None` once reading has started
    pub fn trade_sender(&self) -> Option<mpsc::Sender<Trade>> {
        self.trade_tx.clone()
    }

    /// Trades received so far
    pub fn received(&self) -> u64 {
        self.received
    }
}

impl Default for ChannelTradeSource {
    fn default() -> Self {
        Self::new(DEFAULT_TRADE_CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl LiveTradeSource for ChannelTradeSource {
    async fn next_trade(&mut self) -> Result<Option<Trade>, StreamError> {
        self.trade_tx = None;
        match self.trade_rx.recv().await {
            Some(trade) => {
                self.received += 1;
                Ok(Some(trade))
            }
            None => {
                tracing::debug!(received = self.received, "trade channel closed");
                Err(StreamError::Disconnected)
            }
        }
    }
}

/// Adapter for transports that expose a [`Stream`] of trades
///
/// The end of the stream is treated as a disconnect.
pub struct StreamTradeSource<S> {
    inner: S,
}

impl<S> StreamTradeSource<S>
where
    S: Stream<Item = Trade> + Send + Unpin,
{
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S> LiveTradeSource for StreamTradeSource<S>
where
    S: Stream<Item = Trade> + Send + Unpin,
{
    async fn next_trade(&mut self) -> Result<Option<Trade>, StreamError> {
        self.inner.next().await.map(Some).ok_or(StreamError::Disconnected)
    }
}
