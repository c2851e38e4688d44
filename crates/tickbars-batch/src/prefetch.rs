//! Read-ahead wrapper for paged sources
//!
//! Reads up to `depth` pages ahead on a dedicated thread. Pages reach the
//! consumer strictly in source order; only I/O overlaps with processing.

use crossbeam_channel::{Receiver, bounded};
use std::thread::JoinHandle;
use tickbars_core::{SourceError, TradePage, TradeSource};

/// A [`TradeSource`] fed by a background reader thread
pub struct Prefetch {
    pages: Receiver<Result<TradePage, SourceError>>,
    reader: Option<JoinHandle<u64>>,
    done: bool,
}

impl Prefetch {
    /// Start reading `source` on a new thread
    ///
    /// The reader stops at end of data, at the first fatal error (which is
    /// delivered in order after the pages before it), or once this wrapper is
    /// dropped.
    pub fn spawn<S>(mut source: S, depth: usize) -> Result<Self, SourceError>
    where
        S: TradeSource + Send + 'static,
    {
        let (tx, rx) = bounded(depth);

        let reader = std::thread::Builder::new()
            .name("tickbars-prefetch".to_string())
            .spawn(move || {
                let mut pages = 0u64;
                loop {
                    match source.next_page() {
                        Ok(Some(page)) => {
                            pages += 1;
                            if tx.send(Ok(page)).is_err() {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            let _ = tx.send(Err(e));
                            break;
                        }
                    }
                }
                pages
            })
            .map_err(|e| SourceError::Read {
                path: "<prefetch>".into(),
                source: Box::new(e),
            })?;

        tracing::debug!(depth, "read-ahead started");

        Ok(Self {
            pages: rx,
            reader: Some(reader),
            done: false,
        })
    }

    fn finish(&mut self) -> Result<(), SourceError> {
        self.done = true;
        if let Some(handle) = self.reader.take() {
            match handle.join() {
                Ok(pages) => tracing::debug!(pages, "read-ahead finished"),
                Err(_) => {
                    return Err(SourceError::Read {
                        path: "<prefetch>".into(),
                        source: "read-ahead thread panicked".into(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl TradeSource for Prefetch {
    fn next_page(&mut self) -> Result<Option<TradePage>, SourceError> {
        if self.done {
            return Ok(None);
        }
        match self.pages.recv() {
            Ok(Ok(page)) => Ok(Some(page)),
            Ok(Err(e)) => {
                self.done = true;
                Err(e)
            }
            // Sender dropped: the reader reached end of data or panicked
            Err(_) => {
                self.finish()?;
                Ok(None)
            }
        }
    }
}
