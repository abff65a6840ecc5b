//! Drain continuation scheduling
//!
//! The notification drain runs in bounded slices. After a slice the
//! dispatcher asks its [`DrainScheduler`] to arrange another call to
//! `drain_step`; stopping the drain cancels whatever was arranged.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::debug;

/// Arranges the next drain slice
pub trait DrainScheduler: Send {
    /// Request one more `drain_step` call
    fn schedule(&mut self);
    /// Drop any requested call that has not run yet
    fn cancel(&mut self);
}

/// Scheduler polled by the host's own loop
///
/// Clones share state, so a host keeps one clone and hands the other to the
/// catalog.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    armed: Arc<AtomicBool>,
    scheduled: Arc<AtomicUsize>,
    cancelled: Arc<AtomicUsize>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a pending request, returning whether one was armed
    pub fn take(&self) -> bool {
        self.armed.swap(false, Ordering::AcqRel)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Total requests made so far
    pub fn scheduled(&self) -> usize {
        self.scheduled.load(Ordering::Relaxed)
    }

    /// Total cancellations so far
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl DrainScheduler for ManualScheduler {
    fn schedule(&mut self) {
        self.armed.store(true, Ordering::Release);
        self.scheduled.fetch_add(1, Ordering::Relaxed);
    }

    fn cancel(&mut self) {
        self.armed.store(false, Ordering::Release);
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }
}

/// Scheduler that posts ticks to an async task
///
/// Each tick carries the generation it was sent in. Cancelling bumps the
/// generation, so ticks sent before the cancel are discarded by
/// [`DrainTicks::next`].
#[derive(Debug, Clone)]
pub struct ChannelScheduler {
    sender: UnboundedSender<u64>,
    generation: Arc<AtomicU64>,
}

/// Receiving half of a [`ChannelScheduler`]
#[derive(Debug)]
pub struct DrainTicks {
    receiver: UnboundedReceiver<u64>,
    generation: Arc<AtomicU64>,
}

impl ChannelScheduler {
    pub fn new() -> (Self, DrainTicks) {
        let (sender, receiver) = unbounded_channel();
        let generation = Arc::new(AtomicU64::new(0));
        (
            Self {
                sender,
                generation: generation.clone(),
            },
            DrainTicks {
                receiver,
                generation,
            },
        )
    }
}

impl DrainScheduler for ChannelScheduler {
    fn schedule(&mut self) {
        let generation = self.generation.load(Ordering::Acquire);
        if self.sender.send(generation).is_err() {
            debug!("Drain tick receiver dropped");
        }
    }

    fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

impl DrainTicks {
    /// Wait for the next live tick
    ///
    /// Returns `None` once every scheduler clone is dropped.
    pub async fn next(&mut self) -> Option<()> {
        while let Some(generation) = self.receiver.recv().await {
            if generation == self.generation.load(Ordering::Acquire) {
                return Some(());
            }
            debug!("Discarding cancelled drain tick");
        }
        None
    }

    /// Non-blocking variant of [`DrainTicks::next`]
    pub fn try_next(&mut self) -> Option<()> {
        while let Ok(generation) = self.receiver.try_recv() {
            if generation == self.generation.load(Ordering::Acquire) {
                return Some(());
            }
        }
        None
    }
}
