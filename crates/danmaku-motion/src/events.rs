//! Event bus for projectile lifecycle notifications.

use crate::pool::PoolHandle;
use crate::projectile::{TickOutcome, TickReport};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Lifecycle events of pooled projectiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEvent {
    /// Summon window elapsed, the projectile is now visible
    SummonCompleted {
        /// Projectile
        handle: PoolHandle,
    },
    /// Active phase changed
    PhaseChanged {
        /// Projectile
        handle: PoolHandle,
        /// Phase left
        from: usize,
        /// Phase entered
        to: usize,
    },
    /// Phases wrapped back to the first one
    Looped {
        /// Projectile
        handle: PoolHandle,
    },
    /// Last phase ended without looping
    Finished {
        /// Projectile
        handle: PoolHandle,
    },
    /// Projectile went back to its pool
    Released {
        /// Projectile
        handle: PoolHandle,
    },
}

impl MotionEvent {
    /// Handle of the projectile the event is about.
    #[must_use]
    pub const fn handle(&self) -> PoolHandle {
        match self {
            Self::SummonCompleted { handle }
            | Self::PhaseChanged { handle, .. }
            | Self::Looped { handle }
            | Self::Finished { handle }
            | Self::Released { handle } => *handle,
        }
    }
}

/// Bounded event bus. Events published while it is full are dropped.
#[derive(Debug)]
pub struct MotionEventBus {
    sender: Sender<MotionEvent>,
    receiver: Receiver<MotionEvent>,
    capacity: usize,
    dropped: AtomicU64,
}

impl Default for MotionEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl MotionEventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: MotionEvent) {
        if let Err(TrySendError::Full(event)) = self.sender.try_send(event) {
            // Only the first drop is logged; the counter keeps the rest.
            if self.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
                warn!("Motion event bus full, dropping {:?}", event);
            }
        }
    }

    /// Publishes the events implied by one tick of `handle`.
    ///
    /// `Finished` is reported on every tick after the end, so it is left to
    /// the caller that acts on it.
    pub fn publish_report(&self, handle: PoolHandle, report: &TickReport) {
        if report.outcome == TickOutcome::Summoned {
            self.publish(MotionEvent::SummonCompleted { handle });
        }
        if let Some(change) = report.phase_change {
            self.publish(MotionEvent::PhaseChanged {
                handle,
                from: change.from,
                to: change.to,
            });
        }
        if report.looped {
            self.publish(MotionEvent::Looped { handle });
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<MotionEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events dropped because the bus was full.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<MotionEvent> {
        self.sender.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{EntityPool, Prototype};
    use crate::projectile::{PhaseChange, Projectile};
    use danmaku_common::PrototypeId;

    fn handle() -> PoolHandle {
        let mut pool = EntityPool::new();
        pool.acquire(&Prototype::new(PrototypeId::new(1), Projectile::new()))
    }

    #[test]
    fn test_publish_and_drain() {
        let bus = MotionEventBus::new(8);
        let h = handle();
        bus.publish(MotionEvent::Finished { handle: h });
        bus.publish(MotionEvent::Released { handle: h });

        assert_eq!(bus.pending_count(), 2);
        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].handle(), h);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_sender_publishes_from_another_thread() {
        let bus = MotionEventBus::new(8);
        let h = handle();
        let sender = bus.sender();
        std::thread::spawn(move || sender.send(MotionEvent::Finished { handle: h }))
            .join()
            .unwrap()
            .unwrap();

        let events = bus.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], MotionEvent::Finished { .. }));
    }

    #[test]
    fn test_full_bus_drops() {
        let bus = MotionEventBus::new(1);
        let h = handle();
        bus.publish(MotionEvent::Looped { handle: h });
        bus.publish(MotionEvent::Looped { handle: h });
        assert_eq!(bus.pending_count(), 1);
        assert_eq!(bus.dropped_count(), 1);
    }

    #[test]
    fn test_publish_report() {
        let bus = MotionEventBus::default();
        let h = handle();
        let report = TickReport {
            outcome: TickOutcome::Moved,
            phase_change: Some(PhaseChange { from: 2, to: 0 }),
            looped: true,
        };
        bus.publish_report(h, &report);

        assert_eq!(
            bus.drain(),
            vec![
                MotionEvent::PhaseChanged {
                    handle: h,
                    from: 2,
                    to: 0
                },
                MotionEvent::Looped { handle: h },
            ]
        );
    }
}
