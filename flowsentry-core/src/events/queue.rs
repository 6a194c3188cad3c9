//! Bounded single-producer/single-consumer packet intake queue.
//!
//! Couples the capture thread to the analysis consumer without ever letting
//! analysis backpressure capture: when the consumer falls a full buffer
//! behind, new records are dropped and counted instead of blocking. The
//! dropped count is part of the queue itself so intake loss is observable
//! wherever the queue is.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;

use super::packet::PacketRecord;

#[derive(Error, Debug, PartialEq)]
pub enum QueueError {
    #[error("queue capacity must be a non-zero power of two, got {0}")]
    BadCapacity(usize),
}

/// Each cursor gets its own cache line; the capture thread and the consumer
/// task advance them independently and must not false-share.
#[repr(align(64))]
struct Cursor(AtomicU64);

struct Shared {
    slots: Box<[UnsafeCell<Option<PacketRecord>>]>,
    /// Total records ever accepted; the producer is its only writer.
    produced: Cursor,
    /// Total records ever taken; the consumer is its only writer.
    consumed: Cursor,
    dropped: AtomicU64,
    mask: u64,
}

// SAFETY: a slot is written only by the producer before it publishes
// `produced`, and read only by the consumer before it publishes `consumed`;
// the Acquire/Release pairs on the cursors order those accesses.
unsafe impl Send for Shared {}
unsafe impl Sync for Shared {}

/// Intake queue handle. `share()` yields the handle for the opposite side;
/// the cursor protocol assumes exactly one producer and one consumer.
pub struct PacketQueue {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for PacketQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketQueue").finish_non_exhaustive()
    }
}

impl PacketQueue {
    /// Power-of-two capacity lets slot indexing mask instead of divide.
    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(QueueError::BadCapacity(capacity));
        }
        let slots = (0..capacity).map(|_| UnsafeCell::new(None)).collect();
        Ok(Self {
            shared: Arc::new(Shared {
                slots,
                produced: Cursor(AtomicU64::new(0)),
                consumed: Cursor(AtomicU64::new(0)),
                dropped: AtomicU64::new(0),
                mask: capacity as u64 - 1,
            }),
        })
    }

    /// Handle for the other side of the queue.
    pub fn share(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }

    /// Enqueues a record, or drops and counts it when the queue is full.
    /// Returns whether the record was accepted. Producer side only.
    pub fn push(&self, record: PacketRecord) -> bool {
        let produced = self.shared.produced.0.load(Ordering::Relaxed);
        let consumed = self.shared.consumed.0.load(Ordering::Acquire);
        if produced - consumed > self.shared.mask {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let slot = self.shared.slots[(produced & self.shared.mask) as usize].get();
        // SAFETY: this slot is outside the consumer's published range until
        // the `produced` store below.
        unsafe { *slot = Some(record) };

        self.shared.produced.0.store(produced + 1, Ordering::Release);
        true
    }

    /// Dequeues the oldest record, `None` when the queue is empty. Consumer
    /// side only.
    pub fn pop(&self) -> Option<PacketRecord> {
        let consumed = self.shared.consumed.0.load(Ordering::Relaxed);
        let produced = self.shared.produced.0.load(Ordering::Acquire);
        if consumed == produced {
            return None;
        }

        let slot = self.shared.slots[(consumed & self.shared.mask) as usize].get();
        // SAFETY: the producer published this slot with the `produced` store
        // observed above and will not touch it again until `consumed` moves.
        let record = unsafe { (*slot).take() };

        self.shared.consumed.0.store(consumed + 1, Ordering::Release);
        record
    }

    /// Records dropped on overflow since the queue was created.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Records currently queued.
    pub fn len(&self) -> usize {
        let consumed = self.shared.consumed.0.load(Ordering::Acquire);
        let produced = self.shared.produced.0.load(Ordering::Acquire);
        (produced - consumed) as usize
    }

    /// Drained-to-empty is the shutdown contract: the consumer keeps popping
    /// until this holds after the producer has stopped.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn record(seq: u64) -> PacketRecord {
        PacketRecord {
            timestamp_ns: seq,
            src_ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            dst_ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            src_port: 40000,
            dst_port: 80,
            protocol: crate::events::packet::PROTO_TCP,
            length: 64,
            tcp_flags: PacketRecord::SYN,
            window_size: 65535,
        }
    }

    #[test]
    fn rejects_invalid_capacities() {
        assert_eq!(
            PacketQueue::with_capacity(0).unwrap_err(),
            QueueError::BadCapacity(0)
        );
        assert_eq!(
            PacketQueue::with_capacity(12).unwrap_err(),
            QueueError::BadCapacity(12)
        );
    }

    #[test]
    fn overflow_drops_newest_and_keeps_queued_records() {
        let queue = PacketQueue::with_capacity(2).unwrap();
        assert!(queue.push(record(0)));
        assert!(queue.push(record(1)));
        // Full: the burst packet is dropped, not an older queued one.
        assert!(!queue.push(record(2)));
        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.pop().unwrap().timestamp_ns, 0);
        assert_eq!(queue.pop().unwrap().timestamp_ns, 1);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn capacity_frees_as_the_consumer_drains() {
        let queue = PacketQueue::with_capacity(2).unwrap();
        assert!(queue.push(record(0)));
        assert!(queue.push(record(1)));
        assert!(!queue.push(record(2)));
        queue.pop().unwrap();
        assert!(queue.push(record(3)));
        assert_eq!(queue.pop().unwrap().timestamp_ns, 1);
        assert_eq!(queue.pop().unwrap().timestamp_ns, 3);
    }

    #[test]
    fn fifo_order_survives_index_wraparound() {
        let queue = PacketQueue::with_capacity(4).unwrap();
        let mut expected = 0u64;
        for round in 0..3u64 {
            for i in 0..4 {
                assert!(queue.push(record(round * 4 + i)));
            }
            for _ in 0..4 {
                assert_eq!(queue.pop().unwrap().timestamp_ns, expected);
                expected += 1;
            }
        }
        assert!(queue.is_empty());
        assert_eq!(queue.dropped(), 0);
    }

    #[test]
    fn len_reflects_intake_minus_drain() {
        let queue = PacketQueue::with_capacity(8).unwrap();
        assert!(queue.is_empty());
        queue.push(record(0));
        queue.push(record(1));
        queue.push(record(2));
        assert_eq!(queue.len(), 3);
        queue.pop().unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn producer_thread_and_consumer_account_for_every_record() {
        const TOTAL: u64 = 10_000;
        let queue = PacketQueue::with_capacity(64).unwrap();
        let producer = queue.share();

        let handle = std::thread::spawn(move || {
            let mut accepted = 0u64;
            for seq in 0..TOTAL {
                if producer.push(record(seq)) {
                    accepted += 1;
                }
            }
            accepted
        });

        let mut received = 0u64;
        let mut last_seen = None;
        loop {
            match queue.pop() {
                Some(record) => {
                    if let Some(prev) = last_seen {
                        assert!(record.timestamp_ns > prev, "order violated");
                    }
                    last_seen = Some(record.timestamp_ns);
                    received += 1;
                }
                None => {
                    if handle.is_finished() && queue.is_empty() {
                        break;
                    }
                    std::hint::spin_loop();
                }
            }
        }

        let accepted = handle.join().unwrap();
        assert_eq!(received, accepted);
        assert_eq!(accepted + queue.dropped(), TOTAL);
    }
}
