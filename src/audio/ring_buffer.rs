//! Lock-free single-producer/single-consumer ring of mono samples.
//!
//! The write and read counters grow monotonically and wrap on overflow; the
//! fill level is always `write.wrapping_sub(read)`. Each counter has exactly
//! one writer, which is the whole synchronisation contract. Samples are stored
//! as `f32` bit patterns in atomics so neither side needs `unsafe`.
//!
//! The slot array is rounded up to a power of two so `counter & mask` maps a
//! counter to the same slot before and after it wraps. The fill limit is the
//! requested capacity, not the slot count.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

#[derive(Debug)]
struct Shared {
    slots: Box<[AtomicU32]>,
    mask: usize,
    capacity: usize,
    write: AtomicUsize,
    read: AtomicUsize,
}

impl Shared {
    fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn slot(&self, counter: usize) -> &AtomicU32 {
        &self.slots[counter & self.mask]
    }
}

/// Create a ring holding at most `capacity` samples (at least one).
pub fn ring_buffer(capacity: usize) -> (Producer, Consumer) {
    let capacity = capacity.max(1);
    let slot_count = capacity.next_power_of_two();
    let slots = (0..slot_count).map(|_| AtomicU32::new(0)).collect();
    let shared = Arc::new(Shared {
        slots,
        mask: slot_count - 1,
        capacity,
        write: AtomicUsize::new(0),
        read: AtomicUsize::new(0),
    });
    (
        Producer {
            shared: Arc::clone(&shared),
        },
        Consumer { shared },
    )
}

/// Writing half. Owned by the capture callback; advances only `write`.
#[derive(Debug)]
pub struct Producer {
    shared: Arc<Shared>,
}

impl Producer {
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    pub fn count(&self) -> usize {
        let write = self.shared.write.load(Ordering::Relaxed);
        let read = self.shared.read.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    pub fn space(&self) -> usize {
        self.capacity() - self.count()
    }

    /// Append as many of `samples` as fit and return how many were accepted.
    ///
    /// Overflow is not an error: samples beyond the free space are dropped and
    /// unread data is never overwritten.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        let accepted = samples.len().min(self.space());
        if accepted == 0 {
            return 0;
        }

        let write = self.shared.write.load(Ordering::Relaxed);
        for (offset, &sample) in samples[..accepted].iter().enumerate() {
            self.shared
                .slot(write.wrapping_add(offset))
                .store(sample.to_bits(), Ordering::Relaxed);
        }
        self.shared
            .write
            .store(write.wrapping_add(accepted), Ordering::Release);
        accepted
    }

    /// True once the consumer has been dropped.
    pub fn is_abandoned(&self) -> bool {
        Arc::strong_count(&self.shared) == 1
    }
}

/// Reading half. Owned by the analysis thread; advances only `read`.
#[derive(Debug)]
pub struct Consumer {
    shared: Arc<Shared>,
}

impl Consumer {
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Samples currently readable. The producer may add more at any moment,
    /// so this is a lower bound by the time the caller acts on it.
    pub fn count(&self) -> usize {
        let write = self.shared.write.load(Ordering::Acquire);
        let read = self.shared.read.load(Ordering::Relaxed);
        write.wrapping_sub(read)
    }

    pub fn space(&self) -> usize {
        self.capacity() - self.count()
    }

    /// Copy up to `dest.len()` samples out and return how many were read.
    /// Any shortfall in `dest` is left untouched; padding is the caller's job.
    pub fn pop(&mut self, dest: &mut [f32]) -> usize {
        let taken = dest.len().min(self.count());
        if taken == 0 {
            return 0;
        }

        let read = self.shared.read.load(Ordering::Relaxed);
        for (offset, sample) in dest[..taken].iter_mut().enumerate() {
            let bits = self
                .shared
                .slot(read.wrapping_add(offset))
                .load(Ordering::Relaxed);
            *sample = f32::from_bits(bits);
        }
        self.shared
            .read
            .store(read.wrapping_add(taken), Ordering::Release);
        taken
    }

    /// True once the producer has been dropped; whatever is buffered can
    /// still be drained.
    pub fn is_abandoned(&self) -> bool {
        Arc::strong_count(&self.shared) == 1
    }
}
