//! Live capture bridge: a callback-side sink that feeds the ring, and the
//! analysis-side sliding window that drains it hop by hop.

use super::ring_buffer::{Consumer, Producer, ring_buffer};
use crate::dsp::{HOP_SIZE, WINDOW_SIZE};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Seconds of mono audio the ring can buffer.
const CAPTURE_SECONDS: usize = 2;
/// Frames downmixed per stack batch inside the callback.
const SCRATCH_FRAMES: usize = 256;

/// Build a capture pair sized for `sample_rate`.
pub fn capture_channel(sample_rate: u32, channels: usize) -> (CaptureSink, LiveWindow) {
    let capacity = (sample_rate as usize).max(1) * CAPTURE_SECONDS;
    let (producer, consumer) = ring_buffer(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        CaptureSink::new(producer, channels, Arc::clone(&dropped)),
        LiveWindow::new(consumer, WINDOW_SIZE, HOP_SIZE, dropped),
    )
}

/// Lives inside the hardware callback. Never blocks or allocates.
#[derive(Debug)]
pub struct CaptureSink {
    producer: Producer,
    channels: usize,
    dropped: Arc<AtomicU64>,
}

impl CaptureSink {
    fn new(producer: Producer, channels: usize, dropped: Arc<AtomicU64>) -> Self {
        Self {
            producer,
            channels: channels.max(1),
            dropped,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Downmix interleaved frames to mono and push them. Samples that don't
    /// fit are dropped and counted; a trailing partial frame is ignored.
    pub fn on_input(&mut self, interleaved: &[f32]) {
        let channels = self.channels;
        if channels == 1 {
            let pushed = self.producer.push(interleaved);
            self.note_dropped(interleaved.len() - pushed);
            return;
        }

        let inv = 1.0 / channels as f32;
        let mut scratch = [0.0f32; SCRATCH_FRAMES];
        for block in interleaved.chunks(SCRATCH_FRAMES * channels) {
            let mut frames = 0;
            for (slot, frame) in scratch.iter_mut().zip(block.chunks_exact(channels)) {
                *slot = frame.iter().sum::<f32>() * inv;
                frames += 1;
            }
            let pushed = self.producer.push(&scratch[..frames]);
            self.note_dropped(frames - pushed);
        }
    }

    #[inline]
    fn note_dropped(&self, count: usize) {
        if count > 0 {
            self.dropped.fetch_add(count as u64, Ordering::Relaxed);
        }
    }
}

/// Analysis-side view of the live stream: a window of the most recent
/// samples that slides forward one hop per drained chunk.
#[derive(Debug)]
pub struct LiveWindow {
    consumer: Consumer,
    window: Vec<f32>,
    chunk: Vec<f32>,
    dropped: Arc<AtomicU64>,
}

impl LiveWindow {
    pub fn new(
        consumer: Consumer,
        window_size: usize,
        hop_size: usize,
        dropped: Arc<AtomicU64>,
    ) -> Self {
        let window_size = window_size.max(1);
        let hop_size = hop_size.clamp(1, window_size);
        Self {
            consumer,
            window: vec![0.0; window_size],
            chunk: vec![0.0; hop_size],
            dropped,
        }
    }

    pub fn hop_size(&self) -> usize {
        self.chunk.len()
    }

    pub fn window(&self) -> &[f32] {
        &self.window
    }

    pub fn buffered(&self) -> usize {
        self.consumer.count()
    }

    pub fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// The producer is gone and nothing is left to drain.
    pub fn is_finished(&self) -> bool {
        self.consumer.is_abandoned() && self.consumer.count() == 0
    }

    /// Drain up to `max_hops` whole hops, calling `on_hop(window, fresh)` after
    /// each slide. `fresh` holds only the samples that came from the ring.
    ///
    /// A partial hop is drained only once the producer has gone away; its
    /// shortfall is zero-padded.
    pub fn drain<F>(&mut self, max_hops: usize, mut on_hop: F) -> usize
    where
        F: FnMut(&[f32], &[f32]),
    {
        let hop = self.chunk.len();
        let mut hops = 0;
        while hops < max_hops {
            let abandoned = self.consumer.is_abandoned();
            let available = self.consumer.count();
            if available == 0 || (available < hop && !abandoned) {
                break;
            }

            let read = self.consumer.pop(&mut self.chunk);
            self.chunk[read..].fill(0.0);

            self.window.copy_within(hop.., 0);
            let tail = self.window.len() - hop;
            self.window[tail..].copy_from_slice(&self.chunk);

            on_hop(&self.window, &self.chunk[..read]);
            hops += 1;
        }
        hops
    }
}
