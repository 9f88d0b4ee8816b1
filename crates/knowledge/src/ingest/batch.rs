//! Owned point buffer for batched index writes.

use crate::types::{IndexedPoint, IngestReport};

/// Accumulates points until a batch is full.
///
/// [`PointBuffer::take_batch`] hands the caller the buffered points and
/// leaves a fresh empty buffer behind, so a failed write can simply drop the
/// batch it was given.
#[derive(Debug)]
pub struct PointBuffer {
    points: Vec<IndexedPoint>,
    batch_size: usize,
}

impl PointBuffer {
    /// `batch_size` is clamped to at least one point.
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            points: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    /// Buffer a point. Returns true once the buffer holds a full batch.
    pub fn push(&mut self, point: IndexedPoint) -> bool {
        self.points.push(point);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.points.len() >= self.batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn take_batch(&mut self) -> Vec<IndexedPoint> {
        std::mem::replace(&mut self.points, Vec::with_capacity(self.batch_size))
    }
}

/// Result of writing one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    Written(usize),
    /// The index rejected the batch; its points are lost for this run.
    Discarded { count: usize, reason: String },
}

impl FlushOutcome {
    pub fn record(&self, report: &mut IngestReport) {
        match self {
            FlushOutcome::Written(count) => report.chunks_written += count,
            FlushOutcome::Discarded { count, .. } => {
                report.chunks_discarded += count;
                report.batches_failed += 1;
            }
        }
    }
}
