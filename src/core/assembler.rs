use crate::domain::model::{Batch, ProductRecord};
use std::collections::BTreeMap;

enum Slot {
    Filled { id: String, record: ProductRecord },
    Skipped,
}

/// Reorders completed records back into input order and cuts them into
/// fixed-size batches. Completion order across identifiers is whatever the
/// network produced; output order must not depend on it, so out-of-order
/// arrivals wait in a reorder buffer until the cursor reaches them. The
/// buffer stays within (batch size + concurrency) items as long as the
/// producer keeps its dispatch window anchored to [`cursor`](Self::cursor).
pub struct BatchAssembler {
    batch_size: usize,
    cursor: usize,
    pending: BTreeMap<usize, Slot>,
    current_ids: Vec<String>,
    current_records: Vec<ProductRecord>,
    next_seq: u32,
}

impl BatchAssembler {
    /// `sealed_before` is the number of batches earlier runs already wrote;
    /// numbering continues from there so resumes never overwrite old files.
    pub fn new(batch_size: usize, sealed_before: u32) -> Self {
        Self {
            batch_size,
            cursor: 0,
            pending: BTreeMap::new(),
            current_ids: Vec::new(),
            current_records: Vec::new(),
            next_seq: sealed_before + 1,
        }
    }

    /// Registers a success at its input position. Returns any batches sealed
    /// as a consequence (usually zero or one, more after a long gap closes).
    pub fn push_success(
        &mut self,
        position: usize,
        id: String,
        record: ProductRecord,
    ) -> Vec<Batch> {
        self.pending.insert(position, Slot::Filled { id, record });
        self.drain_ready()
    }

    /// Registers a permanent failure at its input position; the cursor skips
    /// over it without emitting anything.
    pub fn push_skipped(&mut self, position: usize) -> Vec<Batch> {
        self.pending.insert(position, Slot::Skipped);
        self.drain_ready()
    }

    /// Seals the non-empty remainder once the job has drained.
    pub fn finish(&mut self) -> Option<Batch> {
        if self.current_records.is_empty() {
            None
        } else {
            Some(self.seal())
        }
    }

    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Next input position still awaited; everything before it has been
    /// consumed in order.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn drain_ready(&mut self) -> Vec<Batch> {
        let mut sealed = Vec::new();
        while let Some(slot) = self.pending.remove(&self.cursor) {
            self.cursor += 1;
            if let Slot::Filled { id, record } = slot {
                self.current_ids.push(id);
                self.current_records.push(record);
                if self.current_records.len() == self.batch_size {
                    sealed.push(self.seal());
                }
            }
        }
        sealed
    }

    fn seal(&mut self) -> Batch {
        let seq = self.next_seq;
        self.next_seq += 1;
        Batch {
            seq,
            ids: std::mem::take(&mut self.current_ids),
            records: std::mem::take(&mut self.current_records),
        }
    }
}
