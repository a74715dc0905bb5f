//! Streaming record loader
//!
//! Bytes arrive in arbitrary chunks. Only whole records are handed to the
//! sink, at the byte offset they occupy in the destination buffer; a partial
//! record is held back until the next chunk completes it.

/// Destination for whole-record byte spans
pub trait RecordSink {
    /// `bytes` is a whole number of records destined for `byte_offset`.
    fn write_records(&mut self, byte_offset: u64, bytes: &[u8]);
}

impl RecordSink for Vec<u8> {
    fn write_records(&mut self, byte_offset: u64, bytes: &[u8]) {
        let start = byte_offset as usize;
        let end = start + bytes.len();
        if self.len() < end {
            self.resize(end, 0);
        }
        self.as_mut_slice()[start..end].copy_from_slice(bytes);
    }
}

/// Snapshot of loading progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    /// Record-aligned bytes consumed so far
    pub flushed_bytes: u64,
    pub total_bytes: u64,
    /// 0..=100, never decreases
    pub percent: u32,
}

/// Outcome of a finished stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Records handed to the sink
    pub records: u64,
    /// Records dropped because the destination was full
    pub overflow_records: u64,
    /// Unaligned bytes left over at end of stream (discarded)
    pub leftover_bytes: usize,
    pub progress: LoadProgress,
}

#[derive(Debug)]
pub struct StreamingLoader {
    record_size: usize,
    total_bytes: u64,
    capacity_bytes: u64,
    pending: Vec<u8>,
    flushed_bytes: u64,
    written_bytes: u64,
    overflow_bytes: u64,
    percent: u32,
    finished: bool,
}

impl StreamingLoader {
    /// Loader for `total_bytes` of `record_size`-byte records. The destination
    /// is assumed to hold them all; see [`StreamingLoader::with_capacity`].
    pub fn new(record_size: usize, total_bytes: u64) -> Self {
        let record_size = record_size.max(1);
        Self {
            record_size,
            total_bytes,
            capacity_bytes: u64::MAX,
            pending: Vec::with_capacity(record_size),
            flushed_bytes: 0,
            written_bytes: 0,
            overflow_bytes: 0,
            percent: 0,
            finished: false,
        }
    }

    /// Limit the destination to `records` records; later records are dropped.
    pub fn with_capacity(mut self, records: u64) -> Self {
        self.capacity_bytes = records.saturating_mul(self.record_size as u64);
        self
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Records written to the sink so far
    pub fn records_written(&self) -> u64 {
        self.written_bytes / self.record_size as u64
    }

    /// Bytes held back waiting for the rest of their record
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            flushed_bytes: self.flushed_bytes,
            total_bytes: self.total_bytes,
            percent: self.percent,
        }
    }

    /// Consume one chunk, flushing every record it completes.
    pub fn push_chunk(&mut self, chunk: &[u8], sink: &mut impl RecordSink) -> LoadProgress {
        if self.finished || chunk.is_empty() {
            return self.progress();
        }

        self.pending.extend_from_slice(chunk);
        let aligned = self.pending.len() - self.pending.len() % self.record_size;
        if aligned > 0 {
            self.flush(aligned, sink);
            self.pending.drain(..aligned);
        }

        self.update_percent();
        self.progress()
    }

    fn flush(&mut self, aligned: usize, sink: &mut impl RecordSink) {
        let room = self.capacity_bytes.saturating_sub(self.written_bytes);
        let writable = (aligned as u64).min(room) as usize;

        if writable > 0 {
            sink.write_records(self.written_bytes, &self.pending[..writable]);
            self.written_bytes += writable as u64;
        }

        let dropped = (aligned - writable) as u64;
        if dropped > 0 {
            if self.overflow_bytes == 0 {
                log::warn!(
                    "Destination full after {} records; dropping the rest of the stream",
                    self.records_written()
                );
            }
            self.overflow_bytes += dropped;
        }

        self.flushed_bytes += aligned as u64;
    }

    fn update_percent(&mut self) {
        if self.total_bytes == 0 {
            return;
        }
        let percent = (self.flushed_bytes.saturating_mul(100) / self.total_bytes).min(100) as u32;
        if percent > self.percent {
            if percent / 25 > self.percent / 25 {
                log::debug!(
                    "Streamed {}% ({} of {} bytes)",
                    percent,
                    self.flushed_bytes,
                    self.total_bytes
                );
            }
            self.percent = percent;
        }
    }

    /// End of stream. Progress becomes exactly 100; an unaligned remainder is
    /// logged and discarded. Calling it again returns the same summary.
    pub fn finish(&mut self) -> LoadSummary {
        let leftover_bytes = self.pending.len();
        if !self.finished {
            self.finished = true;
            if leftover_bytes > 0 {
                log::warn!(
                    "Stream ended with {} unaligned bytes (record size {}); keeping {} complete records",
                    leftover_bytes,
                    self.record_size,
                    self.records_written()
                );
            }
            if self.flushed_bytes != self.total_bytes {
                log::warn!(
                    "Stream delivered {} bytes, expected {}",
                    self.flushed_bytes + leftover_bytes as u64,
                    self.total_bytes
                );
            }
            if self.overflow_bytes > 0 {
                log::warn!(
                    "Dropped {} records beyond destination capacity",
                    self.overflow_bytes / self.record_size as u64
                );
            }
            self.percent = 100;
        }

        LoadSummary {
            records: self.records_written(),
            overflow_records: self.overflow_bytes / self.record_size as u64,
            leftover_bytes,
            progress: self.progress(),
        }
    }
}
