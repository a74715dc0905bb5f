//! Background catalog reader
//!
//! A single I/O thread reads the catalog files and sends raw chunks back over
//! a channel. It never touches the GPU: the UI thread feeds the chunks through
//! the streaming loader and performs the buffer writes itself.

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::thread;

use super::catalog::{display_name, load_constellations, open_asset, resolve_asset, STARS_BIN};
use super::ConstellationSegment;

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Catalog events the UI handles per frame, so a fast disk never stalls drawing
pub const MAX_EVENTS_PER_FRAME: usize = 8;

/// Events the reader may run ahead of the UI before it blocks
pub const EVENT_QUEUE_DEPTH: usize = MAX_EVENTS_PER_FRAME * 2;

/// Messages from the I/O thread, in the order they are produced
#[derive(Debug)]
pub enum CatalogEvent {
    Constellations(Vec<ConstellationSegment>),
    ConstellationsFailed(String),
    StarChunk(Vec<u8>),
    StarsFinished,
    StarsFailed(String),
}

pub struct CatalogWorker {
    receiver: Receiver<CatalogEvent>,
    _handle: thread::JoinHandle<()>,
    finished: bool,
}

impl CatalogWorker {
    /// Start reading `data_dir`: constellation lines first, then the star
    /// stream in `chunk_size` pieces. The reader waits whenever
    /// `EVENT_QUEUE_DEPTH` events are still unpolled.
    pub fn spawn(data_dir: PathBuf, chunk_size: usize) -> io::Result<Self> {
        let (tx, rx) = mpsc::sync_channel::<CatalogEvent>(EVENT_QUEUE_DEPTH);
        let chunk_size = chunk_size.max(1);

        let handle = thread::Builder::new()
            .name("catalog-io".into())
            .spawn(move || run(data_dir, chunk_size, tx))?;

        Ok(Self {
            receiver: rx,
            _handle: handle,
            finished: false,
        })
    }

    /// Next pending event without blocking.
    pub fn poll(&mut self) -> Option<CatalogEvent> {
        if self.finished {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(event) => {
                if matches!(
                    event,
                    CatalogEvent::StarsFinished | CatalogEvent::StarsFailed(_)
                ) {
                    self.finished = true;
                }
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                Some(CatalogEvent::StarsFailed(
                    "catalog reader stopped unexpectedly".into(),
                ))
            }
        }
    }

    /// Star stream done (successfully or not)
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

fn run(data_dir: PathBuf, chunk_size: usize, tx: SyncSender<CatalogEvent>) {
    let event = match load_constellations(&data_dir) {
        Ok(segments) => CatalogEvent::Constellations(segments),
        Err(e) => CatalogEvent::ConstellationsFailed(e.to_string()),
    };
    if tx.send(event).is_err() {
        return;
    }

    let path = resolve_asset(&data_dir, STARS_BIN);
    log::info!("Streaming stars from {:?}", path);
    let result = open_asset(&path)
        .map_err(|e| e.to_string())
        .and_then(|reader| {
            read_chunks(reader, chunk_size, |chunk| {
                tx.send(CatalogEvent::StarChunk(chunk)).is_ok()
            })
            .map_err(|e| format!("{}: {}", display_name(&path), e))
        });

    let done = match result {
        Ok(bytes) => {
            log::debug!("Catalog reader finished after {} bytes", bytes);
            CatalogEvent::StarsFinished
        }
        Err(reason) => CatalogEvent::StarsFailed(reason),
    };
    let _ = tx.send(done);
}

/// Read `reader` to the end in chunks of at most `chunk_size` bytes. Stops
/// early when `on_chunk` returns false. Returns the number of bytes read.
pub fn read_chunks(
    mut reader: impl Read,
    chunk_size: usize,
    mut on_chunk: impl FnMut(Vec<u8>) -> bool,
) -> io::Result<u64> {
    let mut total = 0u64;
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        total += n as u64;
        if !on_chunk(buf[..n].to_vec()) {
            return Ok(total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        StarRecord, StreamingLoader, CONSTELLATIONS_BIN, RECORD_SIZE,
    };
    use std::time::{Duration, Instant};

    fn drain(worker: &mut CatalogWorker) -> Vec<CatalogEvent> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut events = Vec::new();
        while !worker.is_finished() && Instant::now() < deadline {
            match worker.poll() {
                Some(event) => events.push(event),
                None => thread::sleep(Duration::from_millis(1)),
            }
        }
        events
    }

    #[test]
    fn test_read_chunks_respects_size() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut sizes = Vec::new();
        let total = read_chunks(&data[..], 32, |chunk| {
            sizes.push(chunk.len());
            true
        })
        .unwrap();
        assert_eq!(total, 100);
        assert!(sizes.iter().all(|&s| s <= 32));
        assert_eq!(sizes.iter().sum::<usize>(), 100);
    }

    #[test]
    fn test_read_chunks_stops_when_asked() {
        let data = vec![0u8; 1000];
        let mut calls = 0;
        read_chunks(&data[..], 10, |_| {
            calls += 1;
            calls < 3
        })
        .unwrap();
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_worker_streams_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let mut stars = Vec::new();
        for i in 0..100 {
            StarRecord {
                ra: i as f32,
                dec: 0.0,
                magnitude: i as f32,
                bv: 0.0,
            }
            .write_le_bytes(&mut stars);
        }
        std::fs::write(dir.path().join(STARS_BIN), &stars).unwrap();
        std::fs::write(dir.path().join(CONSTELLATIONS_BIN), [0u8; 32]).unwrap();

        let mut worker = CatalogWorker::spawn(dir.path().to_path_buf(), 100).unwrap();
        let events = drain(&mut worker);

        assert!(matches!(events.first(), Some(CatalogEvent::Constellations(s)) if s.len() == 2));
        assert!(matches!(events.last(), Some(CatalogEvent::StarsFinished)));

        let mut loader = StreamingLoader::new(RECORD_SIZE, stars.len() as u64);
        let mut sink = Vec::new();
        for event in &events {
            if let CatalogEvent::StarChunk(chunk) = event {
                loader.push_chunk(chunk, &mut sink);
            }
        }
        assert_eq!(loader.finish().records, 100);
        assert_eq!(sink, stars);
    }

    #[test]
    fn test_reader_waits_for_consumer() {
        let dir = tempfile::tempdir().unwrap();
        let stars = vec![0u8; RECORD_SIZE * 100];
        std::fs::write(dir.path().join(STARS_BIN), &stars).unwrap();

        // One chunk per record: far more events than the queue holds
        let mut worker = CatalogWorker::spawn(dir.path().to_path_buf(), RECORD_SIZE).unwrap();
        thread::sleep(Duration::from_millis(200));
        assert!(!worker._handle.is_finished());

        let events = drain(&mut worker);
        let chunks = events
            .iter()
            .filter(|e| matches!(e, CatalogEvent::StarChunk(_)))
            .count();
        assert_eq!(chunks, 100);
        assert!(matches!(events.last(), Some(CatalogEvent::StarsFinished)));
    }

    #[test]
    fn test_missing_constellations_are_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STARS_BIN), [0u8; 16]).unwrap();

        let mut worker = CatalogWorker::spawn(dir.path().to_path_buf(), 8).unwrap();
        let events = drain(&mut worker);
        assert!(matches!(
            events.first(),
            Some(CatalogEvent::ConstellationsFailed(_))
        ));
        assert!(matches!(events.last(), Some(CatalogEvent::StarsFinished)));
    }

    #[test]
    fn test_missing_stars_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut worker = CatalogWorker::spawn(dir.path().to_path_buf(), 8).unwrap();
        let events = drain(&mut worker);
        match events.last() {
            Some(CatalogEvent::StarsFailed(reason)) => assert!(reason.contains("stars.bin")),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
