//! Background folder-size calculation.
//!
//! Every folder gets its own detached worker thread; results come back on a
//! single channel that the UI drains once per frame.

use crate::filesystem::folder_size_until;
use log::{debug, warn};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;

#[derive(Debug)]
pub struct SizeReport {
    pub generation: u64,
    pub path: PathBuf,
    pub size: u64,
}

pub struct SizeCalculator {
    tx: Sender<SizeReport>,
    rx: Receiver<SizeReport>,
    generation: Arc<AtomicU64>,
    outstanding: HashSet<PathBuf>,
}

impl SizeCalculator {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            tx,
            rx,
            generation: Arc::new(AtomicU64::new(0)),
            outstanding: HashSet::new(),
        }
    }

    /// Starts a new listing. Workers from earlier listings abandon their walk
    /// and anything they already sent is dropped by [`poll`](Self::poll).
    pub fn begin_listing(&mut self) -> u64 {
        self.outstanding.clear();
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn request(&mut self, path: PathBuf) {
        if !self.outstanding.insert(path.clone()) {
            return;
        }

        let tx = self.tx.clone();
        let current = Arc::clone(&self.generation);
        let generation = current.load(Ordering::SeqCst);
        let worker_path = path.clone();

        let spawned = thread::Builder::new()
            .name("folder-size".into())
            .spawn(move || {
                let size = folder_size_until(&worker_path, || {
                    current.load(Ordering::Relaxed) == generation
                });
                match size {
                    Some(size) => {
                        let _ = tx.send(SizeReport {
                            generation,
                            path: worker_path,
                            size,
                        });
                    }
                    None => debug!("Size walk of {} abandoned", worker_path.display()),
                }
            });

        if let Err(e) = spawned {
            warn!("Failed to spawn size worker for {}: {}", path.display(), e);
            self.outstanding.remove(&path);
        }
    }

    /// Drains up to `max` reports for the current listing without blocking.
    pub fn poll(&mut self, max: usize) -> Vec<(PathBuf, u64)> {
        let generation = self.generation();
        let mut results = Vec::new();

        while results.len() < max {
            match self.rx.try_recv() {
                Ok(report) if report.generation == generation => {
                    self.outstanding.remove(&report.path);
                    results.push((report.path, report.size));
                }
                Ok(stale) => debug!("Dropping stale size for {}", stale.path.display()),
                // The calculator holds a sender itself, so the channel never disconnects.
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        results
    }

    pub fn pending(&self) -> usize {
        self.outstanding.len()
    }
}

impl Default for SizeCalculator {
    fn default() -> Self {
        Self::new()
    }
}
