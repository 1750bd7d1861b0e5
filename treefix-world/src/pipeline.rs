//! Background world rewrite with progress reporting.
//!
//! The worker walks through `Scanning -> Locating -> Rewriting -> Done` and
//! reports through an unbounded channel. The interactive side drains that
//! channel on a timer with [`ProgressView::drain`], which never blocks.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use treefix_anvil::{ChunkError, LEAVES, RewriteOutcome};
use treefix_benchmark::BenchmarkMetrics;

use crate::store::ChunkStore;

/// Total progress of a full run.
pub const PROGRESS_TOTAL: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Add this many percentage points to the progress bar.
    Progress(f64),
    Status(String),
    /// Terminal: the run finished (or was cancelled).
    Done(RunSummary),
    /// Terminal: the world could not be read at all.
    Failed(String),
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Done(_) | ProgressEvent::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
    Locating,
    Rewriting,
    Done,
}

/// Share of the progress bar given to each phase. Always sums to 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseWeights {
    pub scanning: f64,
    pub locating: f64,
    pub rewriting: f64,
}

impl Default for PhaseWeights {
    fn default() -> Self {
        Self {
            scanning: 15.0,
            locating: 60.0,
            rewriting: 25.0,
        }
    }
}

impl PhaseWeights {
    /// Scale arbitrary non-negative weights so they sum to 100.
    pub fn new(scanning: f64, locating: f64, rewriting: f64) -> Option<Self> {
        let parts = [scanning, locating, rewriting];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return None;
        }
        let sum: f64 = parts.iter().sum();
        if sum <= 0.0 {
            return None;
        }

        let scale = PROGRESS_TOTAL / sum;
        Some(Self {
            scanning: scanning * scale,
            locating: locating * scale,
            rewriting: rewriting * scale,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// World directory.
    pub root: PathBuf,
    /// Block id whose data is rewritten.
    pub target_type: u8,
    /// New data value, masked to 4 bits.
    pub replacement: u8,
    pub weights: PhaseWeights,
    /// Compute everything but never save.
    pub dry_run: bool,
}

impl PipelineConfig {
    /// Reset leaf data to 0 in the world at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            target_type: LEAVES,
            replacement: 0,
            weights: PhaseWeights::default(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub chunks_found: usize,
    /// Chunks containing at least one cell of the target type.
    pub chunks_matched: usize,
    pub chunks_rewritten: usize,
    pub cells_matched: usize,
    pub cells_changed: usize,
    /// Chunks that failed to load, decode or save.
    pub chunks_skipped: usize,
    pub cancelled: bool,
    pub dry_run: bool,
}

pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<dyn ChunkStore>,
    events: UnboundedSender<ProgressEvent>,
    cancel: Arc<AtomicBool>,
    benchmark: Option<Arc<BenchmarkMetrics>>,
    phase: Phase,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, store: Arc<dyn ChunkStore>, events: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            config,
            store,
            events,
            cancel: Arc::new(AtomicBool::new(false)),
            benchmark: None,
            phase: Phase::Idle,
        }
    }

    /// Share a cancellation flag; it is checked before every chunk.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_benchmark(mut self, benchmark: Option<Arc<BenchmarkMetrics>>) -> Self {
        self.benchmark = benchmark;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Run on a dedicated thread.
    pub fn spawn(self) -> std::io::Result<thread::JoinHandle<RunSummary>> {
        thread::Builder::new()
            .name("treefix-worker".to_string())
            .spawn(move || self.run())
    }

    /// Run the whole scan, locate and rewrite sequence. Blocks until done.
    pub fn run(mut self) -> RunSummary {
        let mut summary = RunSummary {
            dry_run: self.config.dry_run,
            ..Default::default()
        };
        let weights = self.config.weights;

        // --- 1. SCANNING ---
        self.enter(Phase::Scanning);
        self.status("Finding chunks...".to_string());
        let start = Instant::now();
        let paths = match self.store.list(&self.config.root) {
            Ok(paths) => paths,
            Err(e) => {
                log::error!("Cannot read world {}: {}", self.config.root.display(), e);
                self.enter(Phase::Done);
                self.emit(ProgressEvent::Failed(e.to_string()));
                return summary;
            }
        };
        if let Some(bench) = &self.benchmark {
            bench.record_scan(paths.len(), start.elapsed());
        }
        log::info!("Found {} chunk files under {}", paths.len(), self.config.root.display());
        summary.chunks_found = paths.len();
        let share = self.begin_units(weights.scanning, paths.len());
        for _ in &paths {
            self.progress(share);
        }

        // --- 2. LOCATING ---
        self.enter(Phase::Locating);
        self.status(format!("Finding blocks of type {}...", self.config.target_type));
        let share = self.begin_units(weights.locating, paths.len());
        let mut located: Vec<(PathBuf, usize)> = Vec::with_capacity(paths.len());
        for path in paths {
            if self.cancelled() {
                return self.finish_cancelled(summary);
            }
            match self.locate_chunk(&path) {
                Ok(matches) => {
                    log::debug!("{}: {} matching cells", path.display(), matches);
                    if matches > 0 {
                        summary.chunks_matched += 1;
                        summary.cells_matched += matches;
                    }
                    located.push((path, matches));
                }
                Err(e) => self.skip(&path, e, &mut summary),
            }
            self.progress(share);
        }

        // --- 3. REWRITING ---
        self.enter(Phase::Rewriting);
        self.status("Editing block data...".to_string());
        let share = self.begin_units(weights.rewriting, located.len());
        for (path, matches) in &located {
            if self.cancelled() {
                return self.finish_cancelled(summary);
            }
            if *matches > 0 {
                match self.rewrite_chunk(path) {
                    Ok(RewriteOutcome::Rewritten { changed, .. }) => {
                        summary.chunks_rewritten += 1;
                        summary.cells_changed += changed;
                    }
                    Ok(RewriteOutcome::Unchanged) => {}
                    Err(e) => self.skip(path, e, &mut summary),
                }
            }
            self.progress(share);
        }

        log::info!(
            "Rewrote {} of {} chunks ({} cells changed, {} skipped)",
            summary.chunks_rewritten,
            summary.chunks_found,
            summary.cells_changed,
            summary.chunks_skipped
        );
        self.enter(Phase::Done);
        self.status("Complete!".to_string());
        self.emit(ProgressEvent::Done(summary.clone()));
        summary
    }

    fn locate_chunk(&self, path: &Path) -> Result<usize, ChunkError> {
        let chunk = self.load(path)?;
        let start = Instant::now();
        let cells = chunk.cell_arrays()?;
        let matches = treefix_anvil::locate(&cells.types, self.config.target_type).len();
        if let Some(bench) = &self.benchmark {
            bench.record_locate(start.elapsed());
        }
        Ok(matches)
    }

    fn rewrite_chunk(&self, path: &Path) -> Result<RewriteOutcome, ChunkError> {
        let mut chunk = self.load(path)?;

        let start = Instant::now();
        let outcome = treefix_anvil::rewrite(&mut chunk, self.config.target_type, self.config.replacement)?;
        if let Some(bench) = &self.benchmark {
            bench.record_rewrite(start.elapsed());
        }

        if let RewriteOutcome::Rewritten { changed, .. } = outcome {
            if self.config.dry_run {
                log::info!("{}: would change {} cells", path.display(), changed);
            } else {
                let start = Instant::now();
                self.store.save(path, &chunk)?;
                if let Some(bench) = &self.benchmark {
                    bench.record_save(start.elapsed());
                }
                log::info!("{}: changed {} cells", path.display(), changed);
            }
        }
        Ok(outcome)
    }

    fn load(&self, path: &Path) -> Result<treefix_anvil::ChunkTree, ChunkError> {
        let start = Instant::now();
        let chunk = self.store.load(path)?;
        if let Some(bench) = &self.benchmark {
            bench.record_load(start.elapsed());
        }
        Ok(chunk)
    }

    fn skip(&self, path: &Path, error: ChunkError, summary: &mut RunSummary) {
        log::warn!("Skipping {}: {}", path.display(), error);
        summary.chunks_skipped += 1;
        self.status(format!("{}: {}", path.display(), error));
    }

    /// Progress per unit for a phase of `units` equal steps. A phase with no
    /// units gets its whole budget up front.
    fn begin_units(&self, budget: f64, units: usize) -> f64 {
        if units == 0 {
            self.progress(budget);
            0.0
        } else {
            budget / units as f64
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn finish_cancelled(mut self, mut summary: RunSummary) -> RunSummary {
        log::warn!("Run cancelled during {:?}", self.phase);
        summary.cancelled = true;
        self.enter(Phase::Done);
        self.status("Cancelled".to_string());
        self.emit(ProgressEvent::Done(summary.clone()));
        summary
    }

    fn enter(&mut self, phase: Phase) {
        log::debug!("Pipeline phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn progress(&self, delta: f64) {
        self.emit(ProgressEvent::Progress(delta));
    }

    fn status(&self, text: String) {
        self.emit(ProgressEvent::Status(text));
    }

    fn emit(&self, event: ProgressEvent) {
        // Receiver gone means nobody is watching; keep working regardless.
        if self.events.send(event).is_err() {
            log::debug!("Progress receiver dropped");
        }
    }
}

/// Consumer-side state built from the event stream.
#[derive(Debug, Default)]
pub struct ProgressView {
    pub percent: f64,
    pub status: String,
    pub summary: Option<RunSummary>,
    pub failure: Option<String>,
    finished: bool,
}

impl ProgressView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Apply one event. Returns `true` once a terminal event was seen.
    pub fn apply(&mut self, event: ProgressEvent) -> bool {
        match event {
            ProgressEvent::Progress(delta) => self.percent += delta,
            ProgressEvent::Status(text) => self.status = text,
            ProgressEvent::Done(summary) => {
                self.summary = Some(summary);
                self.finished = true;
            }
            ProgressEvent::Failed(reason) => {
                self.status = format!("Failed: {}", reason);
                self.failure = Some(reason);
                self.finished = true;
            }
        }
        self.finished
    }

    /// Apply everything queued right now without waiting. Returns `true` once
    /// the run is over, after which it should not be polled again.
    pub fn drain(&mut self, events: &mut UnboundedReceiver<ProgressEvent>) -> bool {
        while !self.finished {
            match events.try_recv() {
                Ok(event) => {
                    self.apply(event);
                }
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => {
                    self.failure = Some("worker stopped without finishing".to_string());
                    self.finished = true;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ChunkStore, FileChunkStore, MemoryChunkStore};
    use fastnbt::{ByteArray, Value};
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::mpsc::unbounded_channel;
    use treefix_anvil::{ChunkTree, Compression, nibble_at};

    fn legacy_chunk(blocks: &[u8], data: Vec<i8>) -> ChunkTree {
        let mut level = HashMap::new();
        level.insert("xPos".to_string(), Value::Int(0));
        level.insert("zPos".to_string(), Value::Int(0));
        level.insert(
            "Blocks".to_string(),
            Value::ByteArray(ByteArray::new(blocks.iter().map(|&b| b as i8).collect())),
        );
        level.insert("Data".to_string(), Value::ByteArray(ByteArray::new(data)));
        let mut root = HashMap::new();
        root.insert("Level".to_string(), Value::Compound(level));
        ChunkTree::new(Value::Compound(root), Compression::Gzip)
    }

    fn collect(mut rx: UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn progress_total(events: &[ProgressEvent]) -> f64 {
        events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Progress(delta) => Some(*delta),
                _ => None,
            })
            .sum()
    }

    fn world() -> Arc<MemoryChunkStore> {
        let store = MemoryChunkStore::new();
        // Leaves with data 5 and 7 next to stone
        store.insert("/world/0/0/c.0.0.dat", &legacy_chunk(&[18, 1, 1, 18], vec![0x15, 0x71])).unwrap();
        // No leaves at all
        store.insert("/world/0/1/c.0.1.dat", &legacy_chunk(&[1, 2, 3, 4], vec![0x21, 0x43])).unwrap();
        // Leaves already at 0
        store.insert("/world/1/0/c.1.0.dat", &legacy_chunk(&[18, 18], vec![0x00])).unwrap();
        store.insert_bytes("/world/level.dat", vec![0; 8]);
        Arc::new(store)
    }

    fn run(store: Arc<MemoryChunkStore>, config: PipelineConfig) -> (RunSummary, Vec<ProgressEvent>) {
        let (tx, rx) = unbounded_channel();
        let summary = Pipeline::new(config, store, tx).run();
        (summary, collect(rx))
    }

    #[test]
    fn test_rewrites_only_changed_chunks() {
        let store = world();
        let (summary, events) = run(store.clone(), PipelineConfig::new("/world"));

        assert_eq!(
            summary,
            RunSummary {
                chunks_found: 3,
                chunks_matched: 2,
                chunks_rewritten: 1,
                cells_matched: 4,
                cells_changed: 2,
                chunks_skipped: 0,
                cancelled: false,
                dry_run: false,
            }
        );
        assert_eq!(store.save_count(), 1);

        let chunk = store.get(Path::new("/world/0/0/c.0.0.dat")).unwrap();
        let data = chunk.find_byte_array("Data").unwrap();
        assert_eq!(data, &[0x10, 0x01]);
        assert_eq!(nibble_at(data, 3), Some(0));

        assert_eq!(events.first(), Some(&ProgressEvent::Status("Finding chunks...".to_string())));
        assert_eq!(events.last(), Some(&ProgressEvent::Done(summary)));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!((progress_total(&events) - PROGRESS_TOTAL).abs() < 1e-9);
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let store = world();
        run(store.clone(), PipelineConfig::new("/world"));
        let (summary, _) = run(store.clone(), PipelineConfig::new("/world"));

        assert_eq!(summary.chunks_matched, 2);
        assert_eq!(summary.chunks_rewritten, 0);
        assert_eq!(summary.cells_changed, 0);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_bad_chunk_is_skipped() {
        let store = world();
        store.insert_bytes("/world/0/2/c.0.2.dat", b"garbage".to_vec());
        let mut blocks_only = legacy_chunk(&[18, 18], vec![0]);
        blocks_only.set(&["Level", "Data"], Value::Int(0)).unwrap();
        store.insert("/world/0/3/c.0.3.dat", &blocks_only).unwrap();

        let (summary, events) = run(store.clone(), PipelineConfig::new("/world"));
        assert_eq!(summary.chunks_found, 5);
        assert_eq!(summary.chunks_skipped, 2);
        assert_eq!(summary.chunks_rewritten, 1);

        let skipped: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Status(s) if s.starts_with("/world/0/")))
            .collect();
        assert_eq!(skipped.len(), 2);
        assert!(matches!(events.last(), Some(ProgressEvent::Done(_))));
        assert!((progress_total(&events) - PROGRESS_TOTAL).abs() < 1e-9);
    }

    #[test]
    fn test_dry_run_never_saves() {
        let store = world();
        let config = PipelineConfig {
            dry_run: true,
            ..PipelineConfig::new("/world")
        };
        let (summary, _) = run(store.clone(), config);

        assert!(summary.dry_run);
        assert_eq!(summary.chunks_rewritten, 1);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_custom_target_and_value() {
        let store = world();
        let config = PipelineConfig {
            target_type: 3,
            replacement: 9,
            ..PipelineConfig::new("/world")
        };
        let (summary, _) = run(store.clone(), config);
        assert_eq!(summary.chunks_rewritten, 1);

        let chunk = store.get(Path::new("/world/0/1/c.0.1.dat")).unwrap();
        assert_eq!(chunk.find_byte_array("Data").unwrap(), &[0x21, 0x49]);
    }

    #[test]
    fn test_cancel_before_start() {
        let store = world();
        let (tx, rx) = unbounded_channel();
        let pipeline = Pipeline::new(PipelineConfig::new("/world"), store.clone(), tx);
        pipeline.cancel_flag().store(true, Ordering::Relaxed);
        let summary = pipeline.run();

        assert!(summary.cancelled);
        assert_eq!(store.save_count(), 0);
        let events = collect(rx);
        assert_eq!(events.last(), Some(&ProgressEvent::Done(summary)));
    }

    /// Sets the cancel flag from inside the `nth` load (1-based).
    struct CancelOnLoad {
        inner: Arc<MemoryChunkStore>,
        nth: usize,
        loads: std::sync::atomic::AtomicUsize,
        cancel: Arc<AtomicBool>,
    }

    impl ChunkStore for CancelOnLoad {
        fn list(&self, root: &Path) -> Result<Vec<PathBuf>, ChunkError> {
            self.inner.list(root)
        }

        fn load(&self, path: &Path) -> Result<ChunkTree, ChunkError> {
            if self.loads.fetch_add(1, Ordering::Relaxed) + 1 == self.nth {
                self.cancel.store(true, Ordering::Relaxed);
            }
            self.inner.load(path)
        }

        fn save(&self, path: &Path, chunk: &ChunkTree) -> Result<(), ChunkError> {
            self.inner.save(path, chunk)
        }
    }

    fn run_cancelled_on_load(store: Arc<MemoryChunkStore>, nth: usize) -> (RunSummary, Vec<ProgressEvent>) {
        let cancel = Arc::new(AtomicBool::new(false));
        let wrapper = CancelOnLoad {
            inner: store,
            nth,
            loads: std::sync::atomic::AtomicUsize::new(0),
            cancel: cancel.clone(),
        };
        let (tx, rx) = unbounded_channel();
        let summary = Pipeline::new(PipelineConfig::new("/world"), Arc::new(wrapper), tx)
            .with_cancel(cancel)
            .run();
        (summary, collect(rx))
    }

    #[test]
    fn test_cancel_during_locate() {
        let store = world();
        let (summary, events) = run_cancelled_on_load(store.clone(), 1);

        assert!(summary.cancelled);
        assert_eq!(summary.chunks_matched, 1);
        assert_eq!(summary.chunks_rewritten, 0);
        assert_eq!(store.save_count(), 0);
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(events.last(), Some(&ProgressEvent::Done(summary)));
    }

    #[test]
    fn test_cancel_during_rewrite_stops_before_next_chunk() {
        let store = world();
        // A second chunk that would need rewriting
        store.insert("/world/1/1/c.1.1.dat", &legacy_chunk(&[0, 18], vec![0x50])).unwrap();

        // Four locate loads, then the first rewrite load trips the flag
        let (summary, events) = run_cancelled_on_load(store.clone(), 5);

        assert!(summary.cancelled);
        assert_eq!(summary.chunks_found, 4);
        assert_eq!(summary.chunks_matched, 3);
        assert_eq!(summary.chunks_rewritten, 1);
        assert_eq!(store.save_count(), 1);

        let untouched = store.get(Path::new("/world/1/1/c.1.1.dat")).unwrap();
        assert_eq!(untouched.find_byte_array("Data").unwrap(), &[0x50]);

        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(events.contains(&ProgressEvent::Status("Cancelled".to_string())));
        assert_eq!(events.last(), Some(&ProgressEvent::Done(summary)));
    }

    #[test]
    fn test_missing_world_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = unbounded_channel();
        let config = PipelineConfig::new(dir.path().join("missing"));
        Pipeline::new(config, Arc::new(FileChunkStore), tx).run();

        let events = collect(rx);
        assert!(matches!(events.last(), Some(ProgressEvent::Failed(_))));
        assert!(!events.iter().any(|e| matches!(e, ProgressEvent::Done(_))));
    }

    #[test]
    fn test_only_excluded_files_completes() {
        let dir = tempfile::tempdir().unwrap();
        for name in crate::scan::EXCLUDED_FILES {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let (tx, rx) = unbounded_channel();
        let summary = Pipeline::new(PipelineConfig::new(dir.path()), Arc::new(FileChunkStore), tx).run();

        assert_eq!(summary, RunSummary::default());
        let events = collect(rx);
        assert!((progress_total(&events) - PROGRESS_TOTAL).abs() < 1e-9);
        assert!(events.iter().all(|e| match e {
            ProgressEvent::Progress(delta) => delta.is_finite(),
            _ => true,
        }));
        assert_eq!(events.last(), Some(&ProgressEvent::Done(RunSummary::default())));
    }

    #[test]
    fn test_file_world_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let chunk_dir = dir.path().join("0").join("0");
        std::fs::create_dir_all(&chunk_dir).unwrap();
        let chunk_path = chunk_dir.join("c.0.0.dat");
        legacy_chunk(&[18, 18, 0, 0], vec![-1, -1]).save(&chunk_path).unwrap();
        std::fs::write(dir.path().join("level.dat"), b"").unwrap();

        let (tx, _rx) = unbounded_channel();
        let summary = Pipeline::new(PipelineConfig::new(dir.path()), Arc::new(FileChunkStore), tx).run();
        assert_eq!(summary.chunks_rewritten, 1);
        assert_eq!(summary.cells_changed, 2);

        let saved = ChunkTree::load(&chunk_path).unwrap();
        assert_eq!(saved.compression(), Compression::Gzip);
        assert_eq!(saved.find_byte_array("Data").unwrap(), &[0x00, -1]);
        assert_eq!(saved.find("xPos"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_worker_thread_with_polling_view() {
        let store = world();
        let (tx, mut rx) = unbounded_channel();
        let handle = Pipeline::new(PipelineConfig::new("/world"), store, tx).spawn().unwrap();

        let mut view = ProgressView::new();
        while !view.drain(&mut rx) {
            thread::sleep(Duration::from_millis(10));
        }
        let summary = handle.join().unwrap();

        assert!(view.is_finished());
        assert_eq!(view.summary, Some(summary));
        assert_eq!(view.status, "Complete!");
        assert!((view.percent - PROGRESS_TOTAL).abs() < 1e-9);
        assert!(view.failure.is_none());
    }

    #[test]
    fn test_view_reports_vanished_worker() {
        let (tx, mut rx) = unbounded_channel();
        tx.send(ProgressEvent::Progress(10.0)).unwrap();
        drop(tx);

        let mut view = ProgressView::new();
        assert!(view.drain(&mut rx));
        assert_eq!(view.percent, 10.0);
        assert!(view.failure.is_some());
        assert!(view.summary.is_none());
    }

    #[test]
    fn test_view_stops_at_terminal_event() {
        let (tx, mut rx) = unbounded_channel();
        tx.send(ProgressEvent::Failed("boom".to_string())).unwrap();
        tx.send(ProgressEvent::Progress(50.0)).unwrap();

        let mut view = ProgressView::new();
        assert!(view.drain(&mut rx));
        assert_eq!(view.failure.as_deref(), Some("boom"));
        assert_eq!(view.percent, 0.0);
    }

    #[test]
    fn test_phase_weights() {
        let w = PhaseWeights::new(10.0, 25.0, 65.0).unwrap();
        assert_eq!(w, PhaseWeights { scanning: 10.0, locating: 25.0, rewriting: 65.0 });

        let w = PhaseWeights::new(1.0, 2.0, 1.0).unwrap();
        assert!((w.scanning - 25.0).abs() < 1e-9);
        assert!((w.locating - 50.0).abs() < 1e-9);

        assert!(PhaseWeights::new(0.0, 0.0, 0.0).is_none());
        assert!(PhaseWeights::new(-1.0, 50.0, 50.0).is_none());
        assert!(PhaseWeights::new(f64::NAN, 50.0, 50.0).is_none());
    }

    #[test]
    fn test_summary_serializes() {
        let json = serde_json::to_value(RunSummary { chunks_found: 2, ..Default::default() }).unwrap();
        assert_eq!(json["chunks_found"], 2);
        assert_eq!(json["cancelled"], false);
    }
}
