use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct BenchmarkMetrics {
    // Scan
    pub total_files_found: AtomicUsize,
    pub total_scan_time_us: AtomicU64,

    // Chunk IO
    pub total_chunks_loaded: AtomicUsize,
    pub total_load_time_us: AtomicU64,
    pub max_load_time_us: AtomicU64,
    pub total_chunks_saved: AtomicUsize,
    pub total_save_time_us: AtomicU64,

    // Detailed Breakdown
    pub total_locate_us: AtomicU64,
    pub total_rewrite_us: AtomicU64,

    // Session
    pub start_time: Option<Instant>,
}

impl BenchmarkMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_scan(&self, files: usize, duration: Duration) {
        self.total_files_found.fetch_add(files, Ordering::Relaxed);
        self.total_scan_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_load(&self, duration: Duration) {
        self.total_chunks_loaded.fetch_add(1, Ordering::Relaxed);
        let us = duration.as_micros() as u64;
        self.total_load_time_us.fetch_add(us, Ordering::Relaxed);
        self.max_load_time_us.fetch_max(us, Ordering::Relaxed);
    }

    pub fn record_save(&self, duration: Duration) {
        self.total_chunks_saved.fetch_add(1, Ordering::Relaxed);
        self.total_save_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_locate(&self, duration: Duration) {
        self.total_locate_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_rewrite(&self, duration: Duration) {
        self.total_rewrite_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn generate_report(&self) -> String {
        let uptime = self.start_time.unwrap_or_else(Instant::now).elapsed();

        let files = self.total_files_found.load(Ordering::Relaxed);
        let scan_time = self.total_scan_time_us.load(Ordering::Relaxed) as f64 / 1000.0; // ms

        let loaded = self.total_chunks_loaded.load(Ordering::Relaxed);
        let load_time = self.total_load_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let load_max = self.max_load_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let load_avg = if loaded > 0 { load_time / loaded as f64 } else { 0.0 };

        // Locate runs once per loaded chunk, rewrite once per chunk with matches
        let locate_time = self.total_locate_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let locate_avg = if loaded > 0 { locate_time / loaded as f64 } else { 0.0 };
        let rewrite_time = self.total_rewrite_us.load(Ordering::Relaxed) as f64 / 1000.0;

        let saved = self.total_chunks_saved.load(Ordering::Relaxed);
        let save_time = self.total_save_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let save_avg = if saved > 0 { save_time / saved as f64 } else { 0.0 };

        format!(
            "Treefix Benchmark Report\n\
             ========================\n\
             Session Duration: {:.2?}\n\n\
             [Scan]\n\
             Files Found: {}\n\
             Total Time: {:.2} ms\n\n\
             [Chunk Read]\n\
             Chunks Loaded: {}\n\
             Avg Time: {:.2} ms/chunk\n\
             Max Time: {:.2} ms\n\
               - Locate: {:.2} ms/chunk\n\
               - Rewrite: {:.2} ms total\n\n\
             [Chunk Write]\n\
             Chunks Saved: {}\n\
             Avg Time: {:.2} ms/chunk\n",
            uptime,
            files, scan_time,
            loaded, load_avg, load_max,
            locate_avg, rewrite_time,
            saved, save_avg,
        )
    }
}
