use indicatif::{ProgressBar, ProgressStyle};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum VerbosityLevel {
    Silent = 0,   // Only the final summary
    Summary = 1,  // Phase progress and per-source counts (default)
    Detailed = 2, // Every resolved hostname, source failures
    Debug = 3,    // Everything
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            2.. => VerbosityLevel::Debug,
        }
    }

    /// Default `tracing` filter directive for this verbosity
    pub fn tracing_directive(&self) -> &'static str {
        match self {
            VerbosityLevel::Silent => "error",
            VerbosityLevel::Summary => "warn",
            VerbosityLevel::Detailed => "info",
            VerbosityLevel::Debug => "debug",
        }
    }
}

/// Console reporter for a scan: timestamped messages, a progress bar for the
/// validation phase and the closing summary.
#[derive(Clone)]
pub struct ScanLogger {
    verbosity: VerbosityLevel,
    show_progress: bool,
    progress_bar: Arc<RwLock<Option<ProgressBar>>>,
    metadata: Arc<Mutex<ScanMetadata>>,
}

#[derive(Default, Clone)]
struct ScanMetadata {
    target: String,
    start_time: Option<SystemTime>,
    end_time: Option<SystemTime>,
    total_candidates: usize,
    total_resolved: usize,
    sources: Vec<(String, usize, bool)>,
    cancelled: bool,
    output_file: String,
}

impl ScanLogger {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_progress: true,
            progress_bar: Arc::new(RwLock::new(None)),
            metadata: Arc::new(Mutex::new(ScanMetadata::default())),
        }
    }

    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn info(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("INFO", message);
        }
    }

    pub fn warn(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Detailed {
            self.print_message("WARN", message);
        }
    }

    pub fn error(&self, message: &str) {
        // Errors are shown regardless of verbosity
        self.print_message("ERROR", message);
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Debug {
            self.print_message("DEBUG", message);
        }
    }

    fn print_message(&self, level: &str, message: &str) {
        let msg = format!("[{}] {}: {}", Self::timestamp(), level, message);

        // Print above the bar so it keeps its position
        if let Ok(guard) = self.progress_bar.try_read() {
            if let Some(pb) = guard.as_ref() {
                pb.println(msg);
                return;
            }
        }

        eprintln!("{}", msg);
    }

    fn timestamp() -> String {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        let secs = now.as_secs();

        format!(
            "{:02}:{:02}:{:02}.{:03}",
            (secs / 3600) % 24,
            (secs % 3600) / 60,
            secs % 60,
            now.subsec_millis()
        )
    }

    pub async fn start_progress(&self, total_steps: u64) {
        if !self.show_progress || self.verbosity == VerbosityLevel::Silent {
            return;
        }

        let pb = ProgressBar::new(total_steps);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        pb.set_message("resolving");

        let mut guard = self.progress_bar.write().await;
        *guard = Some(pb);
    }

    pub async fn advance_progress(&self, steps: u64) {
        if let Some(pb) = self.progress_bar.read().await.as_ref() {
            pb.inc(steps);
        }
    }

    pub async fn finish_progress(&self) {
        let mut guard = self.progress_bar.write().await;
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }

    pub fn log_scan_start(&self, target: &str) {
        if let Ok(mut metadata) = self.metadata.lock() {
            metadata.target = target.to_string();
            metadata.start_time = Some(SystemTime::now());
        }
        self.info(&format!("Enumerating subdomains for: {}", target));
    }

    pub fn log_source_start(&self, source: &str) {
        self.debug(&format!("Querying {}...", source));
    }

    pub fn log_source_complete(&self, source: &str, count: usize) {
        if let Ok(mut metadata) = self.metadata.lock() {
            metadata.sources.push((source.to_string(), count, true));
        }
        self.info(&format!("{}: {} candidates", source, count));
    }

    pub fn log_source_failed(&self, source: &str, error: &str) {
        if let Ok(mut metadata) = self.metadata.lock() {
            metadata.sources.push((source.to_string(), 0, false));
        }
        self.warn(&format!("{} failed: {}", source, error));
    }

    pub fn log_bruteforce_hit(&self, host: &str, ip: &IpAddr) {
        self.debug(&format!("Found via brute-force: {} -> {}", host, ip));
    }

    pub fn log_candidates_merged(&self, count: usize) {
        if let Ok(mut metadata) = self.metadata.lock() {
            metadata.total_candidates = count;
        }
        self.info(&format!("Resolving {} unique candidates...", count));
    }

    pub fn log_resolved(&self, host: &str, ip: &IpAddr) {
        if self.verbosity >= VerbosityLevel::Detailed {
            self.print_message("FOUND", &format!("{} -> {}", host, ip));
        }
    }

    pub fn log_scan_complete(&self, resolved: usize, cancelled: bool) {
        if let Ok(mut metadata) = self.metadata.lock() {
            metadata.total_resolved = resolved;
            metadata.cancelled = cancelled;
            metadata.end_time = Some(SystemTime::now());
        }
        if cancelled {
            self.error(&format!(
                "Scan interrupted; keeping {} resolved subdomains gathered so far",
                resolved
            ));
        }
    }

    pub fn log_export_success(&self, path: &str) {
        if let Ok(mut metadata) = self.metadata.lock() {
            metadata.output_file = path.to_string();
        }
        self.info(&format!("Subdomains saved to: {}", path));
    }

    pub fn elapsed(&self) -> Duration {
        self.metadata
            .lock()
            .ok()
            .and_then(|m| {
                let start = m.start_time?;
                let end = m.end_time.unwrap_or_else(SystemTime::now);
                end.duration_since(start).ok()
            })
            .unwrap_or_default()
    }

    /// Summary block printed to stdout once the scan is done
    pub fn render_summary(&self) -> String {
        let metadata = match self.metadata.lock() {
            Ok(m) => m.clone(),
            Err(_) => return String::new(),
        };

        let mut out = String::new();
        out.push_str("\n--- Subdomain Summary ---\n");
        out.push_str(&format!("  Target: {}\n", metadata.target));
        for (name, count, ok) in &metadata.sources {
            if *ok {
                out.push_str(&format!("  {}: {} candidates\n", name, count));
            } else {
                out.push_str(&format!("  {}: failed\n", name));
            }
        }
        out.push_str(&format!("  Total found: {}\n", metadata.total_candidates));
        out.push_str(&format!("  Resolved to IP: {}\n", metadata.total_resolved));
        out.push_str(&format!("  Runtime: {:.2} seconds\n", self.elapsed().as_secs_f64()));
        if metadata.cancelled {
            out.push_str("  Status: interrupted (partial results)\n");
        }
        if !metadata.output_file.is_empty() {
            out.push_str(&format!("  Results: {}\n", metadata.output_file));
        }
        out
    }

    pub fn print_final_summary(&self) {
        println!("{}", self.render_summary());
    }
}
