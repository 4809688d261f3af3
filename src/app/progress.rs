//! Terminal progress line for a running scan

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

const BRAILLE_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Check if the progress line should be displayed
pub fn should_show_progress() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Files completed so far, shared between the scan and the renderer
#[derive(Debug)]
pub struct ScanProgress {
    total: usize,
    done: AtomicUsize,
    started: Instant,
}

impl ScanProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            done: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    /// Record a completed batch
    pub fn advance(&self, files: usize) {
        self.done.fetch_add(files, Ordering::Relaxed);
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn render(&self, frame: char) -> String {
        let done = self.done().min(self.total);
        let percent = if self.total == 0 {
            100.0
        } else {
            done as f64 * 100.0 / self.total as f64
        };
        let secs = self.started.elapsed().as_secs_f64();
        let rate = if secs > 0.0 { done as f64 / secs } else { 0.0 };
        format!(
            "{} Scanning {}/{} files ({:.1}%, {:.1} files/s)",
            frame, done, self.total, percent, rate
        )
    }
}

/// Simple spinner struct
pub struct ProgressSpinner {
    frame_index: usize,
}

impl ProgressSpinner {
    pub fn new() -> Self {
        Self { frame_index: 0 }
    }

    pub fn next_frame(&mut self) -> char {
        let frame = BRAILLE_FRAMES[self.frame_index];
        self.frame_index = (self.frame_index + 1) % BRAILLE_FRAMES.len();
        frame
    }

    pub fn tick(&mut self, progress: &ScanProgress) {
        let line = progress.render(self.next_frame());
        // Clear line and redraw
        eprint!("\r\x1b[2K{line}");
        let _ = std::io::stderr().flush();
    }

    pub fn finish(&self) {
        eprint!("\r\x1b[2K");
        let _ = std::io::stderr().flush();
    }
}

impl Default for ProgressSpinner {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running progress renderer
pub struct ProgressTask {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTask {
    /// Redraw `progress` at 10Hz on stderr, if stderr is a terminal
    pub fn spawn(progress: Arc<ScanProgress>) -> Self {
        if !should_show_progress() {
            return Self {
                stop: None,
                handle: None,
            };
        }

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut spinner = ProgressSpinner::new();
            let mut update_interval = interval(Duration::from_millis(100));
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        spinner.finish();
                        return;
                    }
                    _ = update_interval.tick() => spinner.tick(&progress),
                }
            }
        });

        Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Stop rendering and clear the line
    pub async fn finish(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

/// One-off status line on stderr, e.g. "Updating signature database..."
pub fn status(message: &str) {
    if should_show_progress() {
        eprintln!("{}", message);
    } else {
        log::info!("{}", message);
    }
}
