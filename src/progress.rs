use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use console::{Term, style};

pub const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Shortest time a spinner stays on screen, so instant fetches still flash.
pub const MIN_SPINNER_DURATION: Duration = Duration::from_millis(500);

const TICK: Duration = Duration::from_millis(80);

/// Transient progress indicator drawn on stderr from a helper thread.
pub struct Spinner {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    started: Instant,
    min_duration: Duration,
}

impl Spinner {
    pub fn supported() -> bool {
        Term::stderr().is_term()
    }

    pub fn start(message: impl Into<String>) -> Self {
        Self::start_with_min_duration(message, MIN_SPINNER_DURATION)
    }

    pub fn start_with_min_duration(message: impl Into<String>, min_duration: Duration) -> Self {
        let message = message.into();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);

        let handle = thread::spawn(move || {
            let term = Term::stderr();
            let _ = term.hide_cursor();
            let mut frame = 0;
            while !flag.load(Ordering::Acquire) {
                let _ = term.clear_line();
                let _ = term.write_str(&format!(
                    "{} {message}",
                    style(SPINNER_FRAMES[frame]).cyan().for_stderr()
                ));
                frame = (frame + 1) % SPINNER_FRAMES.len();
                thread::sleep(TICK);
            }
            let _ = term.clear_line();
            let _ = term.show_cursor();
        });

        Self {
            shutdown,
            handle: Some(handle),
            started: Instant::now(),
            min_duration,
        }
    }

    /// Stop the spinner once it has been visible for its minimum duration.
    pub fn finish(mut self) {
        let elapsed = self.started.elapsed();
        if elapsed < self.min_duration {
            thread::sleep(self.min_duration - elapsed);
        }
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop();
    }
}
