//! Terminal input thread and the single channel every producer writes to.
//!
//! Key presses come from an OS thread because `crossterm::event::poll()` blocks.
//! Fetch and cancel tasks push their outcomes through [`EventHandler::sender`].

use crate::app::{FetchTicket, RunRecord};
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Tick,
    /// Outcome of one fetch. Applied only if `ticket` is still current.
    FetchResult {
        ticket: FetchTicket,
        result: Result<Vec<RunRecord>, String>,
    },
    /// One per id in a cancel batch, in completion order.
    CancelOutcome {
        run_id: u64,
        result: Result<(), String>,
    },
    /// Global toast, auto-dismisses after `ERROR_TTL_SECS`.
    Error(String),
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    tx: mpsc::UnboundedSender<AppEvent>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let input_tx = tx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();

        let thread = std::thread::spawn(move || {
            while !shutdown_flag.load(Ordering::Relaxed) {
                match event::poll(tick_rate) {
                    Err(e) => {
                        if input_tx
                            .send(AppEvent::Error(format!("Terminal poll error: {e}")))
                            .is_err()
                        {
                            tracing::warn!("event channel closed; dropping terminal poll error: {e}");
                        }
                        break;
                    }
                    Ok(false) => {
                        if input_tx.send(AppEvent::Tick).is_err() {
                            break;
                        }
                        continue;
                    }
                    Ok(true) => {}
                }
                match event::read() {
                    Ok(CrosstermEvent::Key(key)) => {
                        if input_tx.send(AppEvent::Key(key)).is_err() {
                            break;
                        }
                    }
                    // EINTR
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        if input_tx
                            .send(AppEvent::Error(format!("Terminal read error: {e}")))
                            .is_err()
                        {
                            tracing::warn!("event channel closed; dropping terminal read error: {e}");
                        }
                        break;
                    }
                    _ => {}
                }
            }
        });

        Self {
            rx,
            tx,
            shutdown,
            thread: Some(thread),
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::error!("input thread panicked");
            }
        }
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        // Signal only. Joining here can hang if poll() is blocked during unwinding.
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
