//! Background Event Thread
//!
//! Optional thread that pumps event sources at a fixed interval, so
//! applications that never poll still get their input translated.
//! Stopped through a bounded crossbeam channel; dropping the handle stops
//! and joins the thread.

use crate::error::Result;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tracing::{debug, info};

pub(crate) struct EventThread {
    stop_signal: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl EventThread {
    /// Spawn the thread; `pump` runs once per `interval` until stopped
    pub(crate) fn spawn<F>(interval: Duration, mut pump: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("evpump-events".to_string())
            .spawn(move || {
                info!("[EventThread] Started, pumping every {:?}", interval);
                loop {
                    pump();
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!("[EventThread] Stopped");
            })?;

        Ok(Self {
            stop_signal: stop_tx,
            handle: Some(handle),
        })
    }

    pub(crate) fn thread_id(&self) -> Option<ThreadId> {
        self.handle.as_ref().map(|h| h.thread().id())
    }

    /// Signal the thread and wait for it to finish its current pump
    pub(crate) fn stop(&mut self) {
        let _ = self.stop_signal.try_send(());
        if let Some(handle) = self.handle.take() {
            // Joining ourselves would never return
            if handle.thread().id() == thread::current().id() {
                debug!("[EventThread] Stop requested from the event thread, detaching");
                return;
            }
            let _ = handle.join();
        }
    }
}

impl Drop for EventThread {
    fn drop(&mut self) {
        self.stop();
    }
}
