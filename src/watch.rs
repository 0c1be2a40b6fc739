// Watch mode: re-upload when a local .html/.css file changes.
//
// Changes are throttled against the completion time of the last upload
// cycle. Anything that arrives while a cycle runs is dropped, not queued.
// A stop request is only seen between cycles, so an in-flight upload
// always finishes first.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use notify::{EventKind, RecursiveMode, Watcher as _};
use tracing::{debug, info, warn};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Changed(PathBuf),
    Stop,
}

/// Handle for ending a watch loop from another thread.
#[derive(Debug, Clone)]
pub struct WatchStopper {
    tx: Sender<WatchEvent>,
}

impl WatchStopper {
    pub fn stop(&self) {
        // the loop may already be gone; nothing left to stop then
        let _ = self.tx.send(WatchEvent::Stop);
    }
}

/// Admits an upload cycle only if none completed within `min_interval`.
#[derive(Debug, Clone)]
pub struct UploadThrottle {
    min_interval: Duration,
    last_completed: Option<Instant>,
}

impl UploadThrottle {
    pub fn new(min_interval: Duration) -> Self {
        UploadThrottle {
            min_interval,
            last_completed: None,
        }
    }

    pub fn admits(&self, now: Instant) -> bool {
        match self.last_completed {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.min_interval,
        }
    }

    pub fn record_completion(&mut self, at: Instant) {
        self.last_completed = Some(at);
    }
}

pub fn is_template_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("html") | Some("css"))
}

/// Event handling with an injectable clock.
pub struct WatchLoop<C = fn() -> Instant> {
    throttle: UploadThrottle,
    clock: C,
}

impl WatchLoop {
    pub fn new(min_interval: Duration) -> Self {
        WatchLoop::with_clock(min_interval, Instant::now as fn() -> Instant)
    }
}

impl<C: Fn() -> Instant> WatchLoop<C> {
    pub fn with_clock(min_interval: Duration, clock: C) -> Self {
        WatchLoop {
            throttle: UploadThrottle::new(min_interval),
            clock,
        }
    }

    /// Run `upload` for this change if it is a template file and the
    /// throttle admits it. Returns the upload's result when it ran.
    pub fn on_change<T>(&mut self, path: &Path, upload: impl FnOnce() -> T) -> Option<T> {
        if !is_template_file(path) {
            return None;
        }
        if !self.throttle.admits((self.clock)()) {
            debug!("ignoring change to {} inside the upload interval", path.display());
            return None;
        }
        info!("File changed: {}. Uploading templates...", path.display());
        let out = upload();
        self.throttle.record_completion((self.clock)());
        Some(out)
    }

    /// Consume events until `Stop` arrives or every sender is gone.
    pub fn run(&mut self, events: &Receiver<WatchEvent>, mut upload: impl FnMut()) {
        while let Ok(event) = events.recv() {
            let path = match event {
                WatchEvent::Stop => break,
                WatchEvent::Changed(path) => path,
            };
            if self.on_change(&path, &mut upload).is_none() {
                continue;
            }
            // drop whatever piled up during the cycle, but honour a stop
            loop {
                match events.try_recv() {
                    Ok(WatchEvent::Stop) => return,
                    Ok(WatchEvent::Changed(p)) => debug!("dropping change to {} seen during upload", p.display()),
                    Err(_) => break,
                }
            }
        }
        info!("Watch loop stopped");
    }
}

/// Filesystem watcher feeding a [`WatchLoop`].
pub struct TemplateWatcher {
    tx: Sender<WatchEvent>,
    rx: Receiver<WatchEvent>,
}

impl Default for TemplateWatcher {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel();
        TemplateWatcher { tx, rx }
    }
}

impl TemplateWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stopper(&self) -> WatchStopper {
        WatchStopper { tx: self.tx.clone() }
    }

    /// Watch `dir` (non-recursively) and call `cycle` for admitted changes.
    /// Blocks until stopped.
    pub fn run(self, dir: &Path, min_interval: Duration, cycle: impl FnMut()) -> Result<()> {
        let tx = self.tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    for path in event.paths {
                        let _ = tx.send(WatchEvent::Changed(path));
                    }
                }
            }
            Err(e) => warn!("watch error: {}", e),
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        info!("Watching {} for file changes...", dir.display());

        WatchLoop::new(min_interval).run(&self.rx, cycle);
        Ok(())
    }
}
