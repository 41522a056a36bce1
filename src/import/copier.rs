//! Cancellable batch copy of source files to their targets.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub total: usize,
    pub copied: usize,
    /// Targets that already existed and were left alone.
    pub skipped: usize,
    /// One human-readable message per failed file.
    pub failures: Vec<String>,
    pub cancelled: bool,
}

impl CopyReport {
    pub fn summary(&self) -> String {
        let mut text = format!("Copied {} of {} files", self.copied, self.total);
        if self.skipped > 0 {
            text.push_str(&format!(", kept {}", self.skipped));
        }
        if !self.failures.is_empty() {
            text.push_str(&format!(", {} failed", self.failures.len()));
        }
        if self.cancelled {
            text.push_str(" (cancelled)");
        }
        text.push('.');
        text
    }
}

/// Messages sent by a copy running on a worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyEvent {
    Progress { done: usize, total: usize },
    Failed(String),
    Finished(CopyReport),
}

pub struct FileCopier {
    source_targets: BTreeMap<PathBuf, PathBuf>,
    /// Existing targets the copy is allowed to replace.
    replace: BTreeSet<PathBuf>,
    cancel: Arc<AtomicBool>,
}

impl FileCopier {
    pub fn new(source_targets: BTreeMap<PathBuf, PathBuf>) -> Self {
        Self {
            source_targets,
            replace: BTreeSet::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Allow the copy to replace these targets when they already exist.
    pub fn replacing(mut self, targets: impl IntoIterator<Item = PathBuf>) -> Self {
        self.replace.extend(targets);
        self
    }

    pub fn replaced_targets(&self) -> &BTreeSet<PathBuf> {
        &self.replace
    }

    pub fn set_source_targets(&mut self, files: BTreeMap<PathBuf, PathBuf>) {
        self.source_targets = files;
    }

    pub fn source_targets(&self) -> &BTreeMap<PathBuf, PathBuf> {
        &self.source_targets
    }

    pub fn len(&self) -> usize {
        self.source_targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source_targets.is_empty()
    }

    /// Whether the running copy has been asked to stop.
    pub fn cancel_copy(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn set_cancel_copy(&self, value: bool) {
        self.cancel.store(value, Ordering::SeqCst);
    }

    /// Shared flag; setting it stops the copy before the next file.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Copy every source whose target does not exist yet, or is listed in
    /// [`FileCopier::replacing`]. `progress` gets `(done, total)` after each
    /// file.
    pub fn copy(&self, mut progress: impl FnMut(usize, usize)) -> CopyReport {
        self.copy_with(&mut progress, &mut |_: &str| {})
    }

    fn copy_with(
        &self,
        progress: &mut dyn FnMut(usize, usize),
        failed: &mut dyn FnMut(&str),
    ) -> CopyReport {
        let total = self.source_targets.len();
        let mut report = CopyReport {
            total,
            ..CopyReport::default()
        };

        for (done, (source, target)) in self.source_targets.iter().enumerate() {
            if self.cancel_copy() {
                report.cancelled = true;
                info!(done, total, "copy cancelled");
                break;
            }

            let replace = self.replace.contains(target);
            if target.exists() && !replace {
                report.skipped += 1;
            } else {
                let result = target
                    .parent()
                    .map(fs::create_dir_all)
                    .unwrap_or(Ok(()))
                    .and_then(|_| {
                        if replace {
                            replace_file(source, target)
                        } else {
                            fs::copy(source, target).map(|_| ())
                        }
                    });
                match result {
                    Ok(_) => report.copied += 1,
                    Err(err) => {
                        let message = format!(
                            "An unexpected error occurred while copying: {} to {}",
                            source.display(),
                            target.display()
                        );
                        warn!(error = %err, "{message}");
                        failed(&message);
                        report.failures.push(message);
                    }
                }
            }
            progress(done + 1, total);
        }

        report
    }

    /// Run the copy on a worker thread. Events arrive on the returned handle,
    /// which can also cancel the copy.
    pub fn spawn(self) -> CopyHandle {
        let (sender, receiver) = mpsc::channel();
        let cancel = self.cancel_flag();
        let thread = thread::spawn(move || {
            let progress_sender = sender.clone();
            let failure_sender = sender.clone();
            let report = self.copy_with(
                &mut |done: usize, total: usize| {
                    let _ = progress_sender.send(CopyEvent::Progress { done, total });
                },
                &mut |message: &str| {
                    let _ = failure_sender.send(CopyEvent::Failed(message.to_string()));
                },
            );
            let _ = sender.send(CopyEvent::Finished(report));
        });

        CopyHandle {
            receiver,
            cancel,
            thread: Some(thread),
        }
    }
}

/// Copy `source` next to `target` and rename it over `target`, so a failed
/// copy leaves the existing file untouched.
fn replace_file(source: &Path, target: &Path) -> io::Result<()> {
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = target.with_file_name(format!(".{name}.import"));
    let result = fs::copy(source, &staging).and_then(|_| fs::rename(&staging, target));
    if result.is_err() && staging.exists() {
        let _ = fs::remove_file(&staging);
    }
    result
}

/// Handle on a copy running in the background.
pub struct CopyHandle {
    receiver: Receiver<CopyEvent>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CopyHandle {
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Drain pending events without blocking.
    pub fn poll(&self) -> Vec<CopyEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    /// Block until the copy finishes and return its report.
    pub fn wait(mut self) -> CopyReport {
        let mut report = CopyReport::default();
        for event in self.receiver.iter() {
            if let CopyEvent::Finished(done) = event {
                report = done;
            }
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        report
    }
}
