//! notify-backed file system watcher feeding the debouncer

use crate::debounce::{Clock, Debouncer};
use crate::ignore::IgnoreRules;
use crate::{EventKind, RawEvent};
use crossbeam_channel::{Receiver, TryRecvError};
use mirror_core::fs::relative_path;
use notify::event::{ModifyKind, RemoveKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Failures of the watch mechanism; fatal for a sync session
#[derive(Debug, Error)]
pub enum WatchError {
    /// The source root is missing or not a directory
    #[error("watch root is missing or not a directory: {}", .0.display())]
    MissingRoot(PathBuf),

    /// The platform watcher reported an error or dropped the watch
    #[error("file watcher failed: {0}")]
    Backend(#[from] notify::Error),

    /// The platform watcher went away
    #[error("file watcher disconnected")]
    Disconnected,
}

/// Recursive watcher on a source root
///
/// Translated, non-ignored events go straight into the debouncer from the
/// notify callback thread. Backend errors are queued for [`FsWatcher::check`].
pub struct FsWatcher {
    root: PathBuf,
    // Dropping the watcher stops event delivery
    _watcher: RecommendedWatcher,
    errors: Receiver<notify::Error>,
}

impl FsWatcher {
    /// Start watching `root` recursively
    pub fn start<C>(
        root: &Path,
        rules: Arc<IgnoreRules>,
        debouncer: Arc<Debouncer<RawEvent, C>>,
    ) -> Result<Self, WatchError>
    where
        C: Clock + 'static,
    {
        if !root.is_dir() {
            return Err(WatchError::MissingRoot(root.to_path_buf()));
        }

        let (error_tx, error_rx) = crossbeam_channel::unbounded();
        let callback_root = root.to_path_buf();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for raw in translate(&event) {
                        if is_ignored(&callback_root, &rules, &raw) {
                            continue;
                        }
                        debouncer.add(raw);
                    }
                }
                Err(e) => {
                    warn!("File watcher error: {}", e);
                    let _ = error_tx.send(e);
                }
            }
        })?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        info!("Watching {}", root.display());

        Ok(Self {
            root: root.to_path_buf(),
            _watcher: watcher,
            errors: error_rx,
        })
    }

    /// Surface the first queued backend error, if any
    pub fn check(&self) -> Result<(), WatchError> {
        match self.errors.try_recv() {
            Ok(e) => Err(WatchError::Backend(e)),
            Err(TryRecvError::Empty) => {
                if self.root.is_dir() {
                    Ok(())
                } else {
                    Err(WatchError::MissingRoot(self.root.clone()))
                }
            }
            Err(TryRecvError::Disconnected) => Err(WatchError::Disconnected),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_ignored(root: &Path, rules: &IgnoreRules, raw: &RawEvent) -> bool {
    match relative_path(root, &raw.path) {
        Ok(rel) => rules.should_ignore(Path::new(&rel), raw.is_directory),
        // The root itself and foreign paths are left to the reconciler
        Err(_) => false,
    }
}

/// Translate one notify event into raw events
///
/// - renames become a delete of the old path and a create of the new one
/// - a directory that appears is expanded into creates for the files already
///   inside it, since no per-file events are delivered for them
/// - access and unclassified events are dropped
pub fn translate(event: &notify::Event) -> Vec<RawEvent> {
    use notify::EventKind as Kind;

    let mut out = Vec::new();
    match &event.kind {
        Kind::Create(_) => {
            for path in &event.paths {
                appeared(path, &mut out);
            }
        }
        Kind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => {
                for path in &event.paths {
                    out.push(RawEvent::file(path.clone(), EventKind::Deleted));
                }
            }
            RenameMode::To => {
                for path in &event.paths {
                    appeared(path, &mut out);
                }
            }
            RenameMode::Both => {
                if let [from, to] = event.paths.as_slice() {
                    // The old path was the same kind of node as the new one
                    let was_dir = to.is_dir();
                    out.push(RawEvent {
                        path: from.clone(),
                        kind: EventKind::Deleted,
                        is_directory: was_dir,
                    });
                    appeared(to, &mut out);
                }
            }
            // Backends that cannot pair renames report them as Any/Other:
            // decide by whether the path still exists
            _ => {
                for path in &event.paths {
                    if path.exists() {
                        appeared(path, &mut out);
                    } else {
                        out.push(RawEvent::file(path.clone(), EventKind::Deleted));
                    }
                }
            }
        },
        Kind::Modify(_) => {
            for path in &event.paths {
                out.push(RawEvent {
                    path: path.clone(),
                    kind: EventKind::Modified,
                    is_directory: path.is_dir(),
                });
            }
        }
        Kind::Remove(RemoveKind::Folder) => {
            for path in &event.paths {
                out.push(RawEvent::dir(path.clone(), EventKind::Deleted));
            }
        }
        Kind::Remove(_) => {
            for path in &event.paths {
                out.push(RawEvent::file(path.clone(), EventKind::Deleted));
            }
        }
        Kind::Access(_) | Kind::Any | Kind::Other => {}
    }

    out
}

/// Emit a create for `path`, expanding directories into their files
fn appeared(path: &Path, out: &mut Vec<RawEvent>) {
    if !path.is_dir() {
        out.push(RawEvent::file(path.to_path_buf(), EventKind::Created));
        return;
    }

    out.push(RawEvent::dir(path.to_path_buf(), EventKind::Created));
    for entry in WalkDir::new(path).min_depth(1).follow_links(false) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                out.push(RawEvent::file(entry.into_path(), EventKind::Created));
            }
            Ok(_) => {}
            Err(e) => debug!("Skipping entry while expanding {}: {}", path.display(), e),
        }
    }
}
