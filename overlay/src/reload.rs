//! Live configuration reload
//!
//! Watches the directory holding the configuration document (editors often
//! replace the file rather than writing it in place) and forwards each new,
//! valid snapshot to the event loop. A document that fails to parse is
//! reported and the running snapshot stays in effect.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::Sender;

use clipqa_core::config::read_configuration;
use clipqa_types::Configuration;

use crate::app::OverlayCommand;

/// Keeps the underlying watcher alive; dropping it stops reloads.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl ConfigWatcher {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Tracks the last forwarded document so repeated change events for one save
/// produce a single reload.
struct Reloader {
    path: PathBuf,
    last: Option<Configuration>,
    tx: Sender<OverlayCommand>,
}

impl Reloader {
    fn handle(&mut self, event: notify::Result<Event>) {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Config watch error");
                return;
            }
        };
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return;
        }
        if !event.paths.iter().any(|p| same_file_name(p, &self.path)) {
            return;
        }
        self.reload();
    }

    fn reload(&mut self) {
        let config = match read_configuration(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Keeping previous configuration");
                return;
            }
        };
        if self.last.as_ref() == Some(&config) {
            return;
        }

        tracing::info!(path = %self.path.display(), "Configuration changed, applying to next card");
        self.last = Some(config.clone());
        if self
            .tx
            .try_send(OverlayCommand::Reconfigure(Arc::new(config)))
            .is_err()
        {
            tracing::warn!("Overlay command queue unavailable, configuration update dropped");
        }
    }
}

fn same_file_name(candidate: &Path, target: &Path) -> bool {
    candidate.file_name().is_some() && candidate.file_name() == target.file_name()
}

/// Start watching `path`. `initial` is the snapshot already in use.
pub fn watch_config(
    path: PathBuf,
    initial: Configuration,
    tx: Sender<OverlayCommand>,
) -> notify::Result<ConfigWatcher> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut reloader = Reloader {
        path: path.clone(),
        last: Some(initial),
        tx,
    };
    let mut watcher = notify::recommended_watcher(move |event| reloader.handle(event))?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    tracing::debug!(dir = %dir.display(), "Watching configuration directory");
    Ok(ConfigWatcher {
        _watcher: watcher,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipqa_core::config::store_configuration;
    use clipqa_types::ScreenAnchor;
    use notify::event::{CreateKind, ModifyKind};
    use tokio::sync::mpsc;

    fn modify_event(path: &Path) -> notify::Result<Event> {
        Ok(Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path.to_path_buf()))
    }

    fn reloader(path: PathBuf) -> (Reloader, mpsc::Receiver<OverlayCommand>) {
        let (tx, rx) = mpsc::channel(32);
        (
            Reloader {
                path,
                last: Some(Configuration::default()),
                tx,
            },
            rx,
        )
    }

    #[test]
    fn test_valid_change_is_forwarded_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let (mut reloader, mut rx) = reloader(path.clone());

        let mut config = Configuration::default();
        config.overlay.position = ScreenAnchor::CenterTop;
        store_configuration(&path, &config).unwrap();

        reloader.handle(modify_event(&path));
        reloader.handle(Ok(
            Event::new(EventKind::Create(CreateKind::File)).add_path(path.clone())
        ));

        match rx.try_recv() {
            Ok(OverlayCommand::Reconfigure(snapshot)) => assert_eq!(*snapshot, config),
            _ => panic!("expected a reconfigure command"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_malformed_document_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[text]\ntext_color = \"not a color\"\n").unwrap();

        let (mut reloader, mut rx) = reloader(path.clone());
        reloader.handle(modify_event(&path));
        assert!(rx.try_recv().is_err());
        assert_eq!(reloader.last, Some(Configuration::default()));
    }

    #[test]
    fn test_watcher_tracks_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let (tx, _rx) = mpsc::channel(4);
        let watcher = watch_config(path.clone(), Configuration::default(), tx).unwrap();
        assert_eq!(watcher.path(), path);
    }

    #[test]
    fn test_unrelated_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let other = dir.path().join("notes.txt");
        let mut config = Configuration::default();
        config.behavior.auto_hide_seconds = 5;
        store_configuration(&path, &config).unwrap();

        let (mut reloader, mut rx) = reloader(path);
        reloader.handle(modify_event(&other));
        assert!(rx.try_recv().is_err());
    }
}
