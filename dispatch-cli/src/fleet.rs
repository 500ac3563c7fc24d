//! Loading, running and saving a fleet snapshot for one command.

use std::future::Future;
use std::io::BufReader;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use dispatch_core::{DispatchStore, FleetSnapshot, MemoryDispatchStore};
use dispatch_service::{
    ChangeNotifier, ChannelSubscriber, CoordinatorConfig, ReoptimizationCoordinator,
};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::CliError;
use crate::fs;

/// Events buffered per command before further ones are dropped.
const EVENT_BUFFER: usize = 4096;

/// Reject missing or non-file paths before any parsing starts.
pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Decode a fleet snapshot from JSON.
pub(crate) fn load_snapshot(path: &Utf8Path) -> Result<FleetSnapshot, CliError> {
    let file = fs::open_utf8_file(path).map_err(|source| CliError::OpenSnapshot {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParseSnapshot {
        path: path.to_path_buf(),
        source,
    })
}

/// Pretty-print `snapshot` to `path`, replacing any existing file.
pub(crate) fn save_snapshot(snapshot: &FleetSnapshot, path: &Utf8Path) -> Result<(), CliError> {
    let mut payload = serde_json::to_vec_pretty(snapshot).map_err(CliError::SerializeOutput)?;
    payload.push(b'\n');
    fs::write_utf8_file(path, &payload).map_err(|source| CliError::WriteSnapshot {
        path: path.to_path_buf(),
        source,
    })
}

/// Drive `future` to completion on a fresh current-thread runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    Ok(runtime.block_on(future))
}

/// An in-memory fleet with a coordinator and a log of published events.
#[derive(Debug)]
pub(crate) struct Fleet {
    store: Arc<MemoryDispatchStore>,
    coordinator: ReoptimizationCoordinator,
    events: mpsc::Receiver<Value>,
}

impl Fleet {
    /// Load `path` into memory and attach a coordinator to it.
    pub(crate) fn open(path: &Utf8Path, config: CoordinatorConfig) -> Result<Self, CliError> {
        let snapshot = load_snapshot(path)?;
        let store = MemoryDispatchStore::from_snapshot(snapshot).map_err(|source| {
            CliError::InvalidSnapshot {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let store = Arc::new(store);
        let notifier = Arc::new(ChangeNotifier::default());
        let (subscriber, events) = ChannelSubscriber::channel(EVENT_BUFFER);
        notifier.subscribe(Arc::new(subscriber));
        let coordinator =
            ReoptimizationCoordinator::new(store.clone(), notifier).with_config(config);
        Ok(Self {
            store,
            coordinator,
            events,
        })
    }

    /// Replace the coordinator, keeping its store and notifier.
    pub(crate) fn map_coordinator(
        mut self,
        f: impl FnOnce(ReoptimizationCoordinator) -> ReoptimizationCoordinator,
    ) -> Self {
        self.coordinator = f(self.coordinator);
        self
    }

    pub(crate) const fn coordinator(&self) -> &ReoptimizationCoordinator {
        &self.coordinator
    }

    /// Envelopes published so far, oldest first.
    pub(crate) fn drain_events(&mut self) -> Vec<Value> {
        let mut drained = Vec::new();
        while let Ok(envelope) = self.events.try_recv() {
            drained.push(envelope);
        }
        drained
    }

    /// Write the current fleet to `output` when one was requested.
    pub(crate) fn save_to(&self, output: Option<&Utf8PathBuf>) -> Result<(), CliError> {
        let Some(path) = output else {
            return Ok(());
        };
        save_snapshot(&self.store.snapshot()?, path)
    }
}
