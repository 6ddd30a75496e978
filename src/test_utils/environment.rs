//! Temporary install roots and recording collaborators.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use super::mock_remote::MockRemote;
use crate::config::InstallLayout;
use crate::core::Result;
use crate::lifecycle::{EventSink, LifecycleEngine, LifecycleEvent};
use crate::platform::{PathRegistrar, PathRegistration};
use crate::registry::Registry;

/// A throwaway install root.
pub struct TestRoot {
    temp: TempDir,
    layout: InstallLayout,
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRoot {
    /// New empty root using the `.exe` suffix.
    ///
    /// # Panics
    ///
    /// If the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        super::init_test_logging(None);
        let temp = TempDir::new().expect("failed to create temp dir");
        let layout = InstallLayout::new(temp.path().join("cmam"), ".exe");
        Self { temp, layout }
    }

    /// The layout under test.
    #[must_use]
    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// Root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.layout.root()
    }

    /// Scratch directory outside the install root.
    #[must_use]
    pub fn scratch(&self) -> PathBuf {
        self.temp.path().join("scratch")
    }

    /// Engine over this root.
    #[must_use]
    pub fn engine(&self, remote: MockRemote) -> LifecycleEngine<MockRemote> {
        LifecycleEngine::new(remote, self.layout.clone())
    }

    /// Engine that reports to `sink`.
    #[must_use]
    pub fn engine_with_sink(
        &self,
        remote: MockRemote,
        sink: Arc<RecordingSink>,
    ) -> LifecycleEngine<MockRemote> {
        self.engine(remote).with_sink(sink)
    }

    /// Load the registry.
    ///
    /// # Errors
    ///
    /// Registry parse errors.
    pub async fn registry(&self) -> Result<Registry> {
        Registry::load(&self.layout.registry_path()).await
    }

    /// Write a registry entry directly, bypassing the engine.
    ///
    /// # Panics
    ///
    /// If the registry cannot be read or written.
    pub async fn record(&self, app: &str, version: &str) {
        let mut registry = self.registry().await.expect("registry");
        registry.record(app, version);
        registry.save().await.expect("save registry");
    }

    /// Bytes of the canonical artifact of `app`, if present.
    #[must_use]
    pub fn artifact_bytes(&self, app: &str) -> Option<Vec<u8>> {
        std::fs::read(self.layout.artifact_path(app)).ok()
    }

    /// Place an artifact directly, bypassing the engine.
    ///
    /// # Panics
    ///
    /// If the file cannot be written.
    pub fn write_artifact(&self, app: &str, bytes: &[u8]) {
        let path = self.layout.artifact_path(app);
        std::fs::create_dir_all(self.layout.bin_dir()).expect("create bin dir");
        std::fs::write(path, bytes).expect("write artifact");
    }

    /// Write a file at `relative` under the root.
    ///
    /// # Panics
    ///
    /// If the file cannot be written.
    pub fn write_file(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.layout.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(&path, bytes).expect("write file");
        path
    }

    /// Staging files currently in `bin/`.
    #[must_use]
    pub fn staging_files(&self) -> Vec<String> {
        std::fs::read_dir(self.layout.bin_dir())
            .map(|entries| {
                entries
                    .filter_map(std::result::Result::ok)
                    .filter_map(|e| e.file_name().into_string().ok())
                    .filter(|name| InstallLayout::is_staging_file(name))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Sink that keeps every event.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    /// Shared empty sink.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Events seen so far.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Phase names seen so far, with consecutive duplicates collapsed.
    #[must_use]
    pub fn phases(&self) -> Vec<&'static str> {
        let mut phases: Vec<&'static str> = self.events().iter().map(LifecycleEvent::phase).collect();
        phases.dedup();
        phases
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: LifecycleEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Registrar with a fixed answer that records registration attempts.
#[derive(Debug, Default)]
pub struct StaticPathRegistrar {
    registered: Mutex<bool>,
}

impl StaticPathRegistrar {
    /// Registrar that starts registered or not.
    #[must_use]
    pub fn new(registered: bool) -> Self {
        Self {
            registered: Mutex::new(registered),
        }
    }
}

impl PathRegistrar for StaticPathRegistrar {
    fn is_registered(&self, _dir: &Path) -> bool {
        self.registered.lock().map(|r| *r).unwrap_or(false)
    }

    fn register(&self, _dir: &Path) -> Result<PathRegistration> {
        let mut registered = self.registered.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if *registered {
            return Ok(PathRegistration::AlreadyPresent);
        }
        *registered = true;
        Ok(PathRegistration::Added { profile: None })
    }
}
