//! Feed file watcher
//!
//! Watches a directory of JSON feed files (agent port listing, IoT device
//! listing, sketch metadata) and republishes each file into a [`FeedHub`]
//! when it changes. Touching a file without changing it re-emits the feed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult};

use boardlink_core::prelude::*;
use boardlink_core::SketchMetadata;
use boardlink_feeds::{parse_agent_ports, parse_iot_devices, FeedHub};

use crate::config::WatchSettings;

/// Default debounce duration in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Which feed a file carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFile {
    Ports,
    Iot,
    Sketch,
}

/// Configuration for the feed watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub ports_file: String,
    pub iot_file: String,
    pub sketch_file: String,
    pub debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self::from_settings(&WatchSettings::default())
    }
}

impl WatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &WatchSettings) -> Self {
        Self {
            ports_file: settings.ports_file.clone(),
            iot_file: settings.iot_file.clone(),
            sketch_file: settings.sketch_file.clone(),
            debounce: Duration::from_millis(settings.debounce_ms),
        }
    }

    /// Set debounce duration in milliseconds
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce = Duration::from_millis(ms);
        self
    }

    /// Feed carried by a file name, if any
    pub fn classify(&self, path: &Path) -> Option<FeedFile> {
        let name = path.file_name()?.to_str()?;
        if name == self.ports_file {
            Some(FeedFile::Ports)
        } else if name == self.iot_file {
            Some(FeedFile::Iot)
        } else if name == self.sketch_file {
            Some(FeedFile::Sketch)
        } else {
            None
        }
    }

    fn files(&self) -> [(FeedFile, &str); 3] {
        [
            (FeedFile::Ports, self.ports_file.as_str()),
            (FeedFile::Iot, self.iot_file.as_str()),
            (FeedFile::Sketch, self.sketch_file.as_str()),
        ]
    }
}

/// Read one feed file and publish its content
///
/// A missing sketch file publishes "still loading"; other missing files
/// are skipped.
pub fn load_feed_file(kind: FeedFile, path: &Path, hub: &FeedHub) -> Result<()> {
    if !path.exists() {
        if kind == FeedFile::Sketch {
            hub.publish_metadata(None);
        }
        debug!("Feed file {} not present", path.display());
        return Ok(());
    }

    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read feed file {}", path.display()))?;

    match kind {
        FeedFile::Ports => hub.publish_port_snapshot(parse_agent_ports(&content)?),
        FeedFile::Iot => hub.publish_iot(parse_iot_devices(&content)?),
        FeedFile::Sketch => {
            let metadata: SketchMetadata = serde_json::from_str(&content)?;
            hub.publish_metadata(Some(metadata));
        }
    }
    trace!("Published {:?} feed from {}", kind, path.display());
    Ok(())
}

/// Watches a feed directory and publishes into a hub
pub struct FeedWatcher {
    feed_dir: PathBuf,
    config: WatcherConfig,
    hub: Arc<FeedHub>,
    /// Handle to stop the watcher
    stop_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FeedWatcher {
    pub fn new(feed_dir: PathBuf, config: WatcherConfig, hub: Arc<FeedHub>) -> Self {
        Self {
            feed_dir,
            config,
            hub,
            stop_tx: None,
        }
    }

    /// Publish every feed file once; unreadable files are logged and skipped
    pub fn load_all(&self) {
        for (kind, file) in self.config.files() {
            let path = self.feed_dir.join(file);
            if let Err(e) = load_feed_file(kind, &path, &self.hub) {
                warn!("Skipping {}: {}", path.display(), e);
            }
        }
    }

    /// Start watching for feed file changes
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(Error::watcher("Watcher is already running"));
        }
        if !self.feed_dir.is_dir() {
            return Err(Error::watcher(format!(
                "Feed directory does not exist: {}",
                self.feed_dir.display()
            )));
        }

        let feed_dir = self.feed_dir.clone();
        let config = self.config.clone();
        let hub = self.hub.clone();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();

        self.stop_tx = Some(stop_tx);

        tokio::task::spawn_blocking(move || {
            Self::run_watcher(feed_dir, config, hub, stop_rx);
        });

        Ok(())
    }

    /// Stop the feed watcher
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }

    fn run_watcher(
        feed_dir: PathBuf,
        config: WatcherConfig,
        hub: Arc<FeedHub>,
        mut stop_rx: tokio::sync::oneshot::Receiver<()>,
    ) {
        let handler_config = config.clone();

        let debouncer_result = new_debouncer(
            config.debounce,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let mut changed: Vec<(FeedFile, PathBuf)> = Vec::new();
                    for path in events.iter().flat_map(|event| event.paths.iter()) {
                        if let Some(kind) = handler_config.classify(path) {
                            if !changed.iter().any(|(k, _)| *k == kind) {
                                changed.push((kind, path.clone()));
                            }
                        }
                    }

                    for (kind, path) in changed {
                        debug!("Feed file changed: {}", path.display());
                        if let Err(e) = load_feed_file(kind, &path, &hub) {
                            warn!("Failed to load {}: {}", path.display(), e);
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        warn!("Feed watcher error: {:?}", error);
                    }
                }
            },
        );

        let mut debouncer = match debouncer_result {
            Ok(d) => d,
            Err(e) => {
                error!("Failed to create feed watcher: {}", e);
                return;
            }
        };

        if let Err(e) = debouncer.watch(&feed_dir, RecursiveMode::NonRecursive) {
            error!("Failed to watch {}: {}", feed_dir.display(), e);
            return;
        }
        info!("Watching feeds in {}", feed_dir.display());

        loop {
            match stop_rx.try_recv() {
                Ok(()) | Err(tokio::sync::oneshot::error::TryRecvError::Closed) => {
                    info!("Feed watcher stopping");
                    break;
                }
                Err(tokio::sync::oneshot::error::TryRecvError::Empty) => {
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }
    }
}

impl Drop for FeedWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTS_JSON: &str = r#"[
        {
            "portName": "/dev/cu.usbmodem21201",
            "productId": "0x0043",
            "vendorId": "0x2341",
            "serialNumber": "954323132383515092E1",
            "isOpen": true,
            "board": { "fqbn": "arduino:avr:uno", "name": "Arduino Uno" }
        }
    ]"#;

    #[test]
    fn test_watcher_config_default() {
        let config = WatcherConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(DEFAULT_DEBOUNCE_MS));
        assert_eq!(config.ports_file, "ports.json");
    }

    #[test]
    fn test_watcher_config_builder() {
        let config = WatcherConfig::new().with_debounce_ms(1000);
        assert_eq!(config.debounce, Duration::from_millis(1000));
    }

    #[test]
    fn test_classify() {
        let config = WatcherConfig::default();
        assert_eq!(config.classify(Path::new("/feeds/ports.json")), Some(FeedFile::Ports));
        assert_eq!(config.classify(Path::new("/feeds/iot.json")), Some(FeedFile::Iot));
        assert_eq!(config.classify(Path::new("sketch.json")), Some(FeedFile::Sketch));
        assert_eq!(config.classify(Path::new("/feeds/notes.txt")), None);
    }

    #[test]
    fn test_load_ports_publishes_devices_and_busy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ports.json");
        std::fs::write(&path, PORTS_JSON).unwrap();
        let hub = FeedHub::new();
        let mut rx = hub.subscribe();

        load_feed_file(FeedFile::Ports, &path, &hub).unwrap();

        assert_eq!(hub.ports().len(), 1);
        assert_eq!(hub.ports()[0].fqbn.as_deref(), Some("arduino:avr:uno"));
        assert_eq!(rx.busy.borrow_and_update().len(), 1);
    }

    #[test]
    fn test_load_sketch_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sketch.json");
        std::fs::write(&path, r#"{"fqbn": "arduino:avr:uno", "boardName": "Arduino Uno"}"#)
            .unwrap();
        let hub = FeedHub::new();

        load_feed_file(FeedFile::Sketch, &path, &hub).unwrap();

        let metadata = hub.metadata().unwrap();
        assert_eq!(metadata.fqbn.as_deref(), Some("arduino:avr:uno"));
        assert_eq!(metadata.board_name.as_deref(), Some("Arduino Uno"));
    }

    #[test]
    fn test_missing_sketch_file_means_loading() {
        let dir = tempfile::tempdir().unwrap();
        let hub = FeedHub::new();
        hub.publish_metadata(Some(SketchMetadata::default()));

        load_feed_file(FeedFile::Sketch, &dir.path().join("sketch.json"), &hub).unwrap();

        assert!(hub.metadata().is_none());
    }

    #[test]
    fn test_invalid_iot_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iot.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(load_feed_file(FeedFile::Iot, &path, &FeedHub::new()).is_err());
    }

    #[tokio::test]
    async fn test_watcher_missing_dir_error() {
        let mut watcher = FeedWatcher::new(
            PathBuf::from("/nonexistent/boardlink/feeds"),
            WatcherConfig::default(),
            Arc::new(FeedHub::new()),
        );
        assert!(watcher.start().is_err());
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_watcher_double_start_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = FeedWatcher::new(
            dir.path().to_path_buf(),
            WatcherConfig::default(),
            Arc::new(FeedHub::new()),
        );

        assert!(watcher.start().is_ok());
        assert!(watcher.is_running());
        assert!(watcher.start().is_err());

        watcher.stop();
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_watcher_publishes_changes() {
        let dir = tempfile::tempdir().unwrap();
        let hub = Arc::new(FeedHub::new());
        let mut rx = hub.subscribe();
        let mut watcher = FeedWatcher::new(
            dir.path().to_path_buf(),
            WatcherConfig::new().with_debounce_ms(50),
            hub.clone(),
        );
        watcher.start().unwrap();
        // Give the blocking watcher time to register
        tokio::time::sleep(Duration::from_millis(200)).await;

        std::fs::write(dir.path().join("ports.json"), PORTS_JSON).unwrap();

        tokio::time::timeout(Duration::from_secs(5), rx.ports.changed())
            .await
            .expect("ports should be republished")
            .unwrap();
        assert_eq!(rx.ports.borrow_and_update().len(), 1);
        watcher.stop();
    }
}
