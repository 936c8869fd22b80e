use crate::dashboard::config::{DashboardConfig, CARD_SETTINGS_FILE};
use siphasher::sip::SipHasher24;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// User-scoped storage for the dashboard layout.
pub trait SettingsPersistence: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<DashboardConfig>>;
    fn save(&self, config: &DashboardConfig) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

/// Layout stored as pretty JSON in a per-user directory.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<base>/<slug>-<digest>/card_settings.json`. The slug keeps the
    /// directory readable; the digest of the raw id keeps ids that slugify
    /// alike (`Alice`, `alice`) apart.
    pub fn for_user(base: impl AsRef<Path>, user_id: &str) -> Self {
        Self::new(base.as_ref().join(user_dir(user_id)).join(CARD_SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn user_dir(user_id: &str) -> String {
    let mut hasher = SipHasher24::new_with_keys(0, 0);
    hasher.write(user_id.as_bytes());
    let digest = hasher.finish();
    let slug = slug::slugify(user_id);
    if slug.is_empty() {
        format!("user-{digest:016x}")
    } else {
        format!("{slug}-{digest:016x}")
    }
}

impl SettingsPersistence for JsonFilePersistence {
    fn load(&self) -> anyhow::Result<Option<DashboardConfig>> {
        DashboardConfig::load(&self.path)
    }

    fn save(&self, config: &DashboardConfig) -> anyhow::Result<()> {
        config.save(&self.path)
    }

    fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    config: Option<DashboardConfig>,
    saves: usize,
}

/// In-process storage. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DashboardConfig) -> Self {
        let mem = Self::default();
        if let Ok(mut state) = mem.state.lock() {
            state.config = Some(config);
        }
        mem
    }

    pub fn stored(&self) -> Option<DashboardConfig> {
        self.state.lock().ok().and_then(|s| s.config.clone())
    }

    /// Number of completed `save` calls.
    pub fn save_count(&self) -> usize {
        self.state.lock().map(|s| s.saves).unwrap_or(0)
    }
}

impl SettingsPersistence for MemoryPersistence {
    fn load(&self) -> anyhow::Result<Option<DashboardConfig>> {
        let state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("memory persistence lock poisoned"))?;
        Ok(state.config.clone())
    }

    fn save(&self, config: &DashboardConfig) -> anyhow::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("memory persistence lock poisoned"))?;
        state.config = Some(config.clone());
        state.saves += 1;
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("memory persistence lock poisoned"))?;
        state.config = None;
        Ok(())
    }
}

enum WriteRequest {
    Save { seq: u64, config: DashboardConfig },
    Clear { seq: u64 },
    Flush(Sender<()>),
}

/// Single background writer. Requests are handled in the order they were
/// scheduled; a burst of queued writes collapses into the newest one.
pub struct PersistenceWriter {
    tx: Option<Sender<WriteRequest>>,
    handle: Option<JoinHandle<()>>,
}

impl PersistenceWriter {
    pub fn spawn(backend: Arc<dyn SettingsPersistence>) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("card-settings-writer".into())
            .spawn(move || writer_loop(backend, rx))?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Queue a save of `config`. `seq` must grow with every call.
    pub fn schedule(&self, seq: u64, config: DashboardConfig) {
        self.send(WriteRequest::Save { seq, config });
    }

    pub fn schedule_clear(&self, seq: u64) {
        self.send(WriteRequest::Clear { seq });
    }

    /// Block until everything scheduled so far has been written.
    pub fn flush(&self) {
        let (done_tx, done_rx) = mpsc::channel();
        self.send(WriteRequest::Flush(done_tx));
        let _ = done_rx.recv();
    }

    fn send(&self, request: WriteRequest) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(request).is_err() {
            tracing::error!("card settings writer is gone; write dropped");
        }
    }
}

impl Drop for PersistenceWriter {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("card settings writer panicked");
            }
        }
    }
}

fn writer_loop(backend: Arc<dyn SettingsPersistence>, rx: Receiver<WriteRequest>) {
    let mut last_seq: Option<u64> = None;
    while let Ok(first) = rx.recv() {
        let mut batch = vec![first];
        batch.extend(rx.try_iter());

        let mut pending = None;
        let mut waiters = Vec::new();
        for request in batch {
            match request {
                WriteRequest::Flush(done) => waiters.push(done),
                other => pending = Some(other),
            }
        }

        match pending {
            Some(WriteRequest::Save { seq, config }) if last_seq.map_or(true, |l| seq > l) => {
                if let Err(e) = backend.save(&config) {
                    tracing::error!(seq, "failed to save card settings: {e}");
                }
                last_seq = Some(seq);
            }
            Some(WriteRequest::Clear { seq }) if last_seq.map_or(true, |l| seq > l) => {
                if let Err(e) = backend.clear() {
                    tracing::error!(seq, "failed to clear card settings: {e}");
                }
                last_seq = Some(seq);
            }
            Some(WriteRequest::Save { seq, .. }) | Some(WriteRequest::Clear { seq }) => {
                tracing::debug!(seq, "stale card settings write skipped");
            }
            _ => {}
        }

        for done in waiters {
            let _ = done.send(());
        }
    }
}
