//! File loaders for policies, runtime settings, and the kill switch.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use hitl_kernel::{KillSwitchSource, KillSwitchState, Versioned};
use hitl_policy::PolicyBook;
use hitl_primitives::AgentId;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::defaults::builtin_policy_book;
use crate::error::{ConfigError, ConfigResult};
use crate::schema::{PolicyFile, RuntimeConfig};

/// Reads and deserializes a JSON file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    let raw = fs::read_to_string(path).map_err(|err| ConfigError::io(path, err))?;
    serde_json::from_str(&raw).map_err(|err| ConfigError::parse(path, err))
}

/// Writes `value` as pretty JSON through a temporary file and a rename, so
/// readers never observe a half-written file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the directory or file cannot be written.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| ConfigError::io(parent, err))?;
    }
    let mut json = serde_json::to_vec_pretty(value)?;
    json.push(b'\n');
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).map_err(|err| ConfigError::io(&tmp, err))?;
    fs::rename(&tmp, path).map_err(|err| ConfigError::io(path, err))
}

/// Parses a policy file held in memory.
///
/// # Errors
///
/// Returns [`ConfigError::Json`] for malformed JSON and
/// [`ConfigError::InvalidPolicy`] for structurally invalid policies.
pub fn parse_policy_book(json: &str) -> ConfigResult<PolicyBook> {
    let file: PolicyFile = serde_json::from_str(json)?;
    file.into_book()
}

/// Loads and validates a policy file.
///
/// # Errors
///
/// Returns an error when the file is unreadable, malformed, or contains an
/// invalid policy. Nothing is loaded partially.
pub fn load_policy_book(path: &Path) -> ConfigResult<PolicyBook> {
    let file: PolicyFile = read_json(path)?;
    let book = file.into_book()?;
    info!(
        path = %path.display(),
        version = book.version(),
        agents = book.len(),
        "policy book loaded"
    );
    Ok(book)
}

/// Loads `path` when given, otherwise the built-in policies.
///
/// # Errors
///
/// Propagates [`load_policy_book`] errors.
pub fn load_policy_book_or_builtin(path: Option<&Path>) -> ConfigResult<PolicyBook> {
    match path {
        Some(path) => load_policy_book(path),
        None => {
            debug!("no policy file configured; using built-in policies");
            Ok(builtin_policy_book()?)
        }
    }
}

impl RuntimeConfig {
    /// Loads runtime settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> ConfigResult<Self> {
        read_json(path)
    }

    /// Loads the configured policy file, or the built-in policies.
    ///
    /// # Errors
    ///
    /// Propagates [`load_policy_book`] errors.
    pub fn policy_book(&self) -> ConfigResult<PolicyBook> {
        load_policy_book_or_builtin(self.policy_path.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    fn of(metadata: &fs::Metadata) -> Self {
        Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        }
    }
}

#[derive(Debug)]
struct Cached {
    stamp: Option<FileStamp>,
    snapshot: Arc<Versioned<KillSwitchState>>,
}

impl Cached {
    /// Publishes `state` unless it equals the cached value.
    fn publish(&mut self, stamp: Option<FileStamp>, state: KillSwitchState) {
        self.stamp = stamp;
        if *self.snapshot.value() != state {
            let version = self.snapshot.version() + 1;
            self.snapshot = Arc::new(Versioned::new(version, state));
        }
    }
}

/// Kill switch persisted as JSON on disk.
///
/// The file is re-read only when its modification stamp changes. A missing
/// file means everything is enabled; an unparseable file keeps the last good
/// state.
#[derive(Debug)]
pub struct FileKillSwitch {
    path: PathBuf,
    cache: Mutex<Cached>,
}

impl FileKillSwitch {
    /// Creates a kill switch backed by `path`. Nothing is read until the
    /// first snapshot.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(Cached {
                stamp: None,
                snapshot: Arc::new(Versioned::new(0, KillSwitchState::all_enabled())),
            }),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Enables or disables every agent and persists the change.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be written.
    pub fn set_global_enabled(&self, enabled: bool) -> ConfigResult<u64> {
        let version = self.modify(|state| state.set_global_enabled(enabled))?;
        info!(enabled, version, path = %self.path.display(), "global kill switch updated");
        Ok(version)
    }

    /// Enables or disables one agent and persists the change.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be written.
    pub fn set_agent_enabled(&self, agent: &AgentId, enabled: bool) -> ConfigResult<u64> {
        let version = self.modify(|state| state.set_agent_enabled(agent.clone(), enabled))?;
        info!(agent = %agent, enabled, version, path = %self.path.display(), "agent kill switch updated");
        Ok(version)
    }

    fn modify<F>(&self, change: F) -> ConfigResult<u64>
    where
        F: FnOnce(&mut KillSwitchState),
    {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        self.refresh(&mut cache);

        let mut state = cache.snapshot.value().clone();
        change(&mut state);
        write_json_atomic(&self.path, &state)?;

        let stamp = fs::metadata(&self.path).ok().map(|meta| FileStamp::of(&meta));
        cache.publish(stamp, state);
        Ok(cache.snapshot.version())
    }

    fn refresh(&self, cache: &mut Cached) {
        let metadata = match fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                cache.publish(None, KillSwitchState::all_enabled());
                return;
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "kill switch unreadable; keeping last state");
                return;
            }
        };

        let stamp = FileStamp::of(&metadata);
        if cache.stamp == Some(stamp) {
            return;
        }

        match read_kill_switch(&self.path) {
            Ok(state) => {
                debug!(path = %self.path.display(), "kill switch file reloaded");
                cache.publish(Some(stamp), state);
            }
            Err(err) => {
                warn!(error = %err, "kill switch file rejected; keeping last good state");
                cache.stamp = Some(stamp);
            }
        }
    }
}

fn read_kill_switch(path: &Path) -> ConfigResult<KillSwitchState> {
    let raw = fs::read_to_string(path).map_err(|err| ConfigError::io(path, err))?;
    if raw.trim().is_empty() {
        return Ok(KillSwitchState::all_enabled());
    }
    serde_json::from_str(&raw).map_err(|err| ConfigError::parse(path, err))
}

impl KillSwitchSource for FileKillSwitch {
    fn snapshot(&self) -> Arc<Versioned<KillSwitchState>> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        self.refresh(&mut cache);
        Arc::clone(&cache.snapshot)
    }
}
