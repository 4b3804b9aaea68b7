use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Suffix shared by every snapshot file in a state directory.
pub const STATE_FILE_SUFFIX: &str = ".state.cb";

/// Separator between the device name and the state name in a snapshot filename.
pub const DEVICE_STATE_SEPARATOR: &str = "--";

/// Errors raised while looking up or persisting recorded device states.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No snapshot has been recorded under this name for the device.
    #[error("No such state: {0}")]
    NoSuchState(String),

    /// The state name cannot be encoded into a snapshot filename that
    /// decodes back to the same name.
    #[error("Invalid state name {name:?}: {reason}")]
    InvalidStateName { name: String, reason: &'static str },

    /// An I/O error occurred while accessing the state directory.
    /// Contains a string describing the underlying I/O error.
    #[error("State store I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Builds the snapshot filename for `state_name` of `device_name`.
///
/// Example: `("base", "r1")` -> `r1--base.state.cb`.
pub fn state_name_to_filename(state_name: &str, device_name: &str) -> String {
    format!("{device_name}{DEVICE_STATE_SEPARATOR}{state_name}{STATE_FILE_SUFFIX}")
}

/// Recovers the state name from a snapshot filename built by [`state_name_to_filename`].
///
/// Returns `None` when the file does not belong to `device_name`.
pub fn state_filename_to_name<'a>(filename: &'a str, device_name: &str) -> Option<&'a str> {
    filename
        .strip_prefix(device_name)?
        .strip_prefix(DEVICE_STATE_SEPARATOR)?
        .strip_suffix(STATE_FILE_SUFFIX)
}

/// Checks that a state name survives the filename round trip.
pub fn validate_state_name(state_name: &str) -> Result<(), StoreError> {
    let reason = if state_name.is_empty() {
        Some("name is empty")
    } else if state_name.contains(DEVICE_STATE_SEPARATOR) {
        Some("name contains '--'")
    } else if state_name.contains(['/', '\\']) {
        Some("name contains a path separator")
    } else if state_name.ends_with(STATE_FILE_SUFFIX) {
        Some("name ends with the reserved snapshot suffix")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(StoreError::InvalidStateName {
            name: state_name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Persistent collection of recorded configuration snapshots, keyed by
/// device and state name.
///
/// The exploration engine only ever lists states; recording and deleting
/// are driven by the action surface.
pub trait StateStore: Send + Sync {
    /// Returns the names of every state recorded for `device`, sorted.
    ///
    /// # Returns
    /// The state names (not filenames), or a [`StoreError::Io`] if the store
    /// cannot be read. A device with nothing recorded gives an empty list.
    fn list_states(&self, device: &str) -> Result<Vec<String>, StoreError>;

    /// Returns the location of the snapshot for `state` of `device`.
    ///
    /// Fails with [`StoreError::NoSuchState`] when nothing is recorded under that name.
    fn snapshot_path(&self, device: &str, state: &str) -> Result<PathBuf, StoreError>;

    /// Removes the snapshot for `state` of `device`.
    ///
    /// Fails with [`StoreError::NoSuchState`] when nothing is recorded under that name.
    fn delete_state(&mut self, device: &str, state: &str) -> Result<(), StoreError>;

    /// Stores `snapshot` as `state` of `device`, replacing any previous snapshot
    /// with the same name.
    ///
    /// # Arguments
    /// * `device`: Name of the managed device.
    /// * `state`: New state name. Must pass [`validate_state_name`].
    /// * `snapshot`: The configuration bytes, stored as-is.
    ///
    /// # Returns
    /// The path of the written snapshot, [`StoreError::InvalidStateName`] for a
    /// name that would not round-trip through its filename, or [`StoreError::Io`].
    fn record_state(
        &mut self,
        device: &str,
        state: &str,
        snapshot: &[u8],
    ) -> Result<PathBuf, StoreError>;
}

/// A [`StateStore`] keeping one `{device}--{state}.state.cb` file per state
/// in a single shared directory.
#[derive(Debug, Clone)]
pub struct DirStateStore {
    states_dir: PathBuf,
}

impl DirStateStore {
    /// Opens the state directory, creating it if it does not exist yet.
    pub fn new(states_dir: PathBuf) -> Result<Self, StoreError> {
        if !states_dir.exists() {
            fs::create_dir_all(&states_dir).map_err(|e| {
                StoreError::Io(format!(
                    "Failed to create state directory at {:?}: {}",
                    states_dir, e
                ))
            })?;
        } else if !states_dir.is_dir() {
            return Err(StoreError::Io(format!(
                "State path {:?} exists but is not a directory",
                states_dir
            )));
        }
        Ok(Self { states_dir })
    }

    pub fn states_dir(&self) -> &Path {
        &self.states_dir
    }

    fn state_file_path(&self, device: &str, state: &str) -> PathBuf {
        self.states_dir.join(state_name_to_filename(state, device))
    }
}

impl StateStore for DirStateStore {
    fn list_states(&self, device: &str) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.states_dir).map_err(|e| {
            StoreError::Io(format!(
                "Failed to read state directory {:?}: {}",
                self.states_dir, e
            ))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = state_filename_to_name(file_name, device) {
                names.push(name.to_string());
            }
        }
        names.sort();
        debug!(device, count = names.len(), "listed recorded states");
        Ok(names)
    }

    fn snapshot_path(&self, device: &str, state: &str) -> Result<PathBuf, StoreError> {
        let path = self.state_file_path(device, state);
        if path.is_file() {
            Ok(path)
        } else {
            Err(StoreError::NoSuchState(state.to_string()))
        }
    }

    fn delete_state(&mut self, device: &str, state: &str) -> Result<(), StoreError> {
        let path = self.state_file_path(device, state);
        fs::remove_file(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NoSuchState(state.to_string()),
            _ => StoreError::Io(format!("Failed to delete {:?}: {}", path, e)),
        })?;
        debug!(device, state, "deleted state");
        Ok(())
    }

    fn record_state(
        &mut self,
        device: &str,
        state: &str,
        snapshot: &[u8],
    ) -> Result<PathBuf, StoreError> {
        validate_state_name(state)?;
        let path = self.state_file_path(device, state);

        // Written next to the target so the rename stays on one filesystem.
        let mut staged = tempfile::NamedTempFile::new_in(&self.states_dir)?;
        staged.write_all(snapshot)?;
        staged.flush()?;
        staged.persist(&path).map_err(|e| {
            StoreError::Io(format!("Failed to persist snapshot {:?}: {}", path, e))
        })?;
        debug!(device, state, bytes = snapshot.len(), "recorded state");
        Ok(path)
    }
}
