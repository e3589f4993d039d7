//! Persistence adapters for per-body timelines and live states.
//!
//! The simulation core never touches storage. Callers load the history and
//! the live body states through a [`TimelineStore`] before a run and store
//! the merged result and the final states afterwards. Timelines travel as
//! the JSON blob described in [`crate::simulation::timeline`], live states
//! as `{"t":..,"position":[..],"velocity":[..]}`.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::simulation::states::{BodyState, LiveStates, System};
use crate::simulation::timeline::{Timeline, Trajectories};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("timeline storage I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("stored record for {name:?} could not be decoded: {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("record for {name:?} could not be encoded: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("body name {0:?} cannot be used as a storage key")]
    InvalidName(String),
}

/// Load / store one timeline and one live state per body name.
pub trait TimelineStore {
    /// `Ok(None)` when nothing has been stored for `name` yet.
    fn load_timeline(&self, name: &str) -> Result<Option<Timeline>, StoreError>;

    fn store_timeline(&mut self, name: &str, timeline: &Timeline) -> Result<(), StoreError>;

    /// `Ok(None)` when no live state has been stored for `name` yet.
    fn load_state(&self, name: &str) -> Result<Option<BodyState>, StoreError>;

    fn store_state(&mut self, name: &str, state: &BodyState) -> Result<(), StoreError>;
}

/// History for every name in `names`. Missing or unreadable timelines come
/// back empty; I/O failures are still reported.
pub fn load_history<'a, S, I>(store: &S, names: I) -> Result<Trajectories, StoreError>
where
    S: TimelineStore + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let mut history = Trajectories::new();
    for name in names {
        let timeline = match store.load_timeline(name) {
            Ok(Some(t)) => t,
            Ok(None) => Timeline::new(),
            Err(StoreError::Malformed { name, source }) => {
                log::warn!("history for {name:?} is unreadable, starting empty: {source}");
                Timeline::new()
            }
            Err(e) => return Err(e),
        };
        history.insert(name, timeline);
    }
    Ok(history)
}

/// Store every timeline in `trajectories`.
pub fn store_history<S>(store: &mut S, trajectories: &Trajectories) -> Result<(), StoreError>
where
    S: TimelineStore + ?Sized,
{
    for (name, timeline) in trajectories.iter() {
        store.store_timeline(name, timeline)?;
        log::debug!("stored {} snapshots for {name}", timeline.len());
    }
    Ok(())
}

/// Live states for every name in `names` that has one. Unreadable states
/// are skipped with a warning.
pub fn load_states<'a, S, I>(store: &S, names: I) -> Result<LiveStates, StoreError>
where
    S: TimelineStore + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let mut states = LiveStates::new();
    for name in names {
        match store.load_state(name) {
            Ok(Some(state)) => {
                states.insert(name.to_owned(), state);
            }
            Ok(None) => {}
            Err(StoreError::Malformed { name, source }) => {
                log::warn!("live state for {name:?} is unreadable, ignoring it: {source}");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(states)
}

/// Store the live state of every body in `sys`, stamped with `sys.t`.
pub fn store_states<S>(store: &mut S, sys: &System) -> Result<(), StoreError>
where
    S: TimelineStore + ?Sized,
{
    for (name, state) in sys.live_states() {
        store.store_state(&name, &state)?;
    }
    log::debug!("stored live states of {} bodies at t = {}", sys.bodies.len(), sys.t);
    Ok(())
}

fn decode<T: serde::de::DeserializeOwned>(name: &str, blob: &str) -> Result<Option<T>, StoreError> {
    if blob.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(blob)
        .map(Some)
        .map_err(|source| StoreError::Malformed {
            name: name.to_owned(),
            source,
        })
}

fn encode<T: serde::Serialize>(name: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Encode {
        name: name.to_owned(),
        source,
    })
}

/// Blobs kept in memory, keyed by body name.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, String>,
    states: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw blob for `name`, as it would sit in a text column.
    pub fn blob(&self, name: &str) -> Option<&str> {
        self.blobs.get(name).map(String::as_str)
    }

    pub fn put_blob(&mut self, name: impl Into<String>, blob: impl Into<String>) {
        self.blobs.insert(name.into(), blob.into());
    }

    /// Raw live-state record for `name`.
    pub fn state_blob(&self, name: &str) -> Option<&str> {
        self.states.get(name).map(String::as_str)
    }

    pub fn put_state_blob(&mut self, name: impl Into<String>, blob: impl Into<String>) {
        self.states.insert(name.into(), blob.into());
    }
}

impl TimelineStore for MemoryStore {
    fn load_timeline(&self, name: &str) -> Result<Option<Timeline>, StoreError> {
        match self.blobs.get(name) {
            None => Ok(None),
            Some(blob) => decode(name, blob),
        }
    }

    fn store_timeline(&mut self, name: &str, timeline: &Timeline) -> Result<(), StoreError> {
        let blob = encode(name, timeline)?;
        self.blobs.insert(name.to_owned(), blob);
        Ok(())
    }

    fn load_state(&self, name: &str) -> Result<Option<BodyState>, StoreError> {
        match self.states.get(name) {
            None => Ok(None),
            Some(blob) => decode(name, blob),
        }
    }

    fn store_state(&mut self, name: &str, state: &BodyState) -> Result<(), StoreError> {
        let blob = encode(name, state)?;
        self.states.insert(name.to_owned(), blob);
        Ok(())
    }
}

/// One `<name>.json` timeline per body inside a directory, live states as
/// `state/<name>.json` next to them.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open `root`, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join("state")).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        let bad = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);
        if bad {
            return Err(StoreError::InvalidName(name.to_owned()));
        }
        Ok(self.root.join(format!("{name}.json")))
    }

    fn state_path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        self.path_for(name)?;
        Ok(self.root.join("state").join(format!("{name}.json")))
    }

    fn read(&self, path: PathBuf) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn write(&self, path: PathBuf, blob: String) -> Result<(), StoreError> {
        // atomic replace
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, blob).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }
}

impl TimelineStore for DirectoryStore {
    fn load_timeline(&self, name: &str) -> Result<Option<Timeline>, StoreError> {
        match self.read(self.path_for(name)?)? {
            Some(blob) => decode(name, &blob),
            None => Ok(None),
        }
    }

    fn store_timeline(&mut self, name: &str, timeline: &Timeline) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        self.write(path, encode(name, timeline)?)
    }

    fn load_state(&self, name: &str) -> Result<Option<BodyState>, StoreError> {
        match self.read(self.state_path_for(name)?)? {
            Some(blob) => decode(name, &blob),
            None => Ok(None),
        }
    }

    fn store_state(&mut self, name: &str, state: &BodyState) -> Result<(), StoreError> {
        let path = self.state_path_for(name)?;
        self.write(path, encode(name, state)?)
    }
}
