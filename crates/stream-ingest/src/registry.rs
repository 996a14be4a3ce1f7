// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Persistent stream registry.
//!
//! The registry is a single JSON document mapping system id to
//! [`SystemProfile`], plus one shared `last_updated` field. Saving is a
//! read-modify-write of the whole document: only the saved system's entry is
//! replaced, every other entry is written back exactly as it was read.
//!
//! There is no locking. Two processes saving to the same file at the same
//! time can lose one of the updates.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use log::{debug, warn};
use serde_json::{Map, Value};

use crate::error::{IngestError, IngestResult};
use crate::model::SystemProfile;

/// Name of the shared timestamp field at the top of the document.
pub const LAST_UPDATED_FIELD: &str = "last_updated";

/// File-backed registry of system profiles.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every system profile. A missing file is an empty registry.
    ///
    /// Entries that do not decode as a profile are skipped here but kept on
    /// disk by [`Self::merge_and_save`].
    pub fn load(&self) -> IngestResult<BTreeMap<String, SystemProfile>> {
        let document = self.read_document()?;
        let mut systems = BTreeMap::new();

        for (system_id, entry) in document {
            if system_id == LAST_UPDATED_FIELD {
                continue;
            }
            match serde_json::from_value::<SystemProfile>(entry) {
                Ok(profile) => {
                    systems.insert(system_id, profile);
                }
                Err(e) => warn!("Skipping registry entry '{system_id}': {e}"),
            }
        }

        Ok(systems)
    }

    /// The shared last-updated timestamp, if the registry has one.
    pub fn last_updated(&self) -> IngestResult<Option<String>> {
        Ok(self
            .read_document()?
            .get(LAST_UPDATED_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Replace the entry for `system_id`, refresh `last_updated`, and write
    /// the whole document back.
    ///
    /// The new document is written to a temporary file next to the registry
    /// and renamed into place, so readers see either the old or the new file.
    pub fn merge_and_save(&self, system_id: &str, profile: &SystemProfile) -> IngestResult<()> {
        let mut document = self.read_document()?;

        let entry = serde_json::to_value(profile).map_err(|source| IngestError::Registry {
            path: self.path.clone(),
            source,
        })?;
        document.insert(system_id.to_string(), entry);
        document.insert(
            LAST_UPDATED_FIELD.to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        self.write_document(&document)?;
        debug!(
            "Saved {} streams for {system_id} to {}",
            profile.total_streams,
            self.path.display()
        );
        Ok(())
    }

    fn read_document(&self) -> IngestResult<Map<String, Value>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(IngestError::io(&self.path, e)),
        };

        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&contents).map_err(|source| IngestError::Registry {
            path: self.path.clone(),
            source,
        })
    }

    fn write_document(&self, document: &Map<String, Value>) -> IngestResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| IngestError::io(&dir, e))?;

        let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(|e| IngestError::io(&dir, e))?;
        serde_json::to_writer_pretty(&mut file, document).map_err(|source| {
            IngestError::Registry {
                path: self.path.clone(),
                source,
            }
        })?;
        file.write_all(b"\n")
            .and_then(|()| file.as_file().sync_all())
            .map_err(|e| IngestError::io(file.path(), e))?;

        file.persist(&self.path)
            .map_err(|e| IngestError::io(&self.path, e.error))?;
        Ok(())
    }
}

/// Load the registry at `path`.
pub fn load(path: impl AsRef<Path>) -> IngestResult<BTreeMap<String, SystemProfile>> {
    RegistryStore::new(path.as_ref()).load()
}

/// Merge one system profile into the registry at `path`.
pub fn merge_and_save(
    path: impl AsRef<Path>,
    system_id: &str,
    profile: &SystemProfile,
) -> IngestResult<()> {
    RegistryStore::new(path.as_ref()).merge_and_save(system_id, profile)
}
