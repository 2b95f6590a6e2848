//! Sharded YAML record storage.
//!
//! Each record is one YAML document at `<records_dir>/<s1>/<s2>/<id>/record.yaml`. Writes go
//! to a uniquely named temporary file in the record directory and are renamed over the
//! document, so readers see either the old or the new record. A save holds an exclusive
//! advisory lock on `<id>/.record.lock` across the version check and the rename; the lock is
//! taken through the filesystem, so separate processes sharing a data directory (the REST
//! server and the CLI) exclude each other too.

use super::{check_version, RecordRepository};
use crate::constants::{RECORD_FILENAME, RECORD_LOCK_FILENAME, RECORD_TMP_PREFIX};
use crate::{CoreConfig, CoreError, CoreResult, RecordId};
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use workflow::EncounterRecord;

#[derive(Clone, Debug)]
pub struct FileRepository {
    records_dir: PathBuf,
}

/// Exclusive lock on one record directory, released when dropped.
struct RecordLock {
    _file: File,
}

impl RecordLock {
    fn acquire(record_dir: &Path) -> CoreResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(record_dir.join(RECORD_LOCK_FILENAME))
            .map_err(CoreError::RecordLock)?;
        file.lock_exclusive().map_err(CoreError::RecordLock)?;
        Ok(Self { _file: file })
    }
}

impl FileRepository {
    pub fn new(records_dir: PathBuf) -> Self {
        Self { records_dir }
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self::new(cfg.records_dir())
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    fn read_record(path: &Path) -> CoreResult<EncounterRecord> {
        let contents = fs::read_to_string(path).map_err(CoreError::FileRead)?;
        serde_yaml::from_str(&contents).map_err(CoreError::YamlDeserialization)
    }

    fn write_record(dir: &Path, record: &EncounterRecord) -> CoreResult<()> {
        let yaml = serde_yaml::to_string(record).map_err(CoreError::YamlSerialization)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(RECORD_TMP_PREFIX)
            .tempfile_in(dir)
            .map_err(CoreError::FileWrite)?;
        tmp.write_all(yaml.as_bytes())
            .map_err(CoreError::FileWrite)?;
        tmp.persist(dir.join(RECORD_FILENAME))
            .map_err(|e| CoreError::FileWrite(e.error))?;
        Ok(())
    }
}

/// Runs `write` against a freshly created record directory, removing the directory again if
/// it fails so the id is not left permanently taken by an empty directory.
fn populate_new_dir(dir: &Path, write: impl FnOnce(&Path) -> CoreResult<()>) -> CoreResult<()> {
    match write(dir) {
        Ok(()) => Ok(()),
        Err(err) => {
            if let Err(cleanup) = fs::remove_dir_all(dir) {
                tracing::warn!(
                    path = %dir.display(),
                    error = %cleanup,
                    "failed to remove incomplete record directory"
                );
            }
            Err(err)
        }
    }
}

impl RecordRepository for FileRepository {
    fn insert(&self, record: EncounterRecord) -> CoreResult<EncounterRecord> {
        let id = RecordId::from(record.id());
        let dir = id.sharded_dir(&self.records_dir);

        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent).map_err(CoreError::StorageDirCreation)?;
        }
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(CoreError::AlreadyExists(id.to_string()));
            }
            Err(e) => return Err(CoreError::StorageDirCreation(e)),
        }

        let stored = record.with_version(1);
        populate_new_dir(&dir, |dir| Self::write_record(dir, &stored))?;
        tracing::debug!(record_id = %id, path = %dir.display(), "record stored");
        Ok(stored)
    }

    fn load(&self, id: &RecordId) -> CoreResult<EncounterRecord> {
        let path = id.sharded_dir(&self.records_dir).join(RECORD_FILENAME);
        if !path.is_file() {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Self::read_record(&path)
    }

    fn save(&self, record: EncounterRecord) -> CoreResult<EncounterRecord> {
        let id = RecordId::from(record.id());
        let dir = id.sharded_dir(&self.records_dir);
        if !dir.join(RECORD_FILENAME).is_file() {
            return Err(CoreError::NotFound(id.to_string()));
        }

        let _lock = RecordLock::acquire(&dir)?;
        let current = self.load(&id)?;
        check_version(&id, current.version(), record.version())?;

        let next = record.version() + 1;
        let stored = record.with_version(next);
        Self::write_record(&dir, &stored)?;
        tracing::debug!(record_id = %id, version = next, "record saved");
        Ok(stored)
    }

    fn list(&self) -> CoreResult<Vec<EncounterRecord>> {
        let mut records = Vec::new();

        let s1_iter = match fs::read_dir(&self.records_dir) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(CoreError::FileRead(e)),
        };

        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }
            let Ok(s2_iter) = fs::read_dir(&s1_path) else {
                continue;
            };

            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }
                let Ok(id_iter) = fs::read_dir(&s2_path) else {
                    continue;
                };

                for id_ent in id_iter.flatten() {
                    let record_path = id_ent.path().join(RECORD_FILENAME);
                    if !record_path.is_file() {
                        continue;
                    }
                    match Self::read_record(&record_path) {
                        Ok(record) => records.push(record),
                        Err(e) => {
                            tracing::warn!(
                                path = %record_path.display(),
                                error = %e,
                                "skipping unreadable record"
                            );
                        }
                    }
                }
            }
        }

        Ok(records)
    }
}
