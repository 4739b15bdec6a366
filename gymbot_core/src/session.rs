//! Durable per-user conversation state with file locking.
//!
//! Every in-progress flow is persisted whole after each step so a bot
//! restart lands the user exactly where they left off. One JSON file per
//! user under `<data_dir>/sessions/`.

use crate::{Error, Result, Session};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File-backed session store, keyed by user id
#[derive(Clone, Debug)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Open a store rooted at `dir`, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, user_id: i64) -> PathBuf {
        self.dir.join(format!("{}.json", user_id))
    }

    /// Load the user's draft, if any.
    ///
    /// Unlike reference-data reads, a present-but-unreadable session file is
    /// a fatal `Error::Store`: falling back to an empty draft would silently
    /// restart the conversation.
    pub fn get(&self, user_id: i64) -> Result<Option<Session>> {
        let path = self.path_for(user_id);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)
            .map_err(|e| Error::Store(format!("open {:?}: {}", path, e)))?;
        file.lock_shared()
            .map_err(|e| Error::Store(format!("lock {:?}: {}", path, e)))?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        let read = reader.read_to_string(&mut contents);
        let _ = file.unlock();
        read.map_err(|e| Error::Store(format!("read {:?}: {}", path, e)))?;

        let session = serde_json::from_str::<Session>(&contents)
            .map_err(|e| Error::Store(format!("parse {:?}: {}", path, e)))?;

        tracing::debug!("Loaded session for user {}", user_id);
        Ok(Some(session))
    }

    /// Overwrite the user's entire draft.
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn set(&self, user_id: i64, session: &Session) -> Result<()> {
        let path = self.path_for(user_id);
        self.write_atomic(&path, session)
            .map_err(|e| Error::Store(format!("write {:?}: {}", path, e)))?;
        tracing::debug!("Saved session for user {}", user_id);
        Ok(())
    }

    fn write_atomic(&self, path: &Path, session: &Session) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Store("session path missing parent".into()))?;
        std::fs::create_dir_all(parent)?;

        // Unique temp file in the same directory for atomic rename
        let temp = NamedTempFile::new_in(parent)?;

        // Exclusive lock on the temp file to serialize concurrent writers
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(session)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Remove the user's draft, returning the last value if there was one
    pub fn clear(&self, user_id: i64) -> Result<Option<Session>> {
        let last = self.get(user_id)?;
        let path = self.path_for(user_id);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| Error::Store(format!("remove {:?}: {}", path, e)))?;
            tracing::debug!("Cleared session for user {}", user_id);
        }
        Ok(last)
    }
}
