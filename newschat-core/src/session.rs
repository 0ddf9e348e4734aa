//! Session-id persistence
//!
//! The active session id is the only state remembered across runs. It lives
//! in a single file under the config directory so a restarted client picks
//! up the same backend conversation.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Backend-assigned session identifier
pub type SessionId = String;

/// File name, stable across runs
const SESSION_FILE: &str = "session_id";

/// Persistent store for the active session id
///
/// A trait so presentation and tests can substitute an in-memory fake.
pub trait SessionStore: Send {
    /// Read the persisted id; absent if never set or the store is unavailable
    fn load(&self) -> Option<SessionId>;

    /// Persist the id, overwriting any previous value
    fn save(&self, id: &str) -> crate::Result<()>;
}

/// Session store backed by a single file
#[derive(Debug)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Create a store rooted at the given directory
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<SessionId> {
        let path = self.session_path();
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(&path) {
            Ok(content) => {
                let id = content.trim();
                if id.is_empty() {
                    None
                } else {
                    Some(id.to_string())
                }
            }
            Err(e) => {
                debug!("Failed to read session file {:?}: {}", path, e);
                None
            }
        }
    }

    fn save(&self, id: &str) -> crate::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.session_path(), id)?;
        Ok(())
    }
}
