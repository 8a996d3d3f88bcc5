use chrono::Utc;
use fs_err as fs;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::errors::Result;

pub const DEFAULT_SESSION: &str = "default";
pub const DIR_PREFIX: &str = "webapp-";

/// Socket → session and session → output directory, shared by reference
/// between concurrent generation requests. Each session entry is replaced
/// whole under the write lock, so overlapping allocations for one session
/// resolve last-write-wins.
#[derive(Debug)]
pub struct SessionStore {
    base_dir: PathBuf,
    sockets: RwLock<HashMap<String, String>>,
    dirs: RwLock<HashMap<String, PathBuf>>,
}

/// Session ids end up in directory names.
fn dir_safe(session: &str) -> String {
    session
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

impl SessionStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            sockets: RwLock::new(HashMap::new()),
            dirs: RwLock::new(HashMap::new()),
        }
    }

    /// Issues a fresh session for a newly connected socket.
    pub fn connect(&self, socket_id: &str) -> String {
        let session = Uuid::new_v4().to_string();
        self.sockets.write().insert(socket_id.to_string(), session.clone());
        tracing::debug!(socket_id, session = %session, "session connected");
        session
    }

    /// Forgets the socket only; the session's output directory is kept.
    pub fn disconnect(&self, socket_id: &str) -> Option<String> {
        let session = self.sockets.write().remove(socket_id);
        tracing::debug!(socket_id, ?session, "socket disconnected");
        session
    }

    pub fn session_for_socket(&self, socket_id: &str) -> Option<String> {
        self.sockets.read().get(socket_id).cloned()
    }

    /// An explicit session id wins, then the socket's session, then `default`.
    pub fn resolve(&self, session_id: Option<&str>, socket_id: Option<&str>) -> String {
        if let Some(s) = session_id.map(str::trim).filter(|s| !s.is_empty()) {
            return s.to_string();
        }
        socket_id
            .and_then(|sock| self.session_for_socket(sock))
            .unwrap_or_else(|| DEFAULT_SESSION.to_string())
    }

    /// Creates `webapp-<session>-<timestamp>` under the base directory and
    /// makes it the session's current output directory.
    pub fn allocate_output_dir(&self, session: &str) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
        let name = format!("{DIR_PREFIX}{}-{stamp}", dir_safe(session));

        let mut dir = self.base_dir.join(&name);
        let mut n = 1;
        while dir.exists() {
            dir = self.base_dir.join(format!("{name}-{n}"));
            n += 1;
        }
        fs::create_dir_all(&dir)?;

        self.dirs.write().insert(session.to_string(), dir.clone());
        tracing::info!(session, dir = %dir.display(), "allocated output directory");
        Ok(dir)
    }

    pub fn output_dir(&self, session: &str) -> Option<PathBuf> {
        self.dirs.read().get(session).cloned()
    }

    /// The stored directory if it still exists, else the newest matching one on disk.
    pub fn most_recent_dir(&self, session: &str) -> Option<PathBuf> {
        if let Some(dir) = self.output_dir(session).filter(|d| d.is_dir()) {
            return Some(dir);
        }
        let prefix = format!("{DIR_PREFIX}{}-", dir_safe(session));
        newest_dir(&self.base_dir, &prefix)
    }

    pub fn end_session(&self, session: &str) -> Option<PathBuf> {
        self.sockets.write().retain(|_, s| s != session);
        self.dirs.write().remove(session)
    }
}

/// Newest directory under `base` whose name starts with `prefix`. Names carry
/// a sortable timestamp, so the greatest name is the newest.
pub fn newest_dir(base: &Path, prefix: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(base).ok()?;
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            name.starts_with(prefix).then_some(name)
        })
        .max()
        .map(|name| base.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_session_then_socket_then_default() {
        let store = SessionStore::new("unused");
        let s = store.connect("sock-1");
        assert_eq!(store.resolve(Some("abc"), Some("sock-1")), "abc");
        assert_eq!(store.resolve(Some("  "), Some("sock-1")), s);
        assert_eq!(store.resolve(None, Some("sock-2")), DEFAULT_SESSION);
        assert_eq!(store.resolve(None, None), DEFAULT_SESSION);
    }

    #[test]
    fn disconnect_keeps_the_output_directory() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path());
        let s = store.connect("sock");
        let dir = store.allocate_output_dir(&s).unwrap();

        assert_eq!(store.disconnect("sock"), Some(s.clone()));
        assert_eq!(store.session_for_socket("sock"), None);
        assert_eq!(store.output_dir(&s), Some(dir));
    }

    #[test]
    fn allocation_replaces_the_previous_directory() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path());
        let first = store.allocate_output_dir("s1").unwrap();
        let second = store.allocate_output_dir("s1").unwrap();
        assert_ne!(first, second);
        assert!(first.is_dir() && second.is_dir());
        assert_eq!(store.output_dir("s1"), Some(second.clone()));
        assert!(second.file_name().unwrap().to_string_lossy().starts_with("webapp-s1-"));
    }

    #[test]
    fn most_recent_falls_back_to_the_newest_on_disk() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("webapp-s1-20240101000000000")).unwrap();
        fs::create_dir_all(tmp.path().join("webapp-s1-20250101000000000")).unwrap();
        fs::create_dir_all(tmp.path().join("webapp-s2-20990101000000000")).unwrap();

        let store = SessionStore::new(tmp.path());
        let dir = store.most_recent_dir("s1").unwrap();
        assert!(dir.ends_with("webapp-s1-20250101000000000"));
        assert_eq!(store.most_recent_dir("s3"), None);
    }

    #[test]
    fn ended_sessions_forget_everything() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path());
        let s = store.connect("sock");
        let dir = store.allocate_output_dir(&s).unwrap();
        assert_eq!(store.end_session(&s), Some(dir.clone()));
        assert_eq!(store.output_dir(&s), None);
        assert_eq!(store.session_for_socket("sock"), None);
        // The directory itself stays on disk.
        assert!(dir.is_dir());
    }

    #[test]
    fn session_ids_cannot_escape_the_base_directory() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path());
        let dir = store.allocate_output_dir("../../etc").unwrap();
        assert_eq!(dir.parent(), Some(tmp.path()));
    }
}
