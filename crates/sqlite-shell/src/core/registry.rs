use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::{
    core::{
        client::{Sqlite3, DEFAULT_PROGRAM},
        runner::{ProcessRunner, ShellRunner},
    },
    error::{AppError, AppResult},
};

/// One client per database path, so recorded state (last error, change
/// counters) follows the database a request targets.
#[derive(Debug)]
pub struct ClientRegistry<R = ProcessRunner> {
    inner: Arc<Mutex<HashMap<PathBuf, Sqlite3<R>>>>,
    program: String,
    runner: R,
}

impl<R: Clone> Clone for ClientRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            program: self.program.clone(),
            runner: self.runner.clone(),
        }
    }
}

impl ClientRegistry<ProcessRunner> {
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_runner(program, ProcessRunner)
    }
}

impl Default for ClientRegistry<ProcessRunner> {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl<R: ShellRunner + Clone> ClientRegistry<R> {
    pub fn with_runner(program: impl Into<String>, runner: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            program: program.into(),
            runner,
        }
    }

    pub fn ensure_client(&self, db_path: &Path) -> AppResult<Sqlite3<R>> {
        let db_path = absolute_lossy(db_path)?;
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| AppError::Internal("poisoned lock".into()))?;
        if let Some(c) = guard.get(&db_path) {
            return Ok(c.clone());
        }

        tracing::debug!(path = %db_path.display(), program = %self.program, "creating sqlite shell client");
        let c = Sqlite3::with_runner(db_path.clone(), self.runner.clone()).with_program(self.program.clone());
        guard.insert(db_path, c.clone());
        Ok(c)
    }

    pub fn detached(&self) -> Sqlite3<R> {
        Sqlite3::with_runner(PathBuf::new(), self.runner.clone()).with_program(self.program.clone())
    }
}

fn absolute_lossy(path: &Path) -> AppResult<PathBuf> {
    // canonicalize requires the file to exist; the shell creates it on first use.
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir()?;
        Ok(cwd.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::runner::scripted::ScriptedRunner;

    #[tokio::test]
    async fn same_path_shares_client_state() {
        let runner = ScriptedRunner::new().reply("1\n1\n5\n", "");
        let registry = ClientRegistry::with_runner("sqlite3", runner);

        let a = registry.ensure_client(Path::new("same.db")).unwrap();
        assert!(a.exec("INSERT INTO t DEFAULT VALUES").await.unwrap());

        let b = registry.ensure_client(Path::new("same.db")).unwrap();
        assert_eq!(b.last_insert_rowid().as_deref(), Some("5"));
        assert!(b.path().is_absolute());
    }

    #[test]
    fn distinct_paths_get_distinct_clients() {
        let registry = ClientRegistry::with_runner("custom-sqlite", ScriptedRunner::new());
        let a = registry.ensure_client(Path::new("/tmp/a.db")).unwrap();
        let b = registry.ensure_client(Path::new("/tmp/b.db")).unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(a.program(), "custom-sqlite");
    }
}
