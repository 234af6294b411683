use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::{
    core::{
        framing::{self, Diagnostics, Framing},
        result_set::ResultSet,
        runner::{Captured, ProcessRunner, ShellRunner},
        types::{FetchMode, Outcome, Row, Single, VersionInfo},
    },
    error::{AppError, AppResult},
};

pub const DEFAULT_PROGRAM: &str = "sqlite3";

const HEADER_FLAG: &str = "-header";
const VERSION_FLAG: &str = "-version";

#[derive(Debug, Clone, Default)]
struct ClientState {
    last_query: Option<String>,
    last_error_message: Option<String>,
    last_insert_rowid: Option<String>,
    changes: Option<String>,
    total_changes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStatus {
    pub path: PathBuf,
    pub last_query: Option<String>,
    pub last_error_message: Option<String>,
    pub last_insert_row_id: Option<String>,
    pub changes: Option<String>,
    pub total_changes: Option<String>,
}

/// Client for one database file, driven through the `sqlite3` shell.
///
/// Every operation spawns a fresh shell process. The accessors
/// (`last_error_message`, `changes`, ...) report whatever the most recently
/// *completed* invocation recorded; with several operations in flight the
/// last one to finish wins, so concurrent callers should rely on the values
/// the operations return. Clones share the recorded state.
pub struct Sqlite3<R = ProcessRunner> {
    path: PathBuf,
    program: String,
    runner: Arc<R>,
    state: Arc<Mutex<ClientState>>,
}

impl<R> Clone for Sqlite3<R> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            program: self.program.clone(),
            runner: Arc::clone(&self.runner),
            state: Arc::clone(&self.state),
        }
    }
}

impl<R> std::fmt::Debug for Sqlite3<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sqlite3")
            .field("path", &self.path)
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

impl Sqlite3<ProcessRunner> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_runner(path, ProcessRunner)
    }
}

impl<R: ShellRunner> Sqlite3<R> {
    pub fn with_runner(path: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            path: path.into(),
            program: DEFAULT_PROGRAM.to_string(),
            runner: Arc::new(runner),
            state: Arc::new(Mutex::new(ClientState::default())),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Runs statements that return no rows. `Ok(false)` means the shell
    /// reported an error, see [`Sqlite3::last_error_message`].
    pub async fn exec(&self, query: &str) -> AppResult<bool> {
        self.remember_query(&framing::terminate_statement(query));
        let sql = framing::with_diagnostics(query);
        let out = self.invoke(vec![self.path_arg(), sql]).await?;

        match framing::error_message(&out.stderr) {
            Some(msg) => {
                let diagnostics = framing::recover_diagnostics(&out.stdout, Framing::Plain);
                self.record_failure(msg, Some(diagnostics));
                Ok(false)
            }
            None => {
                let (diagnostics, _) = self.split(&out, Framing::Plain)?;
                self.record_success(Some(diagnostics));
                Ok(true)
            }
        }
    }

    /// Runs a statement and returns its rows as a [`ResultSet`], or
    /// `Done(None)` when it succeeded without printing any row.
    pub async fn query(&self, query: &str) -> AppResult<Outcome<Option<ResultSet>>> {
        self.remember_query(&framing::terminate_statement(query));
        let sql = framing::with_diagnostics(query);
        let out = self
            .invoke(vec![HEADER_FLAG.to_string(), self.path_arg(), sql])
            .await?;

        if let Some(msg) = framing::error_message(&out.stderr) {
            let diagnostics = framing::recover_diagnostics(&out.stdout, Framing::Header);
            self.record_failure(msg, Some(diagnostics));
            return Ok(Outcome::Failed);
        }

        let (diagnostics, payload) = self.split(&out, Framing::Header)?;
        self.record_success(Some(diagnostics));
        if payload.is_empty() {
            Ok(Outcome::Done(None))
        } else {
            Ok(Outcome::Done(Some(ResultSet::parse(&payload))))
        }
    }

    /// First cell of the first row, or with `whole_row` the first row keyed by
    /// column name. Without rows: [`Single::Null`], or an empty row.
    pub async fn query_single(&self, query: &str, whole_row: bool) -> AppResult<Outcome<Single>> {
        let Some(mut rs) = self.query_rows(query).await? else {
            return Ok(Outcome::Failed);
        };

        let single = if whole_row {
            Single::Row(rs.fetch_array(FetchMode::Assoc).unwrap_or_default())
        } else {
            match rs.fetch_array(FetchMode::Num) {
                Some(row) => Single::Value(row.get(0usize).cloned().flatten()),
                None => Single::Null,
            }
        };
        Ok(Outcome::Done(single))
    }

    pub async fn query_array(&self, query: &str, mode: FetchMode) -> AppResult<Outcome<Vec<Row>>> {
        Ok(match self.query_rows(query).await? {
            Some(mut rs) => Outcome::Done(rs.fetch_all(mode)),
            None => Outcome::Failed,
        })
    }

    /// Version of the shell binary. Does not touch the recorded state, not even
    /// when the shell cannot be launched.
    pub async fn version(&self) -> AppResult<VersionInfo> {
        let out = self.launch(vec![VERSION_FLAG.to_string()]).await?;
        if let Some(msg) = framing::error_message(&out.stderr) {
            warn!(program = %self.program, error = %msg, "sqlite shell wrote to stderr for -version");
        }
        Ok(framing::parse_version(&out.stdout))
    }

    pub fn last_error_message(&self) -> Option<String> {
        self.snapshot().last_error_message
    }

    pub fn last_insert_rowid(&self) -> Option<String> {
        self.snapshot().last_insert_rowid
    }

    pub fn changes(&self) -> Option<String> {
        self.snapshot().changes
    }

    pub fn total_changes(&self) -> Option<String> {
        self.snapshot().total_changes
    }

    pub fn last_query(&self) -> Option<String> {
        self.snapshot().last_query
    }

    pub fn status(&self) -> ClientStatus {
        let s = self.snapshot();
        ClientStatus {
            path: self.path.clone(),
            last_query: s.last_query,
            last_error_message: s.last_error_message,
            last_insert_row_id: s.last_insert_rowid,
            changes: s.changes,
            total_changes: s.total_changes,
        }
    }

    pub async fn run(&self, request: Request) -> AppResult<Response> {
        Ok(match request {
            Request::Exec { sql } => Response::Exec(self.exec(&sql).await?),
            Request::Query { sql } => Response::Query(self.query(&sql).await?),
            Request::QuerySingle { sql, whole_row } => {
                Response::QuerySingle(self.query_single(&sql, whole_row).await?)
            }
            Request::QueryArray { sql, mode } => {
                Response::QueryArray(self.query_array(&sql, mode).await?)
            }
            Request::Version => Response::Version(self.version().await?),
        })
    }

    /// Schedules `request` on the current tokio runtime and returns at once.
    /// `callback` is invoked exactly once, when the shell process has finished.
    pub fn dispatch<F>(&self, request: Request, callback: F) -> AppResult<JoinHandle<()>>
    where
        F: FnOnce(AppResult<Response>) + Send + 'static,
    {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| AppError::Internal(format!("no tokio runtime to dispatch on: {e}")))?;
        let client = self.clone();
        Ok(handle.spawn(async move {
            let res = client.run(request).await;
            callback(res);
        }))
    }

    /// Header-mode invocation without diagnostics, shared by `query_single`
    /// and `query_array`. `None` when the shell reported an error.
    async fn query_rows(&self, query: &str) -> AppResult<Option<ResultSet>> {
        self.remember_query(query);
        let out = self
            .invoke(vec![HEADER_FLAG.to_string(), self.path_arg(), query.to_string()])
            .await?;

        match framing::error_message(&out.stderr) {
            Some(msg) => {
                self.record_failure(msg, None);
                Ok(None)
            }
            None => {
                self.record_success(None);
                Ok(Some(ResultSet::parse(&out.stdout)))
            }
        }
    }

    async fn invoke(&self, args: Vec<String>) -> AppResult<Captured> {
        self.launch(args).await.map_err(|e| {
            self.record_broken(&e);
            e
        })
    }

    async fn launch(&self, args: Vec<String>) -> AppResult<Captured> {
        debug!(program = %self.program, db = %self.path.display(), args = args.len(), "invoking sqlite shell");
        self.runner
            .run(&self.program, &args)
            .await
            .map_err(|source| {
                error!(program = %self.program, error = %source, "failed to launch sqlite shell");
                AppError::Launch {
                    program: self.program.clone(),
                    source,
                }
            })
    }

    fn split(&self, out: &Captured, framing: Framing) -> AppResult<(Diagnostics, String)> {
        framing::split_diagnostics(&out.stdout, framing).map_err(|e| {
            warn!(db = %self.path.display(), error = %e, "unexpected sqlite shell output");
            self.record_broken(&e);
            e
        })
    }

    // No usable diagnostics came back, so nothing from an earlier call may linger.
    fn record_broken(&self, e: &AppError) {
        self.update(|s| {
            s.last_error_message = Some(e.to_string());
            s.changes = None;
            s.total_changes = None;
            s.last_insert_rowid = None;
        });
    }

    fn path_arg(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    fn remember_query(&self, query: &str) {
        self.update(|s| s.last_query = Some(query.to_string()));
    }

    fn record_success(&self, diagnostics: Option<Diagnostics>) {
        self.update(|s| {
            s.last_error_message = None;
            if let Some(d) = diagnostics {
                apply(s, d);
            }
        });
    }

    fn record_failure(&self, msg: String, diagnostics: Option<Diagnostics>) {
        warn!(db = %self.path.display(), error = %msg, "sqlite shell reported an error");
        self.update(|s| {
            s.last_error_message = Some(msg);
            if let Some(d) = diagnostics {
                apply(s, d);
            }
        });
    }

    fn update(&self, f: impl FnOnce(&mut ClientState)) {
        let mut guard = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard);
    }

    fn snapshot(&self) -> ClientState {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

fn apply(state: &mut ClientState, d: Diagnostics) {
    state.changes = d.changes;
    state.total_changes = d.total_changes;
    state.last_insert_rowid = d.last_insert_rowid;
}

/// One client operation, for callers that schedule work through
/// [`Sqlite3::dispatch`] or route requests from elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Exec { sql: String },
    Query { sql: String },
    QuerySingle { sql: String, whole_row: bool },
    QueryArray { sql: String, mode: FetchMode },
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Exec(bool),
    Query(Outcome<Option<ResultSet>>),
    QuerySingle(Outcome<Single>),
    QueryArray(Outcome<Vec<Row>>),
    Version(VersionInfo),
}
