//! SQLite access for script hosts without a native binding: every operation
//! runs the `sqlite3` command-line shell once and parses its `|`-separated
//! text output.
//!
//! ```no_run
//! # async fn demo() -> sqlite_shell::AppResult<()> {
//! use sqlite_shell::{FetchMode, Outcome, Sqlite3};
//!
//! let db = Sqlite3::new("app.db");
//! db.exec("CREATE TABLE IF NOT EXISTS t (id INTEGER PRIMARY KEY, name TEXT)").await?;
//! db.exec("INSERT INTO t (name) VALUES ('alice')").await?;
//! println!("inserted rowid {:?}", db.last_insert_rowid());
//!
//! if let Outcome::Done(Some(mut rs)) = db.query("SELECT id, name FROM t").await? {
//!     while let Some(row) = rs.fetch_array(FetchMode::Assoc) {
//!         println!("{:?}", row.name("name"));
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod core;
pub mod error;
pub mod logging;

pub use crate::core::{
    client::{ClientStatus, Request, Response, Sqlite3},
    registry::ClientRegistry,
    result_set::ResultSet,
    runner::{Captured, ProcessRunner, ShellRunner},
    types::{Cell, ColumnKey, FetchMode, Outcome, Row, Single, VersionInfo},
};
pub use crate::error::{AppError, AppResult};
