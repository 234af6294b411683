use std::path::PathBuf;

use clap::Parser;

use crate::core::client::DEFAULT_PROGRAM;

#[derive(Parser, Debug, Clone)]
#[command(name = "sqlite-shell", version, about = "NDJSON bridge to SQLite through the sqlite3 shell")]
pub struct Args {
    /// sqlite3 executable to invoke (name on PATH or full path).
    #[arg(long, default_value = DEFAULT_PROGRAM)]
    pub sqlite_bin: String,

    /// Database made active at startup, as if `connect` had been sent.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Timeout for a single request.
    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["sqlite-shell"]);
        assert_eq!(args.sqlite_bin, "sqlite3");
        assert_eq!(args.db, None);
        assert_eq!(args.log_level, "info");
        assert_eq!(args.timeout_ms, 30_000);
    }

    #[test]
    fn overrides() {
        let args = Args::parse_from([
            "sqlite-shell",
            "--sqlite-bin",
            "/opt/sqlite/bin/sqlite3",
            "--db",
            "app.db",
            "--timeout-ms",
            "500",
        ]);
        assert_eq!(args.sqlite_bin, "/opt/sqlite/bin/sqlite3");
        assert_eq!(args.db, Some(PathBuf::from("app.db")));
        assert_eq!(args.timeout_ms, 500);
    }
}
