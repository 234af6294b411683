//! Text framing shared by the client operations.
//!
//! `exec` and `query` append three `SELECT` statements to the caller's SQL so
//! that the shell prints the change counters and the last insert rowid after
//! the caller's own output. Statements run and print in order, so the
//! counters are always the last lines of stdout and are peeled off from the
//! end: last insert rowid first, then total changes, then changes. In header
//! mode each value is preceded by its computed column name.

use crate::core::types::VersionInfo;
use crate::error::{AppError, AppResult};

pub const STATEMENT_SEPARATOR: char = ';';

pub const DIAGNOSTIC_SQL: &str = "SELECT changes();SELECT total_changes();SELECT last_insert_rowid();";

const CHANGES_HEADER: &str = "changes()";
const TOTAL_CHANGES_HEADER: &str = "total_changes()";
const LAST_INSERT_ROWID_HEADER: &str = "last_insert_rowid()";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Plain,
    Header,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub changes: Option<String>,
    pub total_changes: Option<String>,
    pub last_insert_rowid: Option<String>,
}

fn statement_body(query: &str) -> &str {
    query.trim_end_matches(|c: char| c == STATEMENT_SEPARATOR || c.is_whitespace())
}

pub fn terminate_statement(query: &str) -> String {
    format!("{}{STATEMENT_SEPARATOR}", statement_body(query))
}

// Separator and suffix each start a new line: a trailing `--` comment in the
// query would swallow them otherwise.
pub fn with_diagnostics(query: &str) -> String {
    format!("{}\n{STATEMENT_SEPARATOR}\n{DIAGNOSTIC_SQL}", statement_body(query))
}

/// Error text from stderr with the trailing line break removed; `None` when
/// the shell wrote nothing.
pub fn error_message(stderr: &str) -> Option<String> {
    let msg = stderr.trim_end_matches(&['\r', '\n'][..]);
    (!msg.is_empty()).then(|| msg.to_string())
}

/// Splits stdout of an augmented invocation into the diagnostic values and the
/// caller's own output. The returned payload keeps one `\n` after every line
/// and is empty when the caller's statements printed nothing.
pub fn split_diagnostics(stdout: &str, framing: Framing) -> AppResult<(Diagnostics, String)> {
    let mut lines: Vec<&str> = stdout
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }

    let last_insert_rowid = take_value(&mut lines, framing, LAST_INSERT_ROWID_HEADER)?;
    let total_changes = take_value(&mut lines, framing, TOTAL_CHANGES_HEADER)?;
    let changes = take_value(&mut lines, framing, CHANGES_HEADER)?;

    let mut payload = String::new();
    for line in lines {
        payload.push_str(line);
        payload.push('\n');
    }

    Ok((
        Diagnostics {
            changes: Some(changes),
            total_changes: Some(total_changes),
            last_insert_rowid: Some(last_insert_rowid),
        },
        payload,
    ))
}

/// Used after the shell reported an error: it usually stopped before the
/// diagnostic statements ran, so whatever cannot be recovered is left absent.
pub fn recover_diagnostics(stdout: &str, framing: Framing) -> Diagnostics {
    split_diagnostics(stdout, framing)
        .map(|(diagnostics, _)| diagnostics)
        .unwrap_or_default()
}

fn take_value(lines: &mut Vec<&str>, framing: Framing, header: &str) -> AppResult<String> {
    let value = lines
        .pop()
        .ok_or_else(|| AppError::MalformedOutput(format!("missing value for {header}")))?;
    if value.parse::<i64>().is_err() {
        return Err(AppError::MalformedOutput(format!(
            "expected integer for {header}, got {value:?}"
        )));
    }
    if framing == Framing::Header {
        match lines.pop() {
            Some(h) if h == header => {}
            Some(h) => {
                return Err(AppError::MalformedOutput(format!(
                    "expected header {header}, got {h:?}"
                )))
            }
            None => return Err(AppError::MalformedOutput(format!("missing header {header}"))),
        }
    }
    Ok(value.to_string())
}

/// Best-effort parse of `sqlite3 -version`, e.g.
/// `3.45.1 2024-01-30 16:01:20 e876e51a0ed5c5b3126f52e532044363a014bc594cfefa87ffb5b82257cc1 (64-bit)`.
/// Missing fields come back empty.
pub fn parse_version(stdout: &str) -> VersionInfo {
    let fields: Vec<&str> = stdout.split_whitespace().collect();
    let field = |i: usize| fields.get(i).copied().unwrap_or_default().to_string();
    let version_date = fields.iter().skip(1).take(2).copied().collect::<Vec<_>>().join(" ");
    VersionInfo {
        version_string: field(0),
        version_date,
        version_hash: field(3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_is_normalized() {
        assert_eq!(terminate_statement("SELECT 1"), "SELECT 1;");
        assert_eq!(terminate_statement("SELECT 1;"), "SELECT 1;");
        assert_eq!(terminate_statement("SELECT 1;;"), "SELECT 1;");
        assert_eq!(terminate_statement("SELECT 1; \n"), "SELECT 1;");
        let once = terminate_statement("DELETE FROM t");
        assert_eq!(terminate_statement(&once), once);
    }

    #[test]
    fn diagnostics_follow_the_query() {
        assert_eq!(
            with_diagnostics("INSERT INTO t VALUES (1)"),
            "INSERT INTO t VALUES (1)\n;\nSELECT changes();SELECT total_changes();SELECT last_insert_rowid();"
        );
        assert_eq!(with_diagnostics("DELETE FROM t;;  "), with_diagnostics("DELETE FROM t"));
    }

    #[test]
    fn trailing_line_comment_leaves_diagnostics_intact() {
        let sql = with_diagnostics("INSERT INTO t(v) VALUES ('a') -- add a row");
        let mut lines = sql.lines();
        assert_eq!(lines.next(), Some("INSERT INTO t(v) VALUES ('a') -- add a row"));
        assert_eq!(lines.next(), Some(";"));
        assert_eq!(lines.next(), Some(DIAGNOSTIC_SQL));
        assert_eq!(lines.next(), None);

        let sql = with_diagnostics("SELECT v FROM t -- read;");
        assert!(sql.starts_with("SELECT v FROM t -- read\n;\n"));
    }

    #[test]
    fn error_message_strips_trailing_newline() {
        assert_eq!(error_message(""), None);
        assert_eq!(error_message("\n"), None);
        assert_eq!(
            error_message("Error: no such table: nope\n").as_deref(),
            Some("Error: no such table: nope")
        );
        assert_eq!(error_message("line 1\nline 2\n").as_deref(), Some("line 1\nline 2"));
    }

    #[test]
    fn plain_framing_takes_last_three_values() {
        let (diag, payload) = split_diagnostics("1\n1\n7\n", Framing::Plain).unwrap();
        assert_eq!(diag.changes.as_deref(), Some("1"));
        assert_eq!(diag.total_changes.as_deref(), Some("1"));
        assert_eq!(diag.last_insert_rowid.as_deref(), Some("7"));
        assert!(payload.is_empty());
    }

    #[test]
    fn plain_framing_keeps_preceding_output() {
        let (diag, payload) = split_diagnostics("a|b\n0\n0\n0\n", Framing::Plain).unwrap();
        assert_eq!(diag.changes.as_deref(), Some("0"));
        assert_eq!(payload, "a|b\n");
    }

    #[test]
    fn header_framing_strips_names_and_keeps_payload() {
        let stdout = "id|name\n1|alice\n2|bob\nchanges()\n0\ntotal_changes()\n0\nlast_insert_rowid()\n0\n";
        let (diag, payload) = split_diagnostics(stdout, Framing::Header).unwrap();
        assert_eq!(diag.last_insert_rowid.as_deref(), Some("0"));
        assert_eq!(payload, "id|name\n1|alice\n2|bob\n");
    }

    #[test]
    fn header_framing_with_no_rows_leaves_empty_payload() {
        let stdout = "changes()\n1\ntotal_changes()\n1\nlast_insert_rowid()\n3\n";
        let (diag, payload) = split_diagnostics(stdout, Framing::Header).unwrap();
        assert_eq!(diag.changes.as_deref(), Some("1"));
        assert_eq!(diag.last_insert_rowid.as_deref(), Some("3"));
        assert!(payload.is_empty());
    }

    #[test]
    fn empty_cell_row_survives_in_payload() {
        let stdout = "x\n\nchanges()\n0\ntotal_changes()\n0\nlast_insert_rowid()\n0\n";
        let (_, payload) = split_diagnostics(stdout, Framing::Header).unwrap();
        assert_eq!(payload, "x\n\n");
    }

    #[test]
    fn short_output_fails_closed() {
        let err = split_diagnostics("1\n1\n", Framing::Plain).unwrap_err();
        assert!(matches!(err, AppError::MalformedOutput(_)));

        let err = split_diagnostics("", Framing::Plain).unwrap_err();
        assert!(matches!(err, AppError::MalformedOutput(_)));
    }

    #[test]
    fn wrong_header_fails_closed() {
        let stdout = "changes()\n1\ntotal_changes()\n1\nrowid\n3\n";
        let err = split_diagnostics(stdout, Framing::Header).unwrap_err();
        assert!(matches!(err, AppError::MalformedOutput(_)));
    }

    #[test]
    fn non_integer_value_fails_closed() {
        let err = split_diagnostics("a\nb\nc\n", Framing::Plain).unwrap_err();
        assert!(matches!(err, AppError::MalformedOutput(_)));
    }

    #[test]
    fn recovery_after_error_leaves_values_absent() {
        assert_eq!(recover_diagnostics("", Framing::Plain), Diagnostics::default());
        assert_eq!(recover_diagnostics("a|b\n", Framing::Header), Diagnostics::default());
    }

    #[test]
    fn version_splits_into_three_fields() {
        let v = parse_version(
            "3.45.1 2024-01-30 16:01:20 e876e51a0ed5c5b3126f52e532044363a014bc594cfefa87ffb5b82257cc1 (64-bit)\n",
        );
        assert_eq!(v.version_string, "3.45.1");
        assert_eq!(v.version_date, "2024-01-30 16:01:20");
        assert_eq!(
            v.version_hash,
            "e876e51a0ed5c5b3126f52e532044363a014bc594cfefa87ffb5b82257cc1"
        );
    }

    #[test]
    fn version_degrades_on_short_output() {
        let v = parse_version("3.8.2\n");
        assert_eq!(v.version_string, "3.8.2");
        assert_eq!(v.version_date, "");
        assert_eq!(v.version_hash, "");

        assert_eq!(parse_version(""), VersionInfo::default());
    }
}
