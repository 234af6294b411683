use std::fmt;

use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

/// A single cell as printed by the shell. `None` marks a value the output line
/// did not carry (short row); an SQL `NULL` prints as an empty string.
pub type Cell = Option<String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    #[serde(alias = "SQLITE3_ASSOC", alias = "ASSOC")]
    Assoc,
    #[serde(alias = "SQLITE3_NUM", alias = "NUM")]
    Num,
    #[default]
    #[serde(alias = "SQLITE3_BOTH", alias = "BOTH")]
    Both,
}

impl FetchMode {
    fn by_name(self) -> bool {
        matches!(self, FetchMode::Assoc | FetchMode::Both)
    }

    fn by_index(self) -> bool {
        matches!(self, FetchMode::Num | FetchMode::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnKey {
    Name(String),
    Index(usize),
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Name(name) => f.write_str(name),
            ColumnKey::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for ColumnKey {
    fn from(name: &str) -> Self {
        ColumnKey::Name(name.to_string())
    }
}

impl From<usize> for ColumnKey {
    fn from(i: usize) -> Self {
        ColumnKey::Index(i)
    }
}

/// One fetched row, keyed according to a [`FetchMode`]. Entries keep column
/// order; a repeated column name keeps a single entry holding the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    entries: Vec<(ColumnKey, Cell)>,
}

impl Row {
    pub(crate) fn render(columns: &[String], cells: &[Cell], mode: FetchMode) -> Self {
        let mut row = Row {
            entries: Vec::with_capacity(cells.len() * 2),
        };
        for (i, cell) in cells.iter().enumerate() {
            if mode.by_name() {
                let name = columns.get(i).cloned().unwrap_or_default();
                row.insert(ColumnKey::Name(name), cell.clone());
            }
            if mode.by_index() {
                row.insert(ColumnKey::Index(i), cell.clone());
            }
        }
        row
    }

    pub fn insert(&mut self, key: ColumnKey, value: Cell) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: impl Into<ColumnKey>) -> Option<&Cell> {
        let key = key.into();
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn name(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|c| c.as_deref())
    }

    pub fn index(&self, i: usize) -> Option<&str> {
        self.get(i).and_then(|c| c.as_deref())
    }

    pub fn contains_key(&self, key: impl Into<ColumnKey>) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ColumnKey, &Cell)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(&key.to_string(), value)?;
        }
        map.end()
    }
}

/// Result of one shell invocation. `Failed` means the shell reported an SQL
/// error on stderr; the message is kept by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    Failed,
}

impl<T> Outcome<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed)
    }

    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(v) => Some(v),
            Outcome::Failed => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Single {
    Null,
    Value(Cell),
    // Empty when there was no data line.
    Row(Row),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version_string: String,
    pub version_date: String,
    pub version_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn cells(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|s| Some(s.to_string())).collect()
    }

    #[test]
    fn render_modes_key_entries() {
        let columns = cols(&["id", "name"]);
        let values = cells(&["1", "alice"]);

        let assoc = Row::render(&columns, &values, FetchMode::Assoc);
        assert_eq!(assoc.len(), 2);
        assert_eq!(assoc.name("name"), Some("alice"));
        assert!(!assoc.contains_key(0usize));

        let num = Row::render(&columns, &values, FetchMode::Num);
        assert_eq!(num.len(), 2);
        assert_eq!(num.index(0), Some("1"));
        assert!(!num.contains_key("id"));

        let both = Row::render(&columns, &values, FetchMode::Both);
        assert_eq!(both.len(), 4);
        assert_eq!(both.name("id"), Some("1"));
        assert_eq!(both.index(1), Some("alice"));
    }

    #[test]
    fn duplicate_column_names_keep_last_value() {
        let row = Row::render(&cols(&["a", "a"]), &cells(&["1", "2"]), FetchMode::Assoc);
        assert_eq!(row.len(), 1);
        assert_eq!(row.name("a"), Some("2"));
    }

    #[test]
    fn row_serializes_as_object_in_column_order() {
        let mut values = cells(&["1"]);
        values.push(None);
        let row = Row::render(&cols(&["a", "b"]), &values, FetchMode::Both);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"a":"1","0":"1","b":null,"1":null}"#);
    }

    #[test]
    fn fetch_mode_accepts_both_spellings() {
        let m: FetchMode = serde_json::from_str("\"assoc\"").unwrap();
        assert_eq!(m, FetchMode::Assoc);
        let m: FetchMode = serde_json::from_str("\"SQLITE3_NUM\"").unwrap();
        assert_eq!(m, FetchMode::Num);
        assert_eq!(FetchMode::default(), FetchMode::Both);
    }

    #[test]
    fn version_info_uses_camel_case_keys() {
        let v = VersionInfo {
            version_string: "3.45.1".into(),
            version_date: "2024-01-30 16:01:20".into(),
            version_hash: "e876e51a".into(),
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["versionString"], "3.45.1");
        assert_eq!(json["versionDate"], "2024-01-30 16:01:20");
        assert_eq!(json["versionHash"], "e876e51a");
    }
}
