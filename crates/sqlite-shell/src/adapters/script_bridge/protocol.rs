use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    core::{
        result_set::ResultSet,
        types::{FetchMode, Outcome, Row, Single},
    },
    error::AppResult,
};

pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BridgeRequest {
    pub v: u32,
    pub id: String,
    pub cmd: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Serialize)]
pub struct BridgeResponse<T> {
    pub v: u32,
    pub id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T> BridgeResponse<T> {
    pub fn ok(v: u32, id: String, data: T) -> Self {
        Self {
            v,
            id,
            status: "ok",
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn err(v: u32, id: String, code: &'static str, error: String) -> Self {
        Self {
            v,
            id,
            status: "error",
            data: None,
            error: Some(error),
            code: Some(code),
        }
    }
}

// Payloads

#[derive(Debug, Deserialize)]
pub struct ConnectPayload {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecPayload {
    pub sql: String,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryPayload {
    pub sql: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub mode: FetchMode,
}

#[derive(Debug, Deserialize)]
pub struct QuerySinglePayload {
    pub sql: String,
    #[serde(default)]
    pub whole_row: bool,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub path: Option<String>,
}

// Response data. A shell-reported SQL error is `false` everywhere, matching
// what scripts test for; the message is fetched with `status`.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetData {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub num_rows: usize,
}

pub fn query_data(outcome: Outcome<Option<ResultSet>>, mode: FetchMode) -> AppResult<Value> {
    match outcome {
        Outcome::Failed => Ok(Value::Bool(false)),
        Outcome::Done(None) => Ok(Value::Bool(true)),
        Outcome::Done(Some(mut rs)) => {
            let data = ResultSetData {
                columns: rs.columns().to_vec(),
                num_rows: rs.num_rows(),
                rows: rs.fetch_all(mode),
            };
            Ok(serde_json::to_value(data)?)
        }
    }
}

pub fn single_data(outcome: Outcome<Single>) -> AppResult<Value> {
    match outcome {
        Outcome::Failed => Ok(Value::Bool(false)),
        Outcome::Done(Single::Null) => Ok(Value::Null),
        Outcome::Done(Single::Value(cell)) => Ok(cell.map(Value::String).unwrap_or(Value::Null)),
        Outcome::Done(Single::Row(row)) => Ok(serde_json::to_value(row)?),
    }
}

pub fn array_data(outcome: Outcome<Vec<Row>>) -> AppResult<Value> {
    match outcome {
        Outcome::Failed => Ok(Value::Bool(false)),
        Outcome::Done(rows) => Ok(serde_json::to_value(rows)?),
    }
}
