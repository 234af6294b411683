use std::{future::Future, path::PathBuf, time::Duration};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    cli::Args,
    core::{
        client::{Request, Response, Sqlite3},
        registry::ClientRegistry,
        runner::{ProcessRunner, ShellRunner},
    },
    error::{AppError, AppResult},
};

use super::protocol::*;

pub struct BridgeHandler<R = ProcessRunner> {
    registry: ClientRegistry<R>,
    active_db: Option<PathBuf>,
    timeout: Duration,
}

impl BridgeHandler<ProcessRunner> {
    pub fn new(args: &Args) -> Self {
        Self::with_registry(args, ClientRegistry::new(args.sqlite_bin.clone()))
    }
}

impl<R: ShellRunner + Clone> BridgeHandler<R> {
    pub fn with_registry(args: &Args, registry: ClientRegistry<R>) -> Self {
        Self {
            registry,
            active_db: args.db.clone(),
            timeout: Duration::from_millis(args.timeout_ms),
        }
    }

    pub async fn handle(&mut self, req: BridgeRequest) -> BridgeResponse<Value> {
        if req.v != PROTOCOL_VERSION {
            return BridgeResponse::err(
                req.v,
                req.id,
                "INVALID_REQUEST",
                format!("unsupported protocol version: {}", req.v),
            );
        }

        let res = match req.cmd.as_str() {
            "connect" => self.handle_connect(&req.payload),
            "exec" => self.handle_exec(&req.payload).await,
            "query" => self.handle_query(&req.payload).await,
            "query_single" => self.handle_query_single(&req.payload).await,
            "query_array" => self.handle_query_array(&req.payload).await,
            "version" => self.handle_version().await,
            "status" => self.handle_status(&req.payload),
            other => Err(AppError::InvalidRequest(format!("unknown cmd: {other}"))),
        };

        match res {
            Ok(data) => BridgeResponse::ok(req.v, req.id, data),
            Err(e) => {
                tracing::debug!(id = %req.id, cmd = %req.cmd, error = %e, "request failed");
                BridgeResponse::err(req.v, req.id, e.code(), e.to_string())
            }
        }
    }

    fn handle_connect(&mut self, payload: &Value) -> AppResult<Value> {
        let p: ConnectPayload = parse_payload(payload)?;
        let path = PathBuf::from(p.path);
        self.registry.ensure_client(&path)?;
        self.active_db = Some(path);
        Ok(Value::Bool(true))
    }

    async fn handle_exec(&mut self, payload: &Value) -> AppResult<Value> {
        let p: ExecPayload = parse_payload(payload)?;
        let client = self.client(p.path)?;
        match self.run(&client, Request::Exec { sql: p.sql }).await? {
            Response::Exec(ok) => Ok(Value::Bool(ok)),
            other => Err(unexpected(other)),
        }
    }

    async fn handle_query(&mut self, payload: &Value) -> AppResult<Value> {
        let p: QueryPayload = parse_payload(payload)?;
        let client = self.client(p.path)?;
        match self.run(&client, Request::Query { sql: p.sql }).await? {
            Response::Query(outcome) => query_data(outcome, p.mode),
            other => Err(unexpected(other)),
        }
    }

    async fn handle_query_single(&mut self, payload: &Value) -> AppResult<Value> {
        let p: QuerySinglePayload = parse_payload(payload)?;
        let client = self.client(p.path)?;
        let req = Request::QuerySingle {
            sql: p.sql,
            whole_row: p.whole_row,
        };
        match self.run(&client, req).await? {
            Response::QuerySingle(outcome) => single_data(outcome),
            other => Err(unexpected(other)),
        }
    }

    async fn handle_query_array(&mut self, payload: &Value) -> AppResult<Value> {
        let p: QueryPayload = parse_payload(payload)?;
        let client = self.client(p.path)?;
        let req = Request::QueryArray {
            sql: p.sql,
            mode: p.mode,
        };
        match self.run(&client, req).await? {
            Response::QueryArray(outcome) => array_data(outcome),
            other => Err(unexpected(other)),
        }
    }

    async fn handle_version(&mut self) -> AppResult<Value> {
        let client = self.registry.detached();
        match self.run(&client, Request::Version).await? {
            Response::Version(info) => Ok(serde_json::to_value(info)?),
            other => Err(unexpected(other)),
        }
    }

    fn handle_status(&mut self, payload: &Value) -> AppResult<Value> {
        let p: StatusPayload = if payload.is_null() {
            StatusPayload::default()
        } else {
            parse_payload(payload)?
        };
        let client = self.client(p.path)?;
        Ok(serde_json::to_value(client.status())?)
    }

    async fn run(&self, client: &Sqlite3<R>, req: Request) -> AppResult<Response> {
        with_timeout(self.timeout, client.run(req)).await
    }

    fn client(&self, payload_path: Option<String>) -> AppResult<Sqlite3<R>> {
        let path = match payload_path {
            Some(p) => PathBuf::from(p),
            None => self.active_db.clone().ok_or_else(|| {
                AppError::InvalidRequest("no active db; call connect first or pass path".into())
            })?,
        };
        self.registry.ensure_client(&path)
    }
}

async fn with_timeout<T>(timeout: Duration, fut: impl Future<Output = AppResult<T>>) -> AppResult<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| AppError::Timeout)?
}

fn parse_payload<T: DeserializeOwned>(payload: &Value) -> AppResult<T> {
    serde_json::from_value(payload.clone()).map_err(|e| AppError::InvalidRequest(e.to_string()))
}

fn unexpected(resp: Response) -> AppError {
    AppError::Internal(format!("unexpected response: {resp:?}"))
}
