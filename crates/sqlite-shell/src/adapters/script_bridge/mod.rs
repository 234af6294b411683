//! Line-oriented JSON bridge that lets a script host drive the client over
//! stdio: one request per line in, one response per line out.

mod handler;
mod io;
mod protocol;

use std::io::{BufRead, Write};

use crate::{
    cli::Args,
    core::runner::ShellRunner,
    error::{AppError, AppResult},
};

pub use handler::BridgeHandler;
pub use io::NdjsonIo;
pub use protocol::{BridgeRequest, BridgeResponse, PROTOCOL_VERSION};

pub fn run(args: Args) -> AppResult<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    rt.block_on(async move {
        let mut io = NdjsonIo::stdio();
        let mut handler = BridgeHandler::new(&args);
        serve(&mut io, &mut handler).await
    })
}

pub async fn serve<I, O, R>(io: &mut NdjsonIo<I, O>, handler: &mut BridgeHandler<R>) -> AppResult<()>
where
    I: BufRead,
    O: Write,
    R: ShellRunner + Clone,
{
    loop {
        let Some(line) = io.read_line()? else { break };
        if line.is_empty() {
            continue;
        }

        let req: BridgeRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                // The id is unknown when the line does not parse.
                tracing::warn!(error = %e, "unparsable bridge request");
                io.protocol_error("", PROTOCOL_VERSION, e.to_string())?;
                continue;
            }
        };

        let resp = handler.handle(req).await;
        io.write_json_line(&resp)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::core::{registry::ClientRegistry, runner::scripted::ScriptedRunner};

    #[tokio::test]
    async fn serves_requests_in_order() {
        let runner = ScriptedRunner::new()
            .reply("1\n1\n1\n", "")
            .reply("n\n1\n", "");
        let args = Args::parse_from(["sqlite-shell", "--db", "/tmp/serve.db"]);
        let mut handler = BridgeHandler::with_registry(&args, ClientRegistry::with_runner("sqlite3", runner));

        let input = concat!(
            r#"{"v":1,"id":"a","cmd":"exec","payload":{"sql":"INSERT INTO t VALUES (1)"}}"#,
            "\n\nnot json\n",
            r#"{"v":1,"id":"b","cmd":"query_array","payload":{"sql":"SELECT n FROM t","mode":"assoc"}}"#,
            "\n",
        );
        let mut io = NdjsonIo::new(input.as_bytes(), Vec::new());
        serve(&mut io, &mut handler).await.unwrap();

        let out = String::from_utf8(io.into_output().unwrap()).unwrap();
        let lines: Vec<serde_json::Value> = out.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], "a");
        assert_eq!(lines[0]["data"], true);
        assert_eq!(lines[1]["status"], "error");
        assert_eq!(lines[2]["id"], "b");
        assert_eq!(lines[2]["data"], serde_json::json!([{ "n": "1" }]));
    }
}
