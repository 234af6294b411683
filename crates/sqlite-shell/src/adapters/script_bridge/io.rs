use std::io::{BufRead, BufReader, BufWriter, Stdin, Stdout, Write};

use crate::error::{AppError, AppResult};

pub struct NdjsonIo<I, O: Write> {
    input: I,
    output: BufWriter<O>,
}

impl NdjsonIo<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

impl<I: BufRead, O: Write> NdjsonIo<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self {
            input,
            output: BufWriter::new(output),
        }
    }

    pub fn read_line(&mut self) -> AppResult<Option<String>> {
        let mut line = String::new();
        let n = self.input.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.trim().is_empty() {
            return Ok(Some(String::new()));
        }
        Ok(Some(line.to_string()))
    }

    pub fn write_json_line<T: serde::Serialize>(&mut self, v: &T) -> AppResult<()> {
        serde_json::to_writer(&mut self.output, v)?;
        self.output.write_all(b"\n")?;
        self.output.flush()?;
        Ok(())
    }

    pub fn protocol_error(&mut self, id: &str, v: u32, msg: String) -> AppResult<()> {
        #[derive(serde::Serialize)]
        struct ErrResp<'a> {
            v: u32,
            id: &'a str,
            status: &'static str,
            error: String,
            code: &'static str,
        }
        let r = ErrResp {
            v,
            id,
            status: "error",
            error: msg,
            code: AppError::InvalidRequest(String::new()).code(),
        };
        self.write_json_line(&r)
    }

    pub fn into_output(self) -> AppResult<O> {
        self.output
            .into_inner()
            .map_err(|e| AppError::Io(e.into_error()))
    }
}
