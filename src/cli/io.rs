//! JSON output for CLI commands
//!
//! One JSON object per line on stdout, UTF-8.

use std::io::{self, Write};

use serde_json::{json, Value};

use super::errors::CliResult;

/// `{"status":"ok","data":...}`
pub fn write_response(data: Value) -> CliResult<()> {
    write_line(&mut io::stdout().lock(), &ok_envelope(data))
}

/// `{"status":"error","code":...,"message":...}`
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_line(&mut io::stdout().lock(), &error_envelope(code, message))
}

fn ok_envelope(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

fn error_envelope(code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

fn write_line<W: Write>(writer: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
