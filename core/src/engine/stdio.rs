//! Subprocess engine bridge speaking JSON lines over stdin/stdout.
//!
//! The bridge is started as `<program> <args...> <image path>`. It answers
//! with a handshake line (`{"ready": true}` or `{"error": "..."}`), then one
//! response line per request line:
//!
//! ```text
//! -> {"query": "SELECT ... FROM $SYSTEM.DBSCHEMA_TABLES ..."}
//! <- {"rows": [{"TABLE_NAME": "Sales", "TABLE_TYPE": "TABLE"}]}
//! ```

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{EngineError, EngineSession, SchemaQuery, SchemaRow, TabularEngine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdioEngine {
    program: String,
    args: Vec<String>,
}

impl StdioEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[derive(Serialize)]
struct BridgeRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BridgeResponse {
    Error { error: String },
    Rows { rows: Vec<Map<String, Value>> },
    Ready { ready: bool },
}

impl TabularEngine for StdioEngine {
    fn open(&self, image: &Path) -> Result<Box<dyn EngineSession>, EngineError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(image)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| EngineError::Unavailable {
                reason: format!("failed to start '{}': {}", self.program, e),
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(EngineError::Unavailable {
                reason: "engine bridge stdio was not captured".to_string(),
            });
        };

        let mut session = StdioSession {
            child: Some(child),
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
        };

        match session.read_response()? {
            BridgeResponse::Ready { ready: true } => {
                debug!(program = %self.program, "engine bridge ready");
                Ok(Box::new(session))
            }
            BridgeResponse::Ready { ready: false } => Err(EngineError::Rejected {
                message: "bridge reported not ready".to_string(),
            }),
            BridgeResponse::Error { error } => Err(EngineError::Rejected { message: error }),
            BridgeResponse::Rows { .. } => Err(EngineError::Protocol {
                message: "expected handshake, got rows".to_string(),
            }),
        }
    }
}

struct StdioSession {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl StdioSession {
    fn send(&mut self, statement: &str) -> Result<(), EngineError> {
        let stdin = self.stdin.as_mut().ok_or(EngineError::Disconnected)?;
        let mut line = serde_json::to_string(&BridgeRequest { query: statement }).map_err(|e| {
            EngineError::Protocol {
                message: e.to_string(),
            }
        })?;
        line.push('\n');
        stdin.write_all(line.as_bytes())?;
        stdin.flush()?;
        Ok(())
    }

    fn read_response(&mut self) -> Result<BridgeResponse, EngineError> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self.stdout.read_line(&mut line)?;
            if n == 0 {
                return Err(EngineError::Disconnected);
            }
            if !line.trim().is_empty() {
                break;
            }
        }
        serde_json::from_str(line.trim()).map_err(|e| EngineError::Protocol {
            message: format!("invalid response line: {e}"),
        })
    }
}

impl EngineSession for StdioSession {
    fn query(&mut self, query: &SchemaQuery) -> Result<Vec<SchemaRow>, EngineError> {
        self.send(&query.statement())?;
        match self.read_response()? {
            BridgeResponse::Rows { rows } => Ok(rows.into_iter().map(SchemaRow::from).collect()),
            BridgeResponse::Error { error } => Err(EngineError::Statement { message: error }),
            BridgeResponse::Ready { .. } => Err(EngineError::Protocol {
                message: "expected rows, got handshake".to_string(),
            }),
        }
    }

    fn close(mut self: Box<Self>) -> Result<(), EngineError> {
        // EOF on stdin tells the bridge to unload the image and exit.
        self.stdin.take();
        if let Some(mut child) = self.child.take() {
            let status = child.wait()?;
            if !status.success() {
                return Err(EngineError::Protocol {
                    message: format!("engine bridge exited with {status}"),
                });
            }
        }
        Ok(())
    }
}

impl Drop for StdioSession {
    fn drop(&mut self) {
        self.stdin.take();
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                warn!(error = %e, "failed to stop engine bridge");
            }
            let _ = child.wait();
        }
    }
}
