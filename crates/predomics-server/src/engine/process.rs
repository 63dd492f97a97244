//! Engine implementation that runs the gpredomics binary as a child process

use async_trait::async_trait;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

use super::{Engine, EngineError, EngineInvocation, ProgressParser, ProgressUpdate, ResultBundle};
use crate::config::EngineConfig;

/// Lines of stderr kept for the failure message
const STDERR_TAIL_LINES: usize = 20;

/// Read `reader` line by line until EOF, decoding each line lossily.
///
/// Invalid UTF-8 must not stop the loop: an undrained pipe leaves the
/// engine blocked or killed by SIGPIPE on its next write.
async fn drain_lines<R, F>(reader: R, mut on_line: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(String),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                on_line(line.trim_end_matches(['\n', '\r']).to_string());
            },
            Err(e) => {
                warn!(error = %e, "Failed to read engine output");
                break;
            },
        }
    }
}

pub struct ProcessEngine {
    command: String,
    args: Vec<String>,
    result_file: String,
    parser: Arc<ProgressParser>,
}

impl ProcessEngine {
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        Ok(Self {
            command: config.command.clone(),
            args: config.args.clone(),
            result_file: config.result_file.clone(),
            parser: Arc::new(ProgressParser::new()?),
        })
    }
}

#[async_trait]
impl Engine for ProcessEngine {
    #[instrument(skip(self, invocation, progress), fields(job_id = %invocation.job_id))]
    async fn run(
        &self,
        invocation: &EngineInvocation,
        progress: UnboundedSender<ProgressUpdate>,
    ) -> Result<ResultBundle, EngineError> {
        let param_path = invocation.write_parameter_file().await?;

        info!(command = %self.command, param = %param_path.display(), "Launching engine");

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg(&param_path)
            .current_dir(&invocation.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let stdout_task = child.stdout.take().map(|stdout| {
            let parser = Arc::clone(&self.parser);
            let job_id = invocation.job_id;
            tokio::spawn(async move {
                drain_lines(stdout, |line| {
                    debug!("[engine:{}][stdout] {}", job_id, line);
                    if let Some(update) = parser.parse_line(&line) {
                        // receiver may already be gone
                        let _ = progress.send(update);
                    }
                })
                .await;
            })
        });

        let stderr_task = child.stderr.take().map(|stderr| {
            let job_id = invocation.job_id;
            tokio::spawn(async move {
                let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
                drain_lines(stderr, |line| {
                    debug!("[engine:{}][stderr] {}", job_id, line);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                })
                .await;
                Vec::from(tail).join("\n")
            })
        });

        let status = child.wait().await?;

        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        let stderr_tail = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            warn!(code = ?status.code(), "Engine exited unsuccessfully");
            return Err(EngineError::Exited {
                code: status.code(),
                stderr_tail,
            });
        }

        let result_path = invocation.work_dir.join(&self.result_file);
        let bytes = match tokio::fs::read(&result_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::MissingResult(result_path));
            },
            Err(e) => return Err(e.into()),
        };

        let bundle: serde_json::Value = serde_json::from_slice(&bytes)?;
        info!(bytes = bytes.len(), "Engine finished");
        Ok(ResultBundle(bundle))
    }
}
