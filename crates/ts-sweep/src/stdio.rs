//! Line-delimited JSON controller for optimizers running in another process.
//!
//! The agent writes one `declare` line with the sweep configuration, then
//! reads one assignment object per line and answers each with a `result`
//! line. End of input finishes the sweep.

use async_trait::async_trait;
use serde_json::json;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};
use tracing::debug;
use ts_types::{ParameterSpace, TrialAssignment, TrialResult};

use crate::controller::{SweepController, SweepHandle};
use crate::errors::{ControllerError, ControllerResult};

pub struct JsonLinesController<R, W> {
    reader: R,
    writer: W,
    sweep: Option<SweepHandle>,
    trials_issued: usize,
}

impl JsonLinesController<BufReader<Stdin>, Stdout> {
    /// Controller speaking over the agent's own stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> JsonLinesController<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            sweep: None,
            trials_issued: 0,
        }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn check_sweep(&self, sweep: &SweepHandle) -> ControllerResult<()> {
        match &self.sweep {
            Some(declared) if declared.id == sweep.id => Ok(()),
            _ => Err(ControllerError::UnknownSweep {
                sweep_id: sweep.id.to_string(),
            }),
        }
    }

    async fn write_line(&mut self, message: &serde_json::Value) -> ControllerResult<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<R, W> SweepController for JsonLinesController<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn declare_space(&mut self, space: &ParameterSpace) -> ControllerResult<SweepHandle> {
        let sweep = SweepHandle::new();
        self.write_line(&json!({
            "event": "declare",
            "sweep": sweep.id,
            "config": space.to_sweep_config(),
        }))
        .await?;
        self.sweep = Some(sweep.clone());
        self.trials_issued = 0;
        Ok(sweep)
    }

    async fn next_assignment(
        &mut self,
        sweep: &SweepHandle,
    ) -> ControllerResult<Option<TrialAssignment>> {
        self.check_sweep(sweep)?;
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                debug!("Controller input closed after {} trials", self.trials_issued);
                return Ok(None);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let assignment = serde_json::from_str::<TrialAssignment>(trimmed).map_err(|e| {
                ControllerError::MalformedAssignment {
                    line: trimmed.to_string(),
                    message: e.to_string(),
                }
            })?;
            self.trials_issued += 1;
            return Ok(Some(assignment));
        }
    }

    async fn log(&mut self, sweep: &SweepHandle, result: &TrialResult) -> ControllerResult<()> {
        self.check_sweep(sweep)?;
        let message = json!({
            "event": "result",
            "sweep": sweep.id,
            "trial": self.trials_issued,
            "metrics": result,
        });
        self.write_line(&message).await
    }

    fn name(&self) -> &str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};
    use ts_types::{Objective, ParameterValue};

    fn space() -> ParameterSpace {
        ParameterSpace::new(Objective::minimize("val_bpt")).add_int("k", 16, 2048)
    }

    fn output_lines(bytes: &[u8]) -> Vec<Value> {
        std::str::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn declare_assign_and_report() {
        let input: &[u8] = b"{\"k\": 512, \"d\": 8}\n\n{\"k\": 64}\n";
        let mut controller = JsonLinesController::new(input, Vec::new());

        let sweep = controller.declare_space(&space()).await.unwrap();

        let first = controller.next_assignment(&sweep).await.unwrap().unwrap();
        assert_eq!(first.get("k"), Some(&ParameterValue::Int(512)));
        let mut metrics = Map::new();
        metrics.insert("val_bpt".into(), json!(3.25));
        controller
            .log(&sweep, &TrialResult::from_metrics(metrics))
            .await
            .unwrap();

        let second = controller.next_assignment(&sweep).await.unwrap().unwrap();
        assert_eq!(second.len(), 1);
        controller.log(&sweep, &TrialResult::empty()).await.unwrap();

        assert!(controller.next_assignment(&sweep).await.unwrap().is_none());

        let lines = output_lines(&controller.into_writer());
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["event"], "declare");
        assert_eq!(lines[0]["sweep"], json!(sweep.id));
        assert_eq!(lines[0]["config"]["metric"]["goal"], "minimize");
        assert_eq!(lines[1]["trial"], 1);
        assert_eq!(lines[1]["metrics"], json!({"val_bpt": 3.25}));
        assert_eq!(lines[2]["trial"], 2);
        assert_eq!(lines[2]["metrics"], json!({}));
    }

    #[tokio::test]
    async fn malformed_assignment_is_an_error() {
        let input: &[u8] = b"[1, 2]\n";
        let mut controller = JsonLinesController::new(input, Vec::new());
        let sweep = controller.declare_space(&space()).await.unwrap();
        let err = controller.next_assignment(&sweep).await.unwrap_err();
        assert!(matches!(err, ControllerError::MalformedAssignment { .. }));
    }

    #[tokio::test]
    async fn undeclared_sweep_rejected() {
        let input: &[u8] = b"{\"k\": 1}\n";
        let mut controller = JsonLinesController::new(input, Vec::new());
        let err = controller
            .next_assignment(&SweepHandle::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::UnknownSweep { .. }));
    }
}
