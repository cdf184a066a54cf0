//! Workflow controller.
//!
//! Owns the session and turns commands into service requests. Requests run
//! on spawned tasks so the command loop stays responsive; completions are
//! joined back here and applied to the session in order of arrival.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::{Id, JoinSet};

use crate::client::AnalysisApi;
use crate::error::WorkflowError;
use crate::model::{ActionKind, AnalysisRequest, AnalysisResponse, WorkflowEvent};
use crate::render;
use crate::session::SessionState;

use super::command::Command;

/// Outcome of one in-flight request.
struct TaskOutcome {
    request: AnalysisRequest,
    result: Result<AnalysisResponse, WorkflowError>,
}

pub struct Controller {
    api: Arc<dyn AnalysisApi>,
    session: SessionState,
    event_tx: UnboundedSender<WorkflowEvent>,
    inflight: JoinSet<TaskOutcome>,
    /// The session-mutating action currently in flight, keyed by task id so
    /// that only that task's completion or panic releases it. While set,
    /// every command except Quit is rejected as busy.
    mutating: Option<(Id, ActionKind)>,
}

impl Controller {
    pub fn new(api: Arc<dyn AnalysisApi>, event_tx: UnboundedSender<WorkflowEvent>) -> Self {
        Self {
            api,
            session: SessionState::new(),
            event_tx,
            inflight: JoinSet::new(),
            mutating: None,
        }
    }

    /// Process commands until Quit or until the command channel closes.
    /// Dropping the in-flight set on exit aborts anything still running.
    pub async fn run(mut self, mut cmd_rx: UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Quit) | None => break,
                    Some(cmd) => self.handle(cmd),
                },
                Some(joined) = self.inflight.join_next_with_id(), if !self.inflight.is_empty() => {
                    match joined {
                        Ok((task_id, outcome)) => self.complete(task_id, outcome),
                        Err(e) => {
                            // A panic in the mutating task releases the latch; a
                            // panicking read-only task must leave it alone.
                            if self.mutating.map_or(false, |(task_id, _)| task_id == e.id()) {
                                self.mutating = None;
                            }
                            let _ = self.event_tx.send(WorkflowEvent::Info(format!(
                                "request task failed: {e}"
                            )));
                        }
                    }
                }
            }
        }
    }

    fn handle(&mut self, command: Command) {
        if let Some((_, active)) = self.mutating {
            if let Some(kind) = command.kind() {
                self.fail(kind, WorkflowError::Busy(active));
            }
            return;
        }

        match command {
            Command::Upload { path } => match prepare_upload(&path) {
                Ok(request) => self.submit(request),
                Err(e) => self.fail(ActionKind::Upload, e),
            },
            Command::SelectTarget { column } => self.select_target(&column),
            Command::SetFeature { feature } => self.set_feature(&feature),
            Command::Analyze => {
                let request = self.dataset_and_target().map(|(filepath, target_column)| {
                    AnalysisRequest::Analyze {
                        filepath,
                        target_column,
                    }
                });
                self.submit_or_fail(ActionKind::Analyze, request);
            }
            Command::Summarize => {
                let request = self
                    .session
                    .require_dataset()
                    .map(|filepath| AnalysisRequest::Summarize { filepath });
                self.submit_or_fail(ActionKind::Summarize, request);
            }
            Command::Correlation => {
                let request = self.dataset_and_target().map(|(filepath, target_column)| {
                    AnalysisRequest::Correlation {
                        filepath,
                        target_column,
                    }
                });
                self.submit_or_fail(ActionKind::Correlation, request);
            }
            Command::Distribution => {
                let request = self.dataset_and_feature().map(|(filepath, feature)| {
                    AnalysisRequest::Distribution { filepath, feature }
                });
                self.submit_or_fail(ActionKind::Distribution, request);
            }
            Command::HandleMissing => {
                let request = self
                    .session
                    .require_dataset()
                    .map(|filepath| AnalysisRequest::HandleMissing { filepath });
                self.submit_or_fail(ActionKind::HandleMissing, request);
            }
            Command::HandleOutliers => {
                let request = self.dataset_and_feature().map(|(filepath, feature)| {
                    AnalysisRequest::HandleOutliers { filepath, feature }
                });
                self.submit_or_fail(ActionKind::HandleOutliers, request);
            }
            // Quit is intercepted by the run loop.
            Command::Quit => {}
        }
    }

    fn select_target(&mut self, column: &str) {
        // Target selection needs columns to check against, so the dataset
        // precondition applies even though no request is sent.
        if let Err(e) = self.session.require_dataset() {
            self.fail(ActionKind::SelectTarget, e);
            return;
        }
        match self.session.set_target(column) {
            Ok(()) => {
                if let Some(target) = self.session.target() {
                    let _ = self
                        .event_tx
                        .send(WorkflowEvent::Info(format!("target column: {target}")));
                }
                self.emit_session();
            }
            Err(e) => self.fail(ActionKind::SelectTarget, e),
        }
    }

    fn set_feature(&mut self, feature: &str) {
        match self.session.set_feature(feature) {
            Ok(()) => {
                if let Some(feature) = self.session.feature() {
                    let _ = self
                        .event_tx
                        .send(WorkflowEvent::Info(format!("feature: {feature}")));
                }
                self.emit_session();
            }
            Err(e) => self.fail(ActionKind::SetFeature, e),
        }
    }

    /// Dataset reference plus target column, or the first error on the way.
    /// The dataset precondition is checked before local selections.
    fn dataset_and_target(&self) -> Result<(String, String), WorkflowError> {
        let filepath = self.session.require_dataset()?;
        let target = self
            .session
            .target()
            .ok_or_else(|| WorkflowError::Validation("no target column selected".into()))?;
        Ok((filepath, target.to_string()))
    }

    fn dataset_and_feature(&self) -> Result<(String, String), WorkflowError> {
        let filepath = self.session.require_dataset()?;
        let feature = self
            .session
            .feature()
            .ok_or_else(|| WorkflowError::Validation("no feature name set".into()))?;
        Ok((filepath, feature.to_string()))
    }

    fn submit_or_fail(
        &mut self,
        kind: ActionKind,
        request: Result<AnalysisRequest, WorkflowError>,
    ) {
        match request {
            Ok(request) => self.submit(request),
            Err(e) => self.fail(kind, e),
        }
    }

    /// Announce the action and spawn its request. Mutating actions set the
    /// busy latch until their completion is observed.
    fn submit(&mut self, request: AnalysisRequest) {
        let kind = request.kind();
        let _ = self.event_tx.send(WorkflowEvent::ActionStarted { kind });
        tracing::info!(endpoint = request.endpoint().path(), "action started");

        let api = Arc::clone(&self.api);
        let handle = self.inflight.spawn(async move {
            let result = api.send(request.clone()).await;
            TaskOutcome { request, result }
        });
        if kind.mutates_session() {
            self.mutating = Some((handle.id(), kind));
        }
    }

    fn complete(&mut self, task_id: Id, outcome: TaskOutcome) {
        let kind = outcome.request.kind();
        if self.mutating.map_or(false, |(id, _)| id == task_id) {
            self.mutating = None;
        }

        let payload = match outcome.result {
            Ok(payload) => payload,
            Err(e) => {
                self.fail(kind, e);
                return;
            }
        };

        match &payload {
            AnalysisResponse::Upload(receipt) => {
                self.session
                    .set_dataset(receipt.filepath.clone(), receipt.columns.clone());
                tracing::info!(
                    filepath = %receipt.filepath,
                    columns = receipt.columns.len(),
                    "dataset established"
                );
                self.emit_session();
            }
            AnalysisResponse::Analyze(_) => {
                self.session.mark_analyzed();
                self.emit_session();
            }
            _ => {}
        }

        let _ = self.event_tx.send(WorkflowEvent::ActionCompleted {
            kind,
            payload: payload.clone(),
        });
        match render::render(&outcome.request, &payload) {
            Ok(plan) => {
                let _ = self.event_tx.send(WorkflowEvent::Rendered { kind, plan });
            }
            Err(e) => self.fail(kind, e),
        }
    }

    fn fail(&mut self, kind: ActionKind, error: WorkflowError) {
        tracing::warn!(action = kind.label(), error = %error, "action failed");
        let _ = self
            .event_tx
            .send(WorkflowEvent::ActionFailed { kind, error });
    }

    fn emit_session(&self) {
        let _ = self.event_tx.send(WorkflowEvent::SessionUpdated {
            snapshot: self.session.snapshot(),
        });
    }
}

/// Validate the upload path before any bytes are read.
fn prepare_upload(path: &Path) -> Result<AnalysisRequest, WorkflowError> {
    if path.as_os_str().is_empty() {
        return Err(WorkflowError::Validation("no dataset file selected".into()));
    }
    if !path.is_file() {
        return Err(WorkflowError::Validation(format!(
            "{} is not a readable file",
            path.display()
        )));
    }
    Ok(AnalysisRequest::Upload {
        file: path.to_path_buf(),
    })
}
