//! End-to-end tests for the command flow: preconditions, busy handling,
//! session updates, and the render plans produced for each action, driven
//! through a scripted in-process implementation of the service API.

use async_trait::async_trait;
use datalens_cli::client::AnalysisApi;
use datalens_cli::error::WorkflowError;
use datalens_cli::model::{
    ActionKind, AnalysisReport, AnalysisRequest, AnalysisResponse, CorrelationReport,
    DistributionReport, Endpoint, ImputationReport, OutlierReport, PlotSet, SessionSnapshot,
    SummaryReport, UploadReceipt, WorkflowEvent, WorkflowStage,
};
use datalens_cli::orchestrator::{Command, Controller};
use datalens_cli::render::{RenderItem, RenderPlan, Surface};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Scripted service: answers every endpoint with a canned payload, counts
/// calls, and can hold requests at a gate, fail a chosen endpoint, or crash
/// one on demand.
struct FakeApi {
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    fail_on: Option<(Endpoint, WorkflowError)>,
    panic_on: Option<(Endpoint, Arc<Notify>)>,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate: None,
            fail_on: None,
            panic_on: None,
        }
    }

    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    fn failing(endpoint: Endpoint, error: WorkflowError) -> Self {
        Self {
            fail_on: Some((endpoint, error)),
            ..Self::new()
        }
    }
}

#[async_trait]
impl AnalysisApi for FakeApi {
    async fn send(&self, request: AnalysisRequest) -> Result<AnalysisResponse, WorkflowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((endpoint, trigger)) = &self.panic_on {
            if request.endpoint() == *endpoint {
                trigger.notified().await;
                panic!("scripted {} crash", endpoint.path());
            }
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some((endpoint, error)) = &self.fail_on {
            if request.endpoint() == *endpoint {
                return Err(error.clone());
            }
        }
        Ok(canned_response(&request))
    }
}

fn canned_response(request: &AnalysisRequest) -> AnalysisResponse {
    match request {
        AnalysisRequest::Upload { .. } => AnalysisResponse::Upload(UploadReceipt {
            filepath: "uploads/data.csv".into(),
            columns: vec!["A".into(), "B".into(), "C".into()],
        }),
        AnalysisRequest::Analyze { .. } => AnalysisResponse::Analyze(AnalysisReport {
            plots: PlotSet {
                heatmap: Some("data:image/png;base64,HEAT".into()),
                pairplot: Some("data:image/png;base64,PAIR".into()),
                distribution: "data:image/png;base64,DIST".into(),
            },
            model_score: 0.87,
            target_type: "Categorical".into(),
        }),
        AnalysisRequest::Summarize { .. } => AnalysisResponse::Summary(SummaryReport {
            summary: json!({ "numeric": { "A": { "mean": 1.5 } } }),
            missing_values: json!({ "A": 0, "B": 2 }),
        }),
        AnalysisRequest::Correlation { .. } => AnalysisResponse::Correlation(CorrelationReport {
            correlations: json!({ "A": 1.0, "B": -0.4 }),
        }),
        AnalysisRequest::Distribution { .. } => {
            AnalysisResponse::Distribution(DistributionReport {
                distribution_plot: "data:image/png;base64,FEAT".into(),
            })
        }
        AnalysisRequest::HandleMissing { .. } => {
            AnalysisResponse::HandleMissing(ImputationReport {
                handled_missing: json!({ "B": "filled with median" }),
                updated_filepath: None,
            })
        }
        AnalysisRequest::HandleOutliers { .. } => {
            AnalysisResponse::HandleOutliers(OutlierReport {
                outlier_plot: "data:image/png;base64,OUTL".into(),
                outliers_handled: json!({ "A": 3 }),
                updated_filepath: Some("uploads/data_no_outliers.csv".into()),
            })
        }
    }
}

fn temp_dataset() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.csv");
    std::fs::write(&path, "A,B,C\n1,2,3\n4,,6\n").unwrap();
    (dir, path)
}

/// Controller under test plus the channels to drive it.
struct Harness {
    cmd_tx: UnboundedSender<Command>,
    event_rx: UnboundedReceiver<WorkflowEvent>,
    /// Most recent session snapshot observed while settling commands.
    snapshot: SessionSnapshot,
    controller: JoinHandle<()>,
}

impl Harness {
    fn start(api: Arc<dyn AnalysisApi>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let controller = tokio::spawn(Controller::new(api, event_tx).run(cmd_rx));
        Self {
            cmd_tx,
            event_rx,
            snapshot: SessionSnapshot::default(),
            controller,
        }
    }

    fn send(&self, command: Command) {
        self.cmd_tx.send(command).expect("controller alive");
    }

    async fn next_event(&mut self) -> WorkflowEvent {
        tokio::time::timeout(Duration::from_secs(2), self.event_rx.recv())
            .await
            .expect("event within two seconds")
            .expect("event stream open")
    }

    /// Drive a service-backed command to its terminal event, folding session
    /// updates seen along the way into `snapshot`.
    async fn settle(&mut self, kind: ActionKind) -> Result<RenderPlan, WorkflowError> {
        loop {
            match self.next_event().await {
                WorkflowEvent::SessionUpdated { snapshot } => self.snapshot = snapshot,
                WorkflowEvent::Rendered { kind: k, plan } if k == kind => return Ok(plan),
                WorkflowEvent::ActionFailed { kind: k, error } if k == kind => return Err(error),
                _ => {}
            }
        }
    }

    /// Selection commands emit no render plan; their session update is the
    /// completion signal.
    async fn settle_selection(
        &mut self,
        kind: ActionKind,
    ) -> Result<SessionSnapshot, WorkflowError> {
        loop {
            match self.next_event().await {
                WorkflowEvent::SessionUpdated { snapshot } => {
                    self.snapshot = snapshot.clone();
                    return Ok(snapshot);
                }
                WorkflowEvent::ActionFailed { kind: k, error } if k == kind => return Err(error),
                _ => {}
            }
        }
    }
}

/// Start a harness with the dataset already uploaded.
async fn with_dataset(api: Arc<FakeApi>) -> (TempDir, Harness) {
    let (dir, path) = temp_dataset();
    let mut h = Harness::start(api);
    h.send(Command::Upload { path });
    h.settle(ActionKind::Upload).await.expect("upload succeeds");
    (dir, h)
}

#[tokio::test]
async fn actions_without_a_dataset_are_rejected_before_any_request() {
    let api = Arc::new(FakeApi::new());
    let mut h = Harness::start(api.clone());

    let service_commands = [
        (Command::Analyze, ActionKind::Analyze),
        (Command::Summarize, ActionKind::Summarize),
        (Command::Correlation, ActionKind::Correlation),
        (Command::Distribution, ActionKind::Distribution),
        (Command::HandleMissing, ActionKind::HandleMissing),
        (Command::HandleOutliers, ActionKind::HandleOutliers),
    ];
    for (command, kind) in service_commands {
        h.send(command);
        let err = h.settle(kind).await.unwrap_err();
        assert_eq!(
            err,
            WorkflowError::Precondition("no dataset uploaded yet".into()),
            "{} should be blocked while idle",
            kind.label()
        );
    }

    h.send(Command::SelectTarget { column: "A".into() });
    let err = h
        .settle_selection(ActionKind::SelectTarget)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Precondition(_)));

    assert_eq!(
        api.calls.load(Ordering::SeqCst),
        0,
        "nothing may reach the service"
    );
}

#[tokio::test]
async fn upload_establishes_the_dataset_and_resets_selections() {
    let api = Arc::new(FakeApi::new());
    let (_dir, path) = temp_dataset();
    let mut h = Harness::start(api);

    h.send(Command::Upload { path: path.clone() });
    let plan = h.settle(ActionKind::Upload).await.unwrap();
    assert_eq!(plan.surface, Surface::Controls);
    assert_eq!(h.snapshot.dataset.as_deref(), Some("uploads/data.csv"));
    assert_eq!(h.snapshot.columns, ["A", "B", "C"]);
    assert_eq!(h.snapshot.stage, WorkflowStage::DatasetReady);

    h.send(Command::SelectTarget { column: "B".into() });
    let snapshot = h
        .settle_selection(ActionKind::SelectTarget)
        .await
        .unwrap();
    assert_eq!(snapshot.target.as_deref(), Some("B"));

    // A second upload replaces the dataset wholesale.
    h.send(Command::Upload { path });
    h.settle(ActionKind::Upload).await.unwrap();
    assert_eq!(h.snapshot.target, None);
    assert_eq!(h.snapshot.stage, WorkflowStage::DatasetReady);
}

#[tokio::test]
async fn upload_of_a_missing_file_fails_without_a_request() {
    let api = Arc::new(FakeApi::new());
    let mut h = Harness::start(api.clone());

    h.send(Command::Upload {
        path: PathBuf::from("/no/such/dataset.csv"),
    });
    let err = h.settle(ActionKind::Upload).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn analyze_marks_the_session_and_renders_the_plots() {
    let api = Arc::new(FakeApi::new());
    let (_dir, mut h) = with_dataset(api).await;

    h.send(Command::SelectTarget { column: "C".into() });
    h.settle_selection(ActionKind::SelectTarget).await.unwrap();

    h.send(Command::Analyze);
    let plan = h.settle(ActionKind::Analyze).await.unwrap();

    assert_eq!(plan.surface, Surface::Visualization);
    let images = plan
        .items
        .iter()
        .filter(|item| matches!(item, RenderItem::Image { .. }))
        .count();
    assert_eq!(images, 3);
    assert!(plan.items.contains(&RenderItem::Field {
        label: "Model score".into(),
        value: "0.87".into(),
    }));
    assert!(plan.items.contains(&RenderItem::Field {
        label: "Target type".into(),
        value: "Categorical".into(),
    }));
    assert_eq!(h.snapshot.stage, WorkflowStage::Analyzed);
}

#[tokio::test]
async fn analyze_without_a_target_is_a_validation_error() {
    let api = Arc::new(FakeApi::new());
    let (_dir, mut h) = with_dataset(api.clone()).await;

    h.send(Command::Analyze);
    let err = h.settle(ActionKind::Analyze).await.unwrap_err();
    assert_eq!(
        err,
        WorkflowError::Validation("no target column selected".into())
    );
    assert_eq!(api.calls.load(Ordering::SeqCst), 1, "only the upload ran");
}

#[tokio::test]
async fn selecting_an_unknown_column_is_rejected() {
    let api = Arc::new(FakeApi::new());
    let (_dir, mut h) = with_dataset(api).await;

    h.send(Command::SelectTarget { column: "Z".into() });
    let err = h
        .settle_selection(ActionKind::SelectTarget)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        WorkflowError::Validation("'Z' is not a column of the active dataset".into())
    );
}

#[tokio::test]
async fn an_empty_feature_name_is_rejected_locally() {
    let api = Arc::new(FakeApi::new());
    let (_dir, mut h) = with_dataset(api.clone()).await;

    h.send(Command::SetFeature {
        feature: "   ".into(),
    });
    let err = h
        .settle_selection(ActionKind::SetFeature)
        .await
        .unwrap_err();
    assert_eq!(err, WorkflowError::Validation("no feature name set".into()));

    h.send(Command::Distribution);
    let err = h.settle(ActionKind::Distribution).await.unwrap_err();
    assert_eq!(err, WorkflowError::Validation("no feature name set".into()));

    h.send(Command::HandleOutliers);
    let err = h.settle(ActionKind::HandleOutliers).await.unwrap_err();
    assert_eq!(err, WorkflowError::Validation("no feature name set".into()));

    assert_eq!(api.calls.load(Ordering::SeqCst), 1, "only the upload ran");
}

#[tokio::test]
async fn service_errors_leave_the_session_untouched() {
    let api = Arc::new(FakeApi::failing(
        Endpoint::Analyze,
        WorkflowError::Service("model fit failed: singular matrix".into()),
    ));
    let (_dir, mut h) = with_dataset(api).await;

    h.send(Command::SelectTarget { column: "A".into() });
    h.settle_selection(ActionKind::SelectTarget).await.unwrap();

    h.send(Command::Analyze);
    let err = h.settle(ActionKind::Analyze).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Service(_)));
    assert_eq!(h.snapshot.stage, WorkflowStage::DatasetReady);
    assert_eq!(h.snapshot.target.as_deref(), Some("A"));

    // The session still works; a follow-up read-only action succeeds.
    h.send(Command::Summarize);
    let plan = h.settle(ActionKind::Summarize).await.unwrap();
    assert_eq!(plan.surface, Surface::Exploration);
}

#[tokio::test]
async fn mutating_action_serializes_everything_else() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(FakeApi::gated(Arc::clone(&gate)));
    let (_dir, path) = temp_dataset();
    let mut h = Harness::start(api.clone());

    h.send(Command::Upload { path });
    loop {
        if matches!(
            h.next_event().await,
            WorkflowEvent::ActionStarted {
                kind: ActionKind::Upload
            }
        ) {
            break;
        }
    }

    // While the upload is held at the gate every other command bounces.
    h.send(Command::Analyze);
    let err = h.settle(ActionKind::Analyze).await.unwrap_err();
    assert_eq!(err, WorkflowError::Busy(ActionKind::Upload));

    h.send(Command::SetFeature { feature: "A".into() });
    let err = h
        .settle_selection(ActionKind::SetFeature)
        .await
        .unwrap_err();
    assert_eq!(err, WorkflowError::Busy(ActionKind::Upload));

    gate.notify_one();
    let plan = h.settle(ActionKind::Upload).await.unwrap();
    assert_eq!(plan.surface, Surface::Controls);
    assert_eq!(
        api.calls.load(Ordering::SeqCst),
        1,
        "rejected commands never reached the service"
    );

    // Once the upload settles the workflow is usable again.
    h.send(Command::SelectTarget { column: "B".into() });
    h.settle_selection(ActionKind::SelectTarget).await.unwrap();
    h.send(Command::Analyze);
    gate.notify_one();
    let plan = h.settle(ActionKind::Analyze).await.unwrap();
    assert_eq!(plan.surface, Surface::Visualization);
}

#[tokio::test]
async fn a_panicking_read_only_task_does_not_release_the_busy_latch() {
    let upload_gate = Arc::new(Notify::new());
    let crash_trigger = Arc::new(Notify::new());
    let api = Arc::new(FakeApi {
        gate: Some(Arc::clone(&upload_gate)),
        panic_on: Some((Endpoint::Summarize, Arc::clone(&crash_trigger))),
        ..FakeApi::new()
    });
    let (_dir, path) = temp_dataset();
    let mut h = Harness::start(api.clone());

    h.send(Command::Upload { path: path.clone() });
    upload_gate.notify_one();
    h.settle(ActionKind::Upload).await.unwrap();

    // A read-only action goes in flight, then a second upload takes the latch.
    h.send(Command::Summarize);
    h.send(Command::Upload { path });
    loop {
        if matches!(
            h.next_event().await,
            WorkflowEvent::ActionStarted {
                kind: ActionKind::Upload
            }
        ) {
            break;
        }
    }

    // Crash the read-only task while the upload is still held at the gate.
    crash_trigger.notify_one();
    loop {
        if matches!(h.next_event().await, WorkflowEvent::Info(_)) {
            break;
        }
    }

    // The latch still belongs to the in-flight upload.
    h.send(Command::Summarize);
    match h.next_event().await {
        WorkflowEvent::ActionFailed {
            kind: ActionKind::Summarize,
            error,
        } => assert_eq!(error, WorkflowError::Busy(ActionKind::Upload)),
        other => panic!("summarize slipped past the busy upload: {other:?}"),
    }

    upload_gate.notify_one();
    let plan = h.settle(ActionKind::Upload).await.unwrap();
    assert_eq!(plan.surface, Surface::Controls);
    assert_eq!(
        api.calls.load(Ordering::SeqCst),
        3,
        "the rejected summarize never reached the service"
    );
}

#[tokio::test]
async fn summarize_renders_the_exploration_trees() {
    let api = Arc::new(FakeApi::new());
    let (_dir, mut h) = with_dataset(api).await;

    h.send(Command::Summarize);
    let first = h.settle(ActionKind::Summarize).await.unwrap();
    assert_eq!(first.title, "Dataset summary");
    assert_eq!(first.surface, Surface::Exploration);
    let labels: Vec<_> = first
        .items
        .iter()
        .map(|item| match item {
            RenderItem::Tree { label, .. } => label.as_str(),
            RenderItem::Field { label, .. } | RenderItem::Image { label, .. } => label.as_str(),
        })
        .collect();
    assert_eq!(labels, ["Summary", "Missing values"]);

    // Repeating the action replaces the plan with an identical one.
    h.send(Command::Summarize);
    let second = h.settle(ActionKind::Summarize).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn outlier_handling_reports_the_rewritten_file() {
    let api = Arc::new(FakeApi::new());
    let (_dir, mut h) = with_dataset(api).await;

    h.send(Command::SetFeature { feature: "A".into() });
    h.settle_selection(ActionKind::SetFeature).await.unwrap();

    h.send(Command::HandleOutliers);
    let plan = h.settle(ActionKind::HandleOutliers).await.unwrap();
    assert_eq!(plan.surface, Surface::Visualization);
    assert!(plan
        .items
        .iter()
        .any(|item| matches!(item, RenderItem::Image { .. })));
    assert!(plan.items.contains(&RenderItem::Field {
        label: "Updated file".into(),
        value: "uploads/data_no_outliers.csv".into(),
    }));
}

#[tokio::test]
async fn quit_stops_the_controller() {
    let api = Arc::new(FakeApi::new());
    let h = Harness::start(api);
    h.send(Command::Quit);
    tokio::time::timeout(Duration::from_secs(2), h.controller)
        .await
        .expect("controller exits on quit")
        .expect("controller task completes");
}
