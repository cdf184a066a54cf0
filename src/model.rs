use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::WorkflowError;
use crate::render::RenderPlan;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub user_agent: String,
}

/// User-triggered actions, including the local selection commands. Labels
/// events, busy-state, and the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Upload,
    SelectTarget,
    SetFeature,
    Analyze,
    Summarize,
    Correlation,
    Distribution,
    HandleMissing,
    HandleOutliers,
}

impl ActionKind {
    /// Human-readable label for notifications.
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::Upload => "upload",
            ActionKind::SelectTarget => "target selection",
            ActionKind::SetFeature => "feature selection",
            ActionKind::Analyze => "analysis",
            ActionKind::Summarize => "summary",
            ActionKind::Correlation => "correlation",
            ActionKind::Distribution => "distribution",
            ActionKind::HandleMissing => "missing-value handling",
            ActionKind::HandleOutliers => "outlier handling",
        }
    }

    /// Stable key for machine-readable output.
    pub fn key(self) -> &'static str {
        match self {
            ActionKind::Upload => "upload",
            ActionKind::SelectTarget => "target",
            ActionKind::SetFeature => "feature",
            ActionKind::Analyze => "analyze",
            ActionKind::Summarize => "summary",
            ActionKind::Correlation => "correlation",
            ActionKind::Distribution => "distribution",
            ActionKind::HandleMissing => "handle_missing",
            ActionKind::HandleOutliers => "handle_outliers",
        }
    }

    /// Whether a successful completion mutates the session. Such actions
    /// are serialized: nothing else runs while one is in flight.
    pub fn mutates_session(self) -> bool {
        matches!(self, ActionKind::Upload | ActionKind::Analyze)
    }
}

/// Remote service endpoints, one per workflow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Upload,
    Analyze,
    Summarize,
    Correlation,
    Distribution,
    HandleMissing,
    HandleOutliers,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Upload => "/upload",
            Endpoint::Analyze => "/analyze",
            Endpoint::Summarize => "/summarize",
            Endpoint::Correlation => "/correlation",
            Endpoint::Distribution => "/distribution",
            Endpoint::HandleMissing => "/handle_missing",
            Endpoint::HandleOutliers => "/handle_outliers",
        }
    }
}

/// One prepared request against the remote service, carrying exactly the
/// parameters its endpoint needs.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisRequest {
    Upload { file: PathBuf },
    Analyze { filepath: String, target_column: String },
    Summarize { filepath: String },
    Correlation { filepath: String, target_column: String },
    Distribution { filepath: String, feature: String },
    HandleMissing { filepath: String },
    HandleOutliers { filepath: String, feature: String },
}

impl AnalysisRequest {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            AnalysisRequest::Upload { .. } => Endpoint::Upload,
            AnalysisRequest::Analyze { .. } => Endpoint::Analyze,
            AnalysisRequest::Summarize { .. } => Endpoint::Summarize,
            AnalysisRequest::Correlation { .. } => Endpoint::Correlation,
            AnalysisRequest::Distribution { .. } => Endpoint::Distribution,
            AnalysisRequest::HandleMissing { .. } => Endpoint::HandleMissing,
            AnalysisRequest::HandleOutliers { .. } => Endpoint::HandleOutliers,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            AnalysisRequest::Upload { .. } => ActionKind::Upload,
            AnalysisRequest::Analyze { .. } => ActionKind::Analyze,
            AnalysisRequest::Summarize { .. } => ActionKind::Summarize,
            AnalysisRequest::Correlation { .. } => ActionKind::Correlation,
            AnalysisRequest::Distribution { .. } => ActionKind::Distribution,
            AnalysisRequest::HandleMissing { .. } => ActionKind::HandleMissing,
            AnalysisRequest::HandleOutliers { .. } => ActionKind::HandleOutliers,
        }
    }

    /// JSON body for the endpoint. Upload posts a multipart form instead
    /// and has no JSON body.
    pub fn body(&self) -> Value {
        match self {
            AnalysisRequest::Upload { .. } => Value::Null,
            AnalysisRequest::Analyze {
                filepath,
                target_column,
            } => json!({ "filepath": filepath, "target_column": target_column }),
            AnalysisRequest::Summarize { filepath } => json!({ "filepath": filepath }),
            AnalysisRequest::Correlation {
                filepath,
                target_column,
            } => json!({ "filepath": filepath, "target_column": target_column }),
            AnalysisRequest::Distribution { filepath, feature } => {
                json!({ "filepath": filepath, "feature": feature })
            }
            AnalysisRequest::HandleMissing { filepath } => json!({ "filepath": filepath }),
            AnalysisRequest::HandleOutliers { filepath, feature } => {
                json!({ "filepath": filepath, "feature": feature })
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub filepath: String,
    pub columns: Vec<String>,
}

/// Image references produced by a full analysis. The service omits heatmap
/// and pairplot for datasets where they cannot be drawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotSet {
    #[serde(default)]
    pub heatmap: Option<String>,
    #[serde(default)]
    pub pairplot: Option<String>,
    pub distribution: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub plots: PlotSet,
    pub model_score: f64,
    pub target_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub summary: Value,
    pub missing_values: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub correlations: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionReport {
    pub distribution_plot: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputationReport {
    pub handled_missing: Value,
    #[serde(default)]
    pub updated_filepath: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierReport {
    pub outlier_plot: String,
    pub outliers_handled: Value,
    #[serde(default)]
    pub updated_filepath: Option<String>,
}

/// Typed response payload, one variant per endpoint. Serializes untagged so
/// machine-readable output matches the wire shape.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalysisResponse {
    Upload(UploadReceipt),
    Analyze(AnalysisReport),
    Summary(SummaryReport),
    Correlation(CorrelationReport),
    Distribution(DistributionReport),
    HandleMissing(ImputationReport),
    HandleOutliers(OutlierReport),
}

impl AnalysisResponse {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            AnalysisResponse::Upload(_) => Endpoint::Upload,
            AnalysisResponse::Analyze(_) => Endpoint::Analyze,
            AnalysisResponse::Summary(_) => Endpoint::Summarize,
            AnalysisResponse::Correlation(_) => Endpoint::Correlation,
            AnalysisResponse::Distribution(_) => Endpoint::Distribution,
            AnalysisResponse::HandleMissing(_) => Endpoint::HandleMissing,
            AnalysisResponse::HandleOutliers(_) => Endpoint::HandleOutliers,
        }
    }
}

/// Derived workflow status governing which actions are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStage {
    Idle,
    DatasetReady,
    Analyzed,
}

impl Default for WorkflowStage {
    fn default() -> Self {
        WorkflowStage::Idle
    }
}

/// Immutable copy of the session for presentation layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub dataset: Option<String>,
    pub columns: Vec<String>,
    pub target: Option<String>,
    pub feature: Option<String>,
    pub stage: WorkflowStage,
}

/// Events emitted by the orchestrator and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    ActionStarted {
        kind: ActionKind,
    },
    ActionCompleted {
        kind: ActionKind,
        payload: AnalysisResponse,
    },
    ActionFailed {
        kind: ActionKind,
        error: WorkflowError,
    },
    Rendered {
        kind: ActionKind,
        plan: RenderPlan,
    },
    SessionUpdated {
        snapshot: SessionSnapshot,
    },
    Info(String),
}
