use std::path::PathBuf;

use crate::model::ActionKind;

/// Commands emitted by UI layers, one per user affordance.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Upload a local dataset file, replacing the active dataset.
    Upload { path: PathBuf },
    /// Choose the target column for model-oriented actions.
    SelectTarget { column: String },
    /// Set the free-text feature used by distribution and outlier actions.
    SetFeature { feature: String },
    Analyze,
    Summarize,
    Correlation,
    Distribution,
    HandleMissing,
    HandleOutliers,
    Quit,
}

impl Command {
    /// Action this command maps to, for event attribution. Quit is not an
    /// action.
    pub(crate) fn kind(&self) -> Option<ActionKind> {
        match self {
            Command::Upload { .. } => Some(ActionKind::Upload),
            Command::SelectTarget { .. } => Some(ActionKind::SelectTarget),
            Command::SetFeature { .. } => Some(ActionKind::SetFeature),
            Command::Analyze => Some(ActionKind::Analyze),
            Command::Summarize => Some(ActionKind::Summarize),
            Command::Correlation => Some(ActionKind::Correlation),
            Command::Distribution => Some(ActionKind::Distribution),
            Command::HandleMissing => Some(ActionKind::HandleMissing),
            Command::HandleOutliers => Some(ActionKind::HandleOutliers),
            Command::Quit => None,
        }
    }
}
