//! Client-side session state.
//!
//! The session tracks what the service knows about (the uploaded dataset and
//! its columns) plus the user's current selections. It never talks to the
//! network itself; the orchestrator mutates it from completed actions.

use crate::error::WorkflowError;
use crate::model::{SessionSnapshot, WorkflowStage};

#[derive(Debug, Default)]
pub struct SessionState {
    dataset: Option<String>,
    columns: Vec<String>,
    target: Option<String>,
    feature: Option<String>,
    analyzed: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server-side reference of the active dataset, if one is established.
    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn feature(&self) -> Option<&str> {
        self.feature.as_deref()
    }

    pub fn stage(&self) -> WorkflowStage {
        if self.dataset.is_none() {
            WorkflowStage::Idle
        } else if self.analyzed {
            WorkflowStage::Analyzed
        } else {
            WorkflowStage::DatasetReady
        }
    }

    /// Install a freshly uploaded dataset. Replaces any previous dataset
    /// wholesale: column list is overwritten, target and feature selections
    /// are cleared, and analysis results no longer apply.
    pub fn set_dataset(&mut self, reference: String, columns: Vec<String>) {
        self.dataset = Some(reference);
        self.columns = columns;
        self.target = None;
        self.feature = None;
        self.analyzed = false;
    }

    /// Select the target column for model-oriented actions. The column must
    /// be one of the active dataset's columns.
    pub fn set_target(&mut self, column: &str) -> Result<(), WorkflowError> {
        let column = column.trim();
        if column.is_empty() {
            return Err(WorkflowError::Validation(
                "no target column selected".into(),
            ));
        }
        if !self.columns.iter().any(|c| c == column) {
            return Err(WorkflowError::Validation(format!(
                "'{column}' is not a column of the active dataset"
            )));
        }
        self.target = Some(column.to_string());
        Ok(())
    }

    /// Set the free-text feature name used by distribution and outlier
    /// actions. Unlike the target it is not checked against the column list;
    /// the service validates it on use.
    pub fn set_feature(&mut self, feature: &str) -> Result<(), WorkflowError> {
        let feature = feature.trim();
        if feature.is_empty() {
            return Err(WorkflowError::Validation("no feature name set".into()));
        }
        self.feature = Some(feature.to_string());
        Ok(())
    }

    pub fn mark_analyzed(&mut self) {
        self.analyzed = true;
    }

    /// Dataset reference for building a request, or the precondition error
    /// every dataset-dependent action reports when none is established.
    pub fn require_dataset(&self) -> Result<String, WorkflowError> {
        self.dataset.clone().ok_or_else(|| {
            WorkflowError::Precondition("no dataset uploaded yet".into())
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            dataset: self.dataset.clone(),
            columns: self.columns.clone(),
            target: self.target.clone(),
            feature: self.feature.clone(),
            stage: self.stage(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_follows_dataset_and_analysis() {
        let mut session = SessionState::new();
        assert_eq!(session.stage(), WorkflowStage::Idle);

        session.set_dataset("server/data.csv".into(), vec!["a".into(), "b".into()]);
        assert_eq!(session.stage(), WorkflowStage::DatasetReady);

        session.mark_analyzed();
        assert_eq!(session.stage(), WorkflowStage::Analyzed);
    }

    #[test]
    fn new_dataset_replaces_selections_and_analysis() {
        let mut session = SessionState::new();
        session.set_dataset("server/first.csv".into(), vec!["x".into(), "y".into()]);
        session.set_target("y").unwrap();
        session.set_feature("x").unwrap();
        session.mark_analyzed();

        session.set_dataset("server/second.csv".into(), vec!["p".into(), "q".into()]);
        assert_eq!(session.dataset(), Some("server/second.csv"));
        assert_eq!(session.columns(), ["p".to_string(), "q".to_string()]);
        assert_eq!(session.target(), None);
        assert_eq!(session.feature(), None);
        assert_eq!(session.stage(), WorkflowStage::DatasetReady);
    }

    #[test]
    fn target_must_be_a_known_column() {
        let mut session = SessionState::new();
        session.set_dataset("server/data.csv".into(), vec!["price".into()]);

        let err = session.set_target("size").unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(session.target(), None);

        session.set_target("price").unwrap();
        assert_eq!(session.target(), Some("price"));
    }

    #[test]
    fn empty_selections_are_rejected() {
        let mut session = SessionState::new();
        session.set_dataset("server/data.csv".into(), vec!["a".into()]);

        assert!(matches!(
            session.set_target("  "),
            Err(WorkflowError::Validation(_))
        ));
        assert!(matches!(
            session.set_feature(""),
            Err(WorkflowError::Validation(_))
        ));
    }

    #[test]
    fn require_dataset_reports_precondition_when_idle() {
        let session = SessionState::new();
        assert!(matches!(
            session.require_dataset(),
            Err(WorkflowError::Precondition(_))
        ));

        let mut session = SessionState::new();
        session.set_dataset("server/data.csv".into(), vec![]);
        assert_eq!(session.require_dataset().unwrap(), "server/data.csv");
    }
}
