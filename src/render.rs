//! Turns typed response payloads into presentation-neutral render plans.
//!
//! Rendering is pure: a payload plus the request that produced it map to a
//! [`RenderPlan`] describing what to show and where. The TUI and the one-shot
//! text/JSON modes consume the same plans, so nothing here touches terminals
//! or stdout.

use serde_json::Value;

use crate::error::WorkflowError;
use crate::model::{
    AnalysisReport, AnalysisRequest, AnalysisResponse, CorrelationReport, DistributionReport,
    ImputationReport, OutlierReport, SummaryReport, UploadReceipt,
};

/// Where a plan belongs in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Short confirmations; the TUI appends these to the activity log.
    Controls,
    /// Image-bearing results; shown in the visualization panel.
    Visualization,
    /// Structured text results; shown in the scrollable exploration panel.
    Exploration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderItem {
    Field { label: String, value: String },
    /// An image reference as delivered by the service, typically a data URI.
    /// Terminals cannot draw it, so surfaces show the label and hand the
    /// reference to the clipboard/export paths.
    Image { label: String, reference: String },
    Tree { label: String, lines: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub title: String,
    pub surface: Surface,
    pub items: Vec<RenderItem>,
}

/// Build the plan for a completed action, or a render error when the payload
/// does not answer the request that was sent.
pub fn render(
    request: &AnalysisRequest,
    payload: &AnalysisResponse,
) -> Result<RenderPlan, WorkflowError> {
    let plan = match (request, payload) {
        (AnalysisRequest::Upload { .. }, AnalysisResponse::Upload(receipt)) => {
            upload_plan(receipt)
        }
        (AnalysisRequest::Analyze { .. }, AnalysisResponse::Analyze(report)) => {
            analyze_plan(report)
        }
        (AnalysisRequest::Summarize { .. }, AnalysisResponse::Summary(report)) => {
            summary_plan(report)
        }
        (AnalysisRequest::Correlation { .. }, AnalysisResponse::Correlation(report)) => {
            correlation_plan(report)
        }
        (AnalysisRequest::Distribution { feature, .. }, AnalysisResponse::Distribution(report)) => {
            distribution_plan(feature, report)
        }
        (AnalysisRequest::HandleMissing { .. }, AnalysisResponse::HandleMissing(report)) => {
            imputation_plan(report)
        }
        (AnalysisRequest::HandleOutliers { .. }, AnalysisResponse::HandleOutliers(report)) => {
            outlier_plan(report)
        }
        (request, payload) => {
            return Err(WorkflowError::Render(format!(
                "{} payload does not answer a {} request",
                payload.endpoint().path(),
                request.endpoint().path()
            )))
        }
    };
    Ok(plan)
}

fn upload_plan(receipt: &UploadReceipt) -> RenderPlan {
    RenderPlan {
        title: "Dataset uploaded".to_string(),
        surface: Surface::Controls,
        items: vec![
            RenderItem::Field {
                label: "Stored as".to_string(),
                value: receipt.filepath.clone(),
            },
            RenderItem::Field {
                label: "Columns".to_string(),
                value: receipt.columns.join(", "),
            },
        ],
    }
}

fn analyze_plan(report: &AnalysisReport) -> RenderPlan {
    let mut items = Vec::new();
    if let Some(reference) = &report.plots.heatmap {
        items.push(RenderItem::Image {
            label: "Correlation heatmap".to_string(),
            reference: reference.clone(),
        });
    }
    if let Some(reference) = &report.plots.pairplot {
        items.push(RenderItem::Image {
            label: "Pairwise plot".to_string(),
            reference: reference.clone(),
        });
    }
    items.push(RenderItem::Image {
        label: "Target distribution".to_string(),
        reference: report.plots.distribution.clone(),
    });
    items.push(RenderItem::Field {
        label: "Model score".to_string(),
        value: report.model_score.to_string(),
    });
    items.push(RenderItem::Field {
        label: "Target type".to_string(),
        value: report.target_type.clone(),
    });
    RenderPlan {
        title: "Analysis results".to_string(),
        surface: Surface::Visualization,
        items,
    }
}

fn summary_plan(report: &SummaryReport) -> RenderPlan {
    RenderPlan {
        title: "Dataset summary".to_string(),
        surface: Surface::Exploration,
        items: vec![
            RenderItem::Tree {
                label: "Summary".to_string(),
                lines: value_lines(&report.summary),
            },
            RenderItem::Tree {
                label: "Missing values".to_string(),
                lines: value_lines(&report.missing_values),
            },
        ],
    }
}

fn correlation_plan(report: &CorrelationReport) -> RenderPlan {
    RenderPlan {
        title: "Correlations with target".to_string(),
        surface: Surface::Exploration,
        items: vec![RenderItem::Tree {
            label: "Correlations".to_string(),
            lines: value_lines(&report.correlations),
        }],
    }
}

fn distribution_plan(feature: &str, report: &DistributionReport) -> RenderPlan {
    RenderPlan {
        title: format!("Distribution of {feature}"),
        surface: Surface::Visualization,
        items: vec![RenderItem::Image {
            label: "Distribution plot".to_string(),
            reference: report.distribution_plot.clone(),
        }],
    }
}

fn imputation_plan(report: &ImputationReport) -> RenderPlan {
    let mut items = vec![RenderItem::Tree {
        label: "Handled missing values".to_string(),
        lines: value_lines(&report.handled_missing),
    }];
    if let Some(path) = &report.updated_filepath {
        items.push(RenderItem::Field {
            label: "Updated file".to_string(),
            value: path.clone(),
        });
    }
    RenderPlan {
        title: "Missing values handled".to_string(),
        surface: Surface::Exploration,
        items,
    }
}

fn outlier_plan(report: &OutlierReport) -> RenderPlan {
    let mut items = vec![
        RenderItem::Image {
            label: "Outlier plot".to_string(),
            reference: report.outlier_plot.clone(),
        },
        RenderItem::Tree {
            label: "Outliers handled".to_string(),
            lines: value_lines(&report.outliers_handled),
        },
    ];
    if let Some(path) = &report.updated_filepath {
        items.push(RenderItem::Field {
            label: "Updated file".to_string(),
            value: path.clone(),
        });
    }
    RenderPlan {
        title: "Outliers handled".to_string(),
        surface: Surface::Visualization,
        items,
    }
}

/// Flatten arbitrary nested JSON into indented text lines. Summary and
/// correlation payloads vary by dataset, so no fixed schema is assumed.
pub fn value_lines(value: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    push_value_lines(&mut lines, value, 0);
    lines
}

fn push_value_lines(lines: &mut Vec<String>, value: &Value, depth: usize) {
    let pad = "  ".repeat(depth);
    match value {
        Value::Object(map) if map.is_empty() => lines.push(format!("{pad}(empty)")),
        Value::Object(map) => {
            for (key, child) in map {
                match child {
                    Value::Object(_) | Value::Array(_) => {
                        lines.push(format!("{pad}{key}:"));
                        push_value_lines(lines, child, depth + 1);
                    }
                    scalar => lines.push(format!("{pad}{key}: {}", scalar_text(scalar))),
                }
            }
        }
        Value::Array(items) if items.is_empty() => lines.push(format!("{pad}(empty)")),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(_) | Value::Array(_) => {
                        lines.push(format!("{pad}-"));
                        push_value_lines(lines, item, depth + 1);
                    }
                    scalar => lines.push(format!("{pad}- {}", scalar_text(scalar))),
                }
            }
        }
        scalar => lines.push(format!("{pad}{}", scalar_text(scalar))),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlotSet;
    use serde_json::json;

    fn analyze_request() -> AnalysisRequest {
        AnalysisRequest::Analyze {
            filepath: "uploads/data.csv".into(),
            target_column: "price".into(),
        }
    }

    #[test]
    fn analyze_plan_lists_every_present_plot() {
        let payload = AnalysisResponse::Analyze(AnalysisReport {
            plots: PlotSet {
                heatmap: Some("data:image/png;base64,AAAA".into()),
                pairplot: Some("data:image/png;base64,BBBB".into()),
                distribution: "data:image/png;base64,CCCC".into(),
            },
            model_score: 0.87,
            target_type: "Categorical".into(),
        });
        let plan = render(&analyze_request(), &payload).unwrap();

        assert_eq!(plan.surface, Surface::Visualization);
        let images = plan
            .items
            .iter()
            .filter(|item| matches!(item, RenderItem::Image { .. }))
            .count();
        let fields = plan
            .items
            .iter()
            .filter(|item| matches!(item, RenderItem::Field { .. }))
            .count();
        assert_eq!(images, 3);
        assert_eq!(fields, 2);
    }

    #[test]
    fn analyze_plan_skips_plots_the_service_omitted() {
        let payload = AnalysisResponse::Analyze(AnalysisReport {
            plots: PlotSet {
                heatmap: None,
                pairplot: None,
                distribution: "data:image/png;base64,CCCC".into(),
            },
            model_score: 0.5,
            target_type: "Continuous".into(),
        });
        let plan = render(&analyze_request(), &payload).unwrap();
        let images: Vec<_> = plan
            .items
            .iter()
            .filter(|item| matches!(item, RenderItem::Image { .. }))
            .collect();
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn mismatched_payload_is_a_render_error() {
        let payload = AnalysisResponse::Distribution(DistributionReport {
            distribution_plot: "data:image/png;base64,DDDD".into(),
        });
        let err = render(&analyze_request(), &payload).unwrap_err();
        assert!(matches!(err, WorkflowError::Render(_)));
    }

    #[test]
    fn upload_plan_confirms_on_the_controls_surface() {
        let request = AnalysisRequest::Upload {
            file: "data.csv".into(),
        };
        let payload = AnalysisResponse::Upload(UploadReceipt {
            filepath: "uploads/data.csv".into(),
            columns: vec!["A".into(), "B".into()],
        });
        let plan = render(&request, &payload).unwrap();
        assert_eq!(plan.surface, Surface::Controls);
        assert!(plan.items.contains(&RenderItem::Field {
            label: "Columns".into(),
            value: "A, B".into(),
        }));
    }

    #[test]
    fn value_lines_flattens_nesting_and_arrays() {
        let value = json!({
            "count": 3,
            "columns": ["A", "B"],
            "stats": { "mean": 1.5, "tags": [] }
        });
        assert_eq!(
            value_lines(&value),
            vec![
                "count: 3",
                "columns:",
                "  - A",
                "  - B",
                "stats:",
                "  mean: 1.5",
                "  tags:",
                "    (empty)",
            ]
        );
    }

    #[test]
    fn value_lines_handles_scalars_and_empty_objects() {
        assert_eq!(value_lines(&json!("plain")), vec!["plain"]);
        assert_eq!(value_lines(&json!({})), vec!["(empty)"]);
        assert_eq!(value_lines(&json!(null)), vec!["null"]);
    }
}
