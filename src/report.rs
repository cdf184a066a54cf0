//! Text rendering of plans for CLI output and the activity log.

use crate::render::{RenderItem, RenderPlan};

/// Longest prefix of an image reference shown in text surfaces. References
/// are usually base64 data URIs far too long to print.
const IMAGE_PREVIEW_CHARS: usize = 48;

/// Pre-formatted lines for one plan.
pub fn build_text_report(plan: &RenderPlan) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(plan.title.clone());
    for item in &plan.items {
        match item {
            RenderItem::Field { label, value } => lines.push(format!("{label}: {value}")),
            RenderItem::Image { label, reference } => {
                lines.push(format!("{label}: {}", image_preview(reference)));
            }
            RenderItem::Tree { label, lines: tree } => {
                lines.push(format!("{label}:"));
                for line in tree {
                    lines.push(format!("  {line}"));
                }
            }
        }
    }
    lines
}

/// Shorten an image reference so a line of text stays readable.
pub fn image_preview(reference: &str) -> String {
    let total = reference.chars().count();
    if total <= IMAGE_PREVIEW_CHARS {
        return reference.to_string();
    }
    let head: String = reference.chars().take(IMAGE_PREVIEW_CHARS).collect();
    format!("{head}... ({total} chars)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Surface;

    #[test]
    fn report_lines_cover_every_item_kind() {
        let plan = RenderPlan {
            title: "Outliers handled".into(),
            surface: Surface::Visualization,
            items: vec![
                RenderItem::Image {
                    label: "Outlier plot".into(),
                    reference: "data:image/png;base64,AAAA".into(),
                },
                RenderItem::Tree {
                    label: "Outliers handled".into(),
                    lines: vec!["age: 4".into(), "income: 2".into()],
                },
                RenderItem::Field {
                    label: "Updated file".into(),
                    value: "uploads/data_cleaned.csv".into(),
                },
            ],
        };
        assert_eq!(
            build_text_report(&plan),
            vec![
                "Outliers handled",
                "Outlier plot: data:image/png;base64,AAAA",
                "Outliers handled:",
                "  age: 4",
                "  income: 2",
                "Updated file: uploads/data_cleaned.csv",
            ]
        );
    }

    #[test]
    fn long_image_references_are_truncated_with_a_length() {
        let reference = format!("data:image/png;base64,{}", "Q".repeat(4000));
        let preview = image_preview(&reference);
        assert!(preview.starts_with("data:image/png;base64,Q"));
        assert!(preview.ends_with(&format!("... ({} chars)", reference.chars().count())));

        assert_eq!(image_preview("plots/hist.png"), "plots/hist.png");
    }
}
