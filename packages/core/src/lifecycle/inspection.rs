//! Inspection Processor
//!
//! Folds a freshly recorded inspection into the owning tool's derived fields
//! and decides whether a low-usability alert has to be persisted with it.

use crate::lifecycle::{
    config::LifecycleConfig,
    types::{AlertKind, AlertSeverity, InspectionResult, NewAlert, NewInspection, Tool, ToolStatus},
};

/// Result strings that scrap the tool.
pub const FAILING_RESULTS: &[&str] = &["fail", "not-usable", "scrap"];

/// How an inspection result string maps onto tool state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Usable,
    Scrap,
}

impl Verdict {
    /// Classify a free-form result. Anything outside [`FAILING_RESULTS`],
    /// including unrecognised strings, counts as usable.
    pub fn classify(result: &str) -> Self {
        if FAILING_RESULTS.contains(&result) {
            Verdict::Scrap
        } else {
            Verdict::Usable
        }
    }
}

/// Everything an inspection changes, to be committed in one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionEffects {
    pub tool: Tool,
    pub alert: Option<NewAlert>,
}

/// Apply `inspection` to `tool`, returning the updated tool and the
/// low-usability alert to persist, if any.
pub fn apply_inspection(
    tool: &Tool,
    inspection: &NewInspection,
    config: &LifecycleConfig,
) -> InspectionEffects {
    let mut updated = tool.clone();
    updated.last_inspection_date = Some(inspection.date);
    updated.usability_percentage = inspection.usability_percentage;

    match Verdict::classify(&inspection.result) {
        Verdict::Scrap => {
            updated.status = ToolStatus::Scrap;
            updated.inspection_result = InspectionResult::NotUsable;
        }
        Verdict::Usable => {
            updated.status = ToolStatus::Usable;
            updated.inspection_result = InspectionResult::Usable;
        }
    }

    let alert = inspection
        .usability_percentage
        .filter(|pct| *pct < config.low_usability_threshold)
        .map(|pct| low_usability_alert(&updated, pct, inspection, config));

    InspectionEffects { tool: updated, alert }
}

fn low_usability_alert(
    tool: &Tool,
    percentage: f64,
    inspection: &NewInspection,
    config: &LifecycleConfig,
) -> NewAlert {
    NewAlert {
        kind: AlertKind::LowUsability,
        severity: AlertSeverity::Critical,
        title: "Critical Usability Level".to_string(),
        message: format!(
            "Tool usability has dropped to {}%, which is below the safe threshold of {}%",
            percentage, config.low_usability_threshold
        ),
        tool_id: Some(tool.id),
        site: tool.current_site.clone(),
        date: inspection.date,
    }
}
