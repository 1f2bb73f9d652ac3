//! Alert Synthesizer
//!
//! Computes the non-persisted alerts for expired, expiring and scrapped
//! tools and merges them in front of a page of persisted alerts.
//!
//! Synthetic alerts carry negative identifiers derived from the tool id and
//! a category index (see [`SyntheticAlertId`]). The same tool and category
//! always yield the same id, so polling clients can deduplicate without any
//! server-side state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::lifecycle::{
    config::LifecycleConfig,
    types::{Alert, AlertKind, AlertSeverity, Tool, ToolStatus},
};

/// Multiplier separating tool ids from category indices in synthetic ids.
pub const CATEGORY_STRIDE: i64 = 1000;

/// Categories of alerts computed on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntheticCategory {
    Expired,
    ExpiringSoon,
    Scrap,
}

impl SyntheticCategory {
    pub const ALL: [SyntheticCategory; 3] = [
        SyntheticCategory::Expired,
        SyntheticCategory::ExpiringSoon,
        SyntheticCategory::Scrap,
    ];

    /// Always in `1..CATEGORY_STRIDE`, so no synthetic id is ever zero.
    pub fn index(&self) -> i64 {
        match self {
            SyntheticCategory::Expired => 1,
            SyntheticCategory::ExpiringSoon => 2,
            SyntheticCategory::Scrap => 3,
        }
    }

    pub fn from_index(index: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.index() == index)
    }

    pub fn kind(&self) -> AlertKind {
        match self {
            SyntheticCategory::Expired => AlertKind::Expired,
            SyntheticCategory::ExpiringSoon => AlertKind::ExpiringSoon,
            SyntheticCategory::Scrap => AlertKind::Scrap,
        }
    }

    pub fn severity(&self) -> AlertSeverity {
        match self {
            SyntheticCategory::ExpiringSoon => AlertSeverity::Warning,
            SyntheticCategory::Expired | SyntheticCategory::Scrap => AlertSeverity::Critical,
        }
    }
}

/// Bijective encoding of `(tool_id, category)` into a negative alert id:
/// `-(tool_id * CATEGORY_STRIDE + category.index())`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyntheticAlertId {
    pub tool_id: i64,
    pub category: SyntheticCategory,
}

impl SyntheticAlertId {
    pub fn new(tool_id: i64, category: SyntheticCategory) -> Self {
        Self { tool_id, category }
    }

    /// `None` for negative tool ids or when the id would overflow.
    pub fn encode(&self) -> Option<i64> {
        if self.tool_id < 0 {
            return None;
        }
        self.tool_id
            .checked_mul(CATEGORY_STRIDE)
            .and_then(|base| base.checked_add(self.category.index()))
            .map(|raw| -raw)
    }

    pub fn decode(id: i64) -> Option<Self> {
        if id >= 0 {
            return None;
        }
        let raw = id.checked_neg()?;
        let category = SyntheticCategory::from_index(raw % CATEGORY_STRIDE)?;
        Some(Self {
            tool_id: raw / CATEGORY_STRIDE,
            category,
        })
    }
}

/// Which synthetic category, if any, an unscrapped tool's expiry falls into.
pub fn expiry_category(
    expiry: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &LifecycleConfig,
) -> Option<SyntheticCategory> {
    if expiry < now {
        Some(SyntheticCategory::Expired)
    } else if now
        .checked_add_signed(config.expiring_window())
        .map_or(true, |horizon| expiry <= horizon)
    {
        Some(SyntheticCategory::ExpiringSoon)
    } else {
        None
    }
}

/// Compute every synthetic alert for `tools` at instant `now`.
///
/// Expiry alerts for usable tools come first, then scrap alerts, each in the
/// order the tools were given. Expiry alerts are dated when their condition
/// began, so an unchanged inventory yields an identical feed.
pub fn synthesize_alerts(tools: &[Tool], now: DateTime<Utc>, config: &LifecycleConfig) -> Vec<Alert> {
    let expiry_alerts = tools
        .iter()
        .filter(|tool| tool.status == ToolStatus::Usable)
        .filter_map(|tool| {
            let expiry = tool.expiry_date?;
            let category = expiry_category(expiry, now, config)?;
            build_alert(tool, category, expiry, now, config)
        });

    let scrap_alerts = tools
        .iter()
        .filter(|tool| tool.status == ToolStatus::Scrap)
        .filter_map(|tool| {
            let date = tool.last_inspection_date.unwrap_or(now);
            build_alert(tool, SyntheticCategory::Scrap, date, now, config)
        });

    expiry_alerts.chain(scrap_alerts).collect()
}

/// Place synthetic alerts ahead of the persisted page.
pub fn merge_feed(synthetic: Vec<Alert>, persisted: Vec<Alert>) -> Vec<Alert> {
    let mut feed = synthetic;
    feed.extend(persisted);
    feed
}

/// Per-category counts of the synthetic feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedSummary {
    pub expired: usize,
    pub expiring_soon: usize,
    pub scrap: usize,
}

impl FeedSummary {
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        alerts.iter().fold(Self::default(), |mut acc, alert| {
            match alert.kind {
                AlertKind::Expired => acc.expired += 1,
                AlertKind::ExpiringSoon => acc.expiring_soon += 1,
                AlertKind::Scrap => acc.scrap += 1,
                _ => {}
            }
            acc
        })
    }
}

fn build_alert(
    tool: &Tool,
    category: SyntheticCategory,
    reference: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &LifecycleConfig,
) -> Option<Alert> {
    let Some(id) = SyntheticAlertId::new(tool.id, category).encode() else {
        tracing::warn!(tool_id = tool.id, "Tool id cannot be encoded as a synthetic alert id");
        return None;
    };

    let (title, message, date) = match category {
        SyntheticCategory::Expired => (
            "Tool Expired",
            format!(
                "Tool {} ({}) expired on {}",
                tool.description,
                tool.qr_code,
                reference.format("%Y-%m-%d")
            ),
            reference,
        ),
        SyntheticCategory::ExpiringSoon => (
            "Tool Expiring Soon",
            format!(
                "Tool {} ({}) expires on {} ({} days remaining)",
                tool.description,
                tool.qr_code,
                reference.format("%Y-%m-%d"),
                (reference - now).num_days()
            ),
            // the moment the tool entered the warning window
            reference
                .checked_sub_signed(config.expiring_window())
                .unwrap_or(reference),
        ),
        SyntheticCategory::Scrap => (
            "Tool Scrapped",
            format!(
                "Tool {} ({}) has been marked as scrap and must not be used",
                tool.description, tool.qr_code
            ),
            reference,
        ),
    };

    Some(Alert {
        id,
        kind: category.kind(),
        severity: category.severity(),
        title: title.to_string(),
        message,
        tool_id: Some(tool.id),
        site: tool.current_site.clone(),
        date,
        is_read: false,
        is_resolved: false,
    })
}
