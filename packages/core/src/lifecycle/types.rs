//! Core data types for tools, inspections, alerts and users

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lifecycle::error::LifecycleError;

/// Operational status of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolStatus {
    Usable,
    Scrap,
}

/// Outcome of the most recent inspection as recorded on the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InspectionResult {
    Usable,
    NotUsable,
}

/// Alert category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    #[serde(rename = "new-tool")]
    NewTool,
    #[serde(rename = "tool-update")]
    ToolUpdate,
    #[serde(rename = "tool-deleted")]
    ToolDeleted,
    #[serde(rename = "new-user")]
    NewUser,
    #[serde(rename = "low-usability")]
    LowUsability,
    #[serde(rename = "expired")]
    Expired,
    #[serde(rename = "expiring_soon")]
    ExpiringSoon,
    #[serde(rename = "scrap")]
    Scrap,
}

/// Alert severity, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Usable => "usable",
            ToolStatus::Scrap => "scrap",
        }
    }
}

impl InspectionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            InspectionResult::Usable => "usable",
            InspectionResult::NotUsable => "not-usable",
        }
    }
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::NewTool => "new-tool",
            AlertKind::ToolUpdate => "tool-update",
            AlertKind::ToolDeleted => "tool-deleted",
            AlertKind::NewUser => "new-user",
            AlertKind::LowUsability => "low-usability",
            AlertKind::Expired => "expired",
            AlertKind::ExpiringSoon => "expiring_soon",
            AlertKind::Scrap => "scrap",
        }
    }

    /// Kinds that are only ever computed on read and never persisted.
    pub fn is_synthetic(&self) -> bool {
        matches!(
            self,
            AlertKind::Expired | AlertKind::ExpiringSoon | AlertKind::Scrap
        )
    }
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

impl FromStr for ToolStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "usable" => Ok(ToolStatus::Usable),
            "scrap" => Ok(ToolStatus::Scrap),
            other => Err(LifecycleError::validation(format!(
                "Unknown tool status '{}'",
                other
            ))),
        }
    }
}

impl FromStr for InspectionResult {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "usable" => Ok(InspectionResult::Usable),
            "not-usable" => Ok(InspectionResult::NotUsable),
            other => Err(LifecycleError::validation(format!(
                "Unknown inspection result '{}'",
                other
            ))),
        }
    }
}

impl FromStr for AlertKind {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new-tool" => Ok(AlertKind::NewTool),
            "tool-update" => Ok(AlertKind::ToolUpdate),
            "tool-deleted" => Ok(AlertKind::ToolDeleted),
            "new-user" => Ok(AlertKind::NewUser),
            "low-usability" => Ok(AlertKind::LowUsability),
            "expired" => Ok(AlertKind::Expired),
            "expiring_soon" => Ok(AlertKind::ExpiringSoon),
            "scrap" => Ok(AlertKind::Scrap),
            other => Err(LifecycleError::validation(format!(
                "Unknown alert type '{}'",
                other
            ))),
        }
    }
}

impl FromStr for AlertSeverity {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(AlertSeverity::Info),
            "warning" => Ok(AlertSeverity::Warning),
            "critical" => Ok(AlertSeverity::Critical),
            other => Err(LifecycleError::validation(format!(
                "Unknown alert severity '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---- Tools ----

/// A tracked physical asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: i64,
    pub qr_code: String,
    pub description: String,
    pub make: String,
    pub capacity: String,
    pub safe_working_load: String,
    pub purchaser_name: Option<String>,
    pub purchaser_contact: Option<String>,
    pub supplier_code: Option<String>,
    pub test_certificate: Option<String>,
    pub date_of_supply: Option<DateTime<Utc>>,
    /// Validity in whole years, counted from `date_of_supply`.
    pub validity_period: Option<u32>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub last_inspection_date: Option<DateTime<Utc>>,
    pub inspection_result: InspectionResult,
    pub usability_percentage: Option<f64>,
    pub status: ToolStatus,
    pub subcontractor_name: Option<String>,
    pub subcontractor_code: Option<String>,
    pub remarks: Option<String>,
    pub previous_site: Option<String>,
    pub current_site: Option<String>,
    pub next_site: Option<String>,
    pub job_code: Option<String>,
    pub job_description: Option<String>,
}

/// Input for registering a new tool. `expiry_date` is only used when the
/// schedule (supply date + validity) is incomplete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTool {
    pub qr_code: String,
    pub description: String,
    pub make: String,
    pub capacity: String,
    pub safe_working_load: String,
    #[serde(default)]
    pub purchaser_name: Option<String>,
    #[serde(default)]
    pub purchaser_contact: Option<String>,
    #[serde(default)]
    pub supplier_code: Option<String>,
    #[serde(default)]
    pub test_certificate: Option<String>,
    #[serde(default)]
    pub date_of_supply: Option<DateTime<Utc>>,
    #[serde(default)]
    pub validity_period: Option<u32>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subcontractor_name: Option<String>,
    #[serde(default)]
    pub subcontractor_code: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub previous_site: Option<String>,
    #[serde(default)]
    pub current_site: Option<String>,
    #[serde(default)]
    pub next_site: Option<String>,
    #[serde(default)]
    pub job_code: Option<String>,
    #[serde(default)]
    pub job_description: Option<String>,
}

/// Sparse update over the fixed set of editable tool fields.
///
/// Absent fields are left untouched. `qr_code` is deliberately not part of
/// this set: it is immutable once assigned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolUpdate {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub capacity: Option<String>,
    #[serde(default)]
    pub safe_working_load: Option<String>,
    #[serde(default)]
    pub status: Option<ToolStatus>,
    #[serde(default)]
    pub subcontractor_name: Option<String>,
    #[serde(default)]
    pub subcontractor_code: Option<String>,
    #[serde(default)]
    pub job_code: Option<String>,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub previous_site: Option<String>,
    #[serde(default)]
    pub current_site: Option<String>,
    #[serde(default)]
    pub next_site: Option<String>,
    #[serde(default)]
    pub date_of_supply: Option<DateTime<Utc>>,
    #[serde(default)]
    pub validity_period: Option<u32>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl ToolUpdate {
    /// `true` when the update touches the expiry schedule inputs.
    pub fn touches_schedule(&self) -> bool {
        self.date_of_supply.is_some() || self.validity_period.is_some()
    }

    /// Merge the present fields into `tool`.
    ///
    /// Expiry recomputation is left to the caller; see
    /// [`crate::lifecycle::expiry::refresh_expiry`].
    pub fn merge_into(self, tool: &mut Tool) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }
        fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set(&mut tool.description, self.description);
        set(&mut tool.make, self.make);
        set(&mut tool.capacity, self.capacity);
        set(&mut tool.safe_working_load, self.safe_working_load);
        set_opt(&mut tool.subcontractor_name, self.subcontractor_name);
        set_opt(&mut tool.subcontractor_code, self.subcontractor_code);
        set_opt(&mut tool.job_code, self.job_code);
        set_opt(&mut tool.job_description, self.job_description);
        set_opt(&mut tool.remarks, self.remarks);
        set_opt(&mut tool.previous_site, self.previous_site);
        set_opt(&mut tool.current_site, self.current_site);
        set_opt(&mut tool.next_site, self.next_site);
        set_opt(&mut tool.date_of_supply, self.date_of_supply);
        set_opt(&mut tool.validity_period, self.validity_period);
        set_opt(&mut tool.expiry_date, self.expiry_date);

        if let Some(status) = self.status {
            tool.status = status;
            // scrap always implies a failed inspection result
            if status == ToolStatus::Scrap {
                tool.inspection_result = InspectionResult::NotUsable;
            }
        }
    }
}

/// Filter for tool listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolFilter {
    /// Substring matched against description or QR code.
    pub search: Option<String>,
    pub status: Option<ToolStatus>,
}

impl ToolFilter {
    pub fn matches(&self, tool: &Tool) -> bool {
        if let Some(status) = self.status {
            if tool.status != status {
                return false;
            }
        }
        match self.search.as_deref() {
            Some(needle) => tool.description.contains(needle) || tool.qr_code.contains(needle),
            None => true,
        }
    }
}

// ---- Inspections ----

/// A stored inspection. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub id: i64,
    pub tool_id: i64,
    pub inspector_id: i64,
    pub date: DateTime<Utc>,
    pub result: String,
    pub usability_percentage: Option<f64>,
    pub remarks: Option<String>,
    pub photos: Option<String>,
}

/// Inspection payload as submitted by a client. The inspector is never taken
/// from here; it comes from the caller's identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspectionRequest {
    pub tool_id: i64,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    pub result: String,
    #[serde(default)]
    pub usability_percentage: Option<f64>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub photos: Option<String>,
}

/// A fully resolved inspection ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInspection {
    pub tool_id: i64,
    pub inspector_id: i64,
    pub date: DateTime<Utc>,
    pub result: String,
    pub usability_percentage: Option<f64>,
    pub remarks: Option<String>,
    pub photos: Option<String>,
}

/// An inspection with its tool attached, for "recent inspections" views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionWithTool {
    #[serde(flatten)]
    pub inspection: Inspection,
    pub tool: Option<Tool>,
}

// ---- Alerts ----

/// A persisted or synthetic alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Positive for persisted alerts, negative for synthetic ones.
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub tool_id: Option<i64>,
    pub site: Option<String>,
    pub date: DateTime<Utc>,
    pub is_read: bool,
    pub is_resolved: bool,
}

impl Alert {
    pub fn is_synthetic(&self) -> bool {
        self.id < 0
    }
}

/// An alert queued for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub tool_id: Option<i64>,
    pub site: Option<String>,
    pub date: DateTime<Utc>,
}

/// Alert payload as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRequest {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub tool_id: Option<i64>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

// ---- Users ----

/// A registered user. Credentials live outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub site: Option<String>,
    pub phone: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

fn default_role() -> String {
    "worker".to_string()
}

// ---- Paging ----

/// Offset/limit window over a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Page {
    /// A window covering every row.
    pub const ALL: Page = Page {
        offset: 0,
        limit: u32::MAX,
    };

    pub fn new(offset: u32, limit: u32) -> Self {
        Self { offset, limit }
    }
}
