//! Store contracts
//!
//! The engine never talks to a database directly. Hosts hand it a value
//! implementing these traits: [`crate::repository::ToolRepository`] for
//! SQLite, or [`crate::store::MemoryStore`] for tests.

use async_trait::async_trait;

use crate::lifecycle::{
    error::LifecycleResult,
    types::{
        Alert, Inspection, InspectionWithTool, NewAlert, NewInspection, NewUser, Page, Tool,
        ToolFilter, User,
    },
};

#[async_trait]
pub trait ToolStore {
    async fn get_tool(&self, id: i64) -> LifecycleResult<Option<Tool>>;

    async fn find_tool_by_qr(&self, qr_code: &str) -> LifecycleResult<Option<Tool>>;

    /// Tools matching `filter`, ordered by id ascending.
    async fn list_tools(&self, filter: &ToolFilter, page: Page) -> LifecycleResult<Vec<Tool>>;

    /// Insert a tool whose derived fields are already filled in, together
    /// with `alert`. The id on `tool` is ignored; the alert is linked to the
    /// newly assigned id. Both become visible or neither does.
    async fn insert_tool(
        &self,
        tool: &Tool,
        alert: Option<&NewAlert>,
    ) -> LifecycleResult<(Tool, Option<Alert>)>;

    /// Overwrite the stored tool and save `alert` in the same unit.
    async fn update_tool(&self, tool: &Tool, alert: Option<&NewAlert>) -> LifecycleResult<Option<Alert>>;

    /// Delete the tool and its inspections, clearing the tool reference on
    /// any alerts that point at it, and save `alert` in the same unit.
    /// Returns `false` and writes nothing if no such tool exists.
    async fn delete_tool(&self, id: i64, alert: Option<&NewAlert>) -> LifecycleResult<bool>;
}

#[async_trait]
pub trait InspectionStore {
    /// Persist the inspection, the updated tool and the optional alert as a
    /// single unit. Either all of them become visible or none do.
    async fn commit_inspection(
        &self,
        inspection: &NewInspection,
        tool: &Tool,
        alert: Option<&NewAlert>,
    ) -> LifecycleResult<(Inspection, Option<Alert>)>;

    /// Inspections of one tool, newest first.
    async fn list_inspections_by_tool(&self, tool_id: i64) -> LifecycleResult<Vec<Inspection>>;

    /// Most recent inspections across all tools, newest first.
    async fn list_recent_inspections(&self, page: Page) -> LifecycleResult<Vec<InspectionWithTool>>;
}

#[async_trait]
pub trait AlertStore {
    async fn save_alert(&self, alert: &NewAlert) -> LifecycleResult<Alert>;

    async fn get_alert(&self, id: i64) -> LifecycleResult<Option<Alert>>;

    /// Persisted alerts, newest first.
    async fn list_alerts(&self, page: Page) -> LifecycleResult<Vec<Alert>>;

    /// Returns `false` if no such alert exists.
    async fn mark_alert_read(&self, id: i64) -> LifecycleResult<bool>;

    /// Returns `false` if no such alert exists.
    async fn mark_alert_resolved(&self, id: i64) -> LifecycleResult<bool>;
}

#[async_trait]
pub trait UserStore {
    async fn get_user(&self, id: i64) -> LifecycleResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> LifecycleResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> LifecycleResult<Option<User>>;

    /// Insert the user and `alert` as one unit.
    async fn insert_user(
        &self,
        user: &NewUser,
        alert: Option<&NewAlert>,
    ) -> LifecycleResult<(User, Option<Alert>)>;
}

/// Everything the engine needs from its backing store.
pub trait LifecycleStore: ToolStore + InspectionStore + AlertStore + UserStore + Send + Sync {}

impl<T> LifecycleStore for T where T: ToolStore + InspectionStore + AlertStore + UserStore + Send + Sync {}
