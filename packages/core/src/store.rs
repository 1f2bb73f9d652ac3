//! In-memory lifecycle store.
//!
//! `MemoryStore` implements every store contract over plain collections
//! guarded by a single `tokio::sync::RwLock`. Holding one write guard per
//! operation gives the same all-or-nothing visibility the SQLite repository
//! gets from a transaction. Ids are assigned from per-table counters
//! starting at 1.
//!
//! Used by engine tests and anywhere a throwaway store is enough.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::lifecycle::{
    error::{LifecycleError, LifecycleResult},
    stores::{AlertStore, InspectionStore, ToolStore, UserStore},
    types::{
        Alert, Inspection, InspectionWithTool, NewAlert, NewInspection, NewUser, Page, Tool,
        ToolFilter, User,
    },
};

#[derive(Debug, Default)]
struct Tables {
    tools: BTreeMap<i64, Tool>,
    inspections: BTreeMap<i64, Inspection>,
    alerts: BTreeMap<i64, Alert>,
    users: BTreeMap<i64, User>,
    next_tool_id: i64,
    next_inspection_id: i64,
    next_alert_id: i64,
    next_user_id: i64,
}

impl Tables {
    fn insert_alert(&mut self, alert: &NewAlert) -> Alert {
        self.next_alert_id += 1;
        let stored = Alert {
            id: self.next_alert_id,
            kind: alert.kind,
            severity: alert.severity,
            title: alert.title.clone(),
            message: alert.message.clone(),
            tool_id: alert.tool_id,
            site: alert.site.clone(),
            date: alert.date,
            is_read: false,
            is_resolved: false,
        };
        self.alerts.insert(stored.id, stored.clone());
        stored
    }
}

/// Lock-guarded in-memory implementation of the store contracts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted alerts.
    pub async fn alert_count(&self) -> usize {
        self.tables.read().await.alerts.len()
    }

    /// Number of stored inspections.
    pub async fn inspection_count(&self) -> usize {
        self.tables.read().await.inspections.len()
    }
}

fn window<T>(items: impl Iterator<Item = T>, page: Page) -> Vec<T> {
    items
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl ToolStore for MemoryStore {
    async fn get_tool(&self, id: i64) -> LifecycleResult<Option<Tool>> {
        Ok(self.tables.read().await.tools.get(&id).cloned())
    }

    async fn find_tool_by_qr(&self, qr_code: &str) -> LifecycleResult<Option<Tool>> {
        let tables = self.tables.read().await;
        Ok(tables.tools.values().find(|t| t.qr_code == qr_code).cloned())
    }

    async fn list_tools(&self, filter: &ToolFilter, page: Page) -> LifecycleResult<Vec<Tool>> {
        let tables = self.tables.read().await;
        Ok(window(
            tables.tools.values().filter(|t| filter.matches(t)).cloned(),
            page,
        ))
    }

    async fn insert_tool(
        &self,
        tool: &Tool,
        alert: Option<&NewAlert>,
    ) -> LifecycleResult<(Tool, Option<Alert>)> {
        let mut tables = self.tables.write().await;
        if tables.tools.values().any(|t| t.qr_code == tool.qr_code) {
            return Err(LifecycleError::conflict(format!(
                "QR code '{}' is already assigned",
                tool.qr_code
            )));
        }
        tables.next_tool_id += 1;
        let mut stored = tool.clone();
        stored.id = tables.next_tool_id;
        tables.tools.insert(stored.id, stored.clone());
        let alert = alert.map(|a| {
            tables.insert_alert(&NewAlert {
                tool_id: Some(stored.id),
                ..a.clone()
            })
        });
        Ok((stored, alert))
    }

    async fn update_tool(&self, tool: &Tool, alert: Option<&NewAlert>) -> LifecycleResult<Option<Alert>> {
        let mut tables = self.tables.write().await;
        match tables.tools.get_mut(&tool.id) {
            Some(slot) => *slot = tool.clone(),
            None => return Err(LifecycleError::not_found("Tool", tool.id)),
        }
        Ok(alert.map(|a| tables.insert_alert(a)))
    }

    async fn delete_tool(&self, id: i64, notice: Option<&NewAlert>) -> LifecycleResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.tools.remove(&id).is_none() {
            return Ok(false);
        }
        tables.inspections.retain(|_, i| i.tool_id != id);
        for alert in tables.alerts.values_mut() {
            if alert.tool_id == Some(id) {
                alert.tool_id = None;
            }
        }
        if let Some(notice) = notice {
            tables.insert_alert(notice);
        }
        Ok(true)
    }
}

#[async_trait]
impl InspectionStore for MemoryStore {
    async fn commit_inspection(
        &self,
        inspection: &NewInspection,
        tool: &Tool,
        alert: Option<&NewAlert>,
    ) -> LifecycleResult<(Inspection, Option<Alert>)> {
        let mut tables = self.tables.write().await;
        if !tables.tools.contains_key(&tool.id) {
            return Err(LifecycleError::not_found("Tool", tool.id));
        }

        tables.next_inspection_id += 1;
        let stored = Inspection {
            id: tables.next_inspection_id,
            tool_id: inspection.tool_id,
            inspector_id: inspection.inspector_id,
            date: inspection.date,
            result: inspection.result.clone(),
            usability_percentage: inspection.usability_percentage,
            remarks: inspection.remarks.clone(),
            photos: inspection.photos.clone(),
        };
        tables.inspections.insert(stored.id, stored.clone());
        tables.tools.insert(tool.id, tool.clone());
        let alert = alert.map(|a| tables.insert_alert(a));

        Ok((stored, alert))
    }

    async fn list_inspections_by_tool(&self, tool_id: i64) -> LifecycleResult<Vec<Inspection>> {
        let tables = self.tables.read().await;
        let mut inspections: Vec<Inspection> = tables
            .inspections
            .values()
            .filter(|i| i.tool_id == tool_id)
            .cloned()
            .collect();
        inspections.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(inspections)
    }

    async fn list_recent_inspections(&self, page: Page) -> LifecycleResult<Vec<InspectionWithTool>> {
        let tables = self.tables.read().await;
        let mut inspections: Vec<&Inspection> = tables.inspections.values().collect();
        inspections.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(window(
            inspections.into_iter().map(|i| InspectionWithTool {
                inspection: i.clone(),
                tool: tables.tools.get(&i.tool_id).cloned(),
            }),
            page,
        ))
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn save_alert(&self, alert: &NewAlert) -> LifecycleResult<Alert> {
        Ok(self.tables.write().await.insert_alert(alert))
    }

    async fn get_alert(&self, id: i64) -> LifecycleResult<Option<Alert>> {
        Ok(self.tables.read().await.alerts.get(&id).cloned())
    }

    async fn list_alerts(&self, page: Page) -> LifecycleResult<Vec<Alert>> {
        let tables = self.tables.read().await;
        let mut alerts: Vec<&Alert> = tables.alerts.values().collect();
        alerts.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(window(alerts.into_iter().cloned(), page))
    }

    async fn mark_alert_read(&self, id: i64) -> LifecycleResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .alerts
            .get_mut(&id)
            .map(|alert| alert.is_read = true)
            .is_some())
    }

    async fn mark_alert_resolved(&self, id: i64) -> LifecycleResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .alerts
            .get_mut(&id)
            .map(|alert| alert.is_resolved = true)
            .is_some())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: i64) -> LifecycleResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> LifecycleResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> LifecycleResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(
        &self,
        user: &NewUser,
        alert: Option<&NewAlert>,
    ) -> LifecycleResult<(User, Option<Alert>)> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(LifecycleError::conflict("Username or email already registered"));
        }
        tables.next_user_id += 1;
        let stored = User {
            id: tables.next_user_id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role.clone(),
            site: user.site.clone(),
            phone: user.phone.clone(),
            status: "active".to_string(),
        };
        tables.users.insert(stored.id, stored.clone());
        let alert = alert.map(|a| tables.insert_alert(a));
        Ok((stored, alert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    use crate::lifecycle::types::{AlertKind, AlertSeverity, InspectionResult, ToolStatus};

    fn make_tool(qr_code: &str) -> Tool {
        Tool {
            id: 0,
            qr_code: qr_code.to_string(),
            description: format!("Chain block {}", qr_code),
            make: "Acme".to_string(),
            capacity: "2T".to_string(),
            safe_working_load: "2000kg".to_string(),
            purchaser_name: None,
            purchaser_contact: None,
            supplier_code: None,
            test_certificate: None,
            date_of_supply: None,
            validity_period: None,
            expiry_date: None,
            last_inspection_date: None,
            inspection_result: InspectionResult::Usable,
            usability_percentage: None,
            status: ToolStatus::Usable,
            subcontractor_name: None,
            subcontractor_code: None,
            remarks: None,
            previous_site: None,
            current_site: Some("Yard A".to_string()),
            next_site: None,
            job_code: None,
            job_description: None,
        }
    }

    fn make_alert(tool_id: Option<i64>, minutes_ago: i64) -> NewAlert {
        NewAlert {
            kind: AlertKind::NewTool,
            severity: AlertSeverity::Info,
            title: "New Tool Added".to_string(),
            message: "added".to_string(),
            tool_id,
            site: None,
            date: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap() - Duration::minutes(minutes_ago),
        }
    }

    // ---- tools ----

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.insert_tool(&make_tool("QR-1"), None).await.unwrap().0;
        let b = store.insert_tool(&make_tool("QR-2"), None).await.unwrap().0;
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_qr_code() {
        let store = MemoryStore::new();
        store.insert_tool(&make_tool("QR-1"), None).await.unwrap().0;
        let err = store.insert_tool(&make_tool("QR-1"), None).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict { .. }));
    }

    #[tokio::test]
    async fn list_tools_applies_filter_and_window() {
        let store = MemoryStore::new();
        for qr in ["QR-1", "QR-2", "QR-3", "X-4"] {
            store.insert_tool(&make_tool(qr), None).await.unwrap().0;
        }
        let filter = ToolFilter {
            search: Some("QR".to_string()),
            status: None,
        };
        let page = store.list_tools(&filter, Page::new(1, 5)).await.unwrap();
        let codes: Vec<_> = page.iter().map(|t| t.qr_code.as_str()).collect();
        assert_eq!(codes, vec!["QR-2", "QR-3"]);
    }

    #[tokio::test]
    async fn delete_tool_clears_alert_links_and_inspections() {
        let store = MemoryStore::new();
        let tool = store.insert_tool(&make_tool("QR-1"), None).await.unwrap().0;
        store.save_alert(&make_alert(Some(tool.id), 0)).await.unwrap();
        let inspection = NewInspection {
            tool_id: tool.id,
            inspector_id: 1,
            date: Utc::now(),
            result: "pass".to_string(),
            usability_percentage: None,
            remarks: None,
            photos: None,
        };
        store.commit_inspection(&inspection, &tool, None).await.unwrap();

        assert!(store.delete_tool(tool.id, None).await.unwrap());

        let alerts = store.list_alerts(Page::ALL).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].tool_id, None);
        assert_eq!(store.inspection_count().await, 0);
    }

    #[tokio::test]
    async fn delete_missing_tool_returns_false() {
        let store = MemoryStore::new();
        assert!(!store.delete_tool(42, Some(&make_alert(None, 0))).await.unwrap());
        assert!(store.list_alerts(Page::ALL).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_tool_stores_alert_linked_to_new_id() {
        let store = MemoryStore::new();
        let (tool, alert) = store
            .insert_tool(&make_tool("QR-1"), Some(&make_alert(None, 0)))
            .await
            .unwrap();
        assert_eq!(alert.unwrap().tool_id, Some(tool.id));

        let err = store
            .insert_tool(&make_tool("QR-1"), Some(&make_alert(None, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict { .. }));
        assert_eq!(store.list_alerts(Page::ALL).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_missing_tool_stores_no_alert() {
        let store = MemoryStore::new();
        let ghost = Tool { id: 7, ..make_tool("QR-7") };
        assert!(store.update_tool(&ghost, Some(&make_alert(Some(7), 0))).await.is_err());
        assert!(store.list_alerts(Page::ALL).await.unwrap().is_empty());
    }

    // ---- alerts ----

    #[tokio::test]
    async fn alerts_are_listed_newest_first() {
        let store = MemoryStore::new();
        store.save_alert(&make_alert(None, 30)).await.unwrap();
        store.save_alert(&make_alert(None, 0)).await.unwrap();
        store.save_alert(&make_alert(None, 60)).await.unwrap();

        let alerts = store.list_alerts(Page::ALL).await.unwrap();
        let ids: Vec<_> = alerts.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[tokio::test]
    async fn mark_read_on_missing_alert_returns_false() {
        let store = MemoryStore::new();
        assert!(!store.mark_alert_read(7).await.unwrap());
        assert!(!store.mark_alert_resolved(7).await.unwrap());
    }

    // ---- inspections ----

    #[tokio::test]
    async fn commit_inspection_on_missing_tool_writes_nothing() {
        let store = MemoryStore::new();
        let ghost = Tool { id: 99, ..make_tool("QR-9") };
        let inspection = NewInspection {
            tool_id: 99,
            inspector_id: 1,
            date: Utc::now(),
            result: "fail".to_string(),
            usability_percentage: Some(10.0),
            remarks: None,
            photos: None,
        };
        let alert = make_alert(Some(99), 0);

        assert!(store.commit_inspection(&inspection, &ghost, Some(&alert)).await.is_err());
        assert_eq!(store.inspection_count().await, 0);
        assert_eq!(store.alert_count().await, 0);
    }
}
