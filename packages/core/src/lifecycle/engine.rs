//! Tool Lifecycle Engine - orchestrates the lifecycle rules over a store

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::lifecycle::{
    config::LifecycleConfig,
    error::{LifecycleError, LifecycleResult},
    expiry::{compute_expiry, refresh_expiry},
    inspection::apply_inspection,
    stores::LifecycleStore,
    synthesizer::{merge_feed, synthesize_alerts, FeedSummary, SyntheticAlertId},
    types::*,
};

/// The authenticated caller, as resolved by the host's identity layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub role: String,
}

/// Everything written by a single inspection submission.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionOutcome {
    pub inspection: Inspection,
    pub tool: Tool,
    pub alert: Option<Alert>,
}

/// Counts produced by [`ToolLifecycleEngine::backfill_expiry`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub updated: usize,
    pub already_set: usize,
    pub missing_supply_date: usize,
}

/// Central engine applying lifecycle rules through an injected store.
pub struct ToolLifecycleEngine {
    store: Arc<dyn LifecycleStore>,
    clock: Arc<dyn Clock>,
    config: LifecycleConfig,
}

impl ToolLifecycleEngine {
    pub fn new(store: Arc<dyn LifecycleStore>, clock: Arc<dyn Clock>, config: LifecycleConfig) -> Self {
        Self { store, clock, config }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ---- Tools ----

    /// Register a new tool and raise a `new-tool` alert for it.
    pub async fn create_tool(&self, new_tool: NewTool) -> LifecycleResult<Tool> {
        let qr_code = new_tool.qr_code.trim().to_string();
        if qr_code.is_empty() {
            return Err(LifecycleError::validation("QR code must not be empty"));
        }
        if self.store.find_tool_by_qr(&qr_code).await?.is_some() {
            return Err(LifecycleError::conflict(format!(
                "QR code '{}' is already assigned",
                qr_code
            )));
        }

        let mut draft = draft_tool(new_tool);
        draft.qr_code = qr_code;
        refresh_expiry(&mut draft)?;

        // The store links the alert to the id it assigns.
        let alert = self.inventory_alert(
            AlertKind::NewTool,
            AlertSeverity::Info,
            "New Tool Added",
            format!(
                "New tool has been added to the inventory: {} ({})",
                draft.description, draft.qr_code
            ),
            None,
            draft.current_site.clone(),
        );
        let (tool, _) = self.store.insert_tool(&draft, Some(&alert)).await?;
        tracing::info!(tool_id = tool.id, qr_code = %tool.qr_code, "Tool registered");

        Ok(tool)
    }

    pub async fn get_tool(&self, id: i64) -> LifecycleResult<Tool> {
        self.store
            .get_tool(id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("Tool", id))
    }

    pub async fn find_tool_by_qr(&self, qr_code: &str) -> LifecycleResult<Tool> {
        self.store
            .find_tool_by_qr(qr_code)
            .await?
            .ok_or_else(|| LifecycleError::not_found("Tool", qr_code))
    }

    pub async fn list_tools(&self, filter: &ToolFilter, page: Page) -> LifecycleResult<Vec<Tool>> {
        self.store.list_tools(filter, page).await
    }

    /// Apply a sparse edit. Touching the supply date or validity recomputes
    /// the expiry whenever both are known afterwards.
    pub async fn update_tool(&self, id: i64, update: ToolUpdate) -> LifecycleResult<Tool> {
        let mut tool = self.get_tool(id).await?;
        let touches_schedule = update.touches_schedule();
        update.merge_into(&mut tool);
        if touches_schedule {
            refresh_expiry(&mut tool)?;
        }

        let alert = self.inventory_alert(
            AlertKind::ToolUpdate,
            AlertSeverity::Info,
            "Tool Updated",
            format!(
                "Tool details updated for {} ({}).",
                tool.description, tool.qr_code
            ),
            Some(tool.id),
            tool.current_site.clone(),
        );
        self.store.update_tool(&tool, Some(&alert)).await?;
        tracing::info!(tool_id = tool.id, "Tool updated");

        Ok(tool)
    }

    /// Remove a tool. The `tool-deleted` alert keeps the site but carries no
    /// tool reference.
    pub async fn delete_tool(&self, id: i64) -> LifecycleResult<()> {
        let tool = self.get_tool(id).await?;
        let alert = self.inventory_alert(
            AlertKind::ToolDeleted,
            AlertSeverity::Warning,
            "Tool Deleted",
            format!(
                "Tool {} ({}) has been deleted from inventory.",
                tool.description, tool.qr_code
            ),
            None,
            tool.current_site.clone(),
        );
        if !self.store.delete_tool(id, Some(&alert)).await? {
            return Err(LifecycleError::not_found("Tool", id));
        }
        tracing::info!(tool_id = id, qr_code = %tool.qr_code, "Tool deleted");

        Ok(())
    }

    /// Fill in missing expiry dates for tools that have a supply date.
    /// Tools without a validity period get `default_validity_years`.
    pub async fn backfill_expiry(&self, default_validity_years: u32) -> LifecycleResult<BackfillReport> {
        let tools = self.store.list_tools(&ToolFilter::default(), Page::ALL).await?;
        let mut report = BackfillReport::default();

        for mut tool in tools {
            if tool.expiry_date.is_some() {
                report.already_set += 1;
                continue;
            }
            let Some(supply) = tool.date_of_supply else {
                tracing::debug!(tool_id = tool.id, "Skipping tool without date of supply");
                report.missing_supply_date += 1;
                continue;
            };

            let years = tool.validity_period.unwrap_or(default_validity_years);
            let expiry = compute_expiry(supply, years)?;
            tool.validity_period = Some(years);
            tool.expiry_date = Some(expiry);
            self.store.update_tool(&tool, None).await?;

            tracing::info!(
                tool_id = tool.id,
                supply = %supply.date_naive(),
                expiry = %expiry.date_naive(),
                "Backfilled expiry"
            );
            report.updated += 1;
        }

        Ok(report)
    }

    // ---- Inspections ----

    /// Record an inspection on behalf of `caller` and fold it into the tool.
    ///
    /// The inspection, tool update and optional low-usability alert are
    /// committed together.
    pub async fn record_inspection(
        &self,
        caller: &Caller,
        request: InspectionRequest,
    ) -> LifecycleResult<InspectionOutcome> {
        validate_percentage(request.usability_percentage)?;

        let tool = self.store.get_tool(request.tool_id).await?.ok_or_else(|| {
            LifecycleError::validation(format!(
                "Inspection references unknown tool {}",
                request.tool_id
            ))
        })?;
        if self.store.get_user(caller.user_id).await?.is_none() {
            return Err(LifecycleError::not_found("User", caller.user_id));
        }

        let inspection = NewInspection {
            tool_id: tool.id,
            inspector_id: caller.user_id,
            date: request.date.unwrap_or_else(|| self.clock.now()),
            result: request.result,
            usability_percentage: request.usability_percentage,
            remarks: request.remarks,
            photos: request.photos,
        };

        let effects = apply_inspection(&tool, &inspection, &self.config);
        let (stored, alert) = self
            .store
            .commit_inspection(&inspection, &effects.tool, effects.alert.as_ref())
            .await?;

        tracing::info!(
            tool_id = tool.id,
            inspection_id = stored.id,
            inspector_id = caller.user_id,
            status = effects.tool.status.as_str(),
            "Inspection recorded"
        );
        if let Some(alert) = &alert {
            tracing::warn!(tool_id = tool.id, alert_id = alert.id, "{}", alert.message);
        }

        Ok(InspectionOutcome {
            inspection: stored,
            tool: effects.tool,
            alert,
        })
    }

    pub async fn inspections_for_tool(&self, tool_id: i64) -> LifecycleResult<Vec<Inspection>> {
        self.get_tool(tool_id).await?;
        self.store.list_inspections_by_tool(tool_id).await
    }

    pub async fn recent_inspections(&self, page: Page) -> LifecycleResult<Vec<InspectionWithTool>> {
        self.store.list_recent_inspections(page).await
    }

    // ---- Alerts ----

    /// The alert feed at the clock's current instant.
    pub async fn list_alerts(&self, page: Page) -> LifecycleResult<Vec<Alert>> {
        self.list_alerts_at(self.clock.now(), page).await
    }

    /// The alert feed at `now`: synthetic alerts first, then the requested
    /// page of persisted alerts. Performs no writes.
    pub async fn list_alerts_at(&self, now: DateTime<Utc>, page: Page) -> LifecycleResult<Vec<Alert>> {
        let persisted = self.store.list_alerts(page).await?;
        let tools = self.store.list_tools(&ToolFilter::default(), Page::ALL).await?;
        let synthetic = synthesize_alerts(&tools, now, &self.config);

        tracing::debug!(
            synthetic = synthetic.len(),
            persisted = persisted.len(),
            "Alert feed assembled"
        );

        Ok(merge_feed(synthetic, persisted))
    }

    pub async fn feed_summary(&self) -> LifecycleResult<FeedSummary> {
        let tools = self.store.list_tools(&ToolFilter::default(), Page::ALL).await?;
        let synthetic = synthesize_alerts(&tools, self.clock.now(), &self.config);
        Ok(FeedSummary::from_alerts(&synthetic))
    }

    /// Persist a caller-supplied alert. Computed kinds are refused.
    pub async fn create_alert(&self, request: AlertRequest) -> LifecycleResult<Alert> {
        if request.kind.is_synthetic() {
            return Err(LifecycleError::validation(format!(
                "Alerts of type '{}' are computed and cannot be stored",
                request.kind
            )));
        }
        if let Some(tool_id) = request.tool_id {
            self.get_tool(tool_id).await?;
        }

        let alert = NewAlert {
            kind: request.kind,
            severity: request.severity,
            title: request.title,
            message: request.message,
            tool_id: request.tool_id,
            site: request.site,
            date: request.date.unwrap_or_else(|| self.clock.now()),
        };
        self.store.save_alert(&alert).await
    }

    pub async fn mark_alert_read(&self, id: i64) -> LifecycleResult<Alert> {
        ensure_persisted_id(id)?;
        if !self.store.mark_alert_read(id).await? {
            return Err(LifecycleError::not_found("Alert", id));
        }
        self.require_alert(id).await
    }

    pub async fn resolve_alert(&self, id: i64) -> LifecycleResult<Alert> {
        ensure_persisted_id(id)?;
        if !self.store.mark_alert_resolved(id).await? {
            return Err(LifecycleError::not_found("Alert", id));
        }
        self.require_alert(id).await
    }

    // ---- Users ----

    /// Register a user and raise a `new-user` alert.
    pub async fn register_user(&self, new_user: NewUser) -> LifecycleResult<User> {
        if new_user.username.trim().is_empty() || new_user.email.trim().is_empty() {
            return Err(LifecycleError::validation("Username and email are required"));
        }
        if self.store.find_user_by_username(&new_user.username).await?.is_some() {
            return Err(LifecycleError::conflict("Username already registered"));
        }
        if self.store.find_user_by_email(&new_user.email).await?.is_some() {
            return Err(LifecycleError::conflict("Email already registered"));
        }

        let display_name = new_user.full_name.as_deref().unwrap_or(&new_user.username);
        let alert = self.inventory_alert(
            AlertKind::NewUser,
            AlertSeverity::Info,
            "New User Created",
            format!("New user created: {} ({})", display_name, new_user.role),
            None,
            new_user.site.clone(),
        );
        let (user, _) = self.store.insert_user(&new_user, Some(&alert)).await?;
        tracing::info!(user_id = user.id, role = %user.role, "User registered");

        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> LifecycleResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("User", id))
    }

    // ---- Helpers ----

    async fn require_alert(&self, id: i64) -> LifecycleResult<Alert> {
        self.store
            .get_alert(id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("Alert", id))
    }

    /// Build an inventory alert stamped with the engine clock. Callers hand
    /// it to the store together with the record it describes.
    fn inventory_alert(
        &self,
        kind: AlertKind,
        severity: AlertSeverity,
        title: &str,
        message: String,
        tool_id: Option<i64>,
        site: Option<String>,
    ) -> NewAlert {
        NewAlert {
            kind,
            severity,
            title: title.to_string(),
            message,
            tool_id,
            site,
            date: self.clock.now(),
        }
    }
}

fn draft_tool(new_tool: NewTool) -> Tool {
    Tool {
        id: 0,
        qr_code: new_tool.qr_code,
        description: new_tool.description,
        make: new_tool.make,
        capacity: new_tool.capacity,
        safe_working_load: new_tool.safe_working_load,
        purchaser_name: new_tool.purchaser_name,
        purchaser_contact: new_tool.purchaser_contact,
        supplier_code: new_tool.supplier_code,
        test_certificate: new_tool.test_certificate,
        date_of_supply: new_tool.date_of_supply,
        validity_period: new_tool.validity_period,
        expiry_date: new_tool.expiry_date,
        last_inspection_date: None,
        inspection_result: InspectionResult::Usable,
        usability_percentage: None,
        status: ToolStatus::Usable,
        subcontractor_name: new_tool.subcontractor_name,
        subcontractor_code: new_tool.subcontractor_code,
        remarks: new_tool.remarks,
        previous_site: new_tool.previous_site,
        current_site: new_tool.current_site,
        next_site: new_tool.next_site,
        job_code: new_tool.job_code,
        job_description: new_tool.job_description,
    }
}

fn validate_percentage(percentage: Option<f64>) -> LifecycleResult<()> {
    match percentage {
        Some(pct) if !(0.0..=100.0).contains(&pct) => Err(LifecycleError::validation(format!(
            "Usability percentage must be between 0 and 100, got {}",
            pct
        ))),
        _ => Ok(()),
    }
}

fn ensure_persisted_id(id: i64) -> LifecycleResult<()> {
    if id > 0 {
        return Ok(());
    }
    match SyntheticAlertId::decode(id) {
        Some(synthetic) => Err(LifecycleError::validation(format!(
            "Alert {} is computed for tool {} and cannot be modified",
            id, synthetic.tool_id
        ))),
        None => Err(LifecycleError::validation(format!("Invalid alert id {}", id))),
    }
}
