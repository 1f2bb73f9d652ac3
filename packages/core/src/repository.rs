//! Database repository for tool lifecycle persistence.
//!
//! All SQLite read/write logic lives here. [`ToolRepository`] implements
//! every store contract the engine depends on. Multi-row writes run inside
//! a single transaction: [`InspectionStore::commit_inspection`], every
//! [`ToolStore`] write that carries an inventory alert, and
//! [`UserStore::insert_user`].
//!
//! Timestamps are stored as RFC 3339 strings in UTC with fixed microsecond
//! precision, so `ORDER BY` on the text column is chronological.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Executor, Row, SqlitePool};

use crate::lifecycle::{
    error::{LifecycleError, LifecycleResult},
    stores::{AlertStore, InspectionStore, ToolStore, UserStore},
    types::{
        Alert, Inspection, InspectionWithTool, NewAlert, NewInspection, NewUser, Page, Tool,
        ToolFilter, User,
    },
};

/// Tool columns written on insert and update, in bind order. `id` and
/// `qr_code` are handled separately: the QR code is only written once.
const TOOL_FIELDS: &[&str] = &[
    "description",
    "make",
    "capacity",
    "safe_working_load",
    "purchaser_name",
    "purchaser_contact",
    "supplier_code",
    "test_certificate",
    "date_of_supply",
    "validity_period",
    "expiry_date",
    "last_inspection_date",
    "inspection_result",
    "usability_percentage",
    "status",
    "subcontractor_name",
    "subcontractor_code",
    "remarks",
    "previous_site",
    "current_site",
    "next_site",
    "job_code",
    "job_description",
];

const ALERT_COLUMNS: &str =
    "id, type, severity, title, message, tool_id, site, date, is_read, is_resolved";

const INSPECTION_COLUMNS: &str =
    "id, tool_id, inspector_id, date, result, usability_percentage, remarks, photos";

const USER_COLUMNS: &str = "id, username, email, full_name, role, site, phone, status";

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Repository for reading and writing lifecycle data to SQLite.
#[derive(Clone)]
pub struct ToolRepository {
    pool: SqlitePool,
}

impl ToolRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ---- Encoding helpers ----

fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn encode_opt_ts(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(encode_ts)
}

fn decode_error(message: impl Into<String>) -> sqlx::Error {
    sqlx::Error::Decode(message.into().into())
}

fn decode_ts(raw: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| decode_error(format!("invalid timestamp '{}': {}", raw, err)))
}

fn decode_opt_ts(raw: Option<String>) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    raw.as_deref().map(decode_ts).transpose()
}

fn decode_enum<T>(raw: String) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr<Err = LifecycleError>,
{
    raw.parse::<T>().map_err(|err| decode_error(err.to_string()))
}

/// Map a driver error onto the lifecycle taxonomy. Unique-constraint
/// violations become conflicts; everything else is a storage failure.
fn storage_error(err: sqlx::Error) -> LifecycleError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return LifecycleError::conflict(db_err.message().to_string());
        }
    }
    LifecycleError::storage(err.to_string())
}

// ---- Row mapping ----

fn tool_from_row(row: &SqliteRow) -> Result<Tool, sqlx::Error> {
    let validity_period = row
        .try_get::<Option<i64>, _>("validity_period")?
        .map(|v| u32::try_from(v).map_err(|_| decode_error(format!("invalid validity period {}", v))))
        .transpose()?;

    Ok(Tool {
        id: row.try_get("id")?,
        qr_code: row.try_get("qr_code")?,
        description: row.try_get("description")?,
        make: row.try_get("make")?,
        capacity: row.try_get("capacity")?,
        safe_working_load: row.try_get("safe_working_load")?,
        purchaser_name: row.try_get("purchaser_name")?,
        purchaser_contact: row.try_get("purchaser_contact")?,
        supplier_code: row.try_get("supplier_code")?,
        test_certificate: row.try_get("test_certificate")?,
        date_of_supply: decode_opt_ts(row.try_get("date_of_supply")?)?,
        validity_period,
        expiry_date: decode_opt_ts(row.try_get("expiry_date")?)?,
        last_inspection_date: decode_opt_ts(row.try_get("last_inspection_date")?)?,
        inspection_result: decode_enum(row.try_get("inspection_result")?)?,
        usability_percentage: row.try_get("usability_percentage")?,
        status: decode_enum(row.try_get("status")?)?,
        subcontractor_name: row.try_get("subcontractor_name")?,
        subcontractor_code: row.try_get("subcontractor_code")?,
        remarks: row.try_get("remarks")?,
        previous_site: row.try_get("previous_site")?,
        current_site: row.try_get("current_site")?,
        next_site: row.try_get("next_site")?,
        job_code: row.try_get("job_code")?,
        job_description: row.try_get("job_description")?,
    })
}

fn inspection_from_row(row: &SqliteRow) -> Result<Inspection, sqlx::Error> {
    let date: String = row.try_get("date")?;
    Ok(Inspection {
        id: row.try_get("id")?,
        tool_id: row.try_get("tool_id")?,
        inspector_id: row.try_get("inspector_id")?,
        date: decode_ts(&date)?,
        result: row.try_get("result")?,
        usability_percentage: row.try_get("usability_percentage")?,
        remarks: row.try_get("remarks")?,
        photos: row.try_get("photos")?,
    })
}

fn alert_from_row(row: &SqliteRow) -> Result<Alert, sqlx::Error> {
    let date: String = row.try_get("date")?;
    let is_read: i64 = row.try_get("is_read")?;
    let is_resolved: i64 = row.try_get("is_resolved")?;
    Ok(Alert {
        id: row.try_get("id")?,
        kind: decode_enum(row.try_get("type")?)?,
        severity: decode_enum(row.try_get("severity")?)?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        tool_id: row.try_get("tool_id")?,
        site: row.try_get("site")?,
        date: decode_ts(&date)?,
        is_read: is_read != 0,
        is_resolved: is_resolved != 0,
    })
}

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        role: row.try_get("role")?,
        site: row.try_get("site")?,
        phone: row.try_get("phone")?,
        status: row.try_get("status")?,
    })
}

// ---- SQL builders ----

fn insert_tool_sql() -> String {
    let params = vec!["?"; TOOL_FIELDS.len()].join(", ");
    format!(
        "INSERT INTO tools (qr_code, {}) VALUES (?, {})",
        TOOL_FIELDS.join(", "),
        params
    )
}

fn update_tool_sql() -> String {
    let assignments: Vec<String> = TOOL_FIELDS.iter().map(|c| format!("{} = ?", c)).collect();
    format!("UPDATE tools SET {} WHERE id = ?", assignments.join(", "))
}

/// Bind every entry of [`TOOL_FIELDS`] in order.
fn bind_tool_fields<'q>(query: SqliteQuery<'q>, tool: &'q Tool) -> SqliteQuery<'q> {
    query
        .bind(&tool.description)
        .bind(&tool.make)
        .bind(&tool.capacity)
        .bind(&tool.safe_working_load)
        .bind(&tool.purchaser_name)
        .bind(&tool.purchaser_contact)
        .bind(&tool.supplier_code)
        .bind(&tool.test_certificate)
        .bind(encode_opt_ts(tool.date_of_supply))
        .bind(tool.validity_period.map(i64::from))
        .bind(encode_opt_ts(tool.expiry_date))
        .bind(encode_opt_ts(tool.last_inspection_date))
        .bind(tool.inspection_result.as_str())
        .bind(tool.usability_percentage)
        .bind(tool.status.as_str())
        .bind(&tool.subcontractor_name)
        .bind(&tool.subcontractor_code)
        .bind(&tool.remarks)
        .bind(&tool.previous_site)
        .bind(&tool.current_site)
        .bind(&tool.next_site)
        .bind(&tool.job_code)
        .bind(&tool.job_description)
}

async fn write_tool<'e, E>(executor: E, tool: &Tool) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = update_tool_sql();
    let result = bind_tool_fields(sqlx::query(&sql), tool)
        .bind(tool.id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

async fn write_alert<'e, E>(executor: E, alert: &NewAlert) -> Result<Alert, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO alerts (type, severity, title, message, tool_id, site, date, is_read, is_resolved)
         VALUES (?, ?, ?, ?, ?, ?, ?, 0, 0)",
    )
    .bind(alert.kind.as_str())
    .bind(alert.severity.as_str())
    .bind(&alert.title)
    .bind(&alert.message)
    .bind(alert.tool_id)
    .bind(&alert.site)
    .bind(encode_ts(alert.date))
    .execute(executor)
    .await?;

    Ok(Alert {
        id: result.last_insert_rowid(),
        kind: alert.kind,
        severity: alert.severity,
        title: alert.title.clone(),
        message: alert.message.clone(),
        tool_id: alert.tool_id,
        site: alert.site.clone(),
        date: alert.date,
        is_read: false,
        is_resolved: false,
    })
}

// ---- Tools ----

#[async_trait]
impl ToolStore for ToolRepository {
    async fn get_tool(&self, id: i64) -> LifecycleResult<Option<Tool>> {
        let row = sqlx::query("SELECT * FROM tools WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.as_ref().map(tool_from_row).transpose().map_err(storage_error)
    }

    async fn find_tool_by_qr(&self, qr_code: &str) -> LifecycleResult<Option<Tool>> {
        let row = sqlx::query("SELECT * FROM tools WHERE qr_code = ?")
            .bind(qr_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.as_ref().map(tool_from_row).transpose().map_err(storage_error)
    }

    async fn list_tools(&self, filter: &ToolFilter, page: Page) -> LifecycleResult<Vec<Tool>> {
        // WHERE 1=1 lets the optional conditions be appended uniformly.
        let mut conditions = vec!["1=1"];
        if filter.search.is_some() {
            conditions.push("(instr(description, ?) > 0 OR instr(qr_code, ?) > 0)");
        }
        if filter.status.is_some() {
            conditions.push("status = ?");
        }

        let sql = format!(
            "SELECT * FROM tools WHERE {} ORDER BY id ASC LIMIT ? OFFSET ?",
            conditions.join(" AND ")
        );

        let mut query = sqlx::query(&sql);
        if let Some(search) = filter.search.as_deref() {
            query = query.bind(search).bind(search);
        }
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        let rows = query
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.iter()
            .map(tool_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)
    }

    async fn insert_tool(
        &self,
        tool: &Tool,
        alert: Option<&NewAlert>,
    ) -> LifecycleResult<(Tool, Option<Alert>)> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let sql = insert_tool_sql();
        let result = bind_tool_fields(sqlx::query(&sql).bind(&tool.qr_code), tool)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        let stored = Tool {
            id: result.last_insert_rowid(),
            ..tool.clone()
        };

        let alert = match alert {
            Some(a) => {
                let linked = NewAlert {
                    tool_id: Some(stored.id),
                    ..a.clone()
                };
                Some(write_alert(&mut *tx, &linked).await.map_err(storage_error)?)
            }
            None => None,
        };

        tx.commit().await.map_err(storage_error)?;
        Ok((stored, alert))
    }

    async fn update_tool(
        &self,
        tool: &Tool,
        alert: Option<&NewAlert>,
    ) -> LifecycleResult<Option<Alert>> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let affected = write_tool(&mut *tx, tool).await.map_err(storage_error)?;
        if affected == 0 {
            return Err(LifecycleError::not_found("Tool", tool.id));
        }

        let alert = match alert {
            Some(a) => Some(write_alert(&mut *tx, a).await.map_err(storage_error)?),
            None => None,
        };

        tx.commit().await.map_err(storage_error)?;
        Ok(alert)
    }

    async fn delete_tool(&self, id: i64, alert: Option<&NewAlert>) -> LifecycleResult<bool> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        sqlx::query("UPDATE alerts SET tool_id = NULL WHERE tool_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        sqlx::query("DELETE FROM inspections WHERE tool_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        let result = sqlx::query("DELETE FROM tools WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            // Nothing to delete; dropping the transaction rolls it back.
            return Ok(false);
        }

        if let Some(alert) = alert {
            write_alert(&mut *tx, alert).await.map_err(storage_error)?;
        }

        tx.commit().await.map_err(storage_error)?;
        Ok(true)
    }
}

// ---- Inspections ----

#[async_trait]
impl InspectionStore for ToolRepository {
    async fn commit_inspection(
        &self,
        inspection: &NewInspection,
        tool: &Tool,
        alert: Option<&NewAlert>,
    ) -> LifecycleResult<(Inspection, Option<Alert>)> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let affected = write_tool(&mut *tx, tool).await.map_err(storage_error)?;
        if affected == 0 {
            return Err(LifecycleError::not_found("Tool", tool.id));
        }

        let result = sqlx::query(
            "INSERT INTO inspections
             (tool_id, inspector_id, date, result, usability_percentage, remarks, photos)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(inspection.tool_id)
        .bind(inspection.inspector_id)
        .bind(encode_ts(inspection.date))
        .bind(&inspection.result)
        .bind(inspection.usability_percentage)
        .bind(&inspection.remarks)
        .bind(&inspection.photos)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        let stored_alert = match alert {
            Some(alert) => Some(write_alert(&mut *tx, alert).await.map_err(storage_error)?),
            None => None,
        };

        tx.commit().await.map_err(storage_error)?;

        let stored = Inspection {
            id: result.last_insert_rowid(),
            tool_id: inspection.tool_id,
            inspector_id: inspection.inspector_id,
            date: inspection.date,
            result: inspection.result.clone(),
            usability_percentage: inspection.usability_percentage,
            remarks: inspection.remarks.clone(),
            photos: inspection.photos.clone(),
        };
        Ok((stored, stored_alert))
    }

    async fn list_inspections_by_tool(&self, tool_id: i64) -> LifecycleResult<Vec<Inspection>> {
        let sql = format!(
            "SELECT {} FROM inspections WHERE tool_id = ? ORDER BY date DESC, id DESC",
            INSPECTION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(tool_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.iter()
            .map(inspection_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)
    }

    async fn list_recent_inspections(&self, page: Page) -> LifecycleResult<Vec<InspectionWithTool>> {
        let sql = format!(
            "SELECT {} FROM inspections ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
            INSPECTION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        let inspections = rows
            .iter()
            .map(inspection_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)?;

        let mut tools: HashMap<i64, Option<Tool>> = HashMap::new();
        let mut out = Vec::with_capacity(inspections.len());
        for inspection in inspections {
            let tool = match tools.get(&inspection.tool_id) {
                Some(cached) => cached.clone(),
                None => {
                    let fetched = self.get_tool(inspection.tool_id).await?;
                    tools.insert(inspection.tool_id, fetched.clone());
                    fetched
                }
            };
            out.push(InspectionWithTool { inspection, tool });
        }
        Ok(out)
    }
}

// ---- Alerts ----

#[async_trait]
impl AlertStore for ToolRepository {
    async fn save_alert(&self, alert: &NewAlert) -> LifecycleResult<Alert> {
        write_alert(&self.pool, alert).await.map_err(storage_error)
    }

    async fn get_alert(&self, id: i64) -> LifecycleResult<Option<Alert>> {
        let sql = format!("SELECT {} FROM alerts WHERE id = ?", ALERT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.as_ref().map(alert_from_row).transpose().map_err(storage_error)
    }

    async fn list_alerts(&self, page: Page) -> LifecycleResult<Vec<Alert>> {
        let sql = format!(
            "SELECT {} FROM alerts ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
            ALERT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.iter()
            .map(alert_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)
    }

    async fn mark_alert_read(&self, id: i64) -> LifecycleResult<bool> {
        let result = sqlx::query("UPDATE alerts SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_alert_resolved(&self, id: i64) -> LifecycleResult<bool> {
        let result = sqlx::query("UPDATE alerts SET is_resolved = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(result.rows_affected() > 0)
    }
}

// ---- Users ----

impl ToolRepository {
    async fn find_user_where(&self, column: &str, value: &str) -> LifecycleResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.as_ref().map(user_from_row).transpose().map_err(storage_error)
    }
}

#[async_trait]
impl UserStore for ToolRepository {
    async fn get_user(&self, id: i64) -> LifecycleResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.as_ref().map(user_from_row).transpose().map_err(storage_error)
    }

    async fn find_user_by_username(&self, username: &str) -> LifecycleResult<Option<User>> {
        self.find_user_where("username", username).await
    }

    async fn find_user_by_email(&self, email: &str) -> LifecycleResult<Option<User>> {
        self.find_user_where("email", email).await
    }

    async fn insert_user(
        &self,
        user: &NewUser,
        alert: Option<&NewAlert>,
    ) -> LifecycleResult<(User, Option<Alert>)> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let result = sqlx::query(
            "INSERT INTO users (username, email, full_name, role, site, phone, status)
             VALUES (?, ?, ?, ?, ?, ?, 'active')",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.role)
        .bind(&user.site)
        .bind(&user.phone)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        let alert = match alert {
            Some(a) => Some(write_alert(&mut *tx, a).await.map_err(storage_error)?),
            None => None,
        };
        tx.commit().await.map_err(storage_error)?;

        let stored = User {
            id: result.last_insert_rowid(),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role.clone(),
            site: user.site.clone(),
            phone: user.phone.clone(),
            status: "active".to_string(),
        };
        Ok((stored, alert))
    }
}
