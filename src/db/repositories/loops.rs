use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::db::{
    helpers::{from_json, parse_datetime, to_i64, to_json, to_u64},
    Database,
};
use crate::models::{
    ActivityInstance, Loop, NotificationSettings, ScheduleSettings,
};

fn row_to_loop(row: &Row) -> Result<Loop> {
    let activities: String = row.get("activities")?;
    let tags: String = row.get("tags")?;
    let notification_settings: String = row.get("notification_settings")?;
    let schedule_settings: String = row.get("schedule_settings")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let max_iterations: i64 = row.get("max_iterations")?;
    let break_between: i64 = row.get("break_between_iterations")?;

    let mut record = Loop {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        activities: from_json::<Vec<ActivityInstance>>(&activities, "activities")?,
        tags: from_json(&tags, "tags")?,
        category_id: row.get("category_id")?,
        is_repeatable: row.get("is_repeatable")?,
        max_iterations: max_iterations.max(0) as u32,
        break_between_iterations: to_u64(break_between, "break_between_iterations")?,
        notification_settings: from_json::<NotificationSettings>(
            &notification_settings,
            "notification_settings",
        )?,
        schedule_settings: from_json::<ScheduleSettings>(&schedule_settings, "schedule_settings")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    };
    // A stale record must not leak inconsistent positions into a session.
    record.normalize_order();
    Ok(record)
}

const LOOP_COLUMNS: &str = "id, title, description, activities, tags, category_id, \
     is_repeatable, max_iterations, break_between_iterations, \
     notification_settings, schedule_settings, created_at, updated_at";

impl Database {
    pub async fn insert_loop(&self, record: &Loop) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO loops (id, title, description, activities, tags, category_id,
                     is_repeatable, max_iterations, break_between_iterations,
                     notification_settings, schedule_settings, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    record.id,
                    record.title,
                    record.description,
                    to_json(&record.activities, "activities")?,
                    to_json(&record.tags, "tags")?,
                    record.category_id,
                    record.is_repeatable,
                    i64::from(record.max_iterations),
                    to_i64(record.break_between_iterations)?,
                    to_json(&record.notification_settings, "notification_settings")?,
                    to_json(&record.schedule_settings, "schedule_settings")?,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn update_loop(&self, record: &Loop) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE loops
                 SET title = ?1,
                     description = ?2,
                     activities = ?3,
                     tags = ?4,
                     category_id = ?5,
                     is_repeatable = ?6,
                     max_iterations = ?7,
                     break_between_iterations = ?8,
                     notification_settings = ?9,
                     schedule_settings = ?10,
                     updated_at = ?11
                 WHERE id = ?12",
                params![
                    record.title,
                    record.description,
                    to_json(&record.activities, "activities")?,
                    to_json(&record.tags, "tags")?,
                    record.category_id,
                    record.is_repeatable,
                    i64::from(record.max_iterations),
                    to_i64(record.break_between_iterations)?,
                    to_json(&record.notification_settings, "notification_settings")?,
                    to_json(&record.schedule_settings, "schedule_settings")?,
                    record.updated_at.to_rfc3339(),
                    record.id,
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("loop not found"));
            }
            Ok(())
        })
        .await
    }

    /// `Ok(None)` when the loop no longer exists: the caller renders the
    /// not-found state instead of treating this as a failure.
    pub async fn get_loop(&self, loop_id: &str) -> Result<Option<Loop>> {
        let loop_id = loop_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LOOP_COLUMNS} FROM loops WHERE id = ?1"
            ))?;

            let mut rows = stmt.query(params![loop_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_loop(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn list_loops(&self) -> Result<Vec<Loop>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LOOP_COLUMNS} FROM loops ORDER BY updated_at DESC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut loops = Vec::new();
            while let Some(row) = rows.next()? {
                loops.push(row_to_loop(row)?);
            }
            Ok(loops)
        })
        .await
    }

    pub async fn list_loops_for_category(&self, category_id: &str) -> Result<Vec<Loop>> {
        let category_id = category_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LOOP_COLUMNS} FROM loops WHERE category_id = ?1 ORDER BY updated_at DESC"
            ))?;

            let mut rows = stmt.query(params![category_id])?;
            let mut loops = Vec::new();
            while let Some(row) = rows.next()? {
                loops.push(row_to_loop(row)?);
            }
            Ok(loops)
        })
        .await
    }

    pub async fn delete_loop(&self, loop_id: &str) -> Result<()> {
        let loop_id = loop_id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM loops WHERE id = ?1", params![loop_id])?;
            if rows_affected == 0 {
                return Err(anyhow!("loop not found"));
            }
            Ok(())
        })
        .await
    }

    /// Copies a loop under fresh ids. Every activity instance gets a new
    /// id too; instance ids are unique per loop, never shared.
    pub async fn duplicate_loop(&self, loop_id: &str, now: DateTime<Utc>) -> Result<Loop> {
        let source = self
            .get_loop(loop_id)
            .await?
            .ok_or_else(|| anyhow!("loop not found"))?;

        let mut copy = source.clone();
        copy.id = Uuid::new_v4().to_string();
        copy.title = format!("{} (copy)", source.title);
        copy.created_at = now;
        copy.updated_at = now;
        for activity in &mut copy.activities {
            activity.id = Uuid::new_v4().to_string();
        }

        self.insert_loop(&copy).await?;
        Ok(copy)
    }
}
