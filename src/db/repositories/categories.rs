use anyhow::{anyhow, Result};
use rusqlite::{params, Row};

use crate::db::{helpers::parse_datetime, Database};
use crate::models::Category;

fn row_to_category(row: &Row) -> Result<Category> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Category {
        id: row.get("id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        icon: row.get("icon")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_category(&self, category: &Category) -> Result<()> {
        let record = category.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO categories (id, name, color, icon, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.name,
                    record.color,
                    record.icon,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn update_category(&self, category: &Category) -> Result<()> {
        let record = category.clone();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE categories
                 SET name = ?1,
                     color = ?2,
                     icon = ?3,
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    record.name,
                    record.color,
                    record.icon,
                    record.updated_at.to_rfc3339(),
                    record.id,
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("category not found"));
            }
            Ok(())
        })
        .await
    }

    pub async fn get_category(&self, category_id: &str) -> Result<Option<Category>> {
        let category_id = category_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, color, icon, created_at, updated_at
                 FROM categories
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![category_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_category(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, color, icon, created_at, updated_at
                 FROM categories
                 ORDER BY name ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut categories = Vec::new();
            while let Some(row) = rows.next()? {
                categories.push(row_to_category(row)?);
            }
            Ok(categories)
        })
        .await
    }

    /// Loops referencing the category fall back to uncategorized via the
    /// ON DELETE SET NULL constraint.
    pub async fn delete_category(&self, category_id: &str) -> Result<()> {
        let category_id = category_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM categories WHERE id = ?1",
                params![category_id],
            )?;
            if rows_affected == 0 {
                return Err(anyhow!("category not found"));
            }
            Ok(())
        })
        .await
    }
}
