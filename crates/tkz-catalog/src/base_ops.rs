//! Generic operations on a single mapped table.
//!
//! Everything here is driven by the static [`TableDef`] metadata: create,
//! read, bulk insert (rows or CSV), the three update modes, free-predicate
//! delete, confirm-guarded drop and primary-key resequencing. Dialect-only
//! statements are gated on the engine's dialect.

use std::path::Path;

use tracing::{info, warn};

use tkz_core::error::{TkzError, TkzResult};

use crate::schema::TableDef;
use crate::session::{Dialect, Engine, Session};
use crate::value::SqlValue;

/// One input row: column names with values, in column order.
pub type Row = Vec<(String, SqlValue)>;

/// Update shapes supported by [`TableOps::update_table`].
pub enum UpdateMode<'a> {
    /// Rows carry `id`; every other entry is SET.
    PrimaryKeys,
    /// `UPDATE … WHERE attr = :alias` with bound parameters for bulk edits;
    /// each row carries the alias entry plus the SET entries.
    WithAlias { attr: &'a str, alias: &'a str },
    /// `UPDATE … SET data WHERE attr IN criteria`; a single data row.
    WhereCondition {
        attr: &'a str,
        criteria: &'a [SqlValue],
    },
}

/// A tabular query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Tab-separated rendering; rows are numbered from 1 unless the frame
    /// already carries a number column.
    pub fn render(&self) -> String {
        let numbered = self.headers.first().map(String::as_str) != Some("#");
        let mut out = String::new();
        if numbered {
            out.push_str("#\t");
        }
        out.push_str(&self.headers.join("\t"));
        out.push('\n');
        for (index, row) in self.rows.iter().enumerate() {
            if numbered {
                out.push_str(&format!("{}\t", index + 1));
            }
            let cells: Vec<String> = row.iter().map(SqlValue::to_string).collect();
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
        out
    }
}

/// CRUD surface for one table over one engine.
pub struct TableOps<'e> {
    pub table: &'static TableDef,
    pub engine: &'e Engine,
}

impl<'e> TableOps<'e> {
    pub fn new(table: &'static TableDef, engine: &'e Engine) -> Self {
        TableOps { table, engine }
    }

    /// Create the table if absent; optionally drop it first (`forced_drop`
    /// additionally bypasses foreign-key checks).
    pub fn create_table(&self, drop_first: bool, forced_drop: bool) -> TkzResult<()> {
        if drop_first {
            self.drop_table(self.table.table_name(), forced_drop)?;
        }
        let name = self.table.table_name();
        self.engine.session_scope(true, |session| {
            if session.table_exists(name)? {
                info!("table '{name}' already exists");
                return Ok(());
            }
            session.execute(&self.table.create_sql(session.dialect()), &[])?;
            info!("table '{name}' has been created");
            Ok(())
        })
    }

    /// Read the table, ordered by all non-primary-key columns; the result
    /// is displayed starting at index 1.
    pub fn read_table(&self, filter: Option<&str>, limit: Option<usize>) -> TkzResult<Frame> {
        let headers: Vec<String> = self
            .table
            .columns
            .iter()
            .map(|column| column.name.to_string())
            .collect();
        let order_by: Vec<&str> = self
            .table
            .non_keys(true)
            .iter()
            .map(|column| column.name)
            .collect();
        let mut sql = format!(
            "SELECT {} FROM {}",
            headers.join(", "),
            self.table.table_name()
        );
        if let Some(predicate) = filter {
            sql.push_str(&format!(" WHERE {predicate}"));
        }
        if !order_by.is_empty() {
            sql.push_str(&format!(" ORDER BY {}", order_by.join(", ")));
        }
        if let Some(count) = limit {
            sql.push_str(&format!(" LIMIT {count}"));
        }
        let rows = self.engine.session_scope(true, |session| session.query(&sql, &[]))?;
        Ok(Frame { headers, rows })
    }

    /// Bulk insert from explicit rows and/or a CSV file; at least one source
    /// is required. CSV cells go through the int -> decimal -> text
    /// inference ladder.
    pub fn insert_table(&self, rows: Option<Vec<Row>>, csv: Option<&Path>) -> TkzResult<usize> {
        if rows.is_none() && csv.is_none() {
            let err = TkzError::BadInput(format!(
                "insert into '{}' requires rows or a CSV path",
                self.table.table_name()
            ));
            tracing::error!("{err}");
            return Err(err);
        }
        let mut data = rows.unwrap_or_default();
        if let Some(path) = csv {
            data.extend(load_csv(path)?);
        }
        let inserted = self.engine.session_scope(true, |session| {
            let mut inserted = 0usize;
            for row in &data {
                inserted += insert_row(session, self.table, row)?;
            }
            Ok(inserted)
        })?;
        info!(
            "table '{}' has been updated; {inserted} row(s) inserted",
            self.table.table_name()
        );
        Ok(inserted)
    }

    /// Update rows in one of the three supported shapes; returns the number
    /// of affected rows.
    pub fn update_table(&self, data: &[Row], mode: UpdateMode<'_>) -> TkzResult<usize> {
        if data.is_empty() {
            return Err(TkzError::BadInput(format!(
                "update of '{}' requires at least one row",
                self.table.table_name()
            )));
        }
        let name = self.table.table_name();
        let affected = self.engine.session_scope(true, |session| match mode {
            UpdateMode::PrimaryKeys => {
                let key = self.table.primary_key();
                let mut affected = 0usize;
                for row in data {
                    let id = row_value(row, key).ok_or_else(|| {
                        TkzError::BadInput(format!("update row for '{name}' is missing '{key}'"))
                    })?;
                    let set: Vec<&(String, SqlValue)> =
                        row.iter().filter(|(column, _)| column.as_str() != key).collect();
                    affected += run_update(session, name, &set, &format!("{key} = ?"), &[id])?;
                }
                Ok(affected)
            }
            UpdateMode::WithAlias { attr, alias } => {
                let mut affected = 0usize;
                for row in data {
                    let bound = row_value(row, alias).ok_or_else(|| {
                        TkzError::BadInput(format!("update row for '{name}' is missing '{alias}'"))
                    })?;
                    let set: Vec<&(String, SqlValue)> =
                        row.iter().filter(|(column, _)| column.as_str() != alias).collect();
                    affected += run_update(session, name, &set, &format!("{attr} = ?"), &[bound])?;
                }
                Ok(affected)
            }
            UpdateMode::WhereCondition { attr, criteria } => {
                let set: Vec<&(String, SqlValue)> = data[0].iter().collect();
                let placeholders = vec!["?"; criteria.len()].join(", ");
                let params: Vec<SqlValue> = criteria.to_vec();
                run_update(
                    session,
                    name,
                    &set,
                    &format!("{attr} IN ({placeholders})"),
                    &params,
                )
            }
        })?;
        info!("table '{name}' has been updated; {affected} match(es) found");
        Ok(affected)
    }

    /// Delete with a free-text predicate; returns the number of deleted
    /// rows.
    pub fn delete_table(&self, filter: &str) -> TkzResult<usize> {
        let name = self.table.table_name();
        let deleted = self.engine.session_scope(true, |session| {
            session.execute(&format!("DELETE FROM {name} WHERE {filter}"), &[])
        })?;
        info!("rows were deleted from table '{name}'; {deleted} match(es) found");
        Ok(deleted)
    }

    /// Drop the table, but only when `confirm` repeats the table name.
    /// Returns whether the drop was confirmed; a missing table is an
    /// expected no-op.
    pub fn drop_table(&self, confirm: &str, forced: bool) -> TkzResult<bool> {
        let name = self.table.table_name();
        if confirm != name {
            warn!("table '{name}' deletion not confirmed");
            return Ok(false);
        }
        let drop = format!("DROP TABLE {name}");
        let result = if forced {
            // FK checks are toggled per dialect; the SQLite pragma only
            // takes effect outside a transaction.
            match self.engine.dialect() {
                Dialect::MySql => self.engine.autocommit_scope(false, |session| {
                    session.execute("SET FOREIGN_KEY_CHECKS = 0", &[])?;
                    let result = session.execute(&drop, &[]);
                    session.execute("SET FOREIGN_KEY_CHECKS = 1", &[])?;
                    result.map(|_| ())
                }),
                Dialect::Sqlite => self.engine.autocommit_scope(false, |session| {
                    session.execute("PRAGMA foreign_keys = OFF", &[])?;
                    let result = session.execute(&drop, &[]);
                    session.execute("PRAGMA foreign_keys = ON", &[])?;
                    result.map(|_| ())
                }),
            }
        } else {
            self.engine
                .session_scope(false, |session| session.execute(&drop, &[]).map(|_| ()))
        };
        match result {
            Ok(()) => {
                info!("table '{name}' has been deleted");
                Ok(true)
            }
            Err(err) if is_missing_table(&err) => {
                info!("no need to delete table '{name}', it does not exist");
                Ok(true)
            }
            Err(err) => Err(err),
        }
    }

    /// Compact the primary-key sequence to 1..N.
    ///
    /// SQLite derives rowids from the highest existing rowid, so for plain
    /// tables there is nothing to do; the joined override repairs the
    /// sequence by rewriting rows.
    pub fn reset_id(&self) -> TkzResult<()> {
        let name = self.table.table_name();
        match self.engine.dialect() {
            Dialect::MySql => {
                self.engine.session_scope(true, |session| {
                    session.execute("SET @count = 0", &[])?;
                    session.execute(
                        &format!("UPDATE {name} SET {name}.id = @count := @count + 1"),
                        &[],
                    )?;
                    session.execute(&format!("ALTER TABLE {name} AUTO_INCREMENT = 1"), &[])?;
                    Ok(())
                })?;
                info!("id order for table '{name}' has been reset");
            }
            Dialect::Sqlite => {
                info!("table '{name}' keeps its rowid order; sqlite assigns new rowids past the highest existing one");
            }
        }
        Ok(())
    }
}

pub(crate) fn row_value(row: &[(String, SqlValue)], name: &str) -> Option<SqlValue> {
    row.iter()
        .find(|(column, _)| column.as_str() == name)
        .map(|(_, value)| value.clone())
}

pub(crate) fn insert_row(
    session: &mut Session,
    table: &TableDef,
    row: &[(String, SqlValue)],
) -> TkzResult<usize> {
    let columns: Vec<&str> = row.iter().map(|(column, _)| column.as_str()).collect();
    let params: Vec<SqlValue> = row.iter().map(|(_, value)| value.clone()).collect();
    let placeholders = vec!["?"; row.len()].join(", ");
    session.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            table.table_name(),
            columns.join(", ")
        ),
        &params,
    )
}

fn run_update(
    session: &mut Session,
    name: &str,
    set: &[&(String, SqlValue)],
    predicate: &str,
    bound: &[SqlValue],
) -> TkzResult<usize> {
    if set.is_empty() {
        return Err(TkzError::BadInput(format!(
            "update of '{name}' has no columns to set"
        )));
    }
    let assignments: Vec<String> = set
        .iter()
        .map(|(column, _)| format!("{column} = ?"))
        .collect();
    let mut params: Vec<SqlValue> = set.iter().map(|(_, value)| value.clone()).collect();
    params.extend_from_slice(bound);
    session.execute(
        &format!(
            "UPDATE {name} SET {} WHERE {predicate}",
            assignments.join(", ")
        ),
        &params,
    )
}

fn is_missing_table(err: &TkzError) -> bool {
    let message = err.to_string();
    message.contains("no such table") || message.contains("Unknown table")
}

/// Load a CSV file into rows; the header line names the columns.
pub(crate) fn load_csv(path: &Path) -> TkzResult<Vec<Row>> {
    let mut reader = csv::Reader::from_path(path).map_err(|err| {
        TkzError::BadInput(format!("cannot read CSV file {}: {err}", path.display()))
    })?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|err| TkzError::BadInput(format!("bad CSV header in {}: {err}", path.display())))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| {
            TkzError::BadInput(format!("bad CSV record in {}: {err}", path.display()))
        })?;
        rows.push(
            headers
                .iter()
                .cloned()
                .zip(record.iter().map(SqlValue::infer))
                .collect(),
        );
    }
    Ok(rows)
}
