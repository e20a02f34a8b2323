//! Operations on a fact table joined to its dimension tables.
//!
//! A fact table declares its dimensions as `subtables` in foreign-key
//! column order. Reads join left to right and come back in dimension-column
//! order with a 1..N row number prepended. Inserts dedup at the dimension
//! layer: a row is *fresh* only when at least one of its dimension values
//! was new, and only fresh rows produce a fact row. Updates and deletes
//! address either the fact row (located through its dimension values) or
//! the dimension rows themselves, relying on the cascading foreign keys.

use tracing::info;

use tkz_core::error::{TkzError, TkzResult};

use crate::base_ops::{insert_row, row_value, Frame, Row, TableOps};
use crate::schema::TableDef;
use crate::session::{Dialect, Engine, Session};
use crate::value::SqlValue;

/// CRUD surface for one fact table and its dimensions.
pub struct JoinedOps<'e> {
    pub base: TableOps<'e>,
}

impl<'e> JoinedOps<'e> {
    pub fn new(table: &'static TableDef, engine: &'e Engine) -> Self {
        debug_assert!(table.is_joined(), "{} declares no subtables", table.model);
        JoinedOps {
            base: TableOps::new(table, engine),
        }
    }

    fn table(&self) -> &'static TableDef {
        self.base.table
    }

    fn engine(&self) -> &'e Engine {
        self.base.engine
    }

    /// Left-to-right JOIN of the fact table to its dimensions over the
    /// natural foreign-key equalities.
    pub fn join_clause(&self) -> String {
        let fact = self.table().table_name();
        let mut clause = fact.to_string();
        for column in self.table().foreign_keys() {
            let dim = column
                .references
                .expect("foreign key declares a target")
                .table_name();
            clause.push_str(&format!(
                " JOIN {dim} ON {fact}.{} = {dim}.id",
                column.name
            ));
        }
        clause
    }

    /// Dimension natural-key columns followed by the fact's own data
    /// columns, ordered by the dimension columns, numbered from 1.
    pub fn read_joined_table(&self) -> TkzResult<Frame> {
        let fact = self.table().table_name();
        let mut selected: Vec<String> = Vec::new();
        let mut order_by: Vec<String> = Vec::new();
        for dim in self.table().subtables {
            let qualified = format!("{}.{}", dim.table_name(), dim.value_column().name);
            selected.push(qualified.clone());
            order_by.push(qualified);
        }
        for column in self.table().non_keys(false) {
            selected.push(format!("{fact}.{}", column.name));
        }
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            selected.join(", "),
            self.join_clause(),
            order_by.join(", ")
        );
        let rows = self
            .engine()
            .session_scope(true, |session| session.query(&sql, &[]))?;

        let mut headers = vec!["#".to_string()];
        for dim in self.table().subtables {
            headers.push(dim.value_column().name.to_string());
        }
        for column in self.table().non_keys(false) {
            headers.push(column.name.to_string());
        }
        let numbered = rows
            .into_iter()
            .enumerate()
            .map(|(index, mut row)| {
                row.insert(0, SqlValue::Int(index as i64 + 1));
                row
            })
            .collect();
        Ok(Frame {
            headers,
            rows: numbered,
        })
    }

    /// Insert rows with dimension dedup; returns how many fact rows were
    /// actually created.
    pub fn insert_joined_table(&self, rows: &[Row]) -> TkzResult<usize> {
        if rows.is_empty() {
            return Err(TkzError::BadInput(format!(
                "insert into '{}' requires at least one row",
                self.table().table_name()
            )));
        }
        let inserted = self.engine().session_scope(true, |session| {
            let mut inserted = 0usize;
            for row in rows {
                inserted += self.insert_one(session, row)?;
            }
            Ok(inserted)
        })?;
        info!(
            "table '{}' has been updated; {inserted} row(s) inserted",
            self.table().table_name()
        );
        Ok(inserted)
    }

    fn insert_one(&self, session: &mut Session, row: &[(String, SqlValue)]) -> TkzResult<usize> {
        let table = self.table();
        let mut fresh = false;
        let mut dimension_values = Vec::with_capacity(table.subtables.len());
        for dim in table.subtables {
            let column = dim.value_column().name;
            let value = row_value(row, column)
                .filter(|value| !value.is_null())
                .ok_or_else(|| {
                    TkzError::BadInput(format!(
                        "insert row for '{}' is missing dimension '{column}'",
                        table.table_name()
                    ))
                })?;
            match session.execute(
                &format!("INSERT INTO {} ({column}) VALUES (?)", dim.table_name()),
                std::slice::from_ref(&value),
            ) {
                Ok(_) => fresh = true,
                // Uniqueness violation: the dimension value already exists.
                Err(err) if err.is_integrity() => {}
                Err(err) => return Err(err),
            }
            dimension_values.push(value);
        }

        if !fresh {
            info!(
                "table '{}' not updated: 0 unique rows",
                table.table_name()
            );
            return Ok(0);
        }

        let mut fact_row: Row = Vec::new();
        for (column, dim) in table.foreign_keys().zip(table.subtables.iter()) {
            let id = session
                .query_scalar(
                    &format!(
                        "SELECT id FROM {} WHERE {} = ?",
                        dim.table_name(),
                        dim.value_column().name
                    ),
                    std::slice::from_ref(&dimension_values[fact_row.len()]),
                )?
                .ok_or_else(|| {
                    TkzError::backend(format!(
                        "dimension row vanished from '{}'",
                        dim.table_name()
                    ))
                })?;
            fact_row.push((column.name.to_string(), id));
        }
        for column in table.non_keys(false) {
            if let Some(value) = row_value(row, column.name).filter(|value| !value.is_null()) {
                fact_row.push((column.name.to_string(), value));
            }
        }
        insert_row(session, table, &fact_row)
    }

    /// Two independent edits: the fact row located through `old_source`
    /// gets the provided `target_row` columns; dimensions named in
    /// `new_source` are renamed in place, cascading into the fact table.
    pub fn update_joined_table(
        &self,
        old_source: &[(String, SqlValue)],
        new_source: &[(String, SqlValue)],
        target_row: &[(String, SqlValue)],
    ) -> TkzResult<()> {
        let table = self.table();
        let fact_sets: Vec<(String, SqlValue)> = table
            .non_keys(false)
            .iter()
            .filter_map(|column| {
                row_value(target_row, column.name)
                    .filter(|value| !value.is_null())
                    .map(|value| (column.name.to_string(), value))
            })
            .collect();
        let renames: Vec<(&'static TableDef, SqlValue, SqlValue)> = table
            .subtables
            .iter()
            .filter_map(|dim| {
                let column = dim.value_column().name;
                let old = row_value(old_source, column).filter(|value| !value.is_null())?;
                let new = row_value(new_source, column).filter(|value| !value.is_null())?;
                Some((*dim, old, new))
            })
            .collect();
        if fact_sets.is_empty() && renames.is_empty() {
            let err = TkzError::BadInput(format!(
                "update of '{}' got neither target columns nor new dimension values",
                table.table_name()
            ));
            tracing::error!("{err}");
            return Err(err);
        }

        self.engine().session_scope(true, |session| {
            if !fact_sets.is_empty() {
                let (predicate, bound) = self.dimension_predicate(old_source)?;
                let assignments: Vec<String> = fact_sets
                    .iter()
                    .map(|(column, _)| format!("{column} = ?"))
                    .collect();
                let mut params: Vec<SqlValue> =
                    fact_sets.iter().map(|(_, value)| value.clone()).collect();
                params.extend(bound);
                let affected = session.execute(
                    &format!(
                        "UPDATE {} SET {} WHERE {predicate}",
                        table.table_name(),
                        assignments.join(", ")
                    ),
                    &params,
                )?;
                info!(
                    "table '{}' has been updated; {affected} match(es) found",
                    table.table_name()
                );
            }
            for (dim, old, new) in &renames {
                let column = dim.value_column().name;
                let affected = session.execute(
                    &format!(
                        "UPDATE {} SET {column} = ? WHERE {column} = ?",
                        dim.table_name()
                    ),
                    &[new.clone(), old.clone()],
                )?;
                info!(
                    "table '{}' has been updated; {affected} match(es) found",
                    dim.table_name()
                );
            }
            Ok(())
        })
    }

    /// Delete one fact row located through its dimension values
    /// (`from_source = false`) or the dimension rows themselves
    /// (`from_source = true`), letting the foreign keys cascade.
    pub fn delete_joined_table(&self, source: &[(String, SqlValue)], from_source: bool) -> TkzResult<usize> {
        let table = self.table();
        let deleted = if from_source {
            let targets: Vec<(&'static TableDef, SqlValue)> = table
                .subtables
                .iter()
                .filter_map(|dim| {
                    row_value(source, dim.value_column().name)
                        .filter(|value| !value.is_null())
                        .map(|value| (*dim, value))
                })
                .collect();
            if targets.is_empty() {
                return Err(empty_source(table));
            }
            self.engine().session_scope(true, |session| {
                let mut deleted = 0usize;
                for (dim, value) in &targets {
                    deleted += session.execute(
                        &format!(
                            "DELETE FROM {} WHERE {} = ?",
                            dim.table_name(),
                            dim.value_column().name
                        ),
                        std::slice::from_ref(value),
                    )?;
                }
                Ok(deleted)
            })?
        } else {
            let (predicate, bound) = self.dimension_predicate(source)?;
            self.engine().session_scope(true, |session| {
                session.execute(
                    &format!("DELETE FROM {} WHERE {predicate}", table.table_name()),
                    &bound,
                )
            })?
        };
        info!(
            "rows were deleted from table '{}'; {deleted} match(es) found",
            table.table_name()
        );
        Ok(deleted)
    }

    /// `fk = (SELECT id FROM dim WHERE value = ?)` conjunction over the
    /// dimensions present in `source`.
    fn dimension_predicate(&self, source: &[(String, SqlValue)]) -> TkzResult<(String, Vec<SqlValue>)> {
        let table = self.table();
        let mut conditions = Vec::new();
        let mut bound = Vec::new();
        for (column, dim) in table.foreign_keys().zip(table.subtables.iter()) {
            if let Some(value) =
                row_value(source, dim.value_column().name).filter(|value| !value.is_null())
            {
                conditions.push(format!(
                    "{} = (SELECT id FROM {} WHERE {} = ?)",
                    column.name,
                    dim.table_name(),
                    dim.value_column().name
                ));
                bound.push(value);
            }
        }
        if conditions.is_empty() {
            return Err(empty_source(table));
        }
        Ok((conditions.join(" AND "), bound))
    }

    /// Compact the primary-key sequence to 1..N.
    ///
    /// On SQLite the rows are copied out, removed, the sequence entry is
    /// cleared and the rows are written back with fresh ids; only the ids
    /// change.
    pub fn reset_id(&self) -> TkzResult<()> {
        let table = self.table();
        let name = table.table_name();
        match self.engine().dialect() {
            Dialect::MySql => self.base.reset_id(),
            Dialect::Sqlite => {
                let columns: Vec<&str> =
                    table.columns.iter().map(|column| column.name).collect();
                self.engine().session_scope(true, |session| {
                    let rows = session.query(
                        &format!("SELECT {} FROM {name} ORDER BY id", columns.join(", ")),
                        &[],
                    )?;
                    session.execute(&format!("DELETE FROM {name}"), &[])?;
                    session.execute(
                        "DELETE FROM sqlite_sequence WHERE name = ?",
                        &[SqlValue::from(name)],
                    )?;
                    for (index, mut row) in rows.into_iter().enumerate() {
                        row[0] = SqlValue::Int(index as i64 + 1);
                        let rebuilt: Row = columns
                            .iter()
                            .map(|column| column.to_string())
                            .zip(row)
                            .collect();
                        insert_row(session, table, &rebuilt)?;
                    }
                    Ok(())
                })?;
                info!("id order for table '{name}' has been reset");
                Ok(())
            }
        }
    }
}

fn empty_source(table: &TableDef) -> TkzError {
    let err = TkzError::BadInput(format!(
        "operation on '{}' got no dimension values",
        table.table_name()
    ));
    tracing::error!("{err}");
    err
}
