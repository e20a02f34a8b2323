//! Impedance lookups for chain elements.
//!
//! [`Catalog`] implements the calculation engine's [`ImpedanceSource`]
//! contract: each element variant resolves its natural key through the
//! matching join (or the flat contacts table) and returns the requested
//! scalar. One short session per lookup; the engine layers above never see
//! the database.

use rust_decimal::Decimal;

use tkz_core::element::{Element, ImpedanceColumn, ImpedanceSource};
use tkz_core::error::{TkzError, TkzResult};

use crate::join_ops::JoinedOps;
use crate::schema::{self, TableDef};
use crate::session::Engine;
use crate::value::SqlValue;

/// Catalog-backed impedance source.
pub struct Catalog<'e> {
    engine: &'e Engine,
}

impl<'e> Catalog<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Catalog { engine }
    }

    /// Scalar from a fact table joined over its dimensions, keyed by the
    /// dimension values in subtable order.
    fn joined_scalar(
        &self,
        table: &'static TableDef,
        column: ImpedanceColumn,
        keys: &[SqlValue],
    ) -> TkzResult<Option<SqlValue>> {
        let join = JoinedOps::new(table, self.engine).join_clause();
        let conditions: Vec<String> = table
            .subtables
            .iter()
            .map(|dim| format!("{}.{} = ?", dim.table_name(), dim.value_column().name))
            .collect();
        let sql = format!(
            "SELECT {}.{} FROM {join} WHERE {}",
            table.table_name(),
            column.column_name(),
            conditions.join(" AND ")
        );
        self.engine
            .session_scope(true, |session| session.query_scalar(&sql, keys))
    }

    fn contact_scalar(
        &self,
        contact_type: &str,
        column: ImpedanceColumn,
    ) -> TkzResult<Option<SqlValue>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE contact_type = ?",
            column.column_name(),
            schema::OTHER_CONTACT.table_name()
        );
        self.engine.session_scope(true, |session| {
            session.query_scalar(&sql, &[SqlValue::from(contact_type)])
        })
    }
}

impl ImpedanceSource for Catalog<'_> {
    fn impedance_scalar(
        &self,
        element: &Element,
        column: ImpedanceColumn,
    ) -> TkzResult<Option<Decimal>> {
        let scalar = match element {
            Element::T {
                power,
                voltage,
                vector_group,
            } => self.joined_scalar(
                &schema::TRANSFORMER,
                column,
                &[
                    SqlValue::Int(*power),
                    SqlValue::Decimal(*voltage),
                    SqlValue::from(vector_group.as_str()),
                ],
            )?,
            Element::W {
                mark,
                amount,
                range,
                ..
            } => self.joined_scalar(
                &schema::CABLE,
                column,
                &[
                    SqlValue::from(mark.as_str()),
                    SqlValue::Int(*amount),
                    SqlValue::Decimal(*range),
                ],
            )?,
            Element::Q { current, .. } | Element::Qf { current } | Element::Qs { current } => {
                let device_type = element
                    .device_type()
                    .expect("switching devices carry a device type");
                self.joined_scalar(
                    &schema::CURRENT_BREAKER,
                    column,
                    &[SqlValue::from(device_type), SqlValue::Int(*current)],
                )?
            }
            Element::R { .. } | Element::Line | Element::Arc => {
                let contact_type = element
                    .contact_type()
                    .expect("contacts carry a contact type");
                self.contact_scalar(contact_type, column)?
            }
        };
        scalar
            .map(|value| {
                value.as_decimal().ok_or_else(|| {
                    TkzError::backend(format!(
                        "non-numeric {} stored for '{element}'",
                        column.column_name()
                    ))
                })
            })
            .transpose()
    }
}
