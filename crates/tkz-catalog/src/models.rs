//! Validated input structs for the CRUD surface.
//!
//! These mirror the catalog rows as the GUI collaborator sees them: insert
//! payloads carry the full dimension tuple plus optional fact columns
//! (defaulting to 0), while update/delete payloads are all-optional — only
//! the provided fields take part in the operation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::base_ops::Row;
use crate::value::SqlValue;

fn push(row: &mut Row, name: &str, value: impl Into<SqlValue>) {
    row.push((name.to_string(), value.into()));
}

fn push_opt(row: &mut Row, name: &str, value: Option<impl Into<SqlValue>>) {
    if let Some(value) = value {
        row.push((name.to_string(), value.into()));
    }
}

/// Insert payload for the transformer fact table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertTransformer {
    pub power: i64,
    pub voltage: Decimal,
    pub vector_group: String,
    pub power_short_circuit: Decimal,
    pub voltage_short_circuit: Decimal,
    pub resistance_r1: Decimal,
    pub reactance_x1: Decimal,
    pub resistance_r0: Decimal,
    pub reactance_x0: Decimal,
}

impl InsertTransformer {
    /// New payload with zeroed fact columns.
    pub fn new(power: i64, voltage: Decimal, vector_group: impl Into<String>) -> Self {
        InsertTransformer {
            power,
            voltage,
            vector_group: vector_group.into(),
            power_short_circuit: Decimal::ZERO,
            voltage_short_circuit: Decimal::ZERO,
            resistance_r1: Decimal::ZERO,
            reactance_x1: Decimal::ZERO,
            resistance_r0: Decimal::ZERO,
            reactance_x0: Decimal::ZERO,
        }
    }

    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        push(&mut row, "power", self.power);
        push(&mut row, "voltage", self.voltage);
        push(&mut row, "vector_group", self.vector_group);
        push(&mut row, "power_short_circuit", self.power_short_circuit);
        push(&mut row, "voltage_short_circuit", self.voltage_short_circuit);
        push(&mut row, "resistance_r1", self.resistance_r1);
        push(&mut row, "reactance_x1", self.reactance_x1);
        push(&mut row, "resistance_r0", self.resistance_r0);
        push(&mut row, "reactance_x0", self.reactance_x0);
        row
    }
}

/// Dimension tuple of a transformer row; used to locate rows for update and
/// delete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformerSource {
    pub power: Option<i64>,
    pub voltage: Option<Decimal>,
    pub vector_group: Option<String>,
}

impl TransformerSource {
    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        push_opt(&mut row, "power", self.power);
        push_opt(&mut row, "voltage", self.voltage);
        push_opt(&mut row, "vector_group", self.vector_group);
        row
    }
}

/// Fact-column edit of a transformer row; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformerRowUpdate {
    pub power_short_circuit: Option<Decimal>,
    pub voltage_short_circuit: Option<Decimal>,
    pub resistance_r1: Option<Decimal>,
    pub reactance_x1: Option<Decimal>,
    pub resistance_r0: Option<Decimal>,
    pub reactance_x0: Option<Decimal>,
}

impl TransformerRowUpdate {
    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        push_opt(&mut row, "power_short_circuit", self.power_short_circuit);
        push_opt(&mut row, "voltage_short_circuit", self.voltage_short_circuit);
        push_opt(&mut row, "resistance_r1", self.resistance_r1);
        push_opt(&mut row, "reactance_x1", self.reactance_x1);
        push_opt(&mut row, "resistance_r0", self.resistance_r0);
        push_opt(&mut row, "reactance_x0", self.reactance_x0);
        row
    }
}

/// Insert payload for the cable fact table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertCable {
    pub mark_name: String,
    pub multicore_amount: i64,
    pub cable_range: Decimal,
    pub continuous_current: Decimal,
    pub resistance_r1: Decimal,
    pub reactance_x1: Decimal,
    pub resistance_r0: Decimal,
    pub reactance_x0: Decimal,
}

impl InsertCable {
    pub fn new(mark_name: impl Into<String>, multicore_amount: i64, cable_range: Decimal) -> Self {
        InsertCable {
            mark_name: mark_name.into(),
            multicore_amount,
            cable_range,
            continuous_current: Decimal::ZERO,
            resistance_r1: Decimal::ZERO,
            reactance_x1: Decimal::ZERO,
            resistance_r0: Decimal::ZERO,
            reactance_x0: Decimal::ZERO,
        }
    }

    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        push(&mut row, "mark_name", self.mark_name);
        push(&mut row, "multicore_amount", self.multicore_amount);
        push(&mut row, "cable_range", self.cable_range);
        push(&mut row, "continuous_current", self.continuous_current);
        push(&mut row, "resistance_r1", self.resistance_r1);
        push(&mut row, "reactance_x1", self.reactance_x1);
        push(&mut row, "resistance_r0", self.resistance_r0);
        push(&mut row, "reactance_x0", self.reactance_x0);
        row
    }
}

/// Dimension tuple of a cable row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CableSource {
    pub mark_name: Option<String>,
    pub multicore_amount: Option<i64>,
    pub cable_range: Option<Decimal>,
}

impl CableSource {
    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        push_opt(&mut row, "mark_name", self.mark_name);
        push_opt(&mut row, "multicore_amount", self.multicore_amount);
        push_opt(&mut row, "cable_range", self.cable_range);
        row
    }
}

/// Fact-column edit of a cable row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CableRowUpdate {
    pub continuous_current: Option<Decimal>,
    pub resistance_r1: Option<Decimal>,
    pub reactance_x1: Option<Decimal>,
    pub resistance_r0: Option<Decimal>,
    pub reactance_x0: Option<Decimal>,
}

impl CableRowUpdate {
    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        push_opt(&mut row, "continuous_current", self.continuous_current);
        push_opt(&mut row, "resistance_r1", self.resistance_r1);
        push_opt(&mut row, "reactance_x1", self.reactance_x1);
        push_opt(&mut row, "resistance_r0", self.resistance_r0);
        push_opt(&mut row, "reactance_x0", self.reactance_x0);
        row
    }
}

/// Insert payload for the current-breaker fact table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertBreaker {
    pub device_type: String,
    pub current_value: i64,
    pub resistance_r1: Decimal,
    pub reactance_x1: Decimal,
    pub resistance_r0: Decimal,
    pub reactance_x0: Decimal,
}

impl InsertBreaker {
    pub fn new(device_type: impl Into<String>, current_value: i64) -> Self {
        InsertBreaker {
            device_type: device_type.into(),
            current_value,
            resistance_r1: Decimal::ZERO,
            reactance_x1: Decimal::ZERO,
            resistance_r0: Decimal::ZERO,
            reactance_x0: Decimal::ZERO,
        }
    }

    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        push(&mut row, "device_type", self.device_type);
        push(&mut row, "current_value", self.current_value);
        push(&mut row, "resistance_r1", self.resistance_r1);
        push(&mut row, "reactance_x1", self.reactance_x1);
        push(&mut row, "resistance_r0", self.resistance_r0);
        push(&mut row, "reactance_x0", self.reactance_x0);
        row
    }
}

/// Dimension tuple of a breaker row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BreakerSource {
    pub device_type: Option<String>,
    pub current_value: Option<i64>,
}

impl BreakerSource {
    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        push_opt(&mut row, "device_type", self.device_type);
        push_opt(&mut row, "current_value", self.current_value);
        row
    }
}

/// Fact-column edit of a breaker row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BreakerRowUpdate {
    pub resistance_r1: Option<Decimal>,
    pub reactance_x1: Option<Decimal>,
    pub resistance_r0: Option<Decimal>,
    pub reactance_x0: Option<Decimal>,
}

impl BreakerRowUpdate {
    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        push_opt(&mut row, "resistance_r1", self.resistance_r1);
        push_opt(&mut row, "reactance_x1", self.reactance_x1);
        push_opt(&mut row, "resistance_r0", self.resistance_r0);
        push_opt(&mut row, "reactance_x0", self.reactance_x0);
        row
    }
}

/// Insert payload for the flat contacts table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertContact {
    pub contact_type: String,
    pub resistance_r1: Decimal,
    pub reactance_x1: Decimal,
    pub resistance_r0: Decimal,
    pub reactance_x0: Decimal,
}

impl InsertContact {
    pub fn new(contact_type: impl Into<String>) -> Self {
        InsertContact {
            contact_type: contact_type.into(),
            resistance_r1: Decimal::ZERO,
            reactance_x1: Decimal::ZERO,
            resistance_r0: Decimal::ZERO,
            reactance_x0: Decimal::ZERO,
        }
    }

    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        push(&mut row, "contact_type", self.contact_type);
        push(&mut row, "resistance_r1", self.resistance_r1);
        push(&mut row, "reactance_x1", self.reactance_x1);
        push(&mut row, "resistance_r0", self.resistance_r0);
        push(&mut row, "reactance_x0", self.reactance_x0);
        row
    }
}

/// Fact-column edit of a contact row; applied with a `WHERE contact_type IN`
/// update through the base table operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactRowUpdate {
    pub contact_type: Option<String>,
    pub resistance_r1: Option<Decimal>,
    pub reactance_x1: Option<Decimal>,
    pub resistance_r0: Option<Decimal>,
    pub reactance_x0: Option<Decimal>,
}

impl ContactRowUpdate {
    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        push_opt(&mut row, "contact_type", self.contact_type);
        push_opt(&mut row, "resistance_r1", self.resistance_r1);
        push_opt(&mut row, "reactance_x1", self.reactance_x1);
        push_opt(&mut row, "resistance_r0", self.resistance_r0);
        push_opt(&mut row, "reactance_x0", self.reactance_x0);
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn insert_payload_defaults_fact_columns_to_zero() {
        let row = InsertTransformer::new(160, dec!(0.4), "У/Ун-0").into_row();
        assert_eq!(row.len(), 9);
        assert_eq!(row[0], ("power".to_string(), SqlValue::Int(160)));
        assert_eq!(
            row[3],
            (
                "power_short_circuit".to_string(),
                SqlValue::Decimal(Decimal::ZERO)
            )
        );
    }

    #[test]
    fn optional_payloads_keep_only_provided_fields() {
        let row = CableSource {
            mark_name: Some("ВВГ".into()),
            ..CableSource::default()
        }
        .into_row();
        assert_eq!(row, vec![("mark_name".to_string(), SqlValue::from("ВВГ"))]);

        let row = BreakerRowUpdate {
            reactance_x1: Some(dec!(0.001)),
            ..BreakerRowUpdate::default()
        }
        .into_row();
        assert_eq!(
            row,
            vec![("reactance_x1".to_string(), SqlValue::Decimal(dec!(0.001)))]
        );
    }
}
