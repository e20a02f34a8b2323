//! Backend-neutral cell values.
//!
//! Both backends speak through [`SqlValue`]: parameters convert into the
//! driver's own value type on the way out and query results convert back on
//! the way in. Decimals travel as floats through SQLite (NUMERIC affinity)
//! and as decimal literals through MySQL; the float round trip recovers the
//! shortest decimal representation, which is exact at catalog magnitudes.

use std::fmt;

use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// One table cell or bound parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Decimal(Decimal),
    Text(String),
}

impl SqlValue {
    /// Type-inference ladder for CSV cells and wire bytes: first success
    /// among integer, decimal, text.
    ///
    /// The ladder is deterministic: a purely numeric string can never be
    /// preserved as a string through CSV ingest; such values must enter
    /// through explicit inserts.
    pub fn infer(raw: &str) -> SqlValue {
        if let Ok(int) = raw.trim().parse::<i64>() {
            return SqlValue::Int(int);
        }
        if let Ok(dec) = raw.trim().parse::<Decimal>() {
            return SqlValue::Decimal(dec);
        }
        if let Some(dec) = raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Decimal::from_f64)
        {
            return SqlValue::Decimal(dec);
        }
        SqlValue::Text(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric view of the cell, if it has one.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            SqlValue::Int(value) => Some(Decimal::from(*value)),
            SqlValue::Decimal(value) => Some(*value),
            SqlValue::Text(value) => value.parse::<Decimal>().ok(),
            SqlValue::Null => None,
        }
    }

    pub(crate) fn from_sqlite(value: SqliteValue) -> SqlValue {
        match value {
            SqliteValue::Null => SqlValue::Null,
            SqliteValue::Integer(int) => SqlValue::Int(int),
            SqliteValue::Real(real) => Decimal::from_f64(real)
                .map(SqlValue::Decimal)
                .unwrap_or_else(|| SqlValue::Text(real.to_string())),
            SqliteValue::Text(text) => SqlValue::Text(text),
            SqliteValue::Blob(blob) => SqlValue::Text(String::from_utf8_lossy(&blob).into_owned()),
        }
    }

    pub(crate) fn from_mysql(value: mysql::Value) -> SqlValue {
        match value {
            mysql::Value::NULL => SqlValue::Null,
            mysql::Value::Int(int) => SqlValue::Int(int),
            mysql::Value::UInt(uint) => SqlValue::Int(uint as i64),
            mysql::Value::Float(real) => Decimal::from_f32(real)
                .map(SqlValue::Decimal)
                .unwrap_or_else(|| SqlValue::Text(real.to_string())),
            mysql::Value::Double(real) => Decimal::from_f64(real)
                .map(SqlValue::Decimal)
                .unwrap_or_else(|| SqlValue::Text(real.to_string())),
            mysql::Value::Bytes(bytes) => {
                SqlValue::infer(&String::from_utf8_lossy(&bytes))
            }
            other => SqlValue::Text(format!("{other:?}")),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, ""),
            SqlValue::Int(value) => write!(f, "{value}"),
            SqlValue::Decimal(value) => write!(f, "{value}"),
            SqlValue::Text(value) => write!(f, "{value}"),
        }
    }
}

impl rusqlite::ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(SqliteValue::Null),
            SqlValue::Int(value) => ToSqlOutput::Owned(SqliteValue::Integer(*value)),
            SqlValue::Decimal(value) => {
                let real = value.to_f64().ok_or_else(|| {
                    rusqlite::Error::ToSqlConversionFailure(
                        format!("decimal {value} out of range").into(),
                    )
                })?;
                ToSqlOutput::Owned(SqliteValue::Real(real))
            }
            SqlValue::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
        })
    }
}

impl From<&SqlValue> for mysql::Value {
    fn from(value: &SqlValue) -> mysql::Value {
        match value {
            SqlValue::Null => mysql::Value::NULL,
            SqlValue::Int(int) => mysql::Value::Int(*int),
            SqlValue::Decimal(dec) => mysql::Value::Bytes(dec.to_string().into_bytes()),
            SqlValue::Text(text) => mysql::Value::Bytes(text.clone().into_bytes()),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> SqlValue {
        SqlValue::Int(value)
    }
}

impl From<Decimal> for SqlValue {
    fn from(value: Decimal) -> SqlValue {
        SqlValue::Decimal(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> SqlValue {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> SqlValue {
        SqlValue::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn inference_ladder_is_first_success() {
        assert_eq!(SqlValue::infer("160"), SqlValue::Int(160));
        assert_eq!(SqlValue::infer("0.4"), SqlValue::Decimal(dec!(0.4)));
        assert_eq!(SqlValue::infer("1e-3"), SqlValue::Decimal(dec!(0.001)));
        assert_eq!(
            SqlValue::infer("У/Ун-0"),
            SqlValue::Text("У/Ун-0".to_string())
        );
        // Leading zeros collapse through the integer rung.
        assert_eq!(SqlValue::infer("007"), SqlValue::Int(7));
    }

    #[test]
    fn decimal_views() {
        assert_eq!(SqlValue::Int(3).as_decimal(), Some(dec!(3)));
        assert_eq!(SqlValue::Decimal(dec!(0.4)).as_decimal(), Some(dec!(0.4)));
        assert_eq!(SqlValue::Null.as_decimal(), None);
    }

    #[test]
    fn sqlite_real_round_trip_keeps_short_form() {
        let through = SqlValue::from_sqlite(SqliteValue::Real(0.0166));
        assert_eq!(through, SqlValue::Decimal(dec!(0.0166)));
    }
}
