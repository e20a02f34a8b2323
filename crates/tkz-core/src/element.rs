//! Typed taxonomy of chain elements.
//!
//! Each variant carries the natural key of one catalog row: a transformer is
//! identified by (power, voltage, vector group), a cable by (mark, core
//! count, range) plus its length, a breaker by (nominal current, device
//! type) and a passive contact by its contact type. The variants are plain
//! values; impedances are resolved on demand through an [`ImpedanceSource`].
//!
//! The letter codes follow circuit-diagram conventions: `T` transformer,
//! `W` cable/wire, `Q` switching device (`QF` automatic breaker, `QS` knife
//! switch), `R` other resistance.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{TkzError, TkzResult};

/// Device type recorded for `QF` breakers.
pub const DEVICE_AUTOMATIC: &str = "Автомат";
/// Device type recorded for `QS` switches.
pub const DEVICE_KNIFE_SWITCH: &str = "Рубильник";
/// Contact type recorded for switchgear line sections.
pub const CONTACT_SWITCHGEAR: &str = "РУ";
/// Contact type recorded for the fault arc.
pub const CONTACT_ARC: &str = "Дуга";

/// One of the four stored impedance scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImpedanceColumn {
    ResistanceR1,
    ReactanceX1,
    ResistanceR0,
    ReactanceX0,
}

impl ImpedanceColumn {
    /// Column name in the catalog tables.
    pub fn column_name(self) -> &'static str {
        match self {
            ImpedanceColumn::ResistanceR1 => "resistance_r1",
            ImpedanceColumn::ReactanceX1 => "reactance_x1",
            ImpedanceColumn::ResistanceR0 => "resistance_r0",
            ImpedanceColumn::ReactanceX0 => "reactance_x0",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ImpedanceColumn::ResistanceR1 => "resistance R1",
            ImpedanceColumn::ReactanceX1 => "reactance X1",
            ImpedanceColumn::ResistanceR0 => "resistance R0",
            ImpedanceColumn::ReactanceX0 => "reactance X0",
        }
    }
}

/// Resolves an element's natural key to one stored impedance scalar.
///
/// `Ok(None)` means the catalog has no matching row (or a NULL cell); the
/// element layer turns that into [`TkzError::NotInCatalog`]. Implementations
/// must not rescale stored values; the cable length scaling happens here.
pub trait ImpedanceSource {
    fn impedance_scalar(
        &self,
        element: &Element,
        column: ImpedanceColumn,
    ) -> TkzResult<Option<Decimal>>;
}

/// One series element of a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    /// Supply transformer.
    T {
        power: i64,
        voltage: Decimal,
        vector_group: String,
    },
    /// Cable or wire; stored impedances are per kilometer, `length` is in
    /// meters.
    W {
        mark: String,
        amount: i64,
        range: Decimal,
        length: i64,
    },
    /// Switching device with an explicit device type.
    Q { current: i64, device_type: String },
    /// Automatic breaker.
    Qf { current: i64 },
    /// Knife switch.
    Qs { current: i64 },
    /// Other contact with an explicit contact type.
    R { contact_type: String },
    /// Switchgear line section.
    Line,
    /// Fault arc.
    Arc,
}

impl Element {
    pub fn t(power: i64, vector_group: impl Into<String>, voltage: Decimal) -> Element {
        Element::T {
            power,
            voltage,
            vector_group: vector_group.into(),
        }
    }

    pub fn w(mark: impl Into<String>, amount: i64, range: Decimal, length: i64) -> Element {
        Element::W {
            mark: mark.into(),
            amount,
            range,
            length,
        }
    }

    pub fn q(current: i64, device_type: impl Into<String>) -> Element {
        Element::Q {
            current,
            device_type: device_type.into(),
        }
    }

    pub fn qf(current: i64) -> Element {
        Element::Qf { current }
    }

    pub fn qs(current: i64) -> Element {
        Element::Qs { current }
    }

    pub fn r(contact_type: impl Into<String>) -> Element {
        Element::R {
            contact_type: contact_type.into(),
        }
    }

    pub fn line() -> Element {
        Element::Line
    }

    pub fn arc() -> Element {
        Element::Arc
    }

    /// Construct from a type code and positional text arguments, as written
    /// in a chain expression. Arguments are coerced to the declared field
    /// types; failures and arity mismatches report [`TkzError::BadInput`].
    pub fn from_args(kind: &str, args: &[&str], voltage: Decimal) -> TkzResult<Element> {
        match kind {
            "T" => {
                let [power, vector_group] = expect_args::<2>(kind, args)?;
                Ok(Element::t(coerce_int(power)?, vector_group, voltage))
            }
            "W" => {
                let [mark, amount, range, length] = expect_args::<4>(kind, args)?;
                Ok(Element::w(
                    mark,
                    coerce_int(amount)?,
                    coerce_decimal(range)?,
                    coerce_int(length)?,
                ))
            }
            "Q" => {
                let [current, device_type] = expect_args::<2>(kind, args)?;
                Ok(Element::q(coerce_int(current)?, device_type))
            }
            "QF" => {
                let [current] = expect_args::<1>(kind, args)?;
                Ok(Element::qf(coerce_int(current)?))
            }
            "QS" => {
                let [current] = expect_args::<1>(kind, args)?;
                Ok(Element::qs(coerce_int(current)?))
            }
            "R" => {
                let [contact_type] = expect_args::<1>(kind, args)?;
                Ok(Element::r(contact_type))
            }
            "Line" => {
                expect_args::<0>(kind, args)?;
                Ok(Element::line())
            }
            "Arc" => {
                expect_args::<0>(kind, args)?;
                Ok(Element::arc())
            }
            other => Err(TkzError::BadInput(format!("unknown element type '{other}'"))),
        }
    }

    /// Device type of a switching device variant.
    pub fn device_type(&self) -> Option<&str> {
        match self {
            Element::Q { device_type, .. } => Some(device_type),
            Element::Qf { .. } => Some(DEVICE_AUTOMATIC),
            Element::Qs { .. } => Some(DEVICE_KNIFE_SWITCH),
            _ => None,
        }
    }

    /// Contact type of a passive contact variant.
    pub fn contact_type(&self) -> Option<&str> {
        match self {
            Element::R { contact_type } => Some(contact_type),
            Element::Line => Some(CONTACT_SWITCHGEAR),
            Element::Arc => Some(CONTACT_ARC),
            _ => None,
        }
    }

    pub fn resistance_r1(&self, source: &impl ImpedanceSource) -> TkzResult<Decimal> {
        self.lookup(source, ImpedanceColumn::ResistanceR1)
    }

    pub fn reactance_x1(&self, source: &impl ImpedanceSource) -> TkzResult<Decimal> {
        self.lookup(source, ImpedanceColumn::ReactanceX1)
    }

    pub fn resistance_r0(&self, source: &impl ImpedanceSource) -> TkzResult<Decimal> {
        self.lookup(source, ImpedanceColumn::ResistanceR0)
    }

    pub fn reactance_x0(&self, source: &impl ImpedanceSource) -> TkzResult<Decimal> {
        self.lookup(source, ImpedanceColumn::ReactanceX0)
    }

    fn lookup(&self, source: &impl ImpedanceSource, column: ImpedanceColumn) -> TkzResult<Decimal> {
        let stored = source.impedance_scalar(self, column)?.ok_or_else(|| {
            let message = format!("{} for '{self}' is not found in the catalog", column.describe());
            tracing::error!("{message}");
            TkzError::NotInCatalog(message)
        })?;
        // Cable impedances are stored per kilometer.
        Ok(match self {
            Element::W { length, .. } => stored / Decimal::from(1000) * Decimal::from(*length),
            _ => stored,
        })
    }

    /// Canonical chain-expression form, accepted back by the parser.
    pub fn expression(&self) -> String {
        match self {
            Element::T {
                power,
                vector_group,
                ..
            } => format!("T({power}, '{vector_group}')"),
            Element::W {
                mark,
                amount,
                range,
                length,
            } => format!("W('{mark}', {amount}, {}, {length})", range.normalize()),
            Element::Q {
                current,
                device_type,
            } => format!("Q({current}, '{device_type}')"),
            Element::Qf { current } => format!("QF({current})"),
            Element::Qs { current } => format!("QS({current})"),
            Element::R { contact_type } => format!("R('{contact_type}')"),
            Element::Line => "Line()".to_string(),
            Element::Arc => "Arc()".to_string(),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::T {
                power,
                voltage,
                vector_group,
            } => write!(f, "T {power}/{} ({vector_group})", voltage.normalize()),
            Element::W {
                mark,
                amount,
                range,
                length,
            } => write!(f, "{mark} {amount}x{} {length}m", range.normalize()),
            Element::Q { current, .. } => write!(f, "Q {current}A"),
            Element::Qf { current } => write!(f, "QF {current}A"),
            Element::Qs { current } => write!(f, "QS {current}A"),
            Element::R { .. } => write!(f, "R"),
            Element::Line => write!(f, "{CONTACT_SWITCHGEAR}"),
            Element::Arc => write!(f, "{CONTACT_ARC}"),
        }
    }
}

fn expect_args<'a, const N: usize>(kind: &str, args: &[&'a str]) -> TkzResult<[&'a str; N]> {
    <[&str; N]>::try_from(args).map_err(|_| {
        TkzError::BadInput(format!(
            "element {kind} takes {N} argument(s), got {}",
            args.len()
        ))
    })
}

fn coerce_int(arg: &str) -> TkzResult<i64> {
    arg.trim()
        .parse::<i64>()
        .map_err(|_| TkzError::BadInput(format!("cannot convert '{arg}' to an integer")))
}

fn coerce_decimal(arg: &str) -> TkzResult<Decimal> {
    arg.trim()
        .parse::<Decimal>()
        .map_err(|_| TkzError::BadInput(format!("cannot convert '{arg}' to a decimal")))
}
