//! # tkz-core: Short-Circuit Calculation Core
//!
//! Provides the element model and calculation engine for short-circuit
//! currents in low-voltage (0.4 kV, three-phase) distribution networks.
//!
//! ## Design Philosophy
//!
//! A fault path is modeled as a **chain** of series-connected elements from
//! the supply transformer down to the fault point. Each element value is an
//! immutable natural key into a catalog of measured impedances; the catalog
//! itself lives behind the [`ImpedanceSource`] trait so the engine never
//! binds to a concrete database.
//!
//! All electrical quantities are exact decimals. Floats appear only inside
//! the square root; results are rounded half-away-from-zero to the
//! configured accuracy.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tkz_core::*;
//!
//! let settings = CalcSettings::new(voltage, accuracy);
//! let system = parse_system(
//!     "T(160, 'У/Ун-0'), QS(160), QF(160), Line(), QF(25), W('ВВГ', 3, 4, 20)",
//!     settings.voltage,
//! )?;
//! let current = system[0].three_phase_current(&catalog, &settings)?;
//! println!("Ik(3) = {current} kA");
//! ```
//!
//! ## Modules
//!
//! - [`element`] - Typed element taxonomy and the impedance lookup contract
//! - [`chain`] - Chains, systems and the current formulas
//! - [`parse`] - The compact chain-expression syntax
//! - [`config`] - The persistent key/value configuration store
//! - [`numeric`] - Decimal square root and result rounding

pub mod chain;
pub mod config;
pub mod element;
pub mod error;
pub mod numeric;
pub mod parse;

pub use chain::{CalcSettings, ChainsSystem, ElemChain};
pub use config::{keys, BackendBinding, Config, ConfigValue};
pub use element::{Element, ImpedanceColumn, ImpedanceSource};
pub use error::{TkzError, TkzResult};
pub use numeric::{decimal_sqrt, round_result};
pub use parse::parse_system;
