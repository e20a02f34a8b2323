//! Chains of elements and the short-circuit current formulas.
//!
//! A chain is the series path from the supply transformer to the fault
//! point, either as a plain ordered sequence or as an ordered mapping of
//! project labels to elements. Both forms sum impedances identically; the
//! labels only survive into displays. A [`ChainsSystem`] is an ordered
//! collection of chains evaluated together.
//!
//! Current formulas (U in kV, impedances in Ohm, currents in kA):
//!
//! ```text
//! I3 = U / (√3 · z3)          z3 = √(Σr1² + Σx1²)
//! I2 = (√3 / 2) · I3
//! I1 = (√3 · U) / z1          z1 = √((2Σr1 + Σr0)² + (2Σx1 + Σx0)²)
//! ```

use std::fmt;

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::element::{Element, ImpedanceSource};
use crate::error::{TkzError, TkzResult};
use crate::numeric::{decimal_sqrt, round_result};

fn sqrt3() -> Decimal {
    Decimal::from_f64(3f64.sqrt()).expect("sqrt(3) is representable")
}

/// Voltage and rounding accuracy used by the current formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalcSettings {
    /// `SYSTEM_VOLTAGE_IN_KILOVOLTS`.
    pub voltage: Decimal,
    /// `CALCULATIONS_ACCURACY`: decimal places in rounded results.
    pub accuracy: u32,
}

impl CalcSettings {
    pub fn new(voltage: Decimal, accuracy: u32) -> Self {
        CalcSettings { voltage, accuracy }
    }

    pub fn from_config(config: &Config) -> TkzResult<Self> {
        Ok(CalcSettings {
            voltage: config.system_voltage()?,
            accuracy: config.accuracy()?,
        })
    }
}

/// An ordered chain of elements, positional or labelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElemChain {
    Ordered(Vec<Element>),
    Named(Vec<(String, Element)>),
}

impl ElemChain {
    pub fn from_elements(elements: Vec<Element>) -> Self {
        ElemChain::Ordered(elements)
    }

    pub fn from_named(pairs: Vec<(String, Element)>) -> Self {
        ElemChain::Named(pairs)
    }

    pub fn len(&self) -> usize {
        match self {
            ElemChain::Ordered(elements) => elements.len(),
            ElemChain::Named(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element(&self, index: usize) -> Option<&Element> {
        match self {
            ElemChain::Ordered(elements) => elements.get(index),
            ElemChain::Named(pairs) => pairs.get(index).map(|(_, element)| element),
        }
    }

    /// Label of the element at `index`; `None` for positional chains.
    pub fn label(&self, index: usize) -> Option<&str> {
        match self {
            ElemChain::Ordered(_) => None,
            ElemChain::Named(pairs) => pairs.get(index).map(|(name, _)| name.as_str()),
        }
    }

    pub fn elements(&self) -> Box<dyn Iterator<Item = &Element> + '_> {
        match self {
            ElemChain::Ordered(elements) => Box::new(elements.iter()),
            ElemChain::Named(pairs) => Box::new(pairs.iter().map(|(_, element)| element)),
        }
    }

    /// Sub-chain of the first `end` elements, used to tabulate currents at
    /// each intermediate fault location.
    pub fn slice_to(&self, end: usize) -> ElemChain {
        match self {
            ElemChain::Ordered(elements) => {
                ElemChain::Ordered(elements[..end.min(elements.len())].to_vec())
            }
            ElemChain::Named(pairs) => ElemChain::Named(pairs[..end.min(pairs.len())].to_vec()),
        }
    }

    /// Three-phase short-circuit current, kA.
    pub fn three_phase_current(
        &self,
        source: &impl ImpedanceSource,
        settings: &CalcSettings,
    ) -> TkzResult<Decimal> {
        let z3 = self.positive_sequence_impedance(source)?;
        Ok(round_result(
            settings.voltage / sqrt3() / z3,
            settings.accuracy,
        ))
    }

    /// Two-phase short-circuit current, kA.
    pub fn two_phase_current(
        &self,
        source: &impl ImpedanceSource,
        settings: &CalcSettings,
    ) -> TkzResult<Decimal> {
        let three_phase = self.three_phase_current(source, settings)?;
        Ok(round_result(
            sqrt3() / Decimal::TWO * three_phase,
            settings.accuracy,
        ))
    }

    /// Single-phase short-circuit current, kA.
    pub fn one_phase_current(
        &self,
        source: &impl ImpedanceSource,
        settings: &CalcSettings,
    ) -> TkzResult<Decimal> {
        let z1 = self.zero_path_impedance(source)?;
        Ok(round_result(
            sqrt3() * settings.voltage / z1,
            settings.accuracy,
        ))
    }

    fn sums(
        &self,
        source: &impl ImpedanceSource,
    ) -> TkzResult<(Decimal, Decimal, Decimal, Decimal)> {
        if self.is_empty() {
            return Err(TkzError::BadInput("chain has no elements".into()));
        }
        let mut r1 = Decimal::ZERO;
        let mut x1 = Decimal::ZERO;
        let mut r0 = Decimal::ZERO;
        let mut x0 = Decimal::ZERO;
        for element in self.elements() {
            r1 += element.resistance_r1(source)?;
            x1 += element.reactance_x1(source)?;
            r0 += element.resistance_r0(source)?;
            x0 += element.reactance_x0(source)?;
        }
        Ok((r1, x1, r0, x0))
    }

    fn positive_sequence_impedance(&self, source: &impl ImpedanceSource) -> TkzResult<Decimal> {
        let (r1, x1, _, _) = self.sums(source)?;
        let impedance = decimal_sqrt(r1 * r1 + x1 * x1)?;
        if impedance.is_zero() {
            return Err(TkzError::BadInput("summary impedance is zero".into()));
        }
        Ok(impedance)
    }

    fn zero_path_impedance(&self, source: &impl ImpedanceSource) -> TkzResult<Decimal> {
        let (r1, x1, r0, x0) = self.sums(source)?;
        let loop_r = Decimal::TWO * r1 + r0;
        let loop_x = Decimal::TWO * x1 + x0;
        let impedance = decimal_sqrt(loop_r * loop_r + loop_x * loop_x)?;
        if impedance.is_zero() {
            return Err(TkzError::BadInput("summary impedance is zero".into()));
        }
        Ok(impedance)
    }

    /// Canonical chain-expression form, accepted back by the parser.
    pub fn expression(&self) -> String {
        match self {
            ElemChain::Ordered(elements) => elements
                .iter()
                .map(Element::expression)
                .collect::<Vec<_>>()
                .join(", "),
            ElemChain::Named(pairs) => pairs
                .iter()
                .map(|(name, element)| format!("{name}: {}", element.expression()))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl fmt::Display for ElemChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElemChain::Ordered(elements) => {
                let rendered: Vec<String> = elements.iter().map(Element::to_string).collect();
                write!(f, "{}", rendered.join(" -> "))
            }
            ElemChain::Named(pairs) => {
                let rendered: Vec<String> = pairs
                    .iter()
                    .map(|(name, element)| format!("{name}: {element}"))
                    .collect();
                write!(f, "{}", rendered.join(" -> "))
            }
        }
    }
}

/// Ordered collection of chains; a plain container with no aggregate
/// operations of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainsSystem {
    chains: Vec<ElemChain>,
}

impl ChainsSystem {
    pub fn new(chains: Vec<ElemChain>) -> Self {
        ChainsSystem { chains }
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn chains(&self) -> &[ElemChain] {
        &self.chains
    }

    pub fn get(&self, index: usize) -> Option<&ElemChain> {
        self.chains.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ElemChain> {
        self.chains.iter()
    }

    fn element_count(&self) -> usize {
        self.chains.iter().map(ElemChain::len).sum()
    }

    /// Canonical chain-expression form, accepted back by the parser.
    pub fn expression(&self) -> String {
        self.chains
            .iter()
            .map(ElemChain::expression)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl<'a> IntoIterator for &'a ChainsSystem {
    type Item = &'a ElemChain;
    type IntoIter = std::slice::Iter<'a, ElemChain>;

    fn into_iter(self) -> Self::IntoIter {
        self.chains.iter()
    }
}

impl std::ops::Index<usize> for ChainsSystem {
    type Output = ElemChain;

    fn index(&self, index: usize) -> &ElemChain {
        &self.chains[index]
    }
}

impl fmt::Display for ChainsSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ChainsSystem of {} chains / {} elements]",
            self.len(),
            self.element_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::testing::FixtureSource;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn source() -> FixtureSource {
        let mut values = HashMap::new();
        values.insert(
            "QF 25A".to_string(),
            [dec!(0.01), dec!(0.02), dec!(0.01), dec!(0.02)],
        );
        values.insert(
            "QS 160A".to_string(),
            [dec!(0.005), dec!(0.01), dec!(0.005), dec!(0.01)],
        );
        FixtureSource(values)
    }

    fn settings() -> CalcSettings {
        CalcSettings::new(dec!(0.4), 3)
    }

    #[test]
    fn three_phase_current_matches_hand_computation() {
        let chain = ElemChain::from_elements(vec![Element::qf(25)]);
        // z3 = sqrt(0.01^2 + 0.02^2); 0.4 / sqrt(3) / z3 = 10.3279...
        assert_eq!(
            chain.three_phase_current(&source(), &settings()).unwrap(),
            dec!(10.328)
        );
    }

    #[test]
    fn two_phase_current_is_scaled_three_phase() {
        let chain = ElemChain::from_elements(vec![Element::qf(25), Element::qs(160)]);
        let three_phase = chain.three_phase_current(&source(), &settings()).unwrap();
        let expected = round_result(sqrt3() / Decimal::TWO * three_phase, 3);
        assert_eq!(
            chain.two_phase_current(&source(), &settings()).unwrap(),
            expected
        );
    }

    #[test]
    fn one_phase_current_uses_loop_impedance() {
        let chain = ElemChain::from_elements(vec![Element::qf(25)]);
        // z1 = sqrt(0.03^2 + 0.06^2); sqrt(3) * 0.4 / z1 = 10.3279...
        assert_eq!(
            chain.one_phase_current(&source(), &settings()).unwrap(),
            dec!(10.328)
        );
    }

    #[test]
    fn named_and_ordered_chains_agree() {
        let ordered = ElemChain::from_elements(vec![Element::qf(25), Element::qs(160)]);
        let named = ElemChain::from_named(vec![
            ("QF1".to_string(), Element::qf(25)),
            ("QS1".to_string(), Element::qs(160)),
        ]);
        assert_eq!(
            ordered.three_phase_current(&source(), &settings()).unwrap(),
            named.three_phase_current(&source(), &settings()).unwrap()
        );
    }

    #[test]
    fn slicing_the_whole_chain_changes_nothing() {
        let chain = ElemChain::from_elements(vec![Element::qf(25), Element::qs(160)]);
        let sliced = chain.slice_to(chain.len());
        assert_eq!(sliced, chain);
        assert_eq!(
            sliced.three_phase_current(&source(), &settings()).unwrap(),
            chain.three_phase_current(&source(), &settings()).unwrap()
        );
    }

    #[test]
    fn slicing_shortens_the_fault_path() {
        let chain = ElemChain::from_elements(vec![Element::qf(25), Element::qs(160)]);
        let head = chain.slice_to(1);
        assert_eq!(head.len(), 1);
        // Less series impedance -> larger fault current.
        assert!(
            head.three_phase_current(&source(), &settings()).unwrap()
                > chain.three_phase_current(&source(), &settings()).unwrap()
        );
    }

    #[test]
    fn empty_chain_is_rejected() {
        let chain = ElemChain::from_elements(Vec::new());
        assert!(matches!(
            chain.three_phase_current(&source(), &settings()),
            Err(TkzError::BadInput(_))
        ));
    }

    #[test]
    fn rounded_result_has_exact_scale() {
        let chain = ElemChain::from_elements(vec![Element::qf(25)]);
        let current = chain.three_phase_current(&source(), &settings()).unwrap();
        assert!(current > Decimal::ZERO);
        assert_eq!(current.scale(), 3);
    }

    #[test]
    fn chain_display() {
        let ordered = ElemChain::from_elements(vec![Element::qs(63), Element::qf(25)]);
        assert_eq!(ordered.to_string(), "QS 63A -> QF 25A");
        let named = ElemChain::from_named(vec![
            ("QS1".to_string(), Element::qs(63)),
            ("R1".to_string(), Element::line()),
        ]);
        assert_eq!(named.to_string(), "QS1: QS 63A -> R1: РУ");
    }

    #[test]
    fn system_display_counts_chains_and_elements() {
        let system = ChainsSystem::new(vec![
            ElemChain::from_elements(vec![Element::qf(25), Element::qs(160)]),
            ElemChain::from_elements(vec![Element::arc()]),
        ]);
        assert_eq!(system.to_string(), "[ChainsSystem of 2 chains / 3 elements]");
        assert_eq!(system.len(), 2);
        assert_eq!(system[0].len(), 2);
    }
}
