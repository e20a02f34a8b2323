//! Parser for the compact chain-expression syntax.
//!
//! One input describes one system:
//!
//! ```text
//! system := chain (';' chain)*
//! chain  := elem (',' elem)*
//! elem   := (name ':')? type '(' arglist? ')'
//! ```
//!
//! The chain delimiter `;` is recognized only outside parentheses and
//! quotes. A chain whose every element carries a `name:` prefix becomes a
//! labelled mapping; a chain with no prefixes becomes a plain sequence;
//! mixed forms are rejected. Arguments are positional, quoted with either
//! quote style or bare, and are coerced by the element constructors.

use rust_decimal::Decimal;

use crate::chain::{ChainsSystem, ElemChain};
use crate::element::Element;
use crate::error::{TkzError, TkzResult};

/// Parse a full system expression. `voltage` seeds transformer elements,
/// which take their voltage from the global configuration rather than from
/// the expression.
pub fn parse_system(input: &str, voltage: Decimal) -> TkzResult<ChainsSystem> {
    if input.trim().is_empty() {
        return Err(TkzError::BadInput("empty chain expression".into()));
    }
    let chains = split_chains(input)?
        .into_iter()
        .map(|chunk| parse_chain(chunk, voltage))
        .collect::<TkzResult<Vec<_>>>()?;
    Ok(ChainsSystem::new(chains))
}

/// Split on `;` at paren depth zero, outside quotes.
fn split_chains(input: &str) -> TkzResult<Vec<&str>> {
    let mut chunks = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0usize;
    for (pos, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(open), _) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '\'') | (None, '"') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| TkzError::BadInput("unbalanced ')' in expression".into()))?;
            }
            (None, ';') if depth == 0 => {
                chunks.push(&input[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() {
        return Err(TkzError::BadInput("unterminated quote in expression".into()));
    }
    if depth != 0 {
        return Err(TkzError::BadInput("unbalanced '(' in expression".into()));
    }
    chunks.push(&input[start..]);
    Ok(chunks)
}

fn parse_chain(chunk: &str, voltage: Decimal) -> TkzResult<ElemChain> {
    let mut scanner = Scanner::new(chunk);
    let mut parsed: Vec<(Option<String>, Element)> = Vec::new();
    loop {
        parsed.push(scanner.parse_element(voltage)?);
        scanner.skip_ws();
        if scanner.at_end() {
            break;
        }
        if !scanner.eat(',') {
            return Err(scanner.unexpected("',' between elements"));
        }
    }

    let named = parsed.iter().filter(|(name, _)| name.is_some()).count();
    if named == parsed.len() {
        Ok(ElemChain::from_named(
            parsed
                .into_iter()
                .map(|(name, element)| (name.expect("all elements named"), element))
                .collect(),
        ))
    } else if named == 0 {
        Ok(ElemChain::from_elements(
            parsed.into_iter().map(|(_, element)| element).collect(),
        ))
    } else {
        Err(TkzError::BadInput(
            "chain mixes named and positional elements".into(),
        ))
    }
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Scanner { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.rest().is_empty()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.bump();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, wanted: &str) -> TkzError {
        match self.peek() {
            Some(ch) => TkzError::BadInput(format!("expected {wanted}, found '{ch}'")),
            None => TkzError::BadInput(format!("expected {wanted}, found end of input")),
        }
    }

    /// `[A-Za-z_][A-Za-z0-9_]*`
    fn read_ident(&mut self) -> &'a str {
        let start = self.pos;
        if matches!(self.peek(), Some(ch) if ch.is_ascii_alphabetic() || ch == '_') {
            self.bump();
            while matches!(self.peek(), Some(ch) if ch.is_ascii_alphanumeric() || ch == '_') {
                self.bump();
            }
        }
        &self.src[start..self.pos]
    }

    fn parse_element(&mut self, voltage: Decimal) -> TkzResult<(Option<String>, Element)> {
        self.skip_ws();
        let first = self.read_ident();
        if first.is_empty() {
            return Err(self.unexpected("an element type"));
        }
        self.skip_ws();
        let (name, kind) = if self.eat(':') {
            self.skip_ws();
            let kind = self.read_ident();
            if kind.is_empty() {
                return Err(self.unexpected("an element type after the label"));
            }
            (Some(first.to_string()), kind)
        } else {
            (None, first)
        };
        self.skip_ws();
        if !self.eat('(') {
            return Err(self.unexpected(&format!("'(' after element type '{kind}'")));
        }
        let args = self.parse_args()?;
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        Ok((name, Element::from_args(kind, &arg_refs, voltage)?))
    }

    fn parse_args(&mut self) -> TkzResult<Vec<String>> {
        let mut args = Vec::new();
        self.skip_ws();
        if self.eat(')') {
            return Ok(args);
        }
        loop {
            args.push(self.parse_arg()?);
            self.skip_ws();
            if self.eat(')') {
                return Ok(args);
            }
            if !self.eat(',') {
                return Err(self.unexpected("',' or ')' in the argument list"));
            }
            self.skip_ws();
        }
    }

    fn parse_arg(&mut self) -> TkzResult<String> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.bump();
                let start = self.pos;
                while let Some(ch) = self.peek() {
                    if ch == quote {
                        let arg = self.src[start..self.pos].to_string();
                        self.bump();
                        return Ok(arg);
                    }
                    self.bump();
                }
                Err(TkzError::BadInput("unterminated quoted argument".into()))
            }
            Some(_) => {
                let start = self.pos;
                while let Some(ch) = self.peek() {
                    if ch == ',' || ch == ')' {
                        break;
                    }
                    self.bump();
                }
                Ok(self.src[start..self.pos].trim().to_string())
            }
            None => Err(TkzError::BadInput("unterminated argument list".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const VOLTAGE: Decimal = dec!(0.4);

    const CANONICAL: &str = "T(160, 'У/Ун-0'), QS(160), QF(160), Line(), QF(25), \
                             W('ВВГ', 3, 4, 20), Line(), Arc(); \
                             TCH: T(160, 'У/Ун-0'), QF3: QF(100), R1: Line(), \
                             QF2: QF(25), W1: W('ВВГ', 3, 4, 20)";

    #[test]
    fn canonical_example_parses() {
        let system = parse_system(CANONICAL, VOLTAGE).unwrap();
        assert_eq!(system.len(), 2);
        assert_eq!(system[0].len(), 8);
        assert_eq!(system[1].len(), 5);
        assert!(matches!(system[0], ElemChain::Ordered(_)));

        let labels: Vec<&str> = (0..system[1].len())
            .map(|index| system[1].label(index).unwrap())
            .collect();
        assert_eq!(labels, ["TCH", "QF3", "R1", "QF2", "W1"]);
        assert_eq!(
            system[0].element(0),
            Some(&Element::t(160, "У/Ун-0", VOLTAGE))
        );
        assert_eq!(
            system[1].element(4),
            Some(&Element::w("ВВГ", 3, dec!(4), 20))
        );
    }

    #[test]
    fn quoting_styles_and_whitespace_are_flexible() {
        let system = parse_system("QS(63),QF(25) ,  W(\"ВВГ\",3,2.5,50)", VOLTAGE).unwrap();
        assert_eq!(system.len(), 1);
        assert_eq!(
            system[0].element(2),
            Some(&Element::w("ВВГ", 3, dec!(2.5), 50))
        );
    }

    #[test]
    fn bare_string_arguments_are_accepted() {
        let system = parse_system("W(ВВГ, 3, 4, 20)", VOLTAGE).unwrap();
        assert_eq!(system[0].element(0), Some(&Element::w("ВВГ", 3, dec!(4), 20)));
    }

    #[test]
    fn semicolon_inside_quotes_is_not_a_delimiter() {
        let system = parse_system("R('а;б'), QF(25)", VOLTAGE).unwrap();
        assert_eq!(system.len(), 1);
        assert_eq!(system[0].len(), 2);
    }

    #[test]
    fn mixed_named_and_positional_chain_is_rejected() {
        let err = parse_system("QF1: QF(25), QS(63)", VOLTAGE).unwrap_err();
        assert!(matches!(err, TkzError::BadInput(_)));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(matches!(
            parse_system("Z(25)", VOLTAGE),
            Err(TkzError::BadInput(_))
        ));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        assert!(matches!(
            parse_system("QF(25, 63)", VOLTAGE),
            Err(TkzError::BadInput(_))
        ));
        assert!(matches!(
            parse_system("Line(1)", VOLTAGE),
            Err(TkzError::BadInput(_))
        ));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            parse_system("   ", VOLTAGE),
            Err(TkzError::BadInput(_))
        ));
        assert!(matches!(
            parse_system("QF(25);; QS(63)", VOLTAGE),
            Err(TkzError::BadInput(_))
        ));
    }

    #[test]
    fn unbalanced_input_is_rejected() {
        assert!(parse_system("QF(25", VOLTAGE).is_err());
        assert!(parse_system("QF(25))", VOLTAGE).is_err());
        assert!(parse_system("R('открыто", VOLTAGE).is_err());
    }

    #[test]
    fn expression_round_trips() {
        let system = parse_system(CANONICAL, VOLTAGE).unwrap();
        let rendered = system.expression();
        let reparsed = parse_system(&rendered, VOLTAGE).unwrap();
        assert_eq!(reparsed, system);
    }
}
