//! Syntax support for the line-oriented grammar text.
//!
//! ```text
//! # comment
//! E -> E + T | T
//! T -> ( E ) | id |
//! ```
//!
//! Each non-blank, non-comment line holds a single production arrow. An
//! empty alternative (or a lone `ε`) denotes an epsilon production.

use crate::grammar::{GrammarError, EOI_NAME, EPSILON_NAME};

const ARROW: &str = "->";
const ALTERNATIVE_SEPARATOR: char = '|';
const COMMENT: char = '#';

/// A production line, with its alternatives split into symbol names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDesc {
    /// The 1-based line number in the source text.
    pub line: usize,
    pub left: String,
    pub alternatives: Vec<Vec<String>>,
}

pub fn parse(source: &str) -> Result<Vec<RuleDesc>, GrammarError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let mut descs = vec![];
    for (i, raw) in source.lines().enumerate() {
        let text = raw.trim();
        if text.is_empty() || text.starts_with(COMMENT) {
            continue;
        }
        let desc = parse_line(i + 1, text)?;
        tracing::trace!("line {}: {:?}", desc.line, desc);
        descs.push(desc);
    }
    Ok(descs)
}

fn parse_line(line: usize, text: &str) -> Result<RuleDesc, GrammarError> {
    let error = |reason| GrammarError::Syntax {
        line,
        text: text.to_owned(),
        reason,
    };

    let (left, right) = text
        .split_once(ARROW)
        .ok_or_else(|| error("missing production arrow `->'"))?;
    if right.contains(ARROW) {
        return Err(error("multiple production arrows in a line"));
    }

    let mut left = left.split_whitespace();
    let left = match (left.next(), left.next()) {
        (Some(left), None) => left,
        (None, _) => return Err(error("empty left-hand side")),
        (Some(_), Some(_)) => return Err(error("left-hand side must be a single symbol")),
    };
    if is_reserved(left) {
        return Err(error("reserved symbol in the left-hand side"));
    }

    let mut alternatives = vec![];
    for alternative in right.split(ALTERNATIVE_SEPARATOR) {
        let symbols: Vec<&str> = alternative.split_whitespace().collect();
        if matches!(symbols[..], [symbol] if is_epsilon(symbol)) {
            alternatives.push(vec![]);
            continue;
        }
        if symbols.iter().any(|s| is_epsilon(s)) {
            return Err(error("epsilon must be the only symbol of an alternative"));
        }
        if symbols.contains(&EOI_NAME) {
            return Err(error("the end-of-input marker `$' cannot be used"));
        }
        alternatives.push(symbols.into_iter().map(String::from).collect());
    }

    Ok(RuleDesc {
        line,
        left: left.to_owned(),
        alternatives,
    })
}

fn is_epsilon(symbol: &str) -> bool {
    symbol == EPSILON_NAME
}

fn is_reserved(symbol: &str) -> bool {
    symbol == EOI_NAME || is_epsilon(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternatives(desc: &RuleDesc) -> Vec<Vec<&str>> {
        desc.alternatives
            .iter()
            .map(|alt| alt.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn split_alternatives() {
        let descs = parse("\n  # comment\nE -> E + T | T\n\nF->( E )|id|").unwrap();
        assert_eq!(descs.len(), 2);

        assert_eq!(descs[0].line, 3);
        assert_eq!(descs[0].left, "E");
        assert_eq!(alternatives(&descs[0]), [vec!["E", "+", "T"], vec!["T"]]);

        assert_eq!(descs[1].line, 5);
        assert_eq!(descs[1].left, "F");
        assert_eq!(
            alternatives(&descs[1]),
            [vec!["(", "E", ")"], vec!["id"], vec![]]
        );
    }

    #[test]
    fn explicit_epsilon() {
        let descs = parse("A -> ε | a").unwrap();
        assert_eq!(alternatives(&descs[0]), [vec![], vec!["a"]]);
    }

    #[test]
    fn epsilon_word_is_an_ordinary_symbol() {
        let descs = parse("S -> epsilon x").unwrap();
        assert_eq!(alternatives(&descs[0]), [vec!["epsilon", "x"]]);
    }

    #[test]
    fn syntax_errors() {
        for (source, line) in [
            ("A -> a\nA a", 2),
            ("A -> a -> b", 1),
            ("\n-> a", 2),
            ("A B -> a", 1),
            ("A -> a ε", 1),
            ("A -> a $", 1),
            ("$ -> a", 1),
        ] {
            match parse(source) {
                Err(GrammarError::Syntax { line: l, .. }) => assert_eq!(l, line, "{:?}", source),
                res => panic!("unexpected result for {:?}: {:?}", source, res),
            }
        }
    }
}
