//! Calculation of first set function.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID, EPSILON_NAME},
    types::{Map, TerminalSet},
    util::{display_fn, display_terminals},
};
use std::fmt;

/// `First(X)`: the terminals that can begin a string derived from `X`, and
/// whether `X` can derive the empty string (epsilon).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirstSet {
    terminals: TerminalSet,
    epsilon: bool,
}

impl FirstSet {
    pub fn terminals(&self) -> &TerminalSet {
        &self.terminals
    }

    pub fn contains(&self, terminal: TerminalID) -> bool {
        self.terminals.contains(terminal)
    }

    pub fn contains_epsilon(&self) -> bool {
        self.epsilon
    }

    /// Add the elements of `other`, except epsilon.
    fn union_terminals(&mut self, other: &FirstSet) -> bool {
        self.terminals.union_with(&other.terminals)
    }
}

#[derive(Debug)]
pub struct FirstSets {
    map: Map<NonterminalID, FirstSet>,
}

impl FirstSets {
    /// Compute `First(N)` for every nonterminal `N` of the grammar.
    ///
    /// All productions are swept repeatedly until no set changes, so the
    /// result does not depend on the order in which nonterminals are visited.
    pub fn new(grammar: &Grammar) -> Self {
        let span = tracing::debug_span!("first_sets");
        let _entered = span.enter();

        // First(N) = {} と初期化する
        let mut map: Map<NonterminalID, FirstSet> = grammar
            .nonterminals
            .keys()
            .map(|id| (*id, FirstSet::default()))
            .collect();

        let mut iterations = 0;
        let mut changed = true;
        while changed {
            changed = false;
            iterations += 1;

            for rule in grammar.rules.values() {
                // X -> Y1 Y2 ... Yn に対し、nullable でない最初の記号 Yk までの
                // First(Yi) - {ε} を First(X) に加える
                let mut contribution = FirstSet::default();
                let mut all_nullable = true;
                for symbol in rule.right() {
                    match symbol {
                        SymbolID::T(t) => {
                            contribution.terminals.insert(*t);
                            all_nullable = false;
                        }
                        SymbolID::N(n) => {
                            let first = &map[n];
                            contribution.union_terminals(first);
                            if !first.epsilon {
                                all_nullable = false;
                            }
                        }
                    }
                    if !all_nullable {
                        break;
                    }
                }

                let first = &mut map[&rule.left()];
                changed |= first.union_terminals(&contribution);
                if all_nullable && !first.epsilon {
                    first.epsilon = true;
                    changed = true;
                }
            }
        }
        tracing::debug!("converged after {} iterations", iterations);

        Self { map }
    }

    /// Return `First(symbol)`.
    pub fn get(&self, symbol: SymbolID) -> FirstSet {
        match symbol {
            SymbolID::T(t) => FirstSet {
                terminals: Some(t).into_iter().collect(),
                epsilon: false,
            },
            SymbolID::N(n) => self.map.get(&n).cloned().unwrap_or_default(),
        }
    }

    /// Return `First(N)` of a nonterminal symbol.
    pub fn nonterminal(&self, symbol: NonterminalID) -> Option<&FirstSet> {
        self.map.get(&symbol)
    }

    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        match symbol {
            SymbolID::T(..) => false,
            SymbolID::N(n) => self.map.get(&n).map_or(false, |first| first.epsilon),
        }
    }

    /// `First(Y1 Y2 ... Yn)`, containing epsilon when every `Yi` is nullable.
    pub fn of_sequence(&self, symbols: &[SymbolID]) -> FirstSet {
        let mut res = FirstSet::default();
        for symbol in symbols {
            match symbol {
                SymbolID::T(t) => {
                    res.terminals.insert(*t);
                    return res;
                }
                SymbolID::N(n) => {
                    let Some(first) = self.map.get(n) else {
                        return res;
                    };
                    res.union_terminals(first);
                    if !first.epsilon {
                        return res;
                    }
                }
            }
        }
        res.epsilon = true;
        res
    }

    /// `First(prefix lookahead)`
    pub fn first_of_string(&self, prefix: &[SymbolID], lookahead: TerminalID) -> TerminalSet {
        let first = self.of_sequence(prefix);
        let mut res = first.terminals;
        if first.epsilon {
            res.insert(lookahead);
        }
        res
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (id, first) in &self.map {
                write!(
                    f,
                    "First({}) = {{ {}",
                    g.nonterminals[id],
                    display_terminals(g, &first.terminals, ", ")
                )?;
                if first.epsilon {
                    if !first.terminals.is_empty() {
                        f.write_str(", ")?;
                    }
                    f.write_str(EPSILON_NAME)?;
                }
                writeln!(f, " }}")?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(g: &Grammar, set: &TerminalSet) -> Vec<String> {
        set.iter().map(|t| g.terminals[&t].name().to_owned()).collect()
    }

    fn first_of(g: &Grammar, first_sets: &FirstSets, name: &str) -> (Vec<String>, bool) {
        let id = g.nonterminal_by_name(name).unwrap();
        let first = first_sets.nonterminal(id).unwrap();
        (names(g, first.terminals()), first.contains_epsilon())
    }

    #[test]
    fn arithmetic() {
        let g: Grammar = "E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id"
            .parse()
            .unwrap();
        let first_sets = FirstSets::new(&g);
        eprintln!("{}", first_sets.display(&g));

        for name in ["E'", "E", "T", "F"] {
            assert_eq!(
                first_of(&g, &first_sets, name),
                (vec!["(".to_owned(), "id".to_owned()], false),
                "First({})",
                name
            );
        }

        let plus = g.terminal_by_name("+").unwrap();
        let first = first_sets.get(SymbolID::T(plus));
        assert!(first.contains(plus));
        assert_eq!(first.terminals().len(), 1);
        assert!(!first.contains_epsilon());
    }

    #[test]
    fn nullable_symbols() {
        let g: Grammar = "S -> A B c\nA -> a |\nB -> b | A A".parse().unwrap();
        let first_sets = FirstSets::new(&g);

        assert_eq!(first_of(&g, &first_sets, "A"), (vec!["a".to_owned()], true));
        assert_eq!(
            first_of(&g, &first_sets, "B"),
            (vec!["a".to_owned(), "b".to_owned()], true)
        );
        assert_eq!(
            first_of(&g, &first_sets, "S"),
            (vec!["c".to_owned(), "a".to_owned(), "b".to_owned()], false)
        );

        let a = g.nonterminal_by_name("A").unwrap();
        let b = g.nonterminal_by_name("B").unwrap();
        assert!(first_sets.is_nullable(SymbolID::N(a)));

        let seq = first_sets.first_of_string(&[SymbolID::N(a), SymbolID::N(b)], TerminalID::EOI);
        assert_eq!(names(&g, &seq), ["$", "a", "b"]);

        let seq = first_sets.first_of_string(&[], TerminalID::EOI);
        assert_eq!(names(&g, &seq), ["$"]);

        let dump = first_sets.display(&g).to_string();
        assert!(dump.contains("First(A) = { a, ε }"), "{}", dump);
        assert!(dump.contains("First(S) = { c, a, b }"), "{}", dump);
    }

    #[test]
    fn mutual_left_recursion() {
        // The right-hand side of `A` refers to `B` before `B` is known to be
        // nullable, and vice versa.
        let g: Grammar = "S -> A x\nA -> B a | \nB -> A b | C\nC -> c |"
            .parse()
            .unwrap();
        let first_sets = FirstSets::new(&g);

        let (a, a_eps) = first_of(&g, &first_sets, "A");
        let (b, b_eps) = first_of(&g, &first_sets, "B");
        assert_eq!(a, ["a", "b", "c"]);
        assert_eq!(b, ["a", "b", "c"]);
        assert!(a_eps);
        assert!(b_eps);
        assert_eq!(first_of(&g, &first_sets, "S").0, ["x", "a", "b", "c"]);
    }
}
