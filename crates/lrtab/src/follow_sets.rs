//! Calculation of follow set function.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID},
    types::{Map, TerminalSet},
    util::{display_fn, display_terminals},
};
use std::fmt;

/// `Follow(N)` for every nonterminal `N`: the terminals that can appear
/// immediately after `N` in some sentential form.
///
/// The table construction does not use these sets.
#[derive(Debug)]
pub struct FollowSets {
    map: Map<NonterminalID, TerminalSet>,
}

impl FollowSets {
    pub fn new(grammar: &Grammar, first_sets: &FirstSets) -> Self {
        let span = tracing::debug_span!("follow_sets");
        let _entered = span.enter();

        let mut map: Map<NonterminalID, TerminalSet> = grammar
            .nonterminals
            .keys()
            .map(|id| (*id, TerminalSet::default()))
            .collect();
        map[&NonterminalID::START].insert(TerminalID::EOI);

        let mut iterations = 0;
        let mut changed = true;
        while changed {
            changed = false;
            iterations += 1;

            for rule in grammar.rules.values() {
                // X -> alpha B beta に対し、
                //   Follow(B) ⊇ First(beta) - {ε}
                //   Follow(B) ⊇ Follow(X)  (beta =>* ε の場合)
                for (i, symbol) in rule.right().iter().enumerate() {
                    let SymbolID::N(n) = symbol else {
                        continue;
                    };
                    let beta = first_sets.of_sequence(&rule.right()[i + 1..]);
                    let mut added = beta.terminals().clone();
                    if beta.contains_epsilon() {
                        added.union_with(&map[&rule.left()]);
                    }
                    changed |= map[n].union_with(&added);
                }
            }
        }
        tracing::debug!("converged after {} iterations", iterations);

        Self { map }
    }

    /// Return `Follow(N)`.
    pub fn get(&self, symbol: NonterminalID) -> Option<&TerminalSet> {
        self.map.get(&symbol)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (id, follow) in &self.map {
                writeln!(
                    f,
                    "Follow({}) = {{ {} }}",
                    g.nonterminals[id],
                    display_terminals(g, follow, ", ")
                )?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn follow_of(g: &Grammar, follow_sets: &FollowSets, name: &str) -> Vec<String> {
        let id = g.nonterminal_by_name(name).unwrap();
        follow_sets
            .get(id)
            .unwrap()
            .iter()
            .map(|t| g.terminals[&t].name().to_owned())
            .collect()
    }

    #[test]
    fn arithmetic() {
        let g: Grammar = "E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id"
            .parse()
            .unwrap();
        let first_sets = FirstSets::new(&g);
        let follow_sets = FollowSets::new(&g, &first_sets);
        eprintln!("{}", follow_sets.display(&g));

        // terminals: $ + * ( ) id
        assert_eq!(follow_of(&g, &follow_sets, "E'"), ["$"]);
        assert_eq!(follow_of(&g, &follow_sets, "E"), ["$", "+", ")"]);
        assert_eq!(follow_of(&g, &follow_sets, "T"), ["$", "+", "*", ")"]);
        assert_eq!(follow_of(&g, &follow_sets, "F"), ["$", "+", "*", ")"]);
        assert!(follow_sets
            .display(&g)
            .to_string()
            .contains("Follow(E) = { $, +, ) }"));
    }

    #[test]
    fn nullable_suffix() {
        let g: Grammar = "S -> A B\nA -> a\nB -> b |".parse().unwrap();
        let first_sets = FirstSets::new(&g);
        let follow_sets = FollowSets::new(&g, &first_sets);

        // terminals: $ a b
        assert_eq!(follow_of(&g, &follow_sets, "A"), ["$", "b"]);
        assert_eq!(follow_of(&g, &follow_sets, "B"), ["$"]);
    }
}
