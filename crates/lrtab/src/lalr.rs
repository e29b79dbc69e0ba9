//! LALR(1) automaton, derived from the canonical LR(1) automaton by merging
//! the states with the same LR(0) core.

use crate::{
    first_sets::FirstSets,
    grammar::Grammar,
    lr1::{Automaton, AutomatonKind, ItemSetEngine, LRItemCore, State, StateID},
    table::BuildError,
    types::Map,
};
use std::collections::BTreeSet;

type Core = BTreeSet<LRItemCore>;

/// Merge the states of `canonical` that share their cores.
///
/// The merged states are numbered in the order their cores first appear in
/// the canonical automaton, so that the state 0 is still the initial state.
pub fn merge(
    grammar: &Grammar,
    first_sets: &FirstSets,
    canonical: &Automaton,
) -> Result<Automaton, BuildError> {
    let span = tracing::debug_span!("lalr");
    let _entered = span.enter();

    let engine = ItemSetEngine::new(grammar, first_sets);

    // 同じコアを持つ状態の先読み記号を併合する
    let mut same_cores: Map<Core, StateID> = Map::default();
    let mut states: Vec<State> = vec![];
    let mut merged_from = Vec::with_capacity(canonical.len());
    for (id, state) in canonical.states() {
        let core = state.items().core();
        let merged = match same_cores.get(&core) {
            Some(&merged) => {
                let modified = states[merged.index()]
                    .items
                    .union_lookaheads(state.items());
                tracing::debug!("merge state {} into {} (modified={})", id, merged, modified);
                merged
            }
            None => {
                let merged = StateID::new(states.len());
                same_cores.insert(core, merged);
                states.push(State {
                    items: state.items().clone(),
                    edges: Map::default(),
                });
                merged
            }
        };
        merged_from.push(merged);
    }

    // 併合後の状態に対して遷移を再計算する
    for i in 0..states.len() {
        let from = StateID::new(i);
        let mut edges = Map::default();
        for symbol in engine.next_symbols(&states[i].items) {
            let target = engine.goto(&states[i].items, symbol).core();
            let target = same_cores.get(&target).copied().ok_or_else(|| {
                BuildError::MissingMergedCore {
                    state: from,
                    symbol: grammar.symbol_name(symbol).to_owned(),
                }
            })?;
            edges.insert(symbol, target);
        }
        states[i].edges = edges;
    }

    tracing::debug!("{} -> {} states", canonical.len(), states.len());

    Ok(Automaton {
        kind: AutomatonKind::LALR,
        states,
        merged_from: Some(merged_from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID;

    fn automata(source: &str) -> (Grammar, FirstSets, Automaton, Automaton) {
        let g: Grammar = source.parse().unwrap();
        let first_sets = FirstSets::new(&g);
        let canonical = Automaton::canonical(&g, &first_sets);
        let lalr = merge(&g, &first_sets, &canonical).unwrap();
        (g, first_sets, canonical, lalr)
    }

    #[test]
    fn merges_equal_cores() {
        let (g, _, canonical, lalr) = automata("S -> A A\nA -> a A | b");
        eprintln!("{}", lalr.display(&g));

        assert_eq!(canonical.len(), 10);
        assert_eq!(lalr.len(), 7);
        assert_eq!(lalr.kind(), AutomatonKind::LALR);

        let merge_map: Vec<usize> = lalr
            .merge_map()
            .unwrap()
            .iter()
            .map(|id| id.index())
            .collect();
        assert_eq!(merge_map, [0, 1, 2, 3, 4, 5, 3, 4, 6, 6]);
    }

    #[test]
    fn canonical_items_survive_merge() {
        for source in [
            "S -> A A\nA -> a A | b",
            "E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id",
            "S -> L = R | R\nL -> * R | id\nR -> L",
        ] {
            let (_, _, canonical, lalr) = automata(source);
            assert!(lalr.len() <= canonical.len());

            let merge_map = lalr.merge_map().unwrap();
            for (id, state) in canonical.states() {
                let merged = lalr.state(merge_map[id.index()]).unwrap();
                assert!(state.items().is_subset(merged.items()));
                assert_eq!(state.items().core(), merged.items().core());
            }
        }
    }

    #[test]
    fn edges_follow_cores() {
        let (g, first_sets, _, lalr) =
            automata("E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id");
        assert_eq!(lalr.len(), 12);

        let engine = ItemSetEngine::new(&g, &first_sets);
        for (_, state) in lalr.states() {
            for (symbol, target) in state.edges() {
                let target = lalr.state(target).unwrap();
                assert_eq!(
                    target.items().core(),
                    engine.goto(state.items(), symbol).core()
                );
            }
        }

        let id = SymbolID::T(g.terminal_by_name("id").unwrap());
        let initial = lalr.state(StateID::START).unwrap();
        assert!(initial.edge(id).is_some());
    }
}
