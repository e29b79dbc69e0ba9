//! The implementation of LR(1) automaton.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, RuleID, SymbolID, TerminalID},
    types::{Map, Set, TerminalSet},
    util::{display_fn, display_terminals},
};
use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: usize,
}

impl StateID {
    pub const START: Self = Self::new(0);

    #[inline]
    pub(crate) const fn new(raw: usize) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        Self::new(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.raw)
    }
}

// LR(0) item
// X -> Y1 Y2 ... Yn という構文規則に、マーカ位置を付与したもの
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LRItemCore {
    pub rule: RuleID,
    pub marker: usize,
}

impl LRItemCore {
    /// Return the symbol immediately after the marker, if any.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.rules[&self.rule].right().get(self.marker).copied()
    }

    pub fn is_complete(&self, g: &Grammar) -> bool {
        self.marker >= g.rules[&self.rule].right().len()
    }

    fn advance(self) -> Self {
        Self {
            marker: self.marker + 1,
            ..self
        }
    }

    /// `"X -> Y1 . Y2 Y3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let rule = &g.rules[&self.rule];
            write!(f, "{} ->", g.nonterminals[&rule.left()])?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if self.marker == rule.right().len() {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

/// LR(1) item, a pair of LR(0) core and a lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LRItem {
    pub core: LRItemCore,
    pub lookahead: TerminalID,
}

/// A set of LR(1) items.
///
/// The items sharing a core are grouped, and the groups are ordered by
/// `(production number, marker)`, so two sets with the same items always
/// compare, hash and iterate identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemSet {
    items: BTreeMap<LRItemCore, TerminalSet>,
}

impl ItemSet {
    pub fn insert(&mut self, item: LRItem) -> bool {
        self.items.entry(item.core).or_default().insert(item.lookahead)
    }

    /// Add `core` with every lookahead in `lookaheads`.
    pub(crate) fn insert_all(&mut self, core: LRItemCore, lookaheads: &TerminalSet) -> bool {
        if lookaheads.is_empty() {
            return false;
        }
        self.items.entry(core).or_default().union_with(lookaheads)
    }

    pub fn contains(&self, item: &LRItem) -> bool {
        self.items
            .get(&item.core)
            .map_or(false, |lookaheads| lookaheads.contains(item.lookahead))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Return the number of LR(1) items in this set.
    pub fn len(&self) -> usize {
        self.items.values().map(TerminalSet::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = LRItem> + '_ {
        self.items.iter().flat_map(|(core, lookaheads)| {
            lookaheads.iter().map(move |lookahead| LRItem {
                core: *core,
                lookahead,
            })
        })
    }

    /// Iterate over the cores in this set with their lookahead symbols.
    pub fn entries(&self) -> impl Iterator<Item = (LRItemCore, &TerminalSet)> + '_ {
        self.items.iter().map(|(core, lookaheads)| (*core, lookaheads))
    }

    pub fn lookaheads(&self, core: &LRItemCore) -> Option<&TerminalSet> {
        self.items.get(core)
    }

    /// Return the LR(0) core, i.e. this set with the lookaheads stripped.
    pub fn core(&self) -> BTreeSet<LRItemCore> {
        self.items.keys().copied().collect()
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.items.iter().all(|(core, lookaheads)| {
            other
                .items
                .get(core)
                .map_or(false, |other| lookaheads.is_subset(other))
        })
    }

    /// Union the lookaheads of `other`, which must have the same core.
    pub(crate) fn union_lookaheads(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (core, lookaheads) in &other.items {
            changed |= self.insert_all(*core, lookaheads);
        }
        changed
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (core, lookaheads) in &self.items {
                writeln!(
                    f,
                    "- {}  [{}]",
                    core.display(g),
                    display_terminals(g, lookaheads, " ")
                )?;
            }
            Ok(())
        })
    }
}

impl FromIterator<LRItem> for ItemSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = LRItem>,
    {
        let mut set = Self::default();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

/// Closure and goto over the LR(1) item sets of a grammar.
#[derive(Debug, Clone, Copy)]
pub struct ItemSetEngine<'g> {
    grammar: &'g Grammar,
    first_sets: &'g FirstSets,
}

impl<'g> ItemSetEngine<'g> {
    pub fn new(grammar: &'g Grammar, first_sets: &'g FirstSets) -> Self {
        Self {
            grammar,
            first_sets,
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// クロージャ展開
    pub fn closure(&self, items: ItemSet) -> ItemSet {
        let mut closure = items;
        let mut worklist: VecDeque<LRItem> = closure.iter().collect();
        while let Some(item) = worklist.pop_front() {
            let rule = &self.grammar.rules[&item.core.rule];

            // [X -> ... . Y beta, a]
            //  Y: one nonterminal symbol
            let (y_symbol, beta) = match &rule.right()[item.core.marker..] {
                [SymbolID::N(y_symbol), beta @ ..] => (*y_symbol, beta),
                _ => continue,
            };

            // First(beta a) に含まれる終端記号 b それぞれについて [Y -> . gamma, b] を追加する
            let lookaheads = self.first_sets.first_of_string(beta, item.lookahead);
            for production in self.grammar.productions_for(y_symbol) {
                for lookahead in lookaheads.iter() {
                    let added = LRItem {
                        core: LRItemCore {
                            rule: production.id(),
                            marker: 0,
                        },
                        lookahead,
                    };
                    if closure.insert(added) {
                        worklist.push_back(added);
                    }
                }
            }
        }
        closure
    }

    /// Advance the marker over `symbol` and take the closure.
    ///
    /// The result is empty if no item in `items` expects `symbol`.
    pub fn goto(&self, items: &ItemSet, symbol: SymbolID) -> ItemSet {
        let mut kernel = ItemSet::default();
        for (core, lookaheads) in items.entries() {
            if core.next_symbol(self.grammar) == Some(symbol) {
                kernel.insert_all(core.advance(), lookaheads);
            }
        }
        if kernel.is_empty() {
            return kernel;
        }
        tracing::trace!(
            "goto on {}: {} kernel items",
            self.grammar.symbol_name(symbol),
            kernel.len()
        );
        self.closure(kernel)
    }

    /// Return the symbols immediately after a marker in `items`, in the order
    /// of their first appearance.
    pub fn next_symbols(&self, items: &ItemSet) -> Vec<SymbolID> {
        let symbols: Set<SymbolID> = items
            .entries()
            .filter_map(|(core, _)| core.next_symbol(self.grammar))
            .collect();
        symbols.into_iter().collect()
    }

    /// The initial state, the closure of `[S' -> . S, $]`.
    pub fn initial_items(&self) -> ItemSet {
        let start = LRItem {
            core: LRItemCore {
                rule: RuleID::ACCEPT,
                marker: 0,
            },
            lookahead: TerminalID::EOI,
        };
        self.closure(Some(start).into_iter().collect())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AutomatonKind {
    /// Knuth's canonical LR(1) automaton.
    Canonical,
    /// The automaton derived by merging the canonical states with equal cores.
    LALR,
}

#[derive(Debug)]
pub struct State {
    pub(crate) items: ItemSet,
    pub(crate) edges: Map<SymbolID, StateID>,
}

impl State {
    pub fn items(&self) -> &ItemSet {
        &self.items
    }

    /// Outgoing transitions, in the order the symbols appear after a marker.
    pub fn edges(&self) -> impl Iterator<Item = (SymbolID, StateID)> + '_ {
        self.edges.iter().map(|(symbol, target)| (*symbol, *target))
    }

    pub fn edge(&self, symbol: SymbolID) -> Option<StateID> {
        self.edges.get(&symbol).copied()
    }
}

#[derive(Debug)]
pub struct Automaton {
    pub(crate) kind: AutomatonKind,
    pub(crate) states: Vec<State>,
    /// For a merged automaton, the merged state of each canonical state.
    pub(crate) merged_from: Option<Vec<StateID>>,
}

impl Automaton {
    /// Build the canonical LR(1) automaton.
    ///
    /// States are numbered in the order of discovery: the pending states are
    /// processed in index order, and the transitions of each state are taken
    /// in the order of [`ItemSetEngine::next_symbols`].
    pub fn canonical(grammar: &Grammar, first_sets: &FirstSets) -> Self {
        let span = tracing::debug_span!("canonical");
        let _entered = span.enter();

        let engine = ItemSetEngine::new(grammar, first_sets);

        let initial = engine.initial_items();
        let mut known: Map<ItemSet, StateID> = Map::default();
        known.insert(initial.clone(), StateID::START);
        let mut states = vec![State {
            items: initial,
            edges: Map::default(),
        }];

        // 新規に状態が生成されなくなるまで繰り返す
        let mut current = 0;
        while current < states.len() {
            let mut edges = Map::default();
            for symbol in engine.next_symbols(&states[current].items) {
                let items = engine.goto(&states[current].items, symbol);
                let target = match known.get(&items) {
                    Some(id) => *id,
                    None => {
                        let id = StateID::new(states.len());
                        tracing::debug!(
                            "new state {} (from {} on {}, {} items)",
                            id,
                            StateID::new(current),
                            grammar.symbol_name(symbol),
                            items.len()
                        );
                        known.insert(items.clone(), id);
                        states.push(State {
                            items,
                            edges: Map::default(),
                        });
                        id
                    }
                };
                edges.insert(symbol, target);
            }
            states[current].edges = edges;
            current += 1;
        }

        tracing::debug!("{} states", states.len());

        Self {
            kind: AutomatonKind::Canonical,
            states,
            merged_from: None,
        }
    }

    pub fn kind(&self) -> AutomatonKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (StateID::new(i), state))
    }

    pub fn state(&self, id: StateID) -> Option<&State> {
        self.states.get(id.index())
    }

    /// For a merged automaton, return the state that absorbed each canonical
    /// state, indexed by the canonical state number.
    pub fn merge_map(&self) -> Option<&[StateID]> {
        self.merged_from.as_deref()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (id, state) in self.states() {
                if id != StateID::START {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {}", id)?;

                if let Some(merge_map) = &self.merged_from {
                    f.write_str("## merged from:")?;
                    for (canonical, merged) in merge_map.iter().enumerate() {
                        if *merged == id {
                            write!(f, " {}", StateID::new(canonical))?;
                        }
                    }
                    writeln!(f)?;
                }

                writeln!(f, "## items")?;
                write!(f, "{}", state.items.display(g))?;

                writeln!(f, "## edges")?;
                for (symbol, target) in state.edges() {
                    writeln!(f, "- {} => {}", g.symbol_name(symbol), target)?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(g: &Grammar, lhs: &str, rhs: &[&str], marker: usize, lookahead: &str) -> LRItem {
        LRItem {
            core: LRItemCore {
                rule: g.production_number(lhs, rhs).unwrap(),
                marker,
            },
            lookahead: if lookahead == "$" {
                TerminalID::EOI
            } else {
                g.terminal_by_name(lookahead).unwrap()
            },
        }
    }

    #[test]
    fn closure_of_initial_items() {
        let g: Grammar = "S -> A A\nA -> a A | b".parse().unwrap();
        let first_sets = FirstSets::new(&g);
        let engine = ItemSetEngine::new(&g, &first_sets);

        let initial = engine.initial_items();
        eprintln!("{}", initial.display(&g));

        let expected: ItemSet = [
            item(&g, "S'", &["S"], 0, "$"),
            item(&g, "S", &["A", "A"], 0, "$"),
            item(&g, "A", &["a", "A"], 0, "a"),
            item(&g, "A", &["a", "A"], 0, "b"),
            item(&g, "A", &["b"], 0, "a"),
            item(&g, "A", &["b"], 0, "b"),
        ]
        .into_iter()
        .collect();
        assert_eq!(initial, expected);
        assert_eq!(initial.len(), 6);
    }

    #[test]
    fn goto_advances_marker() {
        let g: Grammar = "S -> A A\nA -> a A | b".parse().unwrap();
        let first_sets = FirstSets::new(&g);
        let engine = ItemSetEngine::new(&g, &first_sets);
        let initial = engine.initial_items();

        let a = SymbolID::N(g.nonterminal_by_name("A").unwrap());
        let after_a = engine.goto(&initial, a);
        let expected: ItemSet = [
            item(&g, "S", &["A", "A"], 1, "$"),
            item(&g, "A", &["a", "A"], 0, "$"),
            item(&g, "A", &["b"], 0, "$"),
        ]
        .into_iter()
        .collect();
        assert_eq!(after_a, expected);

        // nothing expects `b` after `S -> A A .`
        let s = SymbolID::N(g.start_symbol);
        let after_s = engine.goto(&initial, s);
        let b = SymbolID::T(g.terminal_by_name("b").unwrap());
        assert!(engine.goto(&after_s, b).is_empty());

        let next: Vec<_> = engine
            .next_symbols(&initial)
            .into_iter()
            .map(|symbol| g.symbol_name(symbol).to_owned())
            .collect();
        assert_eq!(next, ["S", "A", "a", "b"]);
    }

    #[test]
    fn canonical_automaton() {
        let g: Grammar = "S -> A A\nA -> a A | b".parse().unwrap();
        let first_sets = FirstSets::new(&g);
        let automaton = Automaton::canonical(&g, &first_sets);
        eprintln!("{}", automaton.display(&g));

        assert_eq!(automaton.kind(), AutomatonKind::Canonical);
        assert_eq!(automaton.len(), 10);
        assert!(automaton.merge_map().is_none());

        // every state is distinct, and every edge points at goto(state, symbol).
        let engine = ItemSetEngine::new(&g, &first_sets);
        let distinct: Set<&ItemSet> = automaton.states().map(|(_, s)| s.items()).collect();
        assert_eq!(distinct.len(), automaton.len());
        for (_, state) in automaton.states() {
            for (symbol, target) in state.edges() {
                let target = automaton.state(target).unwrap();
                assert_eq!(*target.items(), engine.goto(state.items(), symbol));
            }
        }
    }

    #[test]
    fn canonical_numbering_is_reproducible() {
        let source = "E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id";
        let render = || {
            let g: Grammar = source.parse().unwrap();
            let first_sets = FirstSets::new(&g);
            let rendered = Automaton::canonical(&g, &first_sets).display(&g).to_string();
            rendered
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn epsilon_items_are_complete() {
        let g: Grammar = "S -> a S b |".parse().unwrap();
        let first_sets = FirstSets::new(&g);
        let engine = ItemSetEngine::new(&g, &first_sets);
        let initial = engine.initial_items();

        let empty = item(&g, "S", &[], 0, "$");
        assert!(initial.contains(&empty));
        assert!(empty.core.is_complete(&g));
        assert_eq!(empty.core.display(&g).to_string(), "S -> .");
    }
}
