//! ACTION/GOTO table construction.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    lalr,
    lr1::{Automaton, AutomatonKind, StateID},
    types::Map,
    util::display_fn,
};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no merged state has the core of the transition from state {} on `{}'", state, symbol)]
    MissingMergedCore { state: StateID, symbol: String },

    #[error("{} conflict(s) detected", _0.len())]
    Conflicts(Vec<Conflict>),
}

#[derive(Debug, Clone)]
pub struct Config {
    algorithm: AutomatonKind,
    strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            algorithm: AutomatonKind::Canonical,
            strict: false,
        }
    }

    /// Build the tables from Knuth's canonical LR(1) automaton.
    ///
    /// This is the default.
    pub fn use_canonical(&mut self) -> &mut Self {
        self.algorithm = AutomatonKind::Canonical;
        self
    }

    /// Build the tables from the LALR(1) automaton, obtained by merging the
    /// canonical states with the same core.
    pub fn use_lalr(&mut self) -> &mut Self {
        self.algorithm = AutomatonKind::LALR;
        self
    }

    /// Fail with [`BuildError::Conflicts`] instead of returning a table that
    /// has conflicts.
    pub fn strict(&mut self, strict: bool) -> &mut Self {
        self.strict = strict;
        self
    }

    pub fn algorithm(&self) -> AutomatonKind {
        self.algorithm
    }

    pub fn build_automaton(
        &self,
        grammar: &Grammar,
        first_sets: &FirstSets,
    ) -> Result<Automaton, BuildError> {
        let canonical = Automaton::canonical(grammar, first_sets);
        match self.algorithm {
            AutomatonKind::Canonical => Ok(canonical),
            AutomatonKind::LALR => lalr::merge(grammar, first_sets, &canonical),
        }
    }

    pub fn build_table(
        &self,
        grammar: &Grammar,
        automaton: &Automaton,
    ) -> Result<ParseTable, BuildError> {
        let table = ParseTable::build(grammar, automaton);
        if self.strict && !table.conflicts.is_empty() {
            return Err(BuildError::Conflicts(table.conflicts));
        }
        Ok(table)
    }

    /// Run the whole pipeline on `grammar`.
    pub fn generate(&self, grammar: &Grammar) -> Result<ParseTable, BuildError> {
        let first_sets = FirstSets::new(grammar);
        let automaton = self.build_automaton(grammar, &first_sets)?;
        self.build_table(grammar, &automaton)
    }
}

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(RuleID),

    Accept,
}

impl Action {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Self::Shift(n) => write!(f, "shift({})", n),
            Self::Reduce(rule) => write!(f, "reduce({})", g.rules[rule].display(g)),
            Self::Accept => f.write_str("accept"),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShiftReduce => f.write_str("shift/reduce"),
            Self::ReduceReduce => f.write_str("reduce/reduce"),
        }
    }
}

/// Two candidate actions for one cell of the ACTION table.
///
/// `first` is the action kept in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub symbol: TerminalID,
    pub first: Action,
    pub second: Action,
    pub kind: ConflictKind,
}

impl Conflict {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(
                f,
                "{} conflict in state {} on {}: {} vs {}",
                self.kind,
                self.state,
                g.terminals[&self.symbol],
                self.first.display(g),
                self.second.display(g)
            )
        })
    }
}

/// A table indexed by the state number and a symbol.
#[derive(Debug)]
pub struct Table<K, V> {
    pub(crate) rows: Vec<Map<K, V>>,
}

impl<K, V> Table<K, V>
where
    K: Copy + Eq + std::hash::Hash,
    V: Copy,
{
    fn with_states(len: usize) -> Self {
        Self {
            rows: (0..len).map(|_| Map::default()).collect(),
        }
    }

    pub fn get(&self, state: StateID, key: K) -> Option<V> {
        self.rows.get(state.index())?.get(&key).copied()
    }

    /// Iterate over the entries of a state, in the order they were written.
    pub fn row(&self, state: StateID) -> impl Iterator<Item = (K, V)> + '_ {
        self.rows
            .get(state.index())
            .into_iter()
            .flat_map(|row| row.iter().map(|(k, v)| (*k, *v)))
    }

    pub fn len(&self) -> usize {
        self.rows.iter().map(|row| row.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.is_empty())
    }
}

pub type ActionTable = Table<TerminalID, Action>;
pub type GotoTable = Table<NonterminalID, StateID>;

#[derive(Debug)]
pub struct ParseTable {
    pub(crate) actions: ActionTable,
    pub(crate) gotos: GotoTable,
    pub(crate) conflicts: Vec<Conflict>,
    pub(crate) productions: Map<RuleID, (NonterminalID, usize)>,
    pub(crate) num_states: usize,
}

impl ParseTable {
    /// Derive the ACTION/GOTO tables from a finished automaton.
    ///
    /// The states are visited in index order. In each state the shift and
    /// goto entries are written first, in the order of the edges, followed
    /// by the reduce/accept entries in the order of the items. A cell that
    /// has already been written keeps its first action, and the collision is
    /// recorded as a [`Conflict`].
    pub fn build(grammar: &Grammar, automaton: &Automaton) -> Self {
        let span = tracing::debug_span!("table");
        let _entered = span.enter();

        let mut actions = ActionTable::with_states(automaton.len());
        let mut gotos = GotoTable::with_states(automaton.len());
        let mut conflicts = vec![];

        for (id, state) in automaton.states() {
            let action_row = &mut actions.rows[id.index()];
            let goto_row = &mut gotos.rows[id.index()];

            // shift, goto
            for (symbol, target) in state.edges() {
                match symbol {
                    SymbolID::T(t) => {
                        write_action(action_row, &mut conflicts, id, t, Action::Shift(target))
                    }
                    SymbolID::N(n) => {
                        goto_row.insert(n, target);
                    }
                }
            }

            // reduce, accept
            for (core, lookaheads) in state.items().entries() {
                if !core.is_complete(grammar) {
                    continue;
                }
                for lookahead in lookaheads.iter() {
                    let action = if core.rule == RuleID::ACCEPT && lookahead == TerminalID::EOI {
                        Action::Accept
                    } else {
                        Action::Reduce(core.rule)
                    };
                    write_action(action_row, &mut conflicts, id, lookahead, action);
                }
            }
        }

        if !conflicts.is_empty() {
            tracing::debug!("{} conflict(s)", conflicts.len());
        }

        let productions = grammar
            .rules
            .values()
            .map(|rule| (rule.id(), (rule.left(), rule.right().len())))
            .collect();

        Self {
            actions,
            gotos,
            conflicts,
            productions,
            num_states: automaton.len(),
        }
    }

    pub fn action(&self, state: StateID, symbol: TerminalID) -> Option<Action> {
        self.actions.get(state, symbol)
    }

    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.gotos.get(state, symbol)
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    pub fn gotos(&self) -> &GotoTable {
        &self.gotos
    }

    /// The conflicts detected during construction, in the order of detection.
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// Return the left-hand side and the length of the right-hand side of a production.
    pub fn production(&self, rule: RuleID) -> Option<(NonterminalID, usize)> {
        self.productions.get(&rule).copied()
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn states(&self) -> impl Iterator<Item = StateID> {
        (0..self.num_states).map(StateID::new)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for id in self.states() {
                if id != StateID::START {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {}", id)?;

                writeln!(f, "## actions")?;
                for (token, action) in self.actions.row(id) {
                    writeln!(f, "- {} => {}", g.terminals[&token], action.display(g))?;
                }

                writeln!(f, "## gotos")?;
                for (symbol, goto) in self.gotos.row(id) {
                    writeln!(f, "- {} => goto({})", g.nonterminals[&symbol], goto)?;
                }
            }

            if !self.conflicts.is_empty() {
                writeln!(f, "\n## conflicts")?;
                for conflict in &self.conflicts {
                    writeln!(f, "- {}", conflict.display(g))?;
                }
            }
            Ok(())
        })
    }
}

fn write_action(
    row: &mut Map<TerminalID, Action>,
    conflicts: &mut Vec<Conflict>,
    state: StateID,
    symbol: TerminalID,
    action: Action,
) {
    let Some(&first) = row.get(&symbol) else {
        row.insert(symbol, action);
        return;
    };
    if first == action {
        return;
    }

    let kind = match (first, action) {
        (Action::Shift(..), _) | (_, Action::Shift(..)) => ConflictKind::ShiftReduce,
        _ => ConflictKind::ReduceReduce,
    };
    tracing::debug!(
        "{:?} conflict in state {} on {:?}: {:?} vs {:?}",
        kind,
        state,
        symbol,
        first,
        action
    );
    conflicts.push(Conflict {
        state,
        symbol,
        first,
        second: action,
        kind,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARITHMETIC: &str = "E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id";
    const DANGLING_ELSE: &str = "S -> if E then S | if E then S else S | other\nE -> cond";

    fn generate(source: &str, config: &Config) -> (Grammar, Result<ParseTable, BuildError>) {
        let g: Grammar = source.parse().unwrap();
        let table = config.generate(&g);
        (g, table)
    }

    #[test]
    fn arithmetic_has_no_conflicts() {
        for config in [Config::new().use_canonical().clone(), Config::new().use_lalr().clone()] {
            let (g, table) = generate(ARITHMETIC, &config);
            let table = table.unwrap();
            eprintln!("{}", table.display(&g));
            assert!(table.conflicts().is_empty());
        }

        let (_, lalr) = generate(ARITHMETIC, Config::new().use_lalr());
        let (_, canonical) = generate(ARITHMETIC, &Config::new());
        assert_eq!(lalr.unwrap().num_states(), 12);
        assert_eq!(canonical.unwrap().num_states(), 22);
    }

    #[test]
    fn accept_on_end_of_input() {
        let (g, table) = generate(ARITHMETIC, Config::new().use_lalr());
        let table = table.unwrap();

        let e = g.start_symbol;
        let after_e = table.goto(StateID::START, e).unwrap();
        assert_eq!(table.action(after_e, TerminalID::EOI), Some(Action::Accept));

        let id = g.terminal_by_name("id").unwrap();
        assert!(matches!(
            table.action(StateID::START, id),
            Some(Action::Shift(..))
        ));
        assert_eq!(table.action(StateID::START, TerminalID::EOI), None);
        assert_eq!(table.production(RuleID::ACCEPT), Some((NonterminalID::START, 1)));
    }

    #[test]
    fn dangling_else_prefers_shift() {
        let (g, table) = generate(DANGLING_ELSE, Config::new().use_lalr());
        let table = table.unwrap();
        eprintln!("{}", table.display(&g));

        let else_ = g.terminal_by_name("else").unwrap();
        let short_if = g.production_number("S", &["if", "E", "then", "S"]).unwrap();

        assert_eq!(table.conflicts().len(), 1);
        let conflict = &table.conflicts()[0];
        assert_eq!(conflict.kind, ConflictKind::ShiftReduce);
        assert_eq!(conflict.symbol, else_);
        assert_eq!(conflict.second, Action::Reduce(short_if));
        assert!(matches!(conflict.first, Action::Shift(..)));

        // the first-written action stays in the table.
        assert_eq!(table.action(conflict.state, else_), Some(conflict.first));
    }

    #[test]
    fn reduce_reduce_conflicts() {
        let (g, table) = generate("S -> A a | B a\nA -> x\nB -> x", &Config::new());
        let table = table.unwrap();

        let a = g.terminal_by_name("a").unwrap();
        let reduce_a = g.production_number("A", &["x"]).unwrap();
        let reduce_b = g.production_number("B", &["x"]).unwrap();
        assert_eq!(
            table.conflicts(),
            [Conflict {
                state: table.conflicts()[0].state,
                symbol: a,
                first: Action::Reduce(reduce_a),
                second: Action::Reduce(reduce_b),
                kind: ConflictKind::ReduceReduce,
            }]
        );
    }

    #[test]
    fn duplicate_alternatives_conflict() {
        let (g, table) = generate("S -> a | a", &Config::new());
        let table = table.unwrap();
        eprintln!("{}", table.display(&g));

        let first = RuleID::from_raw(1);
        let second = RuleID::from_raw(2);
        assert_eq!(table.conflicts().len(), 1);
        let conflict = &table.conflicts()[0];
        assert_eq!(conflict.symbol, TerminalID::EOI);
        assert_eq!(conflict.first, Action::Reduce(first));
        assert_eq!(conflict.second, Action::Reduce(second));
        assert_eq!(conflict.kind, ConflictKind::ReduceReduce);
        assert_eq!(
            table.action(conflict.state, TerminalID::EOI),
            Some(Action::Reduce(first))
        );

        let (_, strict) = generate("S -> a | a", Config::new().strict(true));
        assert!(matches!(strict, Err(BuildError::Conflicts(..))));
    }

    #[test]
    fn merging_may_introduce_conflicts() {
        let source = "S -> a A d | b B d | a B e | b A e\nA -> c\nB -> c";

        let (_, canonical) = generate(source, &Config::new());
        assert!(canonical.unwrap().conflicts().is_empty());

        let (g, lalr) = generate(source, Config::new().use_lalr());
        let lalr = lalr.unwrap();
        let symbols: Vec<_> = lalr
            .conflicts()
            .iter()
            .map(|c| (c.kind, g.terminals[&c.symbol].name().to_owned()))
            .collect();
        assert_eq!(
            symbols,
            [
                (ConflictKind::ReduceReduce, "d".to_owned()),
                (ConflictKind::ReduceReduce, "e".to_owned())
            ]
        );
    }

    #[test]
    fn strict_mode_fails_on_conflicts() {
        let (_, table) = generate(DANGLING_ELSE, Config::new().use_lalr().strict(true));
        match table {
            Err(BuildError::Conflicts(conflicts)) => assert_eq!(conflicts.len(), 1),
            res => panic!("unexpected result: {:?}", res),
        }

        let (_, table) = generate(ARITHMETIC, Config::new().use_lalr().strict(true));
        assert!(table.is_ok());
    }
}
