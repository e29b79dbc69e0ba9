//! Parse table definition.

use std::fmt;

/// The trait for abstracting a generated ACTION/GOTO table pair.
pub trait ParseTable {
    /// The number to identify the state of LR automaton.
    type State: Copy + Eq + fmt::Debug;

    /// The number to identify the terminal symbols.
    type Terminal: Copy + Eq + fmt::Debug;

    /// The number to identify the nonterminal symbols.
    type Nonterminal: Copy + Eq + fmt::Debug;

    /// The number to identify the production rules.
    type Production: Copy + Eq + fmt::Debug;

    /// Return the initial state number.
    fn initial_state(&self) -> Self::State;

    /// Return the ACTION entry corresponding to the specified state number
    /// and lookahead symbol, if any.
    ///
    /// If there is no lookahead symbol, a `None` is passed as the end of input.
    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> Option<ParseAction<Self::State, Self::Production>>;

    /// Return the GOTO entry for the specified state and nonterminal symbol.
    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State>;

    /// Return the left-hand side and the length of the right-hand side of
    /// the specified production.
    fn production(&self, production: Self::Production) -> Option<(Self::Nonterminal, usize)>;

    /// Return the lookahead symbols for which the specified state has an ACTION entry.
    ///
    /// Used only for diagnostics.
    fn expected_terminals(&self, _current: Self::State) -> Vec<Option<Self::Terminal>> {
        vec![]
    }
}

macro_rules! impl_parse_table_for_pointer {
    ($($Ptr:ty),*) => {$(
        impl<T: ?Sized> ParseTable for $Ptr
        where
            T: ParseTable,
        {
            type State = T::State;
            type Terminal = T::Terminal;
            type Nonterminal = T::Nonterminal;
            type Production = T::Production;

            fn initial_state(&self) -> Self::State {
                (**self).initial_state()
            }

            fn action(
                &self,
                current: Self::State,
                lookahead: Option<Self::Terminal>,
            ) -> Option<ParseAction<Self::State, Self::Production>> {
                (**self).action(current, lookahead)
            }

            fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
                (**self).goto(current, symbol)
            }

            fn production(
                &self,
                production: Self::Production,
            ) -> Option<(Self::Nonterminal, usize)> {
                (**self).production(production)
            }

            fn expected_terminals(&self, current: Self::State) -> Vec<Option<Self::Terminal>> {
                (**self).expected_terminals(current)
            }
        }
    )*};
}

impl_parse_table_for_pointer!(&T, std::rc::Rc<T>, std::sync::Arc<T>);

/// An entry of the ACTION table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ParseAction<TState, TProduction> {
    /// Push the lookahead symbol and transition to the specified state.
    Shift(TState),

    /// Reduce by the specified production rule.
    Reduce(TProduction),

    Accept,
}
