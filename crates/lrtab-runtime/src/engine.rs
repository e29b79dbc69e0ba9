//! The implementation of the table-driven shift-reduce parser engine.

use crate::definition::{ParseAction, ParseTable};
use std::fmt;

/// A trait for abstracting token symbols.
pub trait Token<TTerm> {
    /// Return the terminal symbol corresponding to this token.
    ///
    /// A `None` means that the token is not a terminal of the grammar,
    /// and the parser rejects the input when it reaches the token.
    fn to_terminal(&self) -> Option<TTerm>;
}

/// The instance of LR parser engine, driven by a parse table.
pub struct ParseEngine<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token<TDef::Terminal>,
{
    definition: TDef,
    states_stack: Vec<TDef::State>,
    symbols_stack: Vec<Symbol<TDef, TTok>>,
    trace: Vec<Step<TDef, TTok>>,
}

impl<TDef, TTok> fmt::Debug for ParseEngine<TDef, TTok>
where
    TDef: ParseTable + fmt::Debug,
    TTok: Token<TDef::Terminal> + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseEngine")
            .field("definition", &self.definition)
            .field("states_stack", &self.states_stack)
            .field("symbols_stack", &self.symbols_stack)
            .finish_non_exhaustive()
    }
}

impl<TDef, TTok> ParseEngine<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token<TDef::Terminal> + Clone,
{
    /// Create a parser engine using the specified parse table.
    pub fn new(definition: TDef) -> Self {
        let initial_state = definition.initial_state();
        Self {
            definition,
            states_stack: vec![initial_state],
            symbols_stack: vec![],
            trace: vec![],
        }
    }

    /// Run the state machine over the specified tokens.
    ///
    /// The end of input is implicitly appended after the last token.
    /// A rejected input is reported as `Ok` with [`ParseResult::Rejected`];
    /// an `Err` means that the parse table itself is malformed.
    pub fn run<I>(mut self, tokens: I) -> Result<ParseOutcome<TDef, TTok>, ParseError>
    where
        I: IntoIterator<Item = TTok>,
    {
        let tokens: Vec<TTok> = tokens.into_iter().collect();
        let mut cursor = 0;

        loop {
            let current = self
                .states_stack
                .last()
                .copied()
                .ok_or(ParseError::EmptyStack)?;

            let lookahead = tokens.get(cursor);
            let action = match lookahead {
                Some(token) => token
                    .to_terminal()
                    .and_then(|t| self.definition.action(current, Some(t))),
                None => self.definition.action(current, None),
            };

            let step_action = match action {
                Some(ParseAction::Shift(next)) => StepAction::Shift(next),
                Some(ParseAction::Reduce(production)) => StepAction::Reduce(production),
                Some(ParseAction::Accept) => StepAction::Accept,
                None => StepAction::Reject,
            };
            self.record(&tokens[cursor..], step_action);

            match action {
                Some(ParseAction::Shift(next)) => {
                    let token = lookahead.cloned().ok_or(ParseError::UnexpectedEOI)?;
                    tracing::trace!("shift -> {:?}", next);
                    self.symbols_stack.push(Symbol::T(token));
                    self.states_stack.push(next);
                    cursor += 1;
                }

                Some(ParseAction::Reduce(production)) => {
                    let (lhs, n) = self.definition.production(production).ok_or_else(|| {
                        ParseError::UndefinedProduction {
                            production: format!("{:?}", production),
                        }
                    })?;
                    tracing::trace!("reduce {:?} (lhs = {:?}, len = {})", production, lhs, n);

                    if self.symbols_stack.len() < n {
                        return Err(ParseError::EmptyStack);
                    }
                    self.states_stack.truncate(self.states_stack.len() - n);
                    self.symbols_stack.truncate(self.symbols_stack.len() - n);

                    let current = self
                        .states_stack
                        .last()
                        .copied()
                        .ok_or(ParseError::EmptyStack)?;
                    let next = self.definition.goto(current, lhs).ok_or_else(|| {
                        ParseError::MissingGoto {
                            state: format!("{:?}", current),
                            nonterminal: format!("{:?}", lhs),
                        }
                    })?;
                    self.symbols_stack.push(Symbol::N(lhs));
                    self.states_stack.push(next);
                }

                Some(ParseAction::Accept) => {
                    tracing::trace!("accept");
                    return Ok(ParseOutcome {
                        result: ParseResult::Accepted,
                        trace: self.trace,
                    });
                }

                None => {
                    tracing::trace!("reject at state {:?}, position {}", current, cursor);
                    let expected = self.definition.expected_terminals(current);
                    return Ok(ParseOutcome {
                        result: ParseResult::Rejected(Rejection {
                            state: current,
                            position: cursor,
                            lookahead: lookahead.cloned(),
                            expected,
                        }),
                        trace: self.trace,
                    });
                }
            }
        }
    }

    fn record(&mut self, remaining: &[TTok], action: StepAction<TDef>) {
        let mut stack = Vec::with_capacity(self.states_stack.len() + self.symbols_stack.len());
        let mut states = self.states_stack.iter();
        stack.extend(states.next().map(|s| StackItem::State(*s)));
        for (symbol, state) in self.symbols_stack.iter().zip(states) {
            stack.push(StackItem::Symbol(symbol.clone()));
            stack.push(StackItem::State(*state));
        }
        self.trace.push(Step {
            stack,
            remaining: remaining.to_vec(),
            action,
        });
    }
}

/// Run the parser engine over `tokens` with the specified table.
pub fn parse<TDef, TTok, I>(
    definition: TDef,
    tokens: I,
) -> Result<ParseOutcome<TDef, TTok>, ParseError>
where
    TDef: ParseTable,
    TTok: Token<TDef::Terminal> + Clone,
    I: IntoIterator<Item = TTok>,
{
    ParseEngine::new(definition).run(tokens)
}

/// A grammar symbol pushed onto the parser stack.
pub enum Symbol<TDef, TTok>
where
    TDef: ParseTable,
{
    T(TTok),
    N(TDef::Nonterminal),
}

impl<TDef, TTok> Clone for Symbol<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Self::T(t) => Self::T(t.clone()),
            Self::N(n) => Self::N(*n),
        }
    }
}

impl<TDef, TTok> fmt::Debug for Symbol<TDef, TTok>
where
    TDef: ParseTable,
    TTok: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T(t) => f.debug_tuple("T").field(t).finish(),
            Self::N(n) => f.debug_tuple("N").field(n).finish(),
        }
    }
}

/// An entry of the stack snapshot recorded in a trace step.
///
/// Snapshots alternate states and symbols, starting with the initial state.
pub enum StackItem<TDef, TTok>
where
    TDef: ParseTable,
{
    State(TDef::State),
    Symbol(Symbol<TDef, TTok>),
}

impl<TDef, TTok> fmt::Debug for StackItem<TDef, TTok>
where
    TDef: ParseTable,
    TTok: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(s) => f.debug_tuple("State").field(s).finish(),
            Self::Symbol(s) => f.debug_tuple("Symbol").field(s).finish(),
        }
    }
}

/// The action chosen at a trace step.
pub enum StepAction<TDef>
where
    TDef: ParseTable,
{
    Shift(TDef::State),
    Reduce(TDef::Production),
    Accept,
    /// No ACTION entry exists for the lookahead symbol.
    Reject,
}

impl<TDef> Clone for StepAction<TDef>
where
    TDef: ParseTable,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<TDef> Copy for StepAction<TDef> where TDef: ParseTable {}

impl<TDef> PartialEq for StepAction<TDef>
where
    TDef: ParseTable,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Shift(a), Self::Shift(b)) => a == b,
            (Self::Reduce(a), Self::Reduce(b)) => a == b,
            (Self::Accept, Self::Accept) | (Self::Reject, Self::Reject) => true,
            _ => false,
        }
    }
}

impl<TDef> fmt::Debug for StepAction<TDef>
where
    TDef: ParseTable,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(s) => f.debug_tuple("Shift").field(s).finish(),
            Self::Reduce(p) => f.debug_tuple("Reduce").field(p).finish(),
            Self::Accept => f.write_str("Accept"),
            Self::Reject => f.write_str("Reject"),
        }
    }
}

/// A recorded step of the parser, used for diagnostics.
pub struct Step<TDef, TTok>
where
    TDef: ParseTable,
{
    /// The parser stack before the action is performed.
    pub stack: Vec<StackItem<TDef, TTok>>,
    /// The unread tokens, not including the implicit end of input.
    pub remaining: Vec<TTok>,
    pub action: StepAction<TDef>,
}

impl<TDef, TTok> fmt::Debug for Step<TDef, TTok>
where
    TDef: ParseTable,
    TTok: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("stack", &self.stack)
            .field("remaining", &self.remaining)
            .field("action", &self.action)
            .finish()
    }
}

/// The result of a parser run, along with the replayable trace.
pub struct ParseOutcome<TDef, TTok>
where
    TDef: ParseTable,
{
    pub result: ParseResult<TDef, TTok>,
    pub trace: Vec<Step<TDef, TTok>>,
}

impl<TDef, TTok> ParseOutcome<TDef, TTok>
where
    TDef: ParseTable,
{
    pub fn is_accepted(&self) -> bool {
        matches!(self.result, ParseResult::Accepted)
    }

    pub fn rejection(&self) -> Option<&Rejection<TDef, TTok>> {
        match &self.result {
            ParseResult::Rejected(rejection) => Some(rejection),
            ParseResult::Accepted => None,
        }
    }
}

impl<TDef, TTok> fmt::Debug for ParseOutcome<TDef, TTok>
where
    TDef: ParseTable,
    TTok: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOutcome")
            .field("result", &self.result)
            .field("trace", &self.trace)
            .finish()
    }
}

pub enum ParseResult<TDef, TTok>
where
    TDef: ParseTable,
{
    Accepted,
    Rejected(Rejection<TDef, TTok>),
}

impl<TDef, TTok> fmt::Debug for ParseResult<TDef, TTok>
where
    TDef: ParseTable,
    TTok: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("Accepted"),
            Self::Rejected(rejection) => f.debug_tuple("Rejected").field(rejection).finish(),
        }
    }
}

/// The description of the point where the input has been rejected.
pub struct Rejection<TDef, TTok>
where
    TDef: ParseTable,
{
    /// The state on top of the stack.
    pub state: TDef::State,
    /// The index of the offending token in the input.
    pub position: usize,
    /// The offending token, or `None` at the end of input.
    pub lookahead: Option<TTok>,
    /// The lookahead symbols that the state would have accepted.
    pub expected: Vec<Option<TDef::Terminal>>,
}

impl<TDef, TTok> fmt::Debug for Rejection<TDef, TTok>
where
    TDef: ParseTable,
    TTok: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejection")
            .field("state", &self.state)
            .field("position", &self.position)
            .field("lookahead", &self.lookahead)
            .field("expected", &self.expected)
            .finish()
    }
}

/// The structural faults of a parse table, detected while running the engine.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("reduce action refers to undefined production {}", production)]
    UndefinedProduction { production: String },

    #[error("missing GOTO entry for state {} and nonterminal {}", state, nonterminal)]
    MissingGoto { state: String, nonterminal: String },

    #[error("shift action on the end of input")]
    UnexpectedEOI,

    #[error("parser stack underflow")]
    EmptyStack,
}
