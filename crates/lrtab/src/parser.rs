//! Running the parser engine over a generated table.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, TerminalID},
    lr1::StateID,
    table::{Action, ParseTable},
    util::display_fn,
};
use lrtab_runtime::{
    ParseAction, ParseError, ParseOutcome, ParseResult, StackItem, StepAction, Symbol, Token,
};
use std::fmt;

impl lrtab_runtime::ParseTable for ParseTable {
    type State = StateID;
    type Terminal = TerminalID;
    type Nonterminal = NonterminalID;
    type Production = RuleID;

    fn initial_state(&self) -> StateID {
        StateID::START
    }

    fn action(
        &self,
        current: StateID,
        lookahead: Option<TerminalID>,
    ) -> Option<ParseAction<StateID, RuleID>> {
        let action = ParseTable::action(self, current, lookahead.unwrap_or(TerminalID::EOI))?;
        Some(match action {
            Action::Shift(next) => ParseAction::Shift(next),
            Action::Reduce(rule) => ParseAction::Reduce(rule),
            Action::Accept => ParseAction::Accept,
        })
    }

    fn goto(&self, current: StateID, symbol: NonterminalID) -> Option<StateID> {
        ParseTable::goto(self, current, symbol)
    }

    fn production(&self, production: RuleID) -> Option<(NonterminalID, usize)> {
        ParseTable::production(self, production)
    }

    fn expected_terminals(&self, current: StateID) -> Vec<Option<TerminalID>> {
        self.actions()
            .row(current)
            .map(|(t, _)| (t != TerminalID::EOI).then_some(t))
            .collect()
    }
}

/// A token of the input string, with the terminal symbol it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputToken {
    text: String,
    terminal: Option<TerminalID>,
}

impl InputToken {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Return the terminal symbol of this token, or `None` if the grammar
    /// has no terminal with this name.
    pub fn terminal(&self) -> Option<TerminalID> {
        self.terminal
    }
}

impl Token<TerminalID> for InputToken {
    fn to_terminal(&self) -> Option<TerminalID> {
        self.terminal
    }
}

impl fmt::Display for InputToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Grammar {
    /// Split `input` on whitespace and look up the terminal symbol of each token.
    ///
    /// The end of input is never part of the result.
    pub fn tokenize(&self, input: &str) -> Vec<InputToken> {
        input
            .split_whitespace()
            .map(|text| InputToken {
                text: text.to_owned(),
                terminal: self.terminal_by_name(text),
            })
            .collect()
    }
}

pub type Outcome<'t> = ParseOutcome<&'t ParseTable, InputToken>;

/// Tokenize `input` and run the parser engine with `table`.
pub fn parse<'t>(
    grammar: &Grammar,
    table: &'t ParseTable,
    input: &str,
) -> Result<Outcome<'t>, ParseError> {
    let span = tracing::debug_span!("parse", input);
    let _entered = span.enter();

    let tokens = grammar.tokenize(input);
    let outcome = lrtab_runtime::parse(table, tokens)?;
    tracing::debug!("accepted={} ({} steps)", outcome.is_accepted(), outcome.trace.len());
    Ok(outcome)
}

/// Render the trace of a parser run, one step per line: the stack, the
/// remaining input and the chosen action.
pub fn display_trace<'a, T>(
    g: &'a Grammar,
    outcome: &'a ParseOutcome<T, InputToken>,
) -> impl fmt::Display + 'a
where
    T: lrtab_runtime::ParseTable<
            State = StateID,
            Terminal = TerminalID,
            Nonterminal = NonterminalID,
            Production = RuleID,
        > + 'a,
{
    display_fn(move |f| {
        let rows: Vec<(String, String, String)> = outcome
            .trace
            .iter()
            .map(|step| {
                let stack = step
                    .stack
                    .iter()
                    .map(|item| match item {
                        StackItem::State(s) => s.index().to_string(),
                        StackItem::Symbol(Symbol::T(t)) => t.to_string(),
                        StackItem::Symbol(Symbol::N(n)) => g.nonterminals[n].to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                let input = step
                    .remaining
                    .iter()
                    .map(InputToken::text)
                    .chain(Some(g.terminals[&TerminalID::EOI].name()))
                    .collect::<Vec<_>>()
                    .join(" ");
                let action = match step.action {
                    StepAction::Shift(next) => format!("shift {}", next.index()),
                    StepAction::Reduce(rule) => format!("reduce {}", g.rules[&rule].display(g)),
                    StepAction::Accept => "accept".to_owned(),
                    StepAction::Reject => "reject".to_owned(),
                };
                (stack, input, action)
            })
            .collect();

        let stack_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(0).max(5);
        let input_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(0).max(5);
        writeln!(
            f,
            "{:<sw$} | {:<iw$} | action",
            "stack",
            "input",
            sw = stack_width,
            iw = input_width
        )?;
        for (stack, input, action) in &rows {
            writeln!(
                f,
                "{:<sw$} | {:<iw$} | {}",
                stack,
                input,
                action,
                sw = stack_width,
                iw = input_width
            )?;
        }

        match &outcome.result {
            ParseResult::Accepted => writeln!(f, "=> accepted"),
            ParseResult::Rejected(rejection) => {
                match &rejection.lookahead {
                    Some(token) => write!(
                        f,
                        "=> rejected at token {} (`{}')",
                        rejection.position + 1,
                        token
                    )?,
                    None => f.write_str("=> rejected at the end of input")?,
                }
                f.write_str("; expected:")?;
                for t in &rejection.expected {
                    let t = t.unwrap_or(TerminalID::EOI);
                    write!(f, " {}", g.terminals[&t])?;
                }
                writeln!(f)
            }
        }
    })
}
