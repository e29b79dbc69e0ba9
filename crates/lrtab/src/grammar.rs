//! Grammar types.

use crate::{syntax, types::Map, util::display_fn};
use std::{fmt, fs, io, path::Path};

/// The name of the end-of-input marker.
pub const EOI_NAME: &str = "$";

/// The name used to display an empty right-hand side.
pub const EPSILON_NAME: &str = "ε";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}
impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self::new(raw)
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    name: String,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}
impl NonterminalID {
    /// The start symbol of the augmented grammar.
    pub const START: Self = Self::new(0);
    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: String,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

/// The identifier of a production rule.
///
/// The raw value is the production number, i.e. the position of the rule in
/// the declaration-ordered production list of the augmented grammar.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// The augmented production `S' -> S`.
    pub const ACCEPT: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self::new(raw)
    }

    /// Return the production number of this rule.
    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Display for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}
impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    ///
    /// An empty slice means an epsilon production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} ->", g.nonterminals[&self.left()])?;
            if self.right.is_empty() {
                write!(f, " {}", EPSILON_NAME)?;
            }
            for symbol in self.right() {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The augmented grammar used to derive the parser tables.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub rules: Map<RuleID, Rule>,
    /// The start symbol before augmentation.
    pub start_symbol: NonterminalID,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            } else if nonterminal.id() == NonterminalID::START {
                write!(f, " (augmented)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.rules.values() {
            writeln!(f, "{}: {}", rule.id(), rule.display(self))?;
        }

        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarError> {
        let source = fs::read_to_string(path).map_err(GrammarError::Io)?;
        source.parse()
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_rule_id: RuleID::OFFSET,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: EOI_NAME.into(),
            },
        );

        // The name of the augmented start symbol is fixed in `GrammarDef::end`.
        def.nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name: String::new(),
            },
        );

        f(&mut def)?;

        def.end()
    }

    /// Return the rule associated with the specified production number.
    pub fn rule(&self, id: RuleID) -> Option<&Rule> {
        self.rules.get(&id)
    }

    /// Return the alternatives of the specified nonterminal, in declaration order.
    pub fn productions_for(&self, symbol: NonterminalID) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values().filter(move |rule| rule.left() == symbol)
    }

    /// Look up the production number of `lhs -> rhs`.
    ///
    /// An empty `rhs` looks up the epsilon production of `lhs`.
    pub fn production_number(&self, lhs: &str, rhs: &[&str]) -> Option<RuleID> {
        let lhs = self.nonterminal_by_name(lhs)?;
        self.productions_for(lhs)
            .find(|rule| {
                rule.right().len() == rhs.len()
                    && rule
                        .right()
                        .iter()
                        .zip(rhs)
                        .all(|(symbol, name)| self.symbol_name(*symbol) == *name)
            })
            .map(|rule| rule.id())
    }

    /// Find the user-defined terminal symbol with the specified name.
    ///
    /// The end-of-input marker is never returned.
    pub fn terminal_by_name(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.id() != TerminalID::EOI && t.name() == name)
            .map(|t| t.id())
    }

    pub fn nonterminal_by_name(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .values()
            .find(|n| n.name() == name)
            .map(|n| n.id())
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals[&t].name(),
            SymbolID::N(n) => self.nonterminals[&n].name(),
        }
    }

    /// Return the start symbol of the augmented grammar, a.k.a. `S'`.
    pub fn augmented_start(&self) -> &Nonterminal {
        &self.nonterminals[&NonterminalID::START]
    }
}

impl std::str::FromStr for Grammar {
    type Err = GrammarError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let descs = syntax::parse(source)?;
        Grammar::define(|g| define_grammar_from_syntax(g, &descs))
    }
}

fn define_grammar_from_syntax(
    g: &mut GrammarDef,
    descs: &[syntax::RuleDesc],
) -> Result<(), GrammarError> {
    // Every symbol that appears as a left-hand side is a nonterminal,
    // declared in the order of first appearance.
    let mut nonterminals: Map<&str, NonterminalID> = Map::default();
    for desc in descs {
        if !nonterminals.contains_key(&*desc.left) {
            let id = g.nonterminal(&desc.left)?;
            nonterminals.insert(desc.left.as_str(), id);
        }
    }

    // Everything else is a terminal.
    let mut terminals: Map<&str, TerminalID> = Map::default();
    for desc in descs {
        let left = nonterminals[&*desc.left];
        for alternative in &desc.alternatives {
            let mut right = Vec::with_capacity(alternative.len());
            for name in alternative {
                let symbol = match nonterminals.get(&**name) {
                    Some(n) => SymbolID::N(*n),
                    None => match terminals.get(&**name) {
                        Some(t) => SymbolID::T(*t),
                        None => {
                            let id = g.terminal(name)?;
                            terminals.insert(name.as_str(), id);
                            SymbolID::T(id)
                        }
                    },
                };
                right.push(symbol);
            }
            g.rule(left, right)?;
        }
    }

    Ok(())
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_rule_id: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarError> {
        self.verify_name(name)?;

        let id = TerminalID::new(self.next_terminal_id);
        self.next_terminal_id = self
            .next_terminal_id
            .checked_add(1)
            .ok_or("too many terminal symbols")?;

        self.terminals.insert(
            id,
            Terminal {
                id,
                name: name.to_owned(),
            },
        );

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarError> {
        self.verify_name(name)?;

        let id = NonterminalID::new(self.next_nonterminal_id);
        self.next_nonterminal_id = self
            .next_nonterminal_id
            .checked_add(1)
            .ok_or("too many nonterminal symbols")?;

        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: name.to_owned(),
            },
        );

        Ok(id)
    }

    /// Specify a production rule into this grammer.
    ///
    /// Production numbers are assigned in the order of calls. A repeated
    /// alternative gets its own number.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<RuleID, GrammarError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        if left == NonterminalID::START || !self.nonterminals.contains_key(&left) {
            return Err("unknown nonterminal symbol in the left-hand side".into());
        }

        let right: Vec<SymbolID> = right.into_iter().collect();
        for symbol in &right {
            let known = match symbol {
                SymbolID::T(t) => *t != TerminalID::EOI && self.terminals.contains_key(t),
                SymbolID::N(n) => *n != NonterminalID::START && self.nonterminals.contains_key(n),
            };
            if !known {
                return Err("unknown symbol in the right-hand side".into());
            }
        }

        let id = RuleID::new(self.next_rule_id);
        self.next_rule_id = self
            .next_rule_id
            .checked_add(1)
            .ok_or("too many production rules")?;
        self.rules.insert(id, Rule { id, left, right });

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    ///
    /// If omitted, the left-hand side of the first production is used.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarError> {
        if symbol == NonterminalID::START || !self.nonterminals.contains_key(&symbol) {
            return Err("unknown start symbol".into());
        }
        self.start.replace(symbol);
        Ok(())
    }

    fn verify_name(&self, name: &str) -> Result<(), GrammarError> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(GrammarError::Other {
                msg: format!("incorrect symbol name: `{}'", name),
            });
        }
        if name == EOI_NAME || name == EPSILON_NAME {
            return Err(GrammarError::Other {
                msg: format!("reserved symbol name: `{}'", name),
            });
        }
        let used = self.terminals.values().any(|t| t.name == name)
            || self.nonterminals.values().any(|n| n.name == name);
        if used {
            return Err(GrammarError::Other {
                msg: format!("The symbol `{}' has already been declared", name),
            });
        }
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarError> {
        // 指定されていない場合は最初の構文規則の左辺を用いる
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .rules
                .values()
                .next()
                .map(|rule| rule.left)
                .ok_or(GrammarError::Empty)?,
        };
        if self.rules.is_empty() {
            return Err(GrammarError::Empty);
        }

        // S' is named after S, primed until it collides with no other symbol.
        let mut augmented = format!("{}'", self.nonterminals[&start].name);
        while self.terminals.values().any(|t| t.name == augmented)
            || self.nonterminals.values().any(|n| n.name == augmented)
        {
            augmented.push('\'');
        }
        self.nonterminals[&NonterminalID::START].name = augmented;

        // The augmented production is placed at the front of the production list.
        let mut rules = Map::default();
        rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: NonterminalID::START,
                right: vec![SymbolID::N(start)],
            },
        );
        rules.extend(self.rules);

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules,
            start_symbol: start,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("IO error: {}", _0)]
    Io(io::Error),

    #[error("Syntax error at line {}: {} (`{}')", line, reason, text)]
    Syntax {
        line: usize,
        text: String,
        reason: &'static str,
    },

    #[error("The grammar has no production rules")]
    Empty,

    #[error("Other error: {}", msg)]
    Other { msg: String },
}
impl From<&str> for GrammarError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}
impl From<String> for GrammarError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}
