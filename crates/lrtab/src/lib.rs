//! LR(1) and LALR(1) parse table construction.

pub mod first_sets;
pub mod follow_sets;
pub mod grammar;
pub mod lalr;
pub mod lr1;
pub mod parser;
pub mod syntax;
pub mod table;
pub mod types;

mod util;

pub use crate::{
    grammar::{Grammar, GrammarError},
    parser::parse,
    table::{BuildError, Config, ParseTable},
};
