//! Runtime implementation for the table-driven LR parser.

pub mod definition;
pub mod engine;

pub use crate::{
    definition::{ParseAction, ParseTable},
    engine::{
        parse, ParseEngine, ParseError, ParseOutcome, ParseResult, Rejection, StackItem, Step,
        StepAction, Symbol, Token,
    },
};
