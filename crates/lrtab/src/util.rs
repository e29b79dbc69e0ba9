use crate::{grammar::Grammar, types::TerminalSet};
use std::fmt;

pub fn display_fn<F>(f: F) -> impl fmt::Display
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    struct DisplayFn<F> {
        f: F,
    }
    impl<F> fmt::Display for DisplayFn<F>
    where
        F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
    {
        fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            (self.f)(formatter)
        }
    }
    DisplayFn { f }
}

/// The names of the terminals in `set`, separated by `sep`.
pub fn display_terminals<'g>(
    g: &'g Grammar,
    set: &'g TerminalSet,
    sep: &'g str,
) -> impl fmt::Display + 'g {
    display_fn(move |f| {
        for (i, t) in set.iter().enumerate() {
            if i > 0 {
                f.write_str(sep)?;
            }
            write!(f, "{}", g.terminals[&t])?;
        }
        Ok(())
    })
}
