pub mod ast;
mod compile;
pub mod error;
mod matcher;
pub mod parser;
pub mod pattern;
pub mod scanner;
pub mod substitute;

pub use error::{Error, SyntaxErrorKind};
pub use pattern::{Match, Pattern, PatternBuilder};
pub use scanner::Matches;
pub use substitute::Template;

/// Compile `pattern` and report whether it matches anywhere in `input`.
pub fn is_match(pattern: &str, input: &str) -> Result<bool, Error> {
    Ok(Pattern::new(pattern)?.is_match(input))
}

/// Compile `pattern` and replace each of its matches in `input` with
/// `template`.
pub fn substitute(pattern: &str, template: &str, input: &str) -> Result<String, Error> {
    Pattern::new(pattern)?.substitute(template, input)
}
