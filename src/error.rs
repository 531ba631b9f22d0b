use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The pattern string is malformed. `offset` is the byte offset in the
    /// pattern where the problem was detected.
    #[error("pattern syntax error at offset {offset}: {kind}")]
    PatternSyntax { kind: SyntaxErrorKind, offset: usize },

    /// A replacement template refers to a group the pattern does not have.
    #[error("unknown group reference {index}: pattern has {group_count} capturing group(s)")]
    UnknownGroupReference { index: usize, group_count: usize },

    #[error("template syntax error at offset {offset}: {reason}")]
    TemplateSyntax { reason: &'static str, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    #[error("missing ), unterminated subpattern")]
    UnclosedGroup,
    #[error("unbalanced parenthesis")]
    UnbalancedParenthesis,
    #[error("unterminated character set")]
    UnclosedClass,
    #[error("nothing to repeat")]
    NothingToRepeat,
    #[error("multiple repeat")]
    MultipleRepeat,
    #[error("bad character range")]
    BadRange,
    #[error("min repeat greater than max repeat")]
    BadRepeatBounds,
    #[error("repetition count too large")]
    RepeatTooLarge,
    #[error("pattern too large")]
    PatternTooLarge,
    #[error("bad escape")]
    BadEscape,
    #[error("trailing backslash")]
    TrailingBackslash,
    #[error("unsupported group extension")]
    UnsupportedExtension,
}

impl SyntaxErrorKind {
    pub(crate) fn at(self, offset: usize) -> Error {
        Error::PatternSyntax { kind: self, offset }
    }
}
