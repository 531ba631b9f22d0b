/// A parsed pattern: the top-level alternatives plus the number of
/// capturing groups found while parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub alternatives: Vec<Vec<RegexNode>>,
    pub group_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegexNode {
    Literal(char),
    Any,
    Class(CharClass),
    Anchor(AnchorKind),
    Group {
        index: usize,
        alternatives: Vec<Vec<RegexNode>>,
    },
    Repeat {
        node: Box<RegexNode>,
        min: usize,
        // `None` is unbounded
        max: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    Start,
    End,
    WordBoundary,
    NotWordBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerlClass {
    Digit,
    Word,
    Space,
}

impl PerlClass {
    pub fn contains(self, c: char) -> bool {
        match self {
            PerlClass::Digit => c.is_ascii_digit(),
            PerlClass::Word => is_word_char(c),
            PerlClass::Space => matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c'),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassItem {
    Char(char),
    Range(char, char),
    Perl { class: PerlClass, negated: bool },
}

impl ClassItem {
    fn contains(self, c: char) -> bool {
        match self {
            ClassItem::Char(expected) => c == expected,
            ClassItem::Range(lo, hi) => lo <= c && c <= hi,
            ClassItem::Perl { class, negated } => class.contains(c) != negated,
        }
    }
}

/// A bracketed set such as `[a-z_]` or `[^b]`, or one of the shorthand
/// escapes `\d \D \w \W \s \S`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    pub items: Vec<ClassItem>,
    pub negated: bool,
}

impl CharClass {
    pub fn perl(class: PerlClass, negated: bool) -> Self {
        CharClass {
            items: vec![ClassItem::Perl {
                class,
                negated: false,
            }],
            negated,
        }
    }

    /// Membership test. With `fold_case`, ASCII letters match either case;
    /// negation applies after folding so `[^a]` rejects `A` too.
    pub fn matches(&self, c: char, fold_case: bool) -> bool {
        let contains = |c: char| self.items.iter().any(|item| item.contains(c));
        let mut found = contains(c);
        if !found && fold_case && c.is_ascii_alphabetic() {
            found = contains(c.to_ascii_lowercase()) || contains(c.to_ascii_uppercase());
        }
        found != self.negated
    }
}

pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
