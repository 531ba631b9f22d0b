use crate::ast::{AnchorKind, Ast, CharClass, ClassItem, PerlClass, RegexNode};
use crate::compile::{node_size, program_size, MAX_PROGRAM_SIZE};
use crate::error::{Error, SyntaxErrorKind};

/// Largest count accepted inside `{m,n}`.
pub const MAX_REPEAT: usize = 1000;

/// Parser for regular expressions.
///
/// The `Parser` struct holds the pattern and the current byte position.
/// It also hands out capturing-group indices in order of their opening
/// parenthesis.
pub struct Parser<'a> {
    pub pattern: &'a str,
    pub pos: usize,
    next_group_id: usize,
}

enum ClassAtom {
    Char(char),
    Perl(PerlClass, bool),
}

struct Bounds {
    min: usize,
    max: Option<usize>,
    len: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given pattern.
    pub fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            pos: 0,
            next_group_id: 1,
        }
    }

    /// Allocate a new group ID for capturing groups.
    fn alloc_group_id(&mut self) -> usize {
        let id = self.next_group_id;
        self.next_group_id += 1;
        id
    }

    /// Peek at the next character in the pattern without advancing.
    fn peek(&self) -> Option<char> {
        self.pattern[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.pattern[self.pos..].chars().nth(1)
    }

    /// Advance the parser by one character and return it.
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Expect a specific character and advance if it matches.
    fn expect(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Entry point for parsing a regex pattern.
    ///
    /// Example:
    /// - Pattern: `a|b` → alternatives `[[Literal('a')], [Literal('b')]]`
    pub fn parse(&mut self) -> Result<Ast, Error> {
        let alternatives = self.parse_alternatives()?;
        if self.peek() == Some(')') {
            return Err(SyntaxErrorKind::UnbalancedParenthesis.at(self.pos));
        }
        if program_size(&alternatives) > MAX_PROGRAM_SIZE {
            return Err(SyntaxErrorKind::PatternTooLarge.at(0));
        }
        Ok(Ast {
            alternatives,
            group_count: self.next_group_id - 1,
        })
    }

    /// Parse alternation (`|`) in the pattern.
    ///
    /// Example:
    /// - Pattern: `a|b|c` → `[[Literal('a')], [Literal('b')], [Literal('c')]]`
    /// - Pattern: `abc`   → `[[Literal('a'), Literal('b'), Literal('c')]]`
    fn parse_alternatives(&mut self) -> Result<Vec<Vec<RegexNode>>, Error> {
        let mut branches = vec![self.parse_seq()?];
        while self.expect('|') {
            branches.push(self.parse_seq()?);
        }
        Ok(branches)
    }

    /// Parse a sequence of regex atoms (concatenation).
    fn parse_seq(&mut self) -> Result<Vec<RegexNode>, Error> {
        let mut nodes = Vec::new();
        while let Some(ch) = self.peek() {
            if ch == ')' || ch == '|' {
                break;
            }
            nodes.push(self.parse_repeat()?);
        }
        Ok(nodes)
    }

    /// Parse an atom and the quantifier that may follow it.
    ///
    /// Example:
    /// - Pattern: `a?`     → Repeat { node: Literal('a'), min: 0, max: Some(1) }
    /// - Pattern: `b+`     → Repeat { node: Literal('b'), min: 1, max: None }
    /// - Pattern: `\d{3}`  → Repeat { node: Class(\d), min: 3, max: Some(3) }
    /// - Pattern: `c`      → Literal('c')
    fn parse_repeat(&mut self) -> Result<RegexNode, Error> {
        let atom = self.parse_atom()?;
        let quantifier_pos = self.pos;
        let Some((min, max)) = self.parse_quantifier()? else {
            return Ok(atom);
        };
        if matches!(atom, RegexNode::Anchor(_)) {
            return Err(SyntaxErrorKind::NothingToRepeat.at(quantifier_pos));
        }
        let second_pos = self.pos;
        if self.parse_quantifier()?.is_some() {
            return Err(SyntaxErrorKind::MultipleRepeat.at(second_pos));
        }
        let repeat = RegexNode::Repeat {
            node: Box::new(atom),
            min,
            max,
        };
        // nested counts multiply once unrolled
        if node_size(&repeat) > MAX_PROGRAM_SIZE {
            return Err(SyntaxErrorKind::RepeatTooLarge.at(quantifier_pos));
        }
        Ok(repeat)
    }

    fn parse_quantifier(&mut self) -> Result<Option<(usize, Option<usize>)>, Error> {
        let quantifier = match self.peek() {
            Some('*') => (0, None),
            Some('+') => (1, None),
            Some('?') => (0, Some(1)),
            Some('{') => match self.peek_bounds()? {
                Some(bounds) => {
                    self.pos += bounds.len;
                    return Ok(Some((bounds.min, bounds.max)));
                }
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        self.advance();
        Ok(Some(quantifier))
    }

    /// Look at a `{...}` at the current position. Returns `None` when it is
    /// not a well-formed quantifier, in which case `{` is an ordinary literal.
    fn peek_bounds(&self) -> Result<Option<Bounds>, Error> {
        let rest = &self.pattern[self.pos..];
        let Some(close) = rest.find('}') else {
            return Ok(None);
        };
        let body = &rest[1..close];
        let (min_text, max_text) = match body.split_once(',') {
            Some((lo, hi)) => (lo, Some(hi)),
            None => (body, None),
        };
        let all_digits = |text: &str| text.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(min_text) || !max_text.map_or(true, all_digits) {
            return Ok(None);
        }
        if max_text.is_none() && min_text.is_empty() {
            return Ok(None);
        }

        let number = |text: &str| -> Result<Option<usize>, Error> {
            if text.is_empty() {
                return Ok(None);
            }
            match text.parse::<usize>() {
                Ok(n) if n <= MAX_REPEAT => Ok(Some(n)),
                _ => Err(SyntaxErrorKind::RepeatTooLarge.at(self.pos)),
            }
        };
        let min = number(min_text)?.unwrap_or(0);
        let max = match max_text {
            None => Some(min),
            Some(text) => number(text)?,
        };
        if max.is_some_and(|max| min > max) {
            return Err(SyntaxErrorKind::BadRepeatBounds.at(self.pos));
        }
        Ok(Some(Bounds {
            min,
            max,
            len: close + 1,
        }))
    }

    /// Parse a single regex atom: group, char class, escape, literal, or anchor.
    ///
    /// Examples:
    /// - Pattern: `(a|b)` → Group { index, alternatives: [[Literal('a')], [Literal('b')]] }
    /// - Pattern: `[abc]` → Class { items: ['a','b','c'], negated: false }
    /// - Pattern: `\d`    → Class(\d)
    /// - Pattern: `\b`    → Anchor(WordBoundary)
    /// - Pattern: `.`     → Any
    /// - Pattern: `^`     → Anchor(Start)
    /// - Pattern: `a`     → Literal('a')
    fn parse_atom(&mut self) -> Result<RegexNode, Error> {
        let start = self.pos;
        match self.peek() {
            Some('(') => {
                self.advance();
                if self.peek() == Some('?') {
                    return Err(SyntaxErrorKind::UnsupportedExtension.at(start));
                }
                let index = self.alloc_group_id();
                let alternatives = self.parse_alternatives()?;
                if !self.expect(')') {
                    return Err(SyntaxErrorKind::UnclosedGroup.at(start));
                }
                Ok(RegexNode::Group {
                    index,
                    alternatives,
                })
            }
            Some('[') => self.parse_char_class(),
            Some('\\') => self.parse_escape(),
            Some('.') => {
                self.advance();
                Ok(RegexNode::Any)
            }
            Some('^') => {
                self.advance();
                Ok(RegexNode::Anchor(AnchorKind::Start))
            }
            Some('$') => {
                self.advance();
                Ok(RegexNode::Anchor(AnchorKind::End))
            }
            Some('*' | '+' | '?') => Err(SyntaxErrorKind::NothingToRepeat.at(start)),
            Some('{') => {
                if self.peek_bounds()?.is_some() {
                    return Err(SyntaxErrorKind::NothingToRepeat.at(start));
                }
                self.advance();
                Ok(RegexNode::Literal('{'))
            }
            Some(c) => {
                self.advance();
                Ok(RegexNode::Literal(c))
            }
            // parse_seq never asks for an atom at the end of the pattern
            None => Err(SyntaxErrorKind::NothingToRepeat.at(start)),
        }
    }

    fn parse_escape(&mut self) -> Result<RegexNode, Error> {
        let start = self.pos;
        self.advance(); // consume '\'
        let Some(c) = self.advance() else {
            return Err(SyntaxErrorKind::TrailingBackslash.at(start));
        };
        let node = match c {
            'd' => RegexNode::Class(CharClass::perl(PerlClass::Digit, false)),
            'D' => RegexNode::Class(CharClass::perl(PerlClass::Digit, true)),
            'w' => RegexNode::Class(CharClass::perl(PerlClass::Word, false)),
            'W' => RegexNode::Class(CharClass::perl(PerlClass::Word, true)),
            's' => RegexNode::Class(CharClass::perl(PerlClass::Space, false)),
            'S' => RegexNode::Class(CharClass::perl(PerlClass::Space, true)),
            'b' => RegexNode::Anchor(AnchorKind::WordBoundary),
            'B' => RegexNode::Anchor(AnchorKind::NotWordBoundary),
            'A' => RegexNode::Anchor(AnchorKind::Start),
            'Z' => RegexNode::Anchor(AnchorKind::End),
            c => RegexNode::Literal(literal_escape(c, start)?),
        };
        Ok(node)
    }

    /// Parse a character class, e.g. `[abc]`, `[^a-z]` or `[\d.-]`.
    ///
    /// Examples:
    /// - Pattern: `[abc]`  → Class { items: [Char('a'), Char('b'), Char('c')], negated: false }
    /// - Pattern: `[^x-z]` → Class { items: [Range('x', 'z')], negated: true }
    fn parse_char_class(&mut self) -> Result<RegexNode, Error> {
        let start = self.pos;
        self.advance(); // consume '['
        let negated = self.expect('^');

        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(SyntaxErrorKind::UnclosedClass.at(start)),
                // a leading ']' is literal
                Some(']') if !items.is_empty() => {
                    self.advance();
                    break;
                }
                Some(_) => {}
            }

            let atom_pos = self.pos;
            let lo = self.parse_class_atom(start)?;
            let is_range = self.peek() == Some('-') && self.peek_second().is_some_and(|c| c != ']');
            if !is_range {
                items.push(match lo {
                    ClassAtom::Char(c) => ClassItem::Char(c),
                    ClassAtom::Perl(class, negated) => ClassItem::Perl { class, negated },
                });
                continue;
            }

            self.advance(); // consume '-'
            let hi = self.parse_class_atom(start)?;
            match (lo, hi) {
                (ClassAtom::Char(lo), ClassAtom::Char(hi)) if lo <= hi => {
                    items.push(ClassItem::Range(lo, hi));
                }
                _ => return Err(SyntaxErrorKind::BadRange.at(atom_pos)),
            }
        }

        Ok(RegexNode::Class(CharClass { items, negated }))
    }

    fn parse_class_atom(&mut self, class_start: usize) -> Result<ClassAtom, Error> {
        let start = self.pos;
        let atom = match self.advance() {
            None => return Err(SyntaxErrorKind::UnclosedClass.at(class_start)),
            Some('\\') => match self.advance() {
                None => return Err(SyntaxErrorKind::UnclosedClass.at(class_start)),
                Some('d') => ClassAtom::Perl(PerlClass::Digit, false),
                Some('D') => ClassAtom::Perl(PerlClass::Digit, true),
                Some('w') => ClassAtom::Perl(PerlClass::Word, false),
                Some('W') => ClassAtom::Perl(PerlClass::Word, true),
                Some('s') => ClassAtom::Perl(PerlClass::Space, false),
                Some('S') => ClassAtom::Perl(PerlClass::Space, true),
                // backspace, as in most engines
                Some('b') => ClassAtom::Char('\x08'),
                Some(c) => ClassAtom::Char(literal_escape(c, start)?),
            },
            Some(c) => ClassAtom::Char(c),
        };
        Ok(atom)
    }
}

pub(crate) fn control_escape(c: char) -> Option<char> {
    match c {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'f' => Some('\x0c'),
        'v' => Some('\x0b'),
        _ => None,
    }
}

/// An escaped character that stands for itself. Letters and digits are
/// reserved for classes, anchors and backreferences.
fn literal_escape(c: char, offset: usize) -> Result<char, Error> {
    if let Some(control) = control_escape(c) {
        return Ok(control);
    }
    if c.is_ascii_alphanumeric() {
        return Err(SyntaxErrorKind::BadEscape.at(offset));
    }
    Ok(c)
}

pub fn parse(pattern: &str) -> Result<Ast, Error> {
    Parser::new(pattern).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn syntax_error(pattern: &str) -> (SyntaxErrorKind, usize) {
        match parse(pattern) {
            Err(Error::PatternSyntax { kind, offset }) => (kind, offset),
            other => panic!("expected syntax error for {pattern:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_literals_and_escapes() {
        let ast = parse(r"coreyms\.com").unwrap();
        assert_eq!(ast.group_count, 0);
        assert_eq!(ast.alternatives.len(), 1);
        let seq = &ast.alternatives[0];
        assert_eq!(seq.len(), 11);
        assert_eq!(seq[7], RegexNode::Literal('.'));

        let ast = parse(r"\d\W\t").unwrap();
        assert_eq!(
            ast.alternatives[0],
            vec![
                RegexNode::Class(CharClass::perl(PerlClass::Digit, false)),
                RegexNode::Class(CharClass::perl(PerlClass::Word, true)),
                RegexNode::Literal('\t'),
            ]
        );
    }

    #[test]
    fn test_parse_groups_and_alternation() {
        let ast = parse(r"(Mr|Ms|Mrs)\.?").unwrap();
        assert_eq!(ast.group_count, 1);
        match &ast.alternatives[0][0] {
            RegexNode::Group {
                index,
                alternatives,
            } => {
                assert_eq!(*index, 1);
                assert_eq!(alternatives.len(), 3);
                assert_eq!(alternatives[2].len(), 3);
            }
            other => panic!("unexpected node {other:?}"),
        }

        let ast = parse(r"https?://(www\.)?(\w+)(\.\w+)").unwrap();
        assert_eq!(ast.group_count, 3);

        // indices follow the opening parenthesis
        let ast = parse("((a)(b))").unwrap();
        assert_eq!(ast.group_count, 3);
        let RegexNode::Group { alternatives, .. } = &ast.alternatives[0][0] else {
            panic!("expected group");
        };
        let indices: Vec<usize> = alternatives[0]
            .iter()
            .map(|node| match node {
                RegexNode::Group { index, .. } => *index,
                _ => 0,
            })
            .collect();
        assert_eq!(indices, vec![2, 3]);

        let ast = parse("a|").unwrap();
        assert_eq!(ast.alternatives, vec![vec![RegexNode::Literal('a')], vec![]]);
    }

    #[test]
    fn test_parse_quantifiers() {
        let repeat = |pattern: &str| match parse(pattern).unwrap().alternatives[0][0].clone() {
            RegexNode::Repeat { min, max, .. } => (min, max),
            other => panic!("unexpected node {other:?}"),
        };
        assert_eq!(repeat("a*"), (0, None));
        assert_eq!(repeat("a+"), (1, None));
        assert_eq!(repeat("a?"), (0, Some(1)));
        assert_eq!(repeat("a{3}"), (3, Some(3)));
        assert_eq!(repeat("a{3,4}"), (3, Some(4)));
        assert_eq!(repeat("a{2,}"), (2, None));
        assert_eq!(repeat("a{,5}"), (0, Some(5)));

        // not a quantifier, so literal braces
        let ast = parse("a{x}").unwrap();
        assert_eq!(ast.alternatives[0].len(), 4);
        assert_eq!(ast.alternatives[0][1], RegexNode::Literal('{'));
        let ast = parse("{}").unwrap();
        assert_eq!(ast.alternatives[0].len(), 2);
    }

    #[test]
    fn test_parse_char_classes() {
        let ast = parse("[a-zA-Z0-9.-]").unwrap();
        assert_eq!(
            ast.alternatives[0][0],
            RegexNode::Class(CharClass {
                items: vec![
                    ClassItem::Range('a', 'z'),
                    ClassItem::Range('A', 'Z'),
                    ClassItem::Range('0', '9'),
                    ClassItem::Char('.'),
                    ClassItem::Char('-'),
                ],
                negated: false,
            })
        );

        let ast = parse("[^b]").unwrap();
        assert_eq!(
            ast.alternatives[0][0],
            RegexNode::Class(CharClass {
                items: vec![ClassItem::Char('b')],
                negated: true,
            })
        );

        let ast = parse(r"[]\d]").unwrap();
        assert_eq!(
            ast.alternatives[0][0],
            RegexNode::Class(CharClass {
                items: vec![
                    ClassItem::Char(']'),
                    ClassItem::Perl {
                        class: PerlClass::Digit,
                        negated: false
                    },
                ],
                negated: false,
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(syntax_error("(abc"), (SyntaxErrorKind::UnclosedGroup, 0));
        assert_eq!(syntax_error("abc)"), (SyntaxErrorKind::UnbalancedParenthesis, 3));
        assert_eq!(syntax_error("[abc"), (SyntaxErrorKind::UnclosedClass, 0));
        assert_eq!(syntax_error("[^"), (SyntaxErrorKind::UnclosedClass, 0));
        assert_eq!(syntax_error("*a"), (SyntaxErrorKind::NothingToRepeat, 0));
        assert_eq!(syntax_error("a|+"), (SyntaxErrorKind::NothingToRepeat, 2));
        assert_eq!(syntax_error("(?:a)"), (SyntaxErrorKind::UnsupportedExtension, 0));
        assert_eq!(syntax_error("{3}"), (SyntaxErrorKind::NothingToRepeat, 0));
        assert_eq!(syntax_error("^*"), (SyntaxErrorKind::NothingToRepeat, 1));
        assert_eq!(syntax_error("a**"), (SyntaxErrorKind::MultipleRepeat, 2));
        assert_eq!(syntax_error("a*?"), (SyntaxErrorKind::MultipleRepeat, 2));
        assert_eq!(syntax_error("[z-a]"), (SyntaxErrorKind::BadRange, 1));
        assert_eq!(syntax_error(r"[a-\d]"), (SyntaxErrorKind::BadRange, 1));
        assert_eq!(syntax_error("a{5,2}"), (SyntaxErrorKind::BadRepeatBounds, 1));
        assert_eq!(syntax_error("a{1001}"), (SyntaxErrorKind::RepeatTooLarge, 1));
        assert_eq!(syntax_error(r"\q"), (SyntaxErrorKind::BadEscape, 0));
        assert_eq!(syntax_error(r"(a)\1"), (SyntaxErrorKind::BadEscape, 3));
        assert_eq!(syntax_error("ab\\"), (SyntaxErrorKind::TrailingBackslash, 2));
    }

    #[test]
    fn test_nested_counted_repeats_are_bounded() {
        assert_eq!(
            syntax_error("((a{1000}){1000}){1000}"),
            (SyntaxErrorKind::RepeatTooLarge, 10)
        );
        assert_eq!(syntax_error("(a{400}){400}"), (SyntaxErrorKind::RepeatTooLarge, 8));

        let ast = parse("((a{100}){100})").unwrap();
        assert_eq!(ast.group_count, 2);

        // each repeat is small, the sum is not
        let wide = "a{1000}".repeat(101);
        assert_eq!(syntax_error(&wide), (SyntaxErrorKind::PatternTooLarge, 0));
    }
}
