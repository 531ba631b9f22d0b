use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use tracing::debug;

use crate::compile::{compile, Program};
use crate::error::Error;
use crate::matcher::evaluate;
use crate::parser::parse;
use crate::scanner::Matches;
use crate::substitute::{self, Template};

/// A compiled pattern.
///
/// Compiling is the only fallible step; every query afterwards borrows the
/// pattern immutably, so one `Pattern` can be shared between threads.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    program: Program,
    group_count: usize,
}

impl Pattern {
    /// Compile a case-sensitive pattern.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        Self::compile(pattern, false)
    }

    pub fn compile(pattern: &str, case_insensitive: bool) -> Result<Self, Error> {
        let ast = parse(pattern)?;
        let program = compile(&ast, case_insensitive);
        debug!(
            pattern,
            groups = ast.group_count,
            insts = program.insts.len(),
            case_insensitive,
            "compiled pattern"
        );
        Ok(Pattern {
            source: pattern.to_owned(),
            program,
            group_count: ast.group_count,
        })
    }

    pub fn builder(pattern: &str) -> PatternBuilder {
        PatternBuilder::new(pattern)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of capturing groups, not counting the whole match.
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.program.case_insensitive
    }

    /// Try to match starting exactly at byte offset `offset`.
    pub fn match_at<'t>(&self, text: &'t str, offset: usize) -> Option<Match<'t>> {
        let slots = evaluate(&self.program, text, offset)?;
        Match::from_slots(text, &slots)
    }

    /// Match only at the beginning of `text`.
    pub fn match_start<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        self.match_at(text, 0)
    }

    /// The leftmost match anywhere in `text`.
    pub fn find<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        self.find_iter(text).next()
    }

    /// Every non-overlapping match, left to right.
    pub fn find_iter<'p, 't>(&'p self, text: &'t str) -> Matches<'p, 't> {
        Matches::new(self, text)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.find(text).is_some()
    }

    /// The text of every match. Without capturing groups each entry holds
    /// the whole match; otherwise it holds the text of groups `1..=n`, with
    /// `""` for groups that did not take part.
    pub fn find_all_text<'t>(&self, text: &'t str) -> Vec<Vec<&'t str>> {
        self.find_iter(text)
            .map(|m| {
                if self.group_count == 0 {
                    vec![m.as_str()]
                } else {
                    (1..=self.group_count)
                        .map(|index| m.group(index).unwrap_or(""))
                        .collect()
                }
            })
            .collect()
    }

    /// Replace every match with `template`, where `\N` and `\g<N>` insert
    /// the text of group `N`.
    pub fn substitute(&self, template: &str, text: &str) -> Result<String, Error> {
        substitute::substitute(self, template, text)
    }

    /// Like [`Pattern::substitute`], also returning how many matches were
    /// replaced.
    pub fn substitute_count(&self, template: &str, text: &str) -> Result<(String, usize), Error> {
        substitute::substitute_count(self, template, text)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::new(s)
    }
}

/// Compile options for a [`Pattern`].
#[derive(Debug, Clone)]
pub struct PatternBuilder {
    pattern: String,
    case_insensitive: bool,
}

impl PatternBuilder {
    pub fn new(pattern: &str) -> Self {
        PatternBuilder {
            pattern: pattern.to_owned(),
            case_insensitive: false,
        }
    }

    /// Match ASCII letters regardless of case.
    pub fn case_insensitive(&mut self, yes: bool) -> &mut Self {
        self.case_insensitive = yes;
        self
    }

    pub fn build(&self) -> Result<Pattern, Error> {
        Pattern::compile(&self.pattern, self.case_insensitive)
    }
}

/// A successful match: the overall span plus one optional span per
/// capturing group. Offsets are byte offsets into the searched text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'t> {
    text: &'t str,
    start: usize,
    end: usize,
    groups: Vec<Option<Range<usize>>>,
}

impl<'t> Match<'t> {
    pub(crate) fn from_slots(text: &'t str, slots: &[Option<usize>]) -> Option<Self> {
        let (Some(start), Some(end)) = (*slots.first()?, *slots.get(1)?) else {
            return None;
        };
        let groups = slots
            .chunks(2)
            .map(|pair| match pair {
                [Some(start), Some(end)] => Some(*start..*end),
                _ => None,
            })
            .collect();
        Some(Match {
            text,
            start,
            end,
            groups,
        })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_str(&self) -> &'t str {
        &self.text[self.range()]
    }

    /// Number of groups including group 0, the whole match.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Span of group `index`; `None` if the group did not take part in the
    /// match or does not exist.
    pub fn span(&self, index: usize) -> Option<Range<usize>> {
        self.groups.get(index).cloned().flatten()
    }

    pub fn group(&self, index: usize) -> Option<&'t str> {
        self.span(index).map(|range| &self.text[range])
    }

    /// Texts of all groups, group 0 first.
    pub fn groups(&self) -> impl Iterator<Item = Option<&'t str>> + '_ {
        (0..self.len()).map(move |index| self.group(index))
    }

    /// Render `template` against this match alone.
    pub fn expand(&self, template: &str) -> Result<String, Error> {
        let template = Template::parse(template)?;
        template.check(self.len() - 1)?;
        let mut out = String::new();
        template.render_into(self, &mut out);
        Ok(out)
    }
}
