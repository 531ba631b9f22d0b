use std::iter::{self, FusedIterator};

use tracing::trace;

use crate::pattern::{Match, Pattern};

/// Iterator over the non-overlapping matches of a pattern, left to right.
///
/// Created by [`Pattern::find_iter`]. It walks the text once; searching
/// again means calling `find_iter` again.
#[derive(Debug)]
pub struct Matches<'p, 't> {
    pattern: &'p Pattern,
    text: &'t str,
    // `None` once the text is exhausted
    next_start: Option<usize>,
}

impl<'p, 't> Matches<'p, 't> {
    pub(crate) fn new(pattern: &'p Pattern, text: &'t str) -> Self {
        Matches {
            pattern,
            text,
            next_start: Some(0),
        }
    }
}

impl<'t> Iterator for Matches<'_, 't> {
    type Item = Match<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start?;
        let Some(m) = search_from(self.pattern, self.text, start) else {
            self.next_start = None;
            return None;
        };
        trace!(pattern = %self.pattern, start = m.start(), end = m.end(), "match");
        self.next_start = resume_offset(self.text, &m);
        Some(m)
    }
}

impl FusedIterator for Matches<'_, '_> {}

pub fn find_all<'p, 't>(pattern: &'p Pattern, text: &'t str) -> Matches<'p, 't> {
    Matches::new(pattern, text)
}

// Try every char boundary from `start` up to and including the end of the
// text.
fn search_from<'t>(pattern: &Pattern, text: &'t str, start: usize) -> Option<Match<'t>> {
    text[start..]
        .char_indices()
        .map(|(offset, _)| start + offset)
        .chain(iter::once(text.len()))
        .find_map(|offset| pattern.match_at(text, offset))
}

// Where to search after `m`. An empty match steps over one character so
// the scan always moves forward.
fn resume_offset(text: &str, m: &Match<'_>) -> Option<usize> {
    if !m.is_empty() {
        return Some(m.end());
    }
    text[m.end()..]
        .chars()
        .next()
        .map(|c| m.end() + c.len_utf8())
}
