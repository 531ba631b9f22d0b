use crate::ast::{is_word_char, AnchorKind};
use crate::compile::{Inst, Program};

/// Capture slots of a successful evaluation, two per group.
pub type Slots = Vec<Option<usize>>;

// Entries of the backtracking stack. Undo records sit above the retry
// point they belong to, so unwinding to a retry restores captures and
// loop marks to what they were when the retry was pushed.
enum Frame {
    Retry { pc: usize, pos: usize },
    RestoreSlot { slot: usize, old: Option<usize> },
    RestoreMark { mark: usize, old: Option<usize> },
}

/// Run `program` against `text` anchored at byte offset `start`.
///
/// Returns the capture slots of the first successful path in priority
/// order, or `None` when no path matches at `start`.
pub fn evaluate(program: &Program, text: &str, start: usize) -> Option<Slots> {
    if start > text.len() || !text.is_char_boundary(start) {
        return None;
    }

    let fold_case = program.case_insensitive;
    let mut slots: Slots = vec![None; program.slot_count];
    let mut marks: Vec<Option<usize>> = vec![None; program.mark_count];
    let mut stack: Vec<Frame> = Vec::new();
    let mut pc = 0;
    let mut pos = start;

    loop {
        let advanced = match &program.insts[pc] {
            Inst::Char(expected) => match next_char(text, pos) {
                Some(c) if chars_equal(c, *expected, fold_case) => {
                    pos += c.len_utf8();
                    pc += 1;
                    true
                }
                _ => false,
            },
            Inst::Any => match next_char(text, pos) {
                Some(c) if c != '\n' => {
                    pos += c.len_utf8();
                    pc += 1;
                    true
                }
                _ => false,
            },
            Inst::Class(class) => match next_char(text, pos) {
                Some(c) if class.matches(c, fold_case) => {
                    pos += c.len_utf8();
                    pc += 1;
                    true
                }
                _ => false,
            },
            Inst::Assert(kind) => {
                pc += 1;
                assertion_holds(*kind, text, pos)
            }
            Inst::Save(slot) => {
                stack.push(Frame::RestoreSlot {
                    slot: *slot,
                    old: slots[*slot],
                });
                slots[*slot] = Some(pos);
                pc += 1;
                true
            }
            Inst::Split(first, second) => {
                stack.push(Frame::Retry { pc: *second, pos });
                pc = *first;
                true
            }
            Inst::Jump(target) => {
                pc = *target;
                true
            }
            Inst::Mark(mark) => {
                stack.push(Frame::RestoreMark {
                    mark: *mark,
                    old: marks[*mark],
                });
                marks[*mark] = Some(pos);
                pc += 1;
                true
            }
            Inst::Progress { mark, exit } => {
                pc = if marks[*mark] == Some(pos) { *exit } else { pc + 1 };
                true
            }
            Inst::Match => return Some(slots),
        };

        if advanced {
            continue;
        }

        // backtrack to the most recent retry point
        loop {
            match stack.pop()? {
                Frame::Retry {
                    pc: retry_pc,
                    pos: retry_pos,
                } => {
                    pc = retry_pc;
                    pos = retry_pos;
                    break;
                }
                Frame::RestoreSlot { slot, old } => slots[slot] = old,
                Frame::RestoreMark { mark, old } => marks[mark] = old,
            }
        }
    }
}

fn next_char(text: &str, pos: usize) -> Option<char> {
    text[pos..].chars().next()
}

fn prev_char(text: &str, pos: usize) -> Option<char> {
    text[..pos].chars().next_back()
}

fn chars_equal(actual: char, expected: char, fold_case: bool) -> bool {
    actual == expected || (fold_case && actual.eq_ignore_ascii_case(&expected))
}

// `^` and `$` only look at the absolute ends of the text. A word boundary
// sits between a word character and a non-word character, where a missing
// neighbour at either end of the text counts as non-word.
fn assertion_holds(kind: AnchorKind, text: &str, pos: usize) -> bool {
    match kind {
        AnchorKind::Start => pos == 0,
        AnchorKind::End => pos == text.len(),
        AnchorKind::WordBoundary => is_word_boundary(text, pos),
        AnchorKind::NotWordBoundary => !is_word_boundary(text, pos),
    }
}

fn is_word_boundary(text: &str, pos: usize) -> bool {
    let before = prev_char(text, pos).is_some_and(is_word_char);
    let after = next_char(text, pos).is_some_and(is_word_char);
    before != after
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn run(pattern: &str, text: &str, start: usize) -> Option<Slots> {
        let program = compile(&parse(pattern).unwrap(), false);
        evaluate(&program, text, start)
    }

    fn span(pattern: &str, text: &str, start: usize) -> Option<(usize, usize)> {
        run(pattern, text, start).map(|slots| (slots[0].unwrap(), slots[1].unwrap()))
    }

    #[test]
    fn test_evaluate_is_anchored_at_start() {
        assert_eq!(span("abc", "xabc", 0), None);
        assert_eq!(span("abc", "xabc", 1), Some((1, 4)));
        assert_eq!(span("abc", "xabc", 9), None);
    }

    #[test]
    fn test_evaluate_rejects_offsets_inside_a_char() {
        assert_eq!(span(".", "é", 1), None);
        assert_eq!(span(".", "é", 0), Some((0, 2)));
    }

    #[test]
    fn test_dot_skips_newline() {
        assert_eq!(span("a.b", "a\nb", 0), None);
        assert_eq!(span("a.b", "a-b", 0), Some((0, 3)));
    }

    #[test]
    fn test_greedy_quantifiers_backtrack() {
        assert_eq!(span(r"\w*d", "abcd", 0), Some((0, 4)));
        assert_eq!(span("a{2,4}", "aaaaa", 0), Some((0, 4)));
        assert_eq!(span("a{2,4}a", "aaa", 0), Some((0, 3)));
        assert_eq!(span("a{3}", "aa", 0), None);
        assert_eq!(span("a+b", "aaab", 0), Some((0, 4)));
        assert_eq!(span("x?y", "y", 0), Some((0, 1)));
    }

    #[test]
    fn test_alternation_is_ordered() {
        // the first branch that leads to a match wins, even if shorter
        assert_eq!(span("(a|ab)", "ab", 0), Some((0, 1)));
        assert_eq!(span("(a|ab)c", "abc", 0), Some((0, 3)));
    }

    #[test]
    fn test_untaken_branch_groups_are_absent() {
        let slots = run("((a)|(b))", "b", 0).unwrap();
        assert_eq!(
            slots,
            vec![Some(0), Some(1), Some(0), Some(1), None, None, Some(0), Some(1)]
        );
    }

    #[test]
    fn test_repeated_group_keeps_last_iteration() {
        let slots = run("(a|b)+", "abb", 0).unwrap();
        assert_eq!(slots[2..].to_vec(), vec![Some(2), Some(3)]);
    }

    #[test]
    fn test_empty_loop_terminates() {
        assert_eq!(span("(a*)*b", "aab", 0), Some((0, 3)));
        assert_eq!(span("(a*)*", "c", 0), Some((0, 0)));
    }

    #[test]
    fn test_empty_iteration_ends_loop_and_keeps_captures() {
        // an empty iteration leaves the loop instead of trying later branches
        let slots = run("(|a)+", "aa", 0).unwrap();
        assert_eq!(slots, vec![Some(0), Some(0), Some(0), Some(0)]);

        let slots = run("(a*)*", "b", 0).unwrap();
        assert_eq!(slots, vec![Some(0), Some(0), Some(0), Some(0)]);

        // the last, empty, iteration is the one that is captured
        let slots = run("(a*)*b", "aab", 0).unwrap();
        assert_eq!(slots, vec![Some(0), Some(3), Some(2), Some(2)]);
    }

    #[test]
    fn test_anchors() {
        assert_eq!(span("^Start", "Start a sentence", 0), Some((0, 5)));
        assert_eq!(span("^a", "ba", 1), None);
        assert_eq!(span("end$", "an end", 3), Some((3, 6)));
        assert_eq!(span("end$", "an end.", 3), None);
        // absolute ends only, not line ends
        assert_eq!(span("a$", "a\nb", 0), None);
    }

    #[test]
    fn test_word_boundaries() {
        let text = "Ha HaHa";
        assert_eq!(span(r"\bHa", text, 0), Some((0, 2)));
        assert_eq!(span(r"\bHa", text, 3), Some((3, 5)));
        assert_eq!(span(r"\bHa", text, 5), None);
        assert_eq!(span(r"\BHa", text, 5), Some((5, 7)));
        assert_eq!(span(r"\BHa", text, 0), None);
        assert_eq!(span(r"\b", "", 0), None);
        assert_eq!(span(r"\B", "", 0), Some((0, 0)));
        assert_eq!(span(r"\b", " x", 0), None);
    }

    #[test]
    fn test_case_folding() {
        let program = compile(&parse("start[a-c]").unwrap(), true);
        assert_eq!(evaluate(&program, "START B", 0), None);
        assert!(evaluate(&program, "StArTB", 0).is_some());
    }

    #[test]
    fn test_deep_repetition_does_not_recurse() {
        let text = "a".repeat(200_000);
        assert_eq!(span("(a|b)*", &text, 0), Some((0, text.len())));
    }
}
