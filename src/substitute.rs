use tracing::debug;

use crate::error::Error;
use crate::parser::control_escape;
use crate::pattern::{Match, Pattern};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Group(usize),
}

/// A parsed replacement template.
///
/// `\N` or `\NN` (one or two digits, not starting with 0) and `\g<N>`
/// insert the text of group `N`; `\g<0>` is the whole match. `\0` starts an
/// octal escape, so `\0` alone is NUL. `\\` is a backslash and
/// `\n \t \r \f \v` are control characters. Any other escaped non-letter
/// is copied with its backslash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pieces: Vec<Piece>,
}

impl Template {
    pub fn parse(template: &str) -> Result<Self, Error> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            if c != '\\' {
                literal.push(c);
                continue;
            }
            let syntax_error = |reason| Error::TemplateSyntax { reason, offset };
            let Some((_, escaped)) = chars.next() else {
                return Err(syntax_error("trailing backslash"));
            };

            let index = match escaped {
                '0' => {
                    // octal escape: `\0` plus up to two more octal digits
                    let mut code = 0;
                    for _ in 0..2 {
                        match chars.peek() {
                            Some(&(_, d @ '0'..='7')) => {
                                code = code * 8 + digit_value(d);
                                chars.next();
                            }
                            _ => break,
                        }
                    }
                    // at most 0o77, always a valid char
                    literal.push(char::from(code as u8));
                    continue;
                }
                d if d.is_ascii_digit() => {
                    let mut index = digit_value(d);
                    if let Some(&(_, next)) = chars.peek() {
                        if next.is_ascii_digit() {
                            index = index * 10 + digit_value(next);
                            chars.next();
                        }
                    }
                    index
                }
                'g' => {
                    if !matches!(chars.next(), Some((_, '<'))) {
                        return Err(syntax_error("missing < after \\g"));
                    }
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '>')) => break,
                            Some((_, d)) if d.is_ascii_digit() => digits.push(d),
                            Some(_) => return Err(syntax_error("bad group name")),
                            None => return Err(syntax_error("missing >, unterminated name")),
                        }
                    }
                    digits
                        .parse::<usize>()
                        .map_err(|_| syntax_error("bad group name"))?
                }
                '\\' => {
                    literal.push('\\');
                    continue;
                }
                c => {
                    if let Some(control) = control_escape(c) {
                        literal.push(control);
                    } else if c.is_ascii_alphabetic() {
                        return Err(syntax_error("bad escape"));
                    } else {
                        literal.push('\\');
                        literal.push(c);
                    }
                    continue;
                }
            };

            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            pieces.push(Piece::Group(index));
        }

        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }
        Ok(Template { pieces })
    }

    /// Fail if the template refers to a group above `group_count`.
    pub fn check(&self, group_count: usize) -> Result<(), Error> {
        let highest = self
            .pieces
            .iter()
            .filter_map(|piece| match piece {
                Piece::Group(index) => Some(*index),
                Piece::Literal(_) => None,
            })
            .max();
        match highest {
            Some(index) if index > group_count => Err(Error::UnknownGroupReference { index, group_count }),
            _ => Ok(()),
        }
    }

    /// Append the rendering for `m` to `out`. Groups that did not take
    /// part in the match render as nothing.
    pub fn render_into(&self, m: &Match<'_>, out: &mut String) {
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Group(index) => out.push_str(m.group(*index).unwrap_or("")),
            }
        }
    }

    /// Replace every match of `pattern` in `text`, left to right over the
    /// original text, and count the replacements. References to groups the
    /// pattern lacks render as nothing; use [`Template::check`] first to
    /// reject them.
    pub fn replace_all(&self, pattern: &Pattern, text: &str) -> (String, usize) {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut count = 0;
        for m in pattern.find_iter(text) {
            out.push_str(&text[last..m.start()]);
            self.render_into(&m, &mut out);
            last = m.end();
            count += 1;
        }
        out.push_str(&text[last..]);

        debug!(%pattern, replacements = count, "substitution finished");
        (out, count)
    }
}

fn digit_value(c: char) -> usize {
    c as usize - '0' as usize
}

pub fn substitute(pattern: &Pattern, template: &str, text: &str) -> Result<String, Error> {
    substitute_count(pattern, template, text).map(|(out, _)| out)
}

/// Replace every match in `text` and report how many replacements were
/// made.
pub fn substitute_count(
    pattern: &Pattern,
    template: &str,
    text: &str,
) -> Result<(String, usize), Error> {
    let template = Template::parse(template)?;
    template.check(pattern.group_count())?;
    Ok(template.replace_all(pattern, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const URLS: &str = "
https://www.google.com
http://coreyms.com
https://youtube.com
https://www.nasa.gov
";

    #[test]
    fn test_substitute_urls() {
        let pattern = Pattern::new(r"https?://(www\.)?(\w+)(\.\w+)").unwrap();
        assert_eq!(
            substitute(&pattern, r"\2\3", "https://www.google.com").unwrap(),
            "google.com"
        );
        assert_eq!(
            substitute(&pattern, r"\2\3", URLS).unwrap(),
            "\ngoogle.com\ncoreyms.com\nyoutube.com\nnasa.gov\n"
        );
    }

    #[test]
    fn test_substitute_without_matches_is_identity() {
        let pattern = Pattern::new(r"\d+").unwrap();
        assert_eq!(
            substitute_count(&pattern, "#", "no digits here").unwrap(),
            ("no digits here".to_owned(), 0)
        );
    }

    #[test]
    fn test_substitute_counts_and_empty_matches() {
        let pattern = Pattern::new("x*").unwrap();
        assert_eq!(
            substitute_count(&pattern, "-", "abc").unwrap(),
            ("-a-b-c-".to_owned(), 4)
        );
    }

    #[test]
    fn test_substitute_is_not_recursive() {
        let pattern = Pattern::new("a").unwrap();
        assert_eq!(substitute(&pattern, "aa", "aba").unwrap(), "aabaa");
    }

    #[test]
    fn test_absent_group_renders_empty() {
        let pattern = Pattern::new(r"(a)|(b)").unwrap();
        assert_eq!(substitute(&pattern, r"[\1\2]", "ab").unwrap(), "[a][b]");
    }

    #[test]
    fn test_unknown_group_reference() {
        let pattern = Pattern::new(r"(\w+)").unwrap();
        assert_eq!(
            substitute(&pattern, r"\2", "text").unwrap_err(),
            Error::UnknownGroupReference {
                index: 2,
                group_count: 1
            }
        );
        // checked even when nothing matches
        assert!(substitute(&pattern, r"\g<7>", "").is_err());
    }

    #[test]
    fn test_template_escapes() {
        let pattern = Pattern::new(r"(\d)(\d)").unwrap();
        assert_eq!(
            substitute(&pattern, r"\g<2>\1\t\\\.", "12").unwrap(),
            "21\t\\\\."
        );
        // two-digit references
        let wide = Pattern::new("(a)(b)(c)(d)(e)(f)(g)(h)(i)(j)(k)").unwrap();
        assert_eq!(substitute(&wide, r"\11\g<1>0", "abcdefghijk").unwrap(), "ka0");
    }

    #[test]
    fn test_zero_escape_is_octal_not_whole_match() {
        let pattern = Pattern::new(r"\d+").unwrap();
        assert_eq!(substitute(&pattern, r"<\0>", "a1").unwrap(), "a<\0>");
        assert_eq!(substitute(&pattern, r"\012", "7").unwrap(), "\n");
        assert_eq!(substitute(&pattern, r"\0418", "7").unwrap(), "!8");
        assert_eq!(substitute(&pattern, r"[\g<0>]", "a12").unwrap(), "a[12]");
    }

    #[test]
    fn test_template_syntax_errors() {
        let err = |template: &str| match Template::parse(template) {
            Err(Error::TemplateSyntax { reason, offset }) => (reason, offset),
            other => panic!("expected template error for {template:?}, got {other:?}"),
        };
        assert_eq!(err("ab\\"), ("trailing backslash", 2));
        assert_eq!(err(r"\q"), ("bad escape", 0));
        assert_eq!(err(r"x\g1"), ("missing < after \\g", 1));
        assert_eq!(err(r"\g<x>"), ("bad group name", 0));
        assert_eq!(err(r"\g<>"), ("bad group name", 0));
        assert_eq!(err(r"\g<1"), ("missing >, unterminated name", 0));
    }
}
