//! Quote-aware line splitting.
//!
//! Lines split on whitespace runs, except that text between a matched pair
//! of single quotes is one token verbatim. An unmatched trailing quote marks
//! the line malformed; the caller decides how loudly to complain, and the
//! line degrades to a plain whitespace split.

/// Result of splitting one raw line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SplitLine {
    pub tokens: Vec<String>,
    pub unmatched_quote: bool,
}

/// Split a line into tokens, honouring single-quoted spans.
pub fn split_line(line: &str) -> SplitLine {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        if in_quotes {
            if ch == '\'' {
                // Closing quote ends the token even when empty.
                tokens.push(std::mem::take(&mut current));
                in_quotes = false;
            } else {
                current.push(ch);
            }
        } else if ch == '\'' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            in_quotes = true;
        } else if ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }

    if in_quotes {
        return SplitLine {
            tokens: line.split_whitespace().map(str::to_string).collect(),
            unmatched_quote: true,
        };
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    SplitLine {
        tokens,
        unmatched_quote: false,
    }
}
