//! Best-effort "execution steps" narrative for Python source.
//!
//! This is a line-oriented scan, not a parser: it recognises assignments,
//! conditionals and bare expression statements well enough to annotate a
//! program for a learner. Source with unbalanced brackets, unterminated
//! strings or headers missing their colon is rejected as a whole.

use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    /// Zero-based line of the statement
    pub line_number: usize,
    pub step_description: String,
}

/// Statements that open a block and are followed by a header colon
const COMPOUND_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "for", "while", "def", "class", "with", "try", "except", "finally",
    "async",
];

/// Simple statements that never produce a step
const SILENT_KEYWORDS: &[&str] = &[
    "return", "import", "from", "pass", "break", "continue", "raise", "global", "nonlocal", "del",
    "assert",
];

const AUGMENTED_OPERATORS: &[char] = &['+', '-', '*', '/', '%', '&', '|', '^', '@'];

/// Extracts steps in source order, or `None` if the source does not scan
pub fn execution_steps(source: &str) -> Option<Vec<ExecutionStep>> {
    let mut steps = Vec::new();

    for line in logical_lines(source)? {
        let mut statement = line.text.trim();
        while !statement.is_empty() {
            statement = describe_statement(statement, line.number, &mut steps)?;
        }
    }

    Some(steps)
}

struct LogicalLine {
    number: usize,
    text: String,
}

/// Joins physical lines into logical ones and strips comments
fn logical_lines(source: &str) -> Option<Vec<LogicalLine>> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut start_line = 0;
    let mut line = 0;
    let mut brackets: Vec<char> = Vec::new();
    let mut quote: Option<(char, bool)> = None;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some((q, triple)) = quote {
            current.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        if escaped == '\n' {
                            line += 1;
                        }
                        current.push(escaped);
                    }
                }
                '\n' if !triple => return None,
                '\n' => line += 1,
                _ if c == q => {
                    if !triple {
                        quote = None;
                    } else if chars.peek() == Some(&q) {
                        current.push(chars.next()?);
                        if chars.peek() == Some(&q) {
                            current.push(chars.next()?);
                            quote = None;
                        }
                    }
                }
                _ => {}
            }
            continue;
        }

        match c {
            '#' => {
                while chars.peek().is_some_and(|&next| next != '\n') {
                    chars.next();
                }
            }
            '\'' | '"' => {
                current.push(c);
                let triple = chars.peek() == Some(&c) && {
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    lookahead.peek() == Some(&c)
                };
                if triple {
                    current.push(chars.next()?);
                    current.push(chars.next()?);
                    quote = Some((c, true));
                } else if chars.peek() == Some(&c) {
                    // empty string literal
                    current.push(chars.next()?);
                } else {
                    quote = Some((c, false));
                }
            }
            '(' | '[' | '{' => {
                brackets.push(c);
                current.push(c);
            }
            ')' | ']' | '}' => {
                let open = brackets.pop()?;
                if closing_for(open) != c {
                    return None;
                }
                current.push(c);
            }
            '\\' if chars.peek() == Some(&'\n') => {
                chars.next();
                line += 1;
                current.push(' ');
            }
            '\n' => {
                line += 1;
                if brackets.is_empty() {
                    push_line(&mut lines, &mut current, start_line);
                    start_line = line;
                } else {
                    current.push(' ');
                }
            }
            _ => current.push(c),
        }
    }

    if quote.is_some() || !brackets.is_empty() {
        return None;
    }
    push_line(&mut lines, &mut current, start_line);
    Some(lines)
}

fn push_line(lines: &mut Vec<LogicalLine>, current: &mut String, number: usize) {
    let text = std::mem::take(current);
    if !text.trim().is_empty() {
        lines.push(LogicalLine { number, text });
    }
}

fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Byte offsets and characters that sit outside strings and brackets
fn top_level_chars(text: &str) -> Vec<(usize, char)> {
    let mut found = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => found.push((idx, c)),
            _ => {}
        }
    }

    found
}

fn first_word(statement: &str) -> &str {
    let end = statement
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(statement.len());
    &statement[..end]
}

/// Records the step for the leading statement and returns the unconsumed rest
fn describe_statement<'a>(
    statement: &'a str,
    line_number: usize,
    steps: &mut Vec<ExecutionStep>,
) -> Option<&'a str> {
    let keyword = first_word(statement);

    if COMPOUND_KEYWORDS.contains(&keyword) {
        let colon = top_level_chars(statement)
            .into_iter()
            .find(|&(_, c)| c == ':')
            .map(|(idx, _)| idx)?;

        if keyword == "if" || keyword == "elif" {
            let test = statement[keyword.len()..colon].trim();
            if test.is_empty() {
                return None;
            }
            steps.push(ExecutionStep {
                line_number,
                step_description: format!("If {test}"),
            });
        }
        // A one-line body follows the header on the same line
        return Some(statement[colon + 1..].trim());
    }

    let (simple, rest) = match top_level_chars(statement)
        .into_iter()
        .find(|&(_, c)| c == ';')
    {
        Some((idx, _)) => (statement[..idx].trim(), statement[idx + 1..].trim()),
        None => (statement, ""),
    };

    if let Some(step_description) = describe_simple(simple) {
        steps.push(ExecutionStep {
            line_number,
            step_description,
        });
    }
    Some(rest)
}

fn describe_simple(statement: &str) -> Option<String> {
    if statement.is_empty() || statement.starts_with('@') {
        return None;
    }
    let keyword = first_word(statement);
    if SILENT_KEYWORDS.contains(&keyword) {
        return None;
    }

    let top_level = top_level_chars(statement);
    let mut assignments = Vec::new();
    let mut annotated = false;

    for &(idx, c) in &top_level {
        match c {
            ':' if assignments.is_empty() && keyword != "lambda" => annotated = true,
            '=' => {
                let prev = statement[..idx].chars().next_back();
                let before_prev = statement[..idx].chars().rev().nth(1);
                let next = statement[idx + 1..].chars().next();
                let is_comparison = next == Some('=')
                    || matches!(prev, Some('=' | '!' | ':'))
                    || (matches!(prev, Some('<' | '>')) && before_prev != prev);
                if is_comparison {
                    continue;
                }
                let is_augmented = prev.is_some_and(|p| AUGMENTED_OPERATORS.contains(&p))
                    || matches!(prev, Some('<' | '>'));
                if is_augmented {
                    return None;
                }
                assignments.push(idx);
            }
            _ => {}
        }
    }

    if annotated {
        return None;
    }

    match (assignments.first(), assignments.last()) {
        (Some(&first), Some(&last)) => {
            let target = statement[..first].trim();
            let value = statement[last + 1..].trim();
            if target.is_empty() || value.is_empty() {
                return None;
            }
            Some(format!("{target} = {value}"))
        }
        _ => Some(statement.to_string()),
    }
}
