//! Output normalization, comparison and line diffs

/// Canonical line form of a program output.
///
/// Leading and trailing whitespace of the whole text is dropped, then every
/// line is right-trimmed. Running it on its own output (joined with `\n`)
/// yields the same lines.
pub fn normalize(text: &str) -> Vec<String> {
    split_lines(text.trim_matches(is_space))
        .into_iter()
        .map(|line| line.trim_end_matches(is_space).to_string())
        .collect()
}

/// Split on every line boundary (`\n`, `\r`, `\r\n`, `\x0b`, `\x0c`,
/// `\x1c`..`\x1e`, `\u{85}`, `\u{2028}`, `\u{2029}`). A trailing boundary
/// does not start an extra empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..idx]);
        start = idx + c.len_utf8();
        if c == '\r' {
            if let Some(&(_, '\n')) = chars.peek() {
                chars.next();
                start += 1;
            }
        }
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c'..='\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Unicode whitespace plus the ASCII separators `\x1c`..`\x1f`
fn is_space(c: char) -> bool {
    c.is_whitespace() || matches!(c, '\x1c'..='\x1f')
}

/// Exact comparison of the normalized forms. `expected` is the reference.
pub fn compare(expected: &[String], actual: &[String]) -> bool {
    expected == actual
}

/// Compare program output with expected output
pub fn compare_output(expected: &str, actual: &str) -> bool {
    compare(&normalize(expected), &normalize(actual))
}

/// One line of a diff between expected and actual output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    /// Present in both
    Context(String),
    /// Present only in the expected output
    Removed(String),
    /// Present only in the actual output
    Added(String),
}

impl DiffLine {
    pub fn text(&self) -> &str {
        match self {
            DiffLine::Context(s) | DiffLine::Removed(s) | DiffLine::Added(s) => s,
        }
    }

    pub fn prefix(&self) -> char {
        match self {
            DiffLine::Context(_) => ' ',
            DiffLine::Removed(_) => '-',
            DiffLine::Added(_) => '+',
        }
    }
}

impl std::fmt::Display for DiffLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.prefix(), self.text())
    }
}

/// Above this many LCS cells the diff falls back to a positional comparison.
const MAX_LCS_CELLS: usize = 4_000_000;

/// Line diff of two normalized outputs, keeping `context` unchanged lines
/// around each change. Returns an empty list when both sides are equal.
pub fn diff_lines(expected: &[String], actual: &[String], context: usize) -> Vec<DiffLine> {
    if expected == actual {
        return Vec::new();
    }

    let full = if expected.len().saturating_mul(actual.len()) <= MAX_LCS_CELLS {
        lcs_diff(expected, actual)
    } else {
        positional_diff(expected, actual)
    };

    trim_context(full, context)
}

fn lcs_diff(expected: &[String], actual: &[String]) -> Vec<DiffLine> {
    let (n, m) = (expected.len(), actual.len());

    // table[i][j] = LCS length of expected[i..] and actual[j..]
    let mut table = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if expected[i] == actual[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut lines = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if expected[i] == actual[j] {
            lines.push(DiffLine::Context(expected[i].clone()));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            lines.push(DiffLine::Removed(expected[i].clone()));
            i += 1;
        } else {
            lines.push(DiffLine::Added(actual[j].clone()));
            j += 1;
        }
    }
    lines.extend(expected[i..].iter().cloned().map(DiffLine::Removed));
    lines.extend(actual[j..].iter().cloned().map(DiffLine::Added));
    lines
}

fn positional_diff(expected: &[String], actual: &[String]) -> Vec<DiffLine> {
    let mut lines = Vec::new();
    for idx in 0..expected.len().max(actual.len()) {
        match (expected.get(idx), actual.get(idx)) {
            (Some(e), Some(a)) if e == a => lines.push(DiffLine::Context(e.clone())),
            (e, a) => {
                if let Some(e) = e {
                    lines.push(DiffLine::Removed(e.clone()));
                }
                if let Some(a) = a {
                    lines.push(DiffLine::Added(a.clone()));
                }
            }
        }
    }
    lines
}

fn trim_context(lines: Vec<DiffLine>, context: usize) -> Vec<DiffLine> {
    let changed: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !matches!(line, DiffLine::Context(_)))
        .map(|(idx, _)| idx)
        .collect();

    lines
        .into_iter()
        .enumerate()
        .filter(|(idx, line)| {
            !matches!(line, DiffLine::Context(_))
                || changed.iter().any(|&c| c.abs_diff(*idx) <= context)
        })
        .map(|(_, line)| line)
        .collect()
}
