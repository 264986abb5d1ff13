//! Line diff.
//!
//! Compares a rendered template with the file currently on disk. Common
//! leading and trailing lines are matched first, then the middle is aligned
//! with a longest-common-subsequence table.

use serde::Serialize;

/// Upper bound on LCS table cells before falling back to replace-all.
const MAX_TABLE_CELLS: usize = 4_000_000;

/// How one line differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStatus {
    /// Present in both.
    Unchanged,
    /// Only in the new content.
    Added,
    /// Only in the old content.
    Removed,
}

/// A single line of a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    status: LineStatus,
    text: String,
}

impl DiffLine {
    pub fn new(status: LineStatus, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    pub fn status(&self) -> LineStatus {
        self.status
    }

    /// Line text without its newline.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// `+`, `-` or a space.
    pub fn prefix(&self) -> char {
        match self.status {
            LineStatus::Unchanged => ' ',
            LineStatus::Added => '+',
            LineStatus::Removed => '-',
        }
    }
}

/// Line-by-line difference between two texts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diff {
    lines: Vec<DiffLine>,
}

impl Diff {
    /// Compute the diff from `old` to `new`.
    pub fn compute(old: &str, new: &str) -> Self {
        let a: Vec<&str> = old.lines().collect();
        let b: Vec<&str> = new.lines().collect();

        let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
        let suffix = a[prefix..]
            .iter()
            .rev()
            .zip(b[prefix..].iter().rev())
            .take_while(|(x, y)| x == y)
            .count();

        let mut lines: Vec<DiffLine> = a[..prefix]
            .iter()
            .map(|l| DiffLine::new(LineStatus::Unchanged, *l))
            .collect();
        lines.extend(align(&a[prefix..a.len() - suffix], &b[prefix..b.len() - suffix]));
        lines.extend(
            a[a.len() - suffix..]
                .iter()
                .map(|l| DiffLine::new(LineStatus::Unchanged, *l)),
        );

        Self { lines }
    }

    /// All lines in order.
    pub fn lines(&self) -> &[DiffLine] {
        &self.lines
    }

    /// Lines only in the new content.
    pub fn added(&self) -> Vec<&DiffLine> {
        self.with_status(LineStatus::Added)
    }

    /// Lines only in the old content.
    pub fn removed(&self) -> Vec<&DiffLine> {
        self.with_status(LineStatus::Removed)
    }

    fn with_status(&self, status: LineStatus) -> Vec<&DiffLine> {
        self.lines.iter().filter(|l| l.status == status).collect()
    }

    /// Whether old and new are line-for-line identical.
    pub fn is_unchanged(&self) -> bool {
        self.lines.iter().all(|l| l.status == LineStatus::Unchanged)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Changed lines with `+`/`-` prefixes, one per line.
    pub fn render_changes(&self) -> String {
        self.lines
            .iter()
            .filter(|l| l.status != LineStatus::Unchanged)
            .map(|l| format!("{}{}\n", l.prefix(), l.text))
            .collect()
    }
}

/// Align two line slices with no common prefix or suffix.
fn align(a: &[&str], b: &[&str]) -> Vec<DiffLine> {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 || n.saturating_mul(m) > MAX_TABLE_CELLS {
        return a
            .iter()
            .map(|l| DiffLine::new(LineStatus::Removed, *l))
            .chain(b.iter().map(|l| DiffLine::new(LineStatus::Added, *l)))
            .collect();
    }

    // table[i][j] = LCS length of a[i..] and b[j..]
    let width = m + 1;
    let mut table = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            out.push(DiffLine::new(LineStatus::Unchanged, a[i]));
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            out.push(DiffLine::new(LineStatus::Removed, a[i]));
            i += 1;
        } else {
            out.push(DiffLine::new(LineStatus::Added, b[j]));
            j += 1;
        }
    }
    out.extend(a[i..].iter().map(|l| DiffLine::new(LineStatus::Removed, *l)));
    out.extend(b[j..].iter().map(|l| DiffLine::new(LineStatus::Added, *l)));
    out
}
