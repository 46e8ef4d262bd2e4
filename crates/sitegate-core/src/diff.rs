//! Line diff between two text artifacts, with a navigable context window.
//!
//! Texts are compared position by position after normalization. This is not
//! an LCS diff: an inserted line shifts every following position.

use std::fmt::Write as _;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTEXT_RADIUS: usize = 20;

lazy_static! {
    static ref BLANK_RUN: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Unify line endings, trim the whole text and collapse runs of blank lines.
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n");
    BLANK_RUN.replace_all(unified.trim(), "\n\n").into_owned()
}

/// Normalized texts of both sides plus the positions where they differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub a: String,
    pub b: String,
    /// 0-based line indices, ascending.
    pub diffs: Vec<usize>,
}

impl DiffResult {
    pub fn is_match(&self) -> bool {
        self.diffs.is_empty()
    }

    pub fn a_lines(&self) -> Vec<&str> {
        self.a.split('\n').collect()
    }

    pub fn b_lines(&self) -> Vec<&str> {
        self.b.split('\n').collect()
    }
}

pub fn compute_diff(a: &str, b: &str) -> DiffResult {
    let a = normalize(a);
    let b = normalize(b);
    let diffs = diff_indices(&split_lines(&a), &split_lines(&b));
    DiffResult { a, b, diffs }
}

fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Positions where the two sequences differ; a missing line compares as "".
pub fn diff_indices(a: &[&str], b: &[&str]) -> Vec<usize> {
    let max = a.len().max(b.len());
    (0..max)
        .filter(|&i| a.get(i).copied().unwrap_or("") != b.get(i).copied().unwrap_or(""))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextLine {
    /// 1-based line number.
    pub n: usize,
    pub text: String,
    pub is_center: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    pub start: usize,
    pub end: usize,
    pub lines: Vec<ContextLine>,
}

impl ContextWindow {
    /// `## {title}` followed by one right-aligned, center-marked row per line.
    pub fn render(&self, title: &str) -> String {
        let mut out = format!("## {}\n", title);
        for line in &self.lines {
            let mark = if line.is_center { '>' } else { ' ' };
            let _ = writeln!(out, "{:>6} {} {}", line.n, mark, line.text);
        }
        out
    }
}

/// Inclusive window of `radius` lines around `center`, clamped to the input.
/// An empty input yields a single empty center line.
pub fn build_context<S: AsRef<str>>(lines: &[S], center: usize, radius: usize) -> ContextWindow {
    if lines.is_empty() {
        return ContextWindow {
            start: 0,
            end: 0,
            lines: vec![ContextLine {
                n: 1,
                text: String::new(),
                is_center: true,
            }],
        };
    }
    let center = center.min(lines.len() - 1);
    let start = center.saturating_sub(radius);
    let end = center.saturating_add(radius).min(lines.len() - 1);
    let lines = (start..=end)
        .map(|i| ContextLine {
            n: i + 1,
            text: lines[i].as_ref().to_string(),
            is_center: i == center,
        })
        .collect();
    ContextWindow { start, end, lines }
}

/// One comparison under review: the diff plus a cursor over its positions.
#[derive(Debug, Clone)]
pub struct DiffSession {
    result: DiffResult,
    a_label: String,
    b_label: String,
    pos: usize,
    radius: usize,
}

impl DiffSession {
    pub fn new(a: &str, b: &str) -> Self {
        Self {
            result: compute_diff(a, b),
            a_label: "A".to_string(),
            b_label: "B".to_string(),
            pos: 0,
            radius: DEFAULT_CONTEXT_RADIUS,
        }
    }

    pub fn with_labels(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.a_label = a.into();
        self.b_label = b.into();
        self
    }

    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }

    pub fn result(&self) -> &DiffResult {
        &self.result
    }

    pub fn diff_count(&self) -> usize {
        self.result.diffs.len()
    }

    pub fn is_match(&self) -> bool {
        self.result.is_match()
    }

    /// 0-based cursor into the diff list.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Line index under the cursor.
    pub fn current_line(&self) -> Option<usize> {
        self.result.diffs.get(self.pos).copied()
    }

    fn clamp(&self, pos: usize) -> usize {
        pos.min(self.diff_count().saturating_sub(1))
    }

    pub fn next(&mut self) -> usize {
        self.pos = self.clamp(self.pos.saturating_add(1));
        self.pos
    }

    pub fn previous(&mut self) -> usize {
        self.pos = self.clamp(self.pos.saturating_sub(1));
        self.pos
    }

    /// Jump to the `n`th diff (1-based). No-op when there are no diffs.
    pub fn jump_to(&mut self, n: usize) -> usize {
        if self.diff_count() > 0 {
            self.pos = n.clamp(1, self.diff_count()) - 1;
        }
        self.pos
    }

    pub fn label(&self) -> String {
        match self.current_line() {
            None => "No diffs".to_string(),
            Some(line) => format!("Diff {} / {} (line {})", self.pos + 1, self.diff_count(), line + 1),
        }
    }

    /// Context windows for side A and side B around the current diff.
    pub fn context(&self) -> (ContextWindow, ContextWindow) {
        let center = self.current_line().unwrap_or(0);
        (
            build_context(&self.result.a_lines(), center, self.radius),
            build_context(&self.result.b_lines(), center, self.radius),
        )
    }

    /// Shareable text block for the current diff.
    pub fn diff_block(&self, project_id: &str, kind: &str) -> String {
        let (a_ctx, b_ctx) = self.context();
        let (pos, line) = match self.current_line() {
            Some(line) => ((self.pos + 1).to_string(), (line + 1).to_string()),
            None => ("0".to_string(), "-".to_string()),
        };
        let mut out = String::from("# DIFF BLOCK\n");
        let _ = writeln!(out, "projectId: {}", project_id);
        let _ = writeln!(out, "kind: {}", kind);
        let _ = writeln!(out, "diff: {} / {}", pos, self.diff_count());
        let _ = writeln!(out, "line: {}", line);
        let _ = writeln!(out, "contextLines: {}", self.radius);
        let _ = writeln!(out, "A: {}", self.a_label);
        let _ = writeln!(out, "B: {}", self.b_label);
        out.push('\n');
        out.push_str(&a_ctx.render(&self.a_label));
        out.push('\n');
        out.push_str(&b_ctx.render(&self.b_label));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace_churn() {
        assert_eq!(normalize("a\r\nb\r\n"), "a\nb");
        assert_eq!(normalize("\n\na\n\n\n\n\nb  \n"), "a\n\nb");
        assert_eq!(normalize("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_single_changed_line() {
        let diff = compute_diff("A\nB\nC", "A\nX\nC");
        assert_eq!(diff.diffs, vec![1]);

        let ctx = build_context(&diff.a_lines(), 1, 1);
        assert_eq!((ctx.start, ctx.end), (0, 2));
        let centers: Vec<bool> = ctx.lines.iter().map(|l| l.is_center).collect();
        assert_eq!(centers, vec![false, true, false]);
        assert_eq!(ctx.lines[1].n, 2);
        assert_eq!(ctx.lines[1].text, "B");
    }

    #[test]
    fn test_diff_empty_iff_normalized_equal() {
        let cases = [
            ("a\nb", "a\r\nb\n"),
            ("a\n\n\n\nb", "a\n\nb"),
            ("a", "b"),
            ("", "x"),
            ("same", "same"),
        ];
        for (a, b) in cases {
            let diff = compute_diff(a, b);
            assert_eq!(diff.is_match(), normalize(a) == normalize(b), "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn test_diff_is_symmetric_in_length() {
        let pairs = [("a\nb\nc\nd", "a\nx"), ("", "one\ntwo"), ("p\nq", "q\np\nr")];
        for (a, b) in pairs {
            assert_eq!(compute_diff(a, b).diffs.len(), compute_diff(b, a).diffs.len());
        }
    }

    #[test]
    fn test_missing_lines_differ_against_empty() {
        let diff = compute_diff("a\nb\nc", "a");
        assert_eq!(diff.diffs, vec![1, 2]);
    }

    #[test]
    fn test_build_context_clamps() {
        let lines = ["l1", "l2", "l3"];
        let ctx = build_context(&lines, 99, 1);
        assert_eq!((ctx.start, ctx.end), (1, 2));
        assert!(ctx.lines[1].is_center);
        assert_eq!(build_context(&lines, 99, 1), ctx);

        let empty: [&str; 0] = [];
        let ctx = build_context(&empty, 5, 3);
        assert_eq!(ctx.lines.len(), 1);
        assert!(ctx.lines[0].is_center);
        assert_eq!(ctx.lines[0].n, 1);
    }

    #[test]
    fn test_navigation_clamps_without_wrap() {
        let mut s = DiffSession::new("a\nb\nc\nd", "x\nb\ny\nz");
        assert_eq!(s.diff_count(), 3);
        assert_eq!(s.previous(), 0);
        assert_eq!(s.next(), 1);
        assert_eq!(s.previous(), 0);
        s.next();
        s.next();
        assert_eq!(s.next(), 2);
        assert_eq!(s.jump_to(0), 0);
        assert_eq!(s.jump_to(2), 1);
        assert_eq!(s.jump_to(40), 2);
        assert_eq!(s.label(), "Diff 3 / 3 (line 4)");
    }

    #[test]
    fn test_navigation_on_match_is_noop() {
        let mut s = DiffSession::new("same", "same\n");
        assert!(s.is_match());
        assert_eq!(s.next(), 0);
        assert_eq!(s.jump_to(3), 0);
        assert_eq!(s.label(), "No diffs");
    }

    #[test]
    fn test_diff_block_format() {
        let s = DiffSession::new("A\nB\nC", "A\nX\nC")
            .with_labels("generated", "published")
            .with_radius(1);
        let block = s.diff_block("acme", "html");
        assert!(block.starts_with("# DIFF BLOCK\nprojectId: acme\nkind: html\n"));
        assert!(block.contains("diff: 1 / 1\nline: 2\ncontextLines: 1\n"));
        assert!(block.contains("## generated\n     1   A\n     2 > B\n     3   C\n"));
        assert!(block.contains("## published\n     1   A\n     2 > X\n"));
    }
}
