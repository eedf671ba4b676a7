//! DOT output for control flow graphs.
//!
//! The result can be rendered with Graphviz (`dot -Tpng`). Only the small subset
//! of the language needed to draw a CFG is produced: boxed nodes with multi-line
//! labels and solid, dashed or colored edges.

use std::fmt::Write;

/// Escapes a string for use inside a double-quoted DOT label.
///
/// # Examples
///
/// ```rust
/// use dexscope::utils::escape_dot;
///
/// assert_eq!(escape_dot("if (a < b)"), "if (a \\< b)");
/// assert_eq!(escape_dot("\"s\""), "\\\"s\\\"");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\l")
        .replace('\r', "")
        .replace('<', "\\<")
        .replace('>', "\\>")
        .replace('{', "\\{")
        .replace('}', "\\}")
}

/// Style of an edge in a DOT drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStyle {
    /// Unconditional flow.
    Normal,
    /// Branch taken when the condition holds.
    True,
    /// Branch taken when the condition fails.
    False,
    /// Exception handler edge.
    Exceptional,
}

impl EdgeStyle {
    fn attributes(self) -> &'static str {
        match self {
            EdgeStyle::Normal => "color=\"blue\"",
            EdgeStyle::True => "color=\"green\"",
            EdgeStyle::False => "color=\"red\"",
            EdgeStyle::Exceptional => "color=\"black\", style=\"dashed\"",
        }
    }
}

/// Incremental writer for a `digraph`.
#[derive(Debug)]
pub struct DotBuilder {
    out: String,
}

impl DotBuilder {
    /// Starts a digraph with the given name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut out = String::new();
        let _ = writeln!(out, "digraph \"{}\" {{", escape_dot(name));
        out.push_str("  node [shape=box, fontname=\"monospace\"];\n");
        DotBuilder { out }
    }

    /// Emits a node; `lines` become a left-aligned label.
    pub fn node<I, S>(&mut self, id: &str, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut label = String::new();
        for line in lines {
            label.push_str(&escape_dot(line.as_ref()));
            label.push_str("\\l");
        }
        let _ = writeln!(self.out, "  \"{}\" [label=\"{label}\"];", escape_dot(id));
    }

    /// Emits an edge.
    pub fn edge(&mut self, from: &str, to: &str, style: EdgeStyle) {
        let _ = writeln!(
            self.out,
            "  \"{}\" -> \"{}\" [{}];",
            escape_dot(from),
            escape_dot(to),
            style.attributes()
        );
    }

    /// Closes the graph and returns the DOT source.
    #[must_use]
    pub fn finish(mut self) -> String {
        self.out.push_str("}\n");
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_dot_plain() {
        assert_eq!(escape_dot("v0 = 1"), "v0 = 1");
    }

    #[test]
    fn test_escape_dot_quotes_and_backslash() {
        assert_eq!(escape_dot("s = \"a\\b\""), "s = \\\"a\\\\b\\\"");
    }

    #[test]
    fn test_escape_dot_newlines_left_aligned() {
        assert_eq!(escape_dot("a\r\nb"), "a\\lb");
    }

    #[test]
    fn test_escape_dot_record_characters() {
        assert_eq!(escape_dot("List<T>{}"), "List\\<T\\>\\{\\}");
    }

    #[test]
    fn test_builder_output() {
        let mut dot = DotBuilder::new("foo");
        dot.node("0-if", ["if (v0 > 0)"]);
        dot.node("1-ret", ["return"]);
        dot.edge("0-if", "1-ret", EdgeStyle::True);
        let text = dot.finish();

        assert!(text.starts_with("digraph \"foo\" {\n"));
        assert!(text.contains("\"0-if\" [label=\"if (v0 \\> 0)\\l\"];"));
        assert!(text.contains("\"0-if\" -> \"1-ret\" [color=\"green\"];"));
        assert!(text.ends_with("}\n"));
    }
}
