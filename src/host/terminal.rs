//! Terminal renderer for a [`HostTree`].
//!
//! Lays the tree out as lines and writes them inline with crossterm. Each
//! frame erases the previous one, so the output stays in the scrollback
//! position where it started.
//!
//! Layout rules:
//! - Block tags start a new line, indented by nesting
//! - Inline tags (`span`, `b`, `em`, `button`, ...) continue the line
//! - `li` gets a bullet, `button` is drawn as `[ label ]`
//! - `selected=true` draws reversed, `dim=true` draws dimmed

use std::io::{self, Write};

use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::queue;
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate};

use crate::patch::NodePayload;
use crate::types::{AttrValue, NodeId};
use super::HostTree;

const INLINE_TAGS: &[&str] = &["span", "b", "strong", "em", "i", "a", "label", "button", "code"];

/// Text style of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanStyle {
    pub reverse: bool,
    pub dim: bool,
    pub bold: bool,
}

/// A run of text with one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

/// One laid-out line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    pub indent: usize,
    pub spans: Vec<Span>,
}

impl Line {
    /// Plain text of the line, indentation included.
    pub fn plain(&self) -> String {
        let mut out = "  ".repeat(self.indent);
        for span in &self.spans {
            out.push_str(&span.text);
        }
        out
    }
}

/// Lay out `tree` as lines.
pub fn layout(tree: &HostTree) -> Vec<Line> {
    let mut lines = Vec::new();
    for child in tree.children(tree.container()) {
        layout_node(tree, *child, 0, SpanStyle::default(), &mut lines);
    }
    lines.retain(|line| !line.spans.is_empty());
    lines
}

fn layout_node(tree: &HostTree, id: NodeId, depth: usize, style: SpanStyle, lines: &mut Vec<Line>) {
    let Some(node) = tree.get(id) else {
        return;
    };
    match &node.payload {
        Some(NodePayload::Text(text)) => push_span(lines, depth, text.clone(), style),
        Some(NodePayload::Host { tag, attrs, .. }) => {
            let style = SpanStyle {
                reverse: style.reverse || flag(attrs.get("selected")),
                dim: style.dim || flag(attrs.get("dim")),
                bold: style.bold || matches!(tag.as_str(), "b" | "strong" | "h1" | "h2"),
            };
            let inline = INLINE_TAGS.contains(&tag.as_str());
            let child_depth = if inline { depth } else { depth + 1 };
            if !inline {
                lines.push(Line {
                    indent: depth,
                    spans: Vec::new(),
                });
            }
            match tag.as_str() {
                "li" => push_span(lines, depth, "• ".to_string(), style),
                "button" => push_span(lines, depth, "[ ".to_string(), style),
                _ => {}
            }
            for child in &node.children {
                layout_node(tree, *child, child_depth, style, lines);
            }
            if tag == "button" {
                push_span(lines, depth, " ]".to_string(), style);
            }
        }
        Some(NodePayload::Component { .. }) | None => {
            for child in &node.children {
                layout_node(tree, *child, depth, style, lines);
            }
        }
    }
}

// Text continues the current line; a block child opened after it starts a new one.
fn push_span(lines: &mut Vec<Line>, depth: usize, text: String, style: SpanStyle) {
    if lines.is_empty() {
        lines.push(Line {
            indent: depth,
            spans: Vec::new(),
        });
    }
    if let Some(line) = lines.last_mut() {
        match line.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(&text),
            _ => line.spans.push(Span { text, style }),
        }
    }
}

fn flag(value: Option<&AttrValue>) -> bool {
    matches!(value, Some(AttrValue::Bool(true)))
}

/// Inline terminal renderer.
///
/// Clears the previous frame and writes the new one.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    previous_height: u16,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a frame to `out`.
    pub fn render(&mut self, tree: &HostTree, out: &mut impl Write) -> io::Result<()> {
        let lines = layout(tree);

        queue!(out, BeginSynchronizedUpdate)?;
        if self.previous_height > 0 {
            queue!(out, MoveUp(self.previous_height))?;
        }
        queue!(out, MoveToColumn(0), Clear(ClearType::FromCursorDown))?;

        for line in &lines {
            queue!(out, Print("  ".repeat(line.indent)))?;
            for span in &line.spans {
                if span.style.reverse {
                    queue!(out, SetAttribute(Attribute::Reverse))?;
                }
                if span.style.dim {
                    queue!(out, SetAttribute(Attribute::Dim))?;
                }
                if span.style.bold {
                    queue!(out, SetAttribute(Attribute::Bold))?;
                }
                queue!(out, Print(&span.text), SetAttribute(Attribute::Reset))?;
            }
            queue!(out, Print("\r\n"))?;
        }

        queue!(out, EndSynchronizedUpdate)?;
        out.flush()?;

        self.previous_height = u16::try_from(lines.len()).unwrap_or(u16::MAX);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Runtime;
    use crate::primitives::h;

    fn host_for(root: crate::primitives::HostElement) -> HostTree {
        let mut runtime = Runtime::new();
        let mut host = HostTree::new(runtime.container());
        host.apply(&runtime.mount(root).unwrap().patch).unwrap();
        host
    }

    #[test]
    fn test_layout_lines() {
        let host = host_for(
            h("div")
                .child(h("h1").child("Shopping"))
                .child(
                    h("ul")
                        .child(h("li").key(1).child("Cabbage"))
                        .child(h("li").key(2).attr("selected", true).child("Garlic")),
                )
                .child(h("p").child("Total: ").child(h("b").child("2"))),
        );

        let plain: Vec<String> = layout(&host).iter().map(Line::plain).collect();
        assert_eq!(
            plain,
            vec!["  Shopping", "    • Cabbage", "    • Garlic", "  Total: 2"]
        );

        let lines = layout(&host);
        assert!(lines[2].spans.iter().all(|span| span.style.reverse));
        assert!(lines[3].spans.last().unwrap().style.bold);
    }

    #[test]
    fn test_button_is_bracketed() {
        let host = host_for(h("p").child(h("button").child("Add")));
        let plain: Vec<String> = layout(&host).iter().map(Line::plain).collect();
        assert_eq!(plain, vec!["[ Add ]"]);
    }

    #[test]
    fn test_render_writes_frame() {
        let host = host_for(h("p").child("hello"));
        let mut renderer = TerminalRenderer::new();
        let mut out = Vec::new();

        renderer.render(&host, &mut out).unwrap();
        let written = String::from_utf8_lossy(&out);
        assert!(written.contains("hello"));

        out.clear();
        renderer.render(&host, &mut out).unwrap();
        // Second frame moves up over the first (CSI 1 A).
        assert!(String::from_utf8_lossy(&out).contains("\u{1b}[1A"));
    }
}
