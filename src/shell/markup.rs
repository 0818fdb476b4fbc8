//! Turns unit markup into wrapped terminal lines

use std::rc::Rc;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Heading,
    Paragraph,
    Preformatted,
}

/// One block-level run of text in document order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextBlock {
    pub kind: BlockKind,
    pub text: String,
}

/// A display line after wrapping. Blank separator lines have empty text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkupLine {
    pub kind: BlockKind,
    pub text: String,
}

const SKIPPED: &[&str] = &["head", "script", "style", "title"];
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "header", "hr", "li", "main", "nav", "ol", "p", "section", "table", "tr",
    "ul",
];

pub fn extract_blocks(html: &str) -> Vec<TextBlock> {
    let dom = match parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
    {
        Ok(dom) => dom,
        Err(e) => {
            log::warn!("Failed to parse unit markup: {e}");
            return vec![TextBlock {
                kind: BlockKind::Preformatted,
                text: html.to_string(),
            }];
        }
    };

    let mut collector = BlockCollector::default();
    collector.visit(&dom.document);
    collector.flush();
    collector.blocks
}

/// Wrap blocks to `width` columns with a blank line between blocks
pub fn markup_to_lines(html: &str, width: usize) -> Vec<MarkupLine> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for (i, block) in extract_blocks(html).into_iter().enumerate() {
        if i > 0 {
            lines.push(MarkupLine {
                kind: block.kind,
                text: String::new(),
            });
        }
        let wrapped = match block.kind {
            BlockKind::Preformatted => hard_wrap(&block.text, width),
            BlockKind::Heading | BlockKind::Paragraph => word_wrap(&block.text, width),
        };
        lines.extend(wrapped.into_iter().map(|text| MarkupLine {
            kind: block.kind,
            text,
        }));
    }

    lines
}

#[derive(Default)]
struct BlockCollector {
    blocks: Vec<TextBlock>,
    current: String,
    kind: Option<BlockKind>,
}

impl BlockCollector {
    fn visit(&mut self, node: &Handle) {
        match &node.data {
            NodeData::Document => self.visit_children(node),
            NodeData::Text { contents } => self.push_text(&contents.borrow()),
            NodeData::Element { name, .. } => {
                let tag: &str = &name.local;
                match tag {
                    t if SKIPPED.contains(&t) => {}
                    "br" => self.flush(),
                    "pre" => {
                        self.flush();
                        let mut raw = String::new();
                        collect_raw_text(node, &mut raw);
                        let raw = raw.trim_end_matches('\n');
                        if !raw.is_empty() {
                            self.blocks.push(TextBlock {
                                kind: BlockKind::Preformatted,
                                text: raw.to_string(),
                            });
                        }
                    }
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                        self.flush();
                        self.kind = Some(BlockKind::Heading);
                        self.visit_children(node);
                        self.flush();
                    }
                    t if BLOCKS.contains(&t) => {
                        self.flush();
                        self.visit_children(node);
                        self.flush();
                    }
                    _ => self.visit_children(node),
                }
            }
            _ => {}
        }
    }

    fn visit_children(&mut self, node: &Handle) {
        for child in node.children.borrow().iter() {
            self.visit(child);
        }
    }

    fn push_text(&mut self, text: &str) {
        let mut words = text.split_whitespace().peekable();
        if words.peek().is_none() {
            if !text.is_empty() && !self.current.is_empty() && !self.current.ends_with(' ') {
                self.current.push(' ');
            }
            return;
        }
        if text.starts_with(char::is_whitespace)
            && !self.current.is_empty()
            && !self.current.ends_with(' ')
        {
            self.current.push(' ');
        }
        let collapsed: Vec<&str> = words.collect();
        self.current.push_str(&collapsed.join(" "));
        if text.ends_with(char::is_whitespace) {
            self.current.push(' ');
        }
    }

    fn flush(&mut self) {
        let text = self.current.trim();
        if !text.is_empty() {
            self.blocks.push(TextBlock {
                kind: self.kind.unwrap_or(BlockKind::Paragraph),
                text: text.to_string(),
            });
        }
        self.current.clear();
        self.kind = None;
    }
}

fn collect_raw_text(node: &Rc<markup5ever_rcdom::Node>, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { name, .. } if &*name.local == "br" => out.push('\n'),
        _ => {
            for child in node.children.borrow().iter() {
                collect_raw_text(child, out);
            }
        }
    }
}

fn word_wrap(text: &str, width: usize) -> Vec<String> {
    textwrap::wrap(text, width)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

/// Keep every source line; long ones are wrapped to `width` columns
fn hard_wrap(text: &str, width: usize) -> Vec<String> {
    let options = textwrap::Options::new(width).break_words(true);
    text.split('\n')
        .flat_map(|source_line| {
            if source_line.is_empty() {
                return vec![String::new()];
            }
            textwrap::wrap(source_line, &options)
                .into_iter()
                .map(|line| line.into_owned())
                .collect()
        })
        .collect()
}
