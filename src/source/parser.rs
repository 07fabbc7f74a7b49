//! Function spans from source text, via tree-sitter.
//!
//! Function definitions are collected in document order, so spans come out
//! in ascending start line order. Bodies are not descended into: a nested
//! function belongs to its enclosing span.

use std::path::Path;

use tracing::debug;
use tree_sitter::{Language, Node, Parser};

use crate::attribution::SpanParser;
use crate::error::ParseError;
use crate::models::FunctionSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    C,
    Cpp,
    Python,
}

impl SourceLanguage {
    /// Grammar for a path, `None` for code files without one (shell, perl, fortran).
    pub fn for_path(path: &str) -> Option<Self> {
        let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "c" | "h" => Some(SourceLanguage::C),
            "cpp" | "c++" | "cc" | "cxx" | "hpp" | "hh" | "cs++" => Some(SourceLanguage::Cpp),
            "py" => Some(SourceLanguage::Python),
            _ => None,
        }
    }

    fn grammar(self) -> Language {
        match self {
            SourceLanguage::C => tree_sitter_c::LANGUAGE.into(),
            SourceLanguage::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            SourceLanguage::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterParser;

impl TreeSitterParser {
    pub fn new() -> Self {
        Self
    }

    /// Function definitions in `content`, tagged with `path` as file name.
    pub fn functions(&self, path: &str, content: &str) -> Result<Vec<FunctionSpan>, ParseError> {
        let Some(language) = SourceLanguage::for_path(path) else {
            debug!("no grammar for {}, no functions extracted", path);
            return Ok(Vec::new());
        };

        let mut parser = Parser::new();
        parser
            .set_language(&language.grammar())
            .map_err(|e| ParseError::Grammar(format!("{}: {}", path, e)))?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ParseError::MalformedSourceForFunctionParsing(path.to_string()))?;

        let root = tree.root_node();
        if root.kind() == "ERROR" {
            return Err(ParseError::MalformedSourceForFunctionParsing(path.to_string()));
        }

        let source = content.as_bytes();
        let mut spans = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.kind() == "function_definition" {
                if let Some(name) = function_name(language, node, source) {
                    let mut span = FunctionSpan::new(name, start_line(node), end_line(node));
                    span.file_name = path.to_string();
                    spans.push(span);
                }
                continue;
            }
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }

        Ok(spans)
    }
}

impl SpanParser for TreeSitterParser {
    fn spans(&self, path: &str, content: &str) -> Result<Vec<FunctionSpan>, ParseError> {
        self.functions(path, content)
    }
}

fn start_line(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

fn end_line(node: Node) -> u32 {
    let end = node.end_position();
    // a node ending at column 0 ends on the previous line
    if end.column == 0 && end.row > node.start_position().row {
        end.row as u32
    } else {
        end.row as u32 + 1
    }
}

fn function_name(language: SourceLanguage, node: Node, source: &[u8]) -> Option<String> {
    let name_node = match language {
        SourceLanguage::Python => node.child_by_field_name("name")?,
        SourceLanguage::C | SourceLanguage::Cpp => {
            // the name sits under the innermost function declarator, below any
            // pointer, reference or parenthesized wrappers
            let mut current = node.child_by_field_name("declarator")?;
            let mut innermost = None;
            while current.kind().ends_with("declarator") {
                if current.kind() == "function_declarator" {
                    innermost = Some(current);
                }
                current = match current.child_by_field_name("declarator") {
                    Some(inner) => inner,
                    None => current.named_child(current.named_child_count().checked_sub(1)?)?,
                };
            }
            innermost?.child_by_field_name("declarator")?
        }
    };
    name_node
        .utf8_text(source)
        .ok()
        .map(|name| name.to_string())
}
