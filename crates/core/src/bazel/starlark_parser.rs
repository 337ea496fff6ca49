//! BUILD file syntax trees via tree-sitter-starlark

use crate::error::{Error, Result};
use tree_sitter::{Node, Parser, Tree};

pub struct StarlarkParser {
    parser: Parser,
}

impl StarlarkParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_starlark::LANGUAGE.into())
            .map_err(|e| Error::BuildFileParse(format!("cannot load Starlark grammar: {}", e)))?;
        Ok(Self { parser })
    }

    /// Parse BUILD file content; any syntax error rejects the whole file
    pub fn parse_build_file(&mut self, content: &str) -> Result<StarlarkAst> {
        let tree = self
            .parser
            .parse(content, None)
            .ok_or_else(|| Error::BuildFileParse("parser produced no tree".to_string()))?;

        if let Some(node) = first_error(tree.root_node()) {
            let position = node.start_position();
            return Err(Error::BuildFileParse(format!(
                "syntax error at line {}, column {}",
                position.row + 1,
                position.column + 1
            )));
        }

        Ok(StarlarkAst {
            tree,
            source: content.to_string(),
        })
    }
}

/// Depth-first search for the first `ERROR` or missing node
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error).or(Some(node))
}

/// A parsed BUILD file and the text it came from
pub struct StarlarkAst {
    pub tree: Tree,
    pub source: String,
}

impl StarlarkAst {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn node_text<'a>(&'a self, node: &Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }
}
