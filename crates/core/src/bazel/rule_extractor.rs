//! Extract rule calls, load statements and directives from a Starlark AST

use crate::error::Result;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tree_sitter::{Node, TreeCursor};

use super::starlark_parser::StarlarkAst;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#\s*gazelle:([A-Za-z0-9_]+)\s*(.*)$").expect("valid directive regex")
});

/// A rule call in a BUILD file
#[derive(Debug, Clone)]
pub struct RuleCall {
    pub rule_type: String,
    pub name: String,
    pub attributes: HashMap<String, AttributeValue>,
    pub location: SourceLocation,
    /// Byte range of the call expression in the BUILD file
    pub span: ByteSpan,
}

impl RuleCall {
    /// String entries of a list attribute, or the single string value
    pub fn attr_strings(&self, name: &str) -> Vec<String> {
        match self.attributes.get(name) {
            Some(AttributeValue::List(items)) => items.clone(),
            Some(AttributeValue::String(value)) | Some(AttributeValue::Label(value)) => {
                vec![value.clone()]
            }
            _ => Vec::new(),
        }
    }
}

/// Attribute values in rule calls
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    List(Vec<String>),
    Label(String),
    Glob(GlobPattern),
    Boolean(bool),
}

/// Glob pattern (e.g., glob(["*.proto"], exclude = ["skip.proto"]))
#[derive(Debug, Clone, PartialEq)]
pub struct GlobPattern {
    pub patterns: Vec<String>,
    pub exclude: Vec<String>,
}

/// Source location in the BUILD file
#[derive(Debug, Clone)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSpan {
    pub start: usize,
    pub end: usize,
}

/// A `load("<module>", "<symbol>", alias = "<symbol>")` statement
#[derive(Debug, Clone, PartialEq)]
pub struct LoadStatement {
    pub module: String,
    /// Names bound in the BUILD file
    pub symbols: Vec<String>,
    pub span: ByteSpan,
}

/// A `# gazelle:<key> <value>` comment
#[derive(Debug, Clone, PartialEq)]
pub struct RawDirective {
    pub key: String,
    pub value: String,
    pub line: usize,
}

/// Everything protogen reads from one BUILD file
#[derive(Debug, Clone, Default)]
pub struct BuildFileContents {
    pub rules: Vec<RuleCall>,
    pub loads: Vec<LoadStatement>,
    pub directives: Vec<RawDirective>,
}

impl BuildFileContents {
    /// Whether any load statement already binds `symbol`
    pub fn loads_symbol(&self, symbol: &str) -> bool {
        self.loads.iter().any(|load| load.symbols.iter().any(|s| s == symbol))
    }
}

/// Extracts rule calls from Starlark AST
pub struct RuleExtractor;

impl RuleExtractor {
    /// Extract rules, loads and directives from the AST
    pub fn extract(ast: &StarlarkAst) -> Result<BuildFileContents> {
        let mut contents = BuildFileContents::default();
        let mut cursor = ast.tree.walk();

        Self::visit_node(&mut cursor, ast, &mut contents)?;

        Ok(contents)
    }

    /// Extract all rule calls from the AST
    pub fn extract_rules(ast: &StarlarkAst) -> Result<Vec<RuleCall>> {
        Ok(Self::extract(ast)?.rules)
    }

    /// Recursively visit nodes looking for top-level calls and comments
    fn visit_node(
        cursor: &mut TreeCursor,
        ast: &StarlarkAst,
        contents: &mut BuildFileContents,
    ) -> Result<()> {
        let node = cursor.node();

        match node.kind() {
            "call" if is_statement(&node) => {
                if let Some(load) = Self::extract_load(&node, ast) {
                    contents.loads.push(load);
                } else if let Some(rule) = Self::extract_rule_call(&node, ast)? {
                    contents.rules.push(rule);
                }
            }
            "comment" => {
                if let Some(caps) = DIRECTIVE_RE.captures(ast.node_text(&node).trim_end()) {
                    contents.directives.push(RawDirective {
                        key: caps[1].to_string(),
                        value: caps[2].trim().to_string(),
                        line: node.start_position().row + 1,
                    });
                }
            }
            _ => {}
        }

        // Visit children
        if cursor.goto_first_child() {
            loop {
                Self::visit_node(cursor, ast, contents)?;
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
            cursor.goto_parent();
        }

        Ok(())
    }

    fn extract_load(node: &Node, ast: &StarlarkAst) -> Option<LoadStatement> {
        let function_node = node.child_by_field_name("function")?;
        if ast.node_text(&function_node) != "load" {
            return None;
        }

        let args_node = node.child_by_field_name("arguments")?;
        let mut module = None;
        let mut symbols = Vec::new();
        let mut cursor = args_node.walk();

        for child in args_node.named_children(&mut cursor) {
            match child.kind() {
                "string" => {
                    let value = unquote(ast.node_text(&child));
                    if module.is_none() {
                        module = Some(value);
                    } else {
                        symbols.push(value);
                    }
                }
                "keyword_argument" => {
                    if let Some(name_node) = child.child_by_field_name("name") {
                        symbols.push(ast.node_text(&name_node).to_string());
                    }
                }
                _ => {}
            }
        }

        Some(LoadStatement {
            module: module?,
            symbols,
            span: span_of(node),
        })
    }

    /// Extract a rule call from a call node
    fn extract_rule_call(node: &Node, ast: &StarlarkAst) -> Result<Option<RuleCall>> {
        let Some(function_node) = node.child_by_field_name("function") else {
            return Ok(None);
        };
        let rule_type = ast.node_text(&function_node);

        let mut attributes = HashMap::new();
        if let Some(args_node) = node.child_by_field_name("arguments") {
            Self::extract_arguments(&args_node, ast, &mut attributes)?;
        }

        // Calls without a name (package(), exports_files(), ...) are not rules
        let name = match attributes.get("name") {
            Some(AttributeValue::String(name)) => name.clone(),
            _ => return Ok(None),
        };

        let location = SourceLocation {
            line: node.start_position().row + 1,
            column: node.start_position().column,
        };

        Ok(Some(RuleCall {
            rule_type: rule_type.to_string(),
            name,
            attributes,
            location,
            span: span_of(node),
        }))
    }

    /// Extract arguments from an arguments node
    fn extract_arguments(
        node: &Node,
        ast: &StarlarkAst,
        attributes: &mut HashMap<String, AttributeValue>,
    ) -> Result<()> {
        let mut cursor = node.walk();

        if cursor.goto_first_child() {
            loop {
                let child = cursor.node();

                if child.kind() == "keyword_argument" {
                    if let (Some(name_node), Some(value_node)) = (
                        child.child_by_field_name("name"),
                        child.child_by_field_name("value"),
                    ) {
                        let name = ast.node_text(&name_node);
                        if let Some(value) = Self::extract_value(&value_node, ast)? {
                            attributes.insert(name.to_string(), value);
                        }
                    }
                }

                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Extract a value from a node
    fn extract_value(node: &Node, ast: &StarlarkAst) -> Result<Option<AttributeValue>> {
        match node.kind() {
            "string" => Ok(Some(AttributeValue::String(unquote(ast.node_text(node))))),

            "list" => {
                let mut items = Vec::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if child.kind() == "string" {
                        items.push(unquote(ast.node_text(&child)));
                    }
                }
                Ok(Some(AttributeValue::List(items)))
            }

            "call" => {
                // Only glob() is understood; select() and macros are skipped
                if let Some(func_node) = node.child_by_field_name("function") {
                    if ast.node_text(&func_node) == "glob" {
                        return Self::extract_glob_pattern(node, ast);
                    }
                }
                Ok(None)
            }

            "true" => Ok(Some(AttributeValue::Boolean(true))),
            "false" => Ok(Some(AttributeValue::Boolean(false))),

            "binary_expression" => {
                // ["a.proto"] + glob([...]) keeps the literal list part
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if child.kind() == "list" {
                        return Self::extract_value(&child, ast);
                    }
                }
                Ok(None)
            }

            _ => {
                let text = ast.node_text(node);
                if text.starts_with(':') || text.starts_with("//") || text.starts_with('@') {
                    Ok(Some(AttributeValue::Label(text.to_string())))
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Extract a glob pattern
    fn extract_glob_pattern(node: &Node, ast: &StarlarkAst) -> Result<Option<AttributeValue>> {
        let mut patterns = Vec::new();
        let mut exclude = Vec::new();

        if let Some(args_node) = node.child_by_field_name("arguments") {
            let mut cursor = args_node.walk();
            for child in args_node.named_children(&mut cursor) {
                match child.kind() {
                    "list" => {
                        if let Some(AttributeValue::List(items)) = Self::extract_value(&child, ast)? {
                            patterns = items;
                        }
                    }
                    "keyword_argument" => {
                        let is_exclude = child
                            .child_by_field_name("name")
                            .is_some_and(|n| ast.node_text(&n) == "exclude");
                        if let (true, Some(value)) = (is_exclude, child.child_by_field_name("value")) {
                            if let Some(AttributeValue::List(items)) = Self::extract_value(&value, ast)? {
                                exclude = items;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(Some(AttributeValue::Glob(GlobPattern { patterns, exclude })))
    }
}

fn is_statement(node: &Node) -> bool {
    node.parent()
        .is_some_and(|parent| parent.kind() == "expression_statement")
}

fn span_of(node: &Node) -> ByteSpan {
    ByteSpan {
        start: node.start_byte(),
        end: node.end_byte(),
    }
}

fn unquote(text: &str) -> String {
    text.trim_matches('"').trim_matches('\'').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bazel::StarlarkParser;

    fn extract(content: &str) -> BuildFileContents {
        let mut parser = StarlarkParser::new().unwrap();
        let ast = parser.parse_build_file(content).unwrap();
        RuleExtractor::extract(&ast).unwrap()
    }

    #[test]
    fn test_extract_simple_rules() {
        let content = r#"
proto_library(
    name = "foo_proto",
    srcs = ["foo.proto"],
    deps = [":dep1", "//other:dep2"],
)

go_proto_library(
    name = "foo_go",
    proto = ":foo_proto",
)
"#;

        let rules = extract(content).rules;

        assert_eq!(rules.len(), 2);

        assert_eq!(rules[0].rule_type, "proto_library");
        assert_eq!(rules[0].name, "foo_proto");
        assert_eq!(rules[0].attr_strings("srcs"), vec!["foo.proto"]);
        assert_eq!(rules[0].location.line, 2);

        assert_eq!(rules[1].rule_type, "go_proto_library");
        assert_eq!(rules[1].name, "foo_go");
        assert_eq!(rules[1].attr_strings("proto"), vec![":foo_proto"]);
    }

    #[test]
    fn test_span_covers_the_call() {
        let content = "proto_library(\n    name = \"x_proto\",\n)\n";
        let rules = extract(content).rules;
        let span = rules[0].span;
        assert_eq!(span.start, 0);
        assert_eq!(&content[span.start..span.end], "proto_library(\n    name = \"x_proto\",\n)");
    }

    #[test]
    fn test_extract_glob_pattern() {
        let content = r#"
proto_library(
    name = "all_proto",
    srcs = glob(["*.proto"], exclude = ["internal.proto"]),
)
"#;

        let rules = extract(content).rules;

        assert_eq!(rules.len(), 1);
        if let Some(AttributeValue::Glob(glob)) = rules[0].attributes.get("srcs") {
            assert_eq!(glob.patterns, vec!["*.proto"]);
            assert_eq!(glob.exclude, vec!["internal.proto"]);
        } else {
            panic!("Expected glob pattern for srcs");
        }
    }

    #[test]
    fn test_extract_loads_and_directives() {
        let content = r#"
load("//rules:go_proto_library.bzl", "go_proto_library")
load("@rules_proto//proto:defs.bzl", pl = "proto_library")

# gazelle:proto_plugin go grpc_go
# gazelle:proto_language   go
# plain comment

package(default_visibility = ["//visibility:public"])
"#;

        let contents = extract(content);

        assert_eq!(contents.loads.len(), 2);
        assert_eq!(contents.loads[0].module, "//rules:go_proto_library.bzl");
        assert_eq!(contents.loads[0].symbols, vec!["go_proto_library"]);
        assert!(contents.loads_symbol("pl"));
        assert!(!contents.loads_symbol("py_proto_library"));

        assert_eq!(
            contents.directives,
            vec![
                RawDirective { key: "proto_plugin".into(), value: "go grpc_go".into(), line: 5 },
                RawDirective { key: "proto_language".into(), value: "go".into(), line: 6 },
            ]
        );
        // package() has no name attribute and is not a rule
        assert!(contents.rules.is_empty());
    }
}
