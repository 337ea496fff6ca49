//! Scanner for the file-level statements of a `.proto` file
//!
//! Only statements at brace depth zero are interpreted. Message, enum,
//! service and extend bodies are skipped with brace matching, so nested
//! options and fields never leak into the file description.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::error::{Error, Result};

use super::file::{Import, ImportKind, SourceFile, join_rel};

static SYNTAX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(syntax|edition)\s*=\s*(?:"([^"]*)"|'([^']*)')$"#).expect("valid syntax regex")
});

static PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^package\s+([A-Za-z_][A-Za-z0-9_]*(?:\s*\.\s*[A-Za-z_][A-Za-z0-9_]*)*)$")
        .expect("valid package regex")
});

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^import\s*(?:(public|weak)\s*)?(?:"([^"]*)"|'([^']*)')$"#).expect("valid import regex")
});

static OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^option\s+([A-Za-z_(][A-Za-z0-9_.()\s]*?)\s*=\s*(.+)$").expect("valid option regex")
});

const BLOCK_KEYWORDS: [&str; 4] = ["message", "enum", "service", "extend"];

/// A top-level statement with the line it starts on
#[derive(Debug, Clone, PartialEq)]
struct Statement {
    text: String,
    line: usize,
}

/// Parser for a single proto file
pub struct ProtoParser {
    rel: String,
    basename: String,
}

impl ProtoParser {
    pub fn new(rel: &str, basename: &str) -> Self {
        Self {
            rel: rel.to_string(),
            basename: basename.to_string(),
        }
    }

    /// Parse the file content into a [`SourceFile`]
    pub fn parse(&self, content: &str) -> Result<SourceFile> {
        let mut syntax = None;
        let mut package: Option<String> = None;
        let mut imports = Vec::new();
        let mut options = BTreeMap::new();

        for statement in self.scan(content)? {
            let text = statement.text.as_str();
            match leading_keyword(text) {
                "syntax" | "edition" => {
                    if syntax.is_some() {
                        return Err(self.error(statement.line, "duplicate syntax declaration"));
                    }
                    syntax = Some(self.parse_syntax(&statement)?);
                }
                "package" => {
                    let caps = PACKAGE_RE
                        .captures(text)
                        .ok_or_else(|| self.error(statement.line, "malformed package declaration"))?;
                    let name: String = caps[1].chars().filter(|c| !c.is_whitespace()).collect();
                    if let Some(previous) = &package {
                        return Err(self.error(
                            statement.line,
                            format!("duplicate package declaration {:?} (already {:?})", name, previous),
                        ));
                    }
                    package = Some(name);
                }
                "import" => {
                    let caps = IMPORT_RE
                        .captures(text)
                        .ok_or_else(|| self.error(statement.line, "malformed import statement"))?;
                    let path = caps
                        .get(2)
                        .or_else(|| caps.get(3))
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default();
                    if path.is_empty() {
                        return Err(self.error(statement.line, "empty import path"));
                    }
                    let kind = match caps.get(1).map(|m| m.as_str()) {
                        Some("public") => ImportKind::Public,
                        Some("weak") => ImportKind::Weak,
                        _ => ImportKind::Default,
                    };
                    imports.push(Import { path, kind });
                }
                "option" => {
                    let caps = OPTION_RE
                        .captures(text)
                        .ok_or_else(|| self.error(statement.line, "malformed option statement"))?;
                    let name: String = caps[1].chars().filter(|c| !c.is_whitespace()).collect();
                    let value = unquote(caps[2].trim());
                    if options.insert(name.clone(), value).is_some() {
                        return Err(self.error(
                            statement.line,
                            format!("option {:?} set more than once", name),
                        ));
                    }
                }
                other => {
                    return Err(self.error(
                        statement.line,
                        format!("unexpected top-level statement {:?}", other),
                    ));
                }
            }
        }

        tracing::debug!(
            "parsed {}: package={:?}, {} imports, {} options",
            join_rel(&self.rel, &self.basename),
            package,
            imports.len(),
            options.len()
        );

        Ok(SourceFile::from_parts(
            &self.rel,
            &self.basename,
            syntax,
            package,
            imports,
            options,
        ))
    }

    fn parse_syntax(&self, statement: &Statement) -> Result<String> {
        let caps = SYNTAX_RE
            .captures(&statement.text)
            .ok_or_else(|| self.error(statement.line, "malformed syntax declaration"))?;
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match &caps[1] {
            "syntax" if value == "proto2" || value == "proto3" => Ok(value.to_string()),
            "syntax" => Err(self.error(statement.line, format!("unsupported syntax {:?}", value))),
            _ if value.is_empty() => Err(self.error(statement.line, "empty edition")),
            _ => Ok(format!("edition {}", value)),
        }
    }

    /// Split the content into top-level statements
    fn scan(&self, content: &str) -> Result<Vec<Statement>> {
        let chars: Vec<char> = content.chars().collect();
        let mut statements = Vec::new();
        let mut buf = String::new();
        let mut start_line = 1;
        let mut line = 1;
        let mut depth = 0usize;
        let mut block_line = 1;
        // Inside the braces of an aggregate option value at file level
        let mut capture = false;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let keep = depth == 0 || capture;

            match c {
                '/' if chars.get(i + 1) == Some(&'/') => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                    continue;
                }
                '/' if chars.get(i + 1) == Some(&'*') => {
                    let open = line;
                    i += 2;
                    loop {
                        if i + 1 >= chars.len() {
                            return Err(self.error(open, "unterminated block comment"));
                        }
                        if chars[i] == '*' && chars[i + 1] == '/' {
                            i += 2;
                            break;
                        }
                        if chars[i] == '\n' {
                            line += 1;
                        }
                        i += 1;
                    }
                    if keep {
                        buf.push(' ');
                    }
                    continue;
                }
                '"' | '\'' => {
                    let open = line;
                    let mut literal = String::from(c);
                    i += 1;
                    loop {
                        match chars.get(i) {
                            None | Some('\n') => {
                                return Err(self.error(open, "unterminated string literal"));
                            }
                            Some('\\') => {
                                literal.push('\\');
                                match chars.get(i + 1) {
                                    None | Some('\n') => {
                                        return Err(self.error(open, "unterminated string literal"));
                                    }
                                    Some(&escaped) => literal.push(escaped),
                                }
                                i += 2;
                            }
                            Some(&q) if q == c => {
                                literal.push(q);
                                i += 1;
                                break;
                            }
                            Some(&other) => {
                                literal.push(other);
                                i += 1;
                            }
                        }
                    }
                    if keep {
                        if buf.trim().is_empty() {
                            start_line = open;
                        }
                        buf.push_str(&literal);
                    }
                    continue;
                }
                '{' => {
                    if depth == 0 {
                        let header = buf.trim();
                        if leading_keyword(header) == "option" {
                            capture = true;
                            buf.push('{');
                        } else {
                            self.check_block_header(header, line)?;
                            buf.clear();
                            block_line = line;
                        }
                    } else if capture {
                        buf.push('{');
                    }
                    depth += 1;
                }
                '}' => {
                    if depth == 0 {
                        return Err(self.error(line, "unbalanced '}'"));
                    }
                    depth -= 1;
                    if capture {
                        buf.push('}');
                        if depth == 0 {
                            capture = false;
                        }
                    }
                }
                ';' if depth == 0 => {
                    let text = buf.trim();
                    if !text.is_empty() {
                        statements.push(Statement {
                            text: text.to_string(),
                            line: start_line,
                        });
                    }
                    buf.clear();
                }
                _ => {
                    if keep {
                        if !c.is_whitespace() && buf.trim().is_empty() {
                            start_line = line;
                        }
                        buf.push(c);
                    }
                    if c == '\n' {
                        line += 1;
                    }
                }
            }
            i += 1;
        }

        if depth > 0 {
            return Err(self.error(block_line, "unterminated block, missing '}'"));
        }
        if !buf.trim().is_empty() {
            return Err(self.error(start_line, "expected ';'"));
        }
        Ok(statements)
    }

    fn check_block_header(&self, header: &str, line: usize) -> Result<()> {
        let keyword = leading_keyword(header);
        if header.is_empty() {
            Err(self.error(line, "unexpected '{'"))
        } else if !BLOCK_KEYWORDS.contains(&keyword) {
            Err(self.error(line, format!("unexpected block {:?}", header)))
        } else {
            Ok(())
        }
    }

    fn error(&self, line: usize, message: impl Into<String>) -> Error {
        Error::ProtoParse {
            file: join_rel(&self.rel, &self.basename),
            line,
            message: message.into(),
        }
    }
}

fn leading_keyword(text: &str) -> &str {
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    &text[..end]
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
        && !value[1..value.len() - 1].contains(bytes[0] as char)
    {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}
