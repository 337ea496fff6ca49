//! BUILD file support using proper Starlark parsing

pub mod label;
pub mod rule_extractor;
pub mod starlark_parser;

pub use label::Label;
pub use rule_extractor::{
    AttributeValue, BuildFileContents, ByteSpan, GlobPattern, LoadStatement, RawDirective,
    RuleCall, RuleExtractor,
};
pub use starlark_parser::{StarlarkAst, StarlarkParser};

use crate::error::Result;

/// Parse BUILD file content and extract its rules, loads and directives
pub fn read_build_file(content: &str) -> Result<BuildFileContents> {
    let mut parser = StarlarkParser::new()?;
    let ast = parser.parse_build_file(content)?;
    RuleExtractor::extract(&ast)
}
