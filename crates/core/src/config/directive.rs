//! `# gazelle:proto_*` directives

use crate::bazel::RawDirective;
use crate::error::{Error, Result};

pub const LANGUAGE_DIRECTIVE: &str = "proto_language";
pub const PLUGIN_DIRECTIVE: &str = "proto_plugin";
pub const RULE_DIRECTIVE: &str = "proto_rule";

/// Directive keys this extension understands
pub const KNOWN_DIRECTIVES: [&str; 3] = [LANGUAGE_DIRECTIVE, PLUGIN_DIRECTIVE, RULE_DIRECTIVE];

const DIRECTIVE_NAMESPACE: &str = "proto_";

/// How a list directive changes the inherited value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListUpdate {
    /// `name ...`: exactly these entries
    Replace(Vec<String>),
    /// `+name -name ...`: changes to the inherited entries
    Edit { add: Vec<String>, remove: Vec<String> },
    /// `all`: every registered entry
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Language(ListUpdate),
    Plugin(ListUpdate),
    Rule(String),
}

impl Directive {
    pub fn parse(key: &str, value: &str) -> Result<Self> {
        match key {
            LANGUAGE_DIRECTIVE => Ok(Directive::Language(parse_list(key, value)?)),
            PLUGIN_DIRECTIVE => Ok(Directive::Plugin(parse_list(key, value)?)),
            RULE_DIRECTIVE => {
                let mut words = value.split_whitespace();
                match (words.next(), words.next()) {
                    (Some(kind), None) => Ok(Directive::Rule(kind.to_string())),
                    _ => Err(Error::InvalidDirective {
                        key: key.to_string(),
                        value: value.to_string(),
                        message: "expected exactly one rule kind".to_string(),
                    }),
                }
            }
            other => Err(Error::UnknownDirective(other.to_string())),
        }
    }

    /// Parse the directives in this extension's namespace.
    ///
    /// Keys outside `proto_*` belong to other extensions and are skipped.
    pub fn collect(raw: &[RawDirective]) -> Result<Vec<Directive>> {
        raw.iter()
            .filter(|d| d.key.starts_with(DIRECTIVE_NAMESPACE))
            .map(|d| Directive::parse(&d.key, &d.value))
            .collect()
    }
}

fn parse_list(key: &str, value: &str) -> Result<ListUpdate> {
    let invalid = |message: &str| Error::InvalidDirective {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    };

    let words: Vec<&str> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|w| !w.is_empty())
        .collect();

    match words.as_slice() {
        [] => Err(invalid("expected at least one value")),
        ["all"] => Ok(ListUpdate::All),
        _ => {
            let edits = words
                .iter()
                .filter(|w| w.starts_with('+') || w.starts_with('-'))
                .count();
            if edits == 0 {
                Ok(ListUpdate::Replace(words.iter().map(|w| w.to_string()).collect()))
            } else if edits == words.len() {
                let mut add = Vec::new();
                let mut remove = Vec::new();
                for word in words {
                    let (target, name) = match word.split_at(1) {
                        ("+", name) => (&mut add, name),
                        (_, name) => (&mut remove, name),
                    };
                    if name.is_empty() {
                        return Err(invalid("empty entry"));
                    }
                    target.push(name.to_string());
                }
                Ok(ListUpdate::Edit { add, remove })
            } else {
                Err(invalid("cannot mix +/- entries with plain entries"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_forms() {
        assert_eq!(
            Directive::parse("proto_plugin", "go grpc_go").unwrap(),
            Directive::Plugin(ListUpdate::Replace(vec!["go".into(), "grpc_go".into()]))
        );
        assert_eq!(
            Directive::parse("proto_language", "+java,-python").unwrap(),
            Directive::Language(ListUpdate::Edit {
                add: vec!["java".into()],
                remove: vec!["python".into()],
            })
        );
        assert_eq!(
            Directive::parse("proto_language", "all").unwrap(),
            Directive::Language(ListUpdate::All)
        );
        assert_eq!(
            Directive::parse("proto_rule", " proto_compile ").unwrap(),
            Directive::Rule("proto_compile".into())
        );
    }

    #[test]
    fn test_invalid_directives() {
        assert!(matches!(
            Directive::parse("proto_plugins", "go"),
            Err(Error::UnknownDirective(key)) if key == "proto_plugins"
        ));
        assert!(matches!(
            Directive::parse("proto_plugin", "go -py"),
            Err(Error::InvalidDirective { .. })
        ));
        assert!(Directive::parse("proto_plugin", "").is_err());
        assert!(Directive::parse("proto_plugin", "+").is_err());
        assert!(Directive::parse("proto_rule", "a b").is_err());
    }

    #[test]
    fn test_collect_skips_other_namespaces() {
        let raw = vec![
            RawDirective { key: "go_prefix".into(), value: "example.com/x".into(), line: 1 },
            RawDirective { key: "proto_rule".into(), value: "proto_compile".into(), line: 2 },
        ];
        assert_eq!(
            Directive::collect(&raw).unwrap(),
            vec![Directive::Rule("proto_compile".into())]
        );

        let raw = vec![RawDirective { key: "proto_lang".into(), value: "go".into(), line: 1 }];
        assert!(matches!(Directive::collect(&raw), Err(Error::UnknownDirective(_))));
    }
}
