//! Minimal Bazel label model
//!
//! Only the forms that appear in `srcs`/`deps` of proto rules are handled:
//! `@repo//pkg:name`, `//pkg:name`, `//pkg`, `:name` and bare `name`.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Label {
    pub repo: Option<String>,
    pub package: String,
    pub name: String,
    /// `:name` or `name`, i.e. relative to the package that mentions it
    relative: bool,
}

impl Label {
    /// An absolute label in the main repository
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            repo: None,
            package: package.into(),
            name: name.into(),
            relative: false,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |message: &str| Error::InvalidLabel {
            label: s.to_string(),
            message: message.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("empty label"));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(invalid("labels cannot contain whitespace"));
        }

        if let Some(rest) = s.strip_prefix('@') {
            let rest = rest.strip_prefix('@').unwrap_or(rest);
            return match rest.split_once("//") {
                Some((repo, target)) => {
                    let mut label = Self::parse_absolute(target, s)?;
                    label.repo = (!repo.is_empty()).then(|| repo.to_string());
                    Ok(label)
                }
                None if !rest.is_empty() && !rest.contains(':') => Ok(Self {
                    repo: Some(rest.to_string()),
                    package: String::new(),
                    name: rest.to_string(),
                    relative: false,
                }),
                None => Err(invalid("expected '//' after repository name")),
            };
        }

        if let Some(target) = s.strip_prefix("//") {
            return Self::parse_absolute(target, s);
        }

        let name = s.strip_prefix(':').unwrap_or(s);
        if name.is_empty() || name.contains(':') {
            return Err(invalid("invalid target name"));
        }
        Ok(Self {
            repo: None,
            package: String::new(),
            name: name.to_string(),
            relative: true,
        })
    }

    fn parse_absolute(target: &str, original: &str) -> Result<Self> {
        let invalid = |message: &str| Error::InvalidLabel {
            label: original.to_string(),
            message: message.to_string(),
        };
        let (package, name) = match target.split_once(':') {
            Some((package, name)) => (package, name),
            None => {
                let name = target.rsplit('/').next().unwrap_or_default();
                (target, name)
            }
        };
        if name.is_empty() || name.contains(':') {
            return Err(invalid("invalid target name"));
        }
        if package.ends_with('/') || package.starts_with('/') {
            return Err(invalid("invalid package path"));
        }
        Ok(Self::new(package, name))
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }

    /// Anchor a relative label in `package`; absolute labels are unchanged
    pub fn resolve_in(&self, package: &str) -> Label {
        if self.relative {
            Label::new(package, self.name.clone())
        } else {
            self.clone()
        }
    }

    /// Render the label as written from a BUILD file in `package`
    pub fn rel_to(&self, package: &str) -> String {
        if self.relative || (self.repo.is_none() && self.package == package) {
            format!(":{}", self.name)
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.relative {
            return write!(f, ":{}", self.name);
        }
        if let Some(repo) = &self.repo {
            write!(f, "@{}", repo)?;
        }
        write!(f, "//{}:{}", self.package, self.name)
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Label::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_forms() {
        let label = Label::parse("//pkg/a:a_go").unwrap();
        assert_eq!(label.package, "pkg/a");
        assert_eq!(label.name, "a_go");
        assert!(!label.is_relative());

        let label = Label::parse("//pkg/a").unwrap();
        assert_eq!(label.name, "a");

        let label = Label::parse("@org_golang_google_grpc//:go_default_library").unwrap();
        assert_eq!(label.repo.as_deref(), Some("org_golang_google_grpc"));
        assert_eq!(label.package, "");
        assert_eq!(label.to_string(), "@org_golang_google_grpc//:go_default_library");

        let label = Label::parse(":x.proto").unwrap();
        assert!(label.is_relative());
        assert_eq!(label.name, "x.proto");

        let label = Label::parse("x.proto").unwrap();
        assert!(label.is_relative());
        assert_eq!(label.resolve_in("pkg/c"), Label::new("pkg/c", "x.proto"));
    }

    #[test]
    fn test_parse_invalid_labels() {
        assert!(Label::parse("").is_err());
        assert!(Label::parse("//pkg:").is_err());
        assert!(Label::parse("//pkg/:x").is_err());
        assert!(Label::parse("has space").is_err());
        assert!(Label::parse("@repo:x").is_err());
    }

    #[test]
    fn test_rel_to() {
        let label = Label::new("pkg/a", "a_go");
        assert_eq!(label.rel_to("pkg/a"), ":a_go");
        assert_eq!(label.rel_to("pkg/b"), "//pkg/a:a_go");
        assert_eq!(Label::new("", "root_go").rel_to("pkg"), "//:root_go");
    }
}
