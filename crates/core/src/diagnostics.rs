//! Non-fatal findings reported alongside generated output

use serde::Serialize;
use std::fmt;

/// Why an adopted unit's `srcs` entry could not be claimed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchReason {
    /// No discovered source file has that name
    Missing,
    /// An earlier hand-authored unit already claims the file
    AlreadyClaimed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    UnresolvedImport {
        declaration: String,
        import: String,
        reason: String,
    },
    AmbiguousImport {
        declaration: String,
        import: String,
        chosen: String,
        candidates: Vec<String>,
    },
    AdoptedUnitMismatch {
        unit: String,
        src: String,
        reason: MismatchReason,
    },
    SkippedSourceFile {
        file: String,
        message: String,
    },
}

impl Diagnostic {
    /// Emit the diagnostic as a warning event
    pub fn log(&self) {
        tracing::warn!("{}", self);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnresolvedImport {
                declaration,
                import,
                reason,
            } => write!(f, "{}: unresolved import {:?}: {}", declaration, import, reason),
            Diagnostic::AmbiguousImport {
                declaration,
                import,
                chosen,
                candidates,
            } => write!(
                f,
                "{}: import {:?} is provided by {} units ({}), using {}",
                declaration,
                import,
                candidates.len(),
                candidates.join(", "),
                chosen
            ),
            Diagnostic::AdoptedUnitMismatch { unit, src, reason } => match reason {
                MismatchReason::Missing => {
                    write!(f, "{}: source {:?} does not exist", unit, src)
                }
                MismatchReason::AlreadyClaimed => {
                    write!(f, "{}: source {:?} is already claimed by another unit", unit, src)
                }
            },
            Diagnostic::SkippedSourceFile { file, message } => {
                write!(f, "skipped unparseable {}: {}", file, message)
            }
        }
    }
}
