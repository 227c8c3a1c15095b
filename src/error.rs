//! The error taxonomy shared by every pass in the back end.
//!
//! Fatal errors bubble up to the module driver ([`crate::pipeline`]); nothing
//! in this crate catches and retries one. Semantic diagnostics (unknown
//! callee, wrong argument count) are printed to stderr at the call site that
//! detects them, then reported as [`Error::InvalidArgument`] or
//! [`Error::Unsupported`] so the pipeline still aborts cleanly.

use derive_more::Display;

use crate::common::Id;

/// A fatal back-end error.
#[derive(Clone, PartialEq, Eq, Display)]
pub enum Error {
    /// An allocation failed inside `isel`, `varmap`, `argloc`, or `ralloc`.
    #[display("out of memory while {context}")]
    OutOfMemory {
        /// What the allocator was trying to do when it ran out of room.
        context: String,
    },
    /// A lookup failed: an IR declaration, record member, or varmap entry
    /// that does not exist.
    #[display("not found: {what} {name:?}")]
    NotFound {
        /// What kind of thing was being looked up, e.g. `"procedure"`.
        what: &'static str,
        /// The name that could not be found.
        name: Id,
    },
    /// An internal contract was violated: wrong operand kind, unrecognised
    /// declaration, or similar programming error from the front end.
    #[display("invalid argument in {proc}: {detail}")]
    InvalidArgument {
        /// The procedure being translated when the violation was detected.
        proc: Id,
        /// Human-readable description of the violated contract.
        detail: String,
    },
    /// A translation that the calling convention or frame layout cannot
    /// express: too many arguments to place, or a displacement that overflows
    /// the signed 8-bit IX-relative window.
    #[display("unsupported in {proc}: {detail}")]
    Unsupported {
        /// The procedure being translated when the limit was hit.
        proc: Id,
        /// Human-readable description of what limit was exceeded.
        detail: String,
    },
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::error::Error for Error {}

/// Convenience constructors used throughout `isel`/`ralloc`/`varmap`/`argloc`.
impl Error {
    pub fn out_of_memory(context: impl Into<String>) -> Error {
        Error::OutOfMemory {
            context: context.into(),
        }
    }

    pub fn not_found(what: &'static str, name: Id) -> Error {
        Error::NotFound { what, name }
    }

    pub fn invalid_argument(proc: Id, detail: impl Into<String>) -> Error {
        Error::InvalidArgument {
            proc,
            detail: detail.into(),
        }
    }

    pub fn unsupported(proc: Id, detail: impl Into<String>) -> Error {
        Error::Unsupported {
            proc,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_matches_display() {
        let e = Error::not_found("procedure", Id::from("foo".to_string()));
        assert_eq!(format!("{e}"), format!("{e:?}"));
    }

    #[test]
    fn display_messages_are_readable() {
        let e = Error::unsupported(Id::from("f".to_string()), "displacement -200 out of range");
        assert_eq!(
            format!("{e}"),
            "unsupported in f: displacement -200 out of range"
        );
    }
}
