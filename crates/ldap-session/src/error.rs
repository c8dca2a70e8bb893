//! Failure taxonomy for directory operations.
//!
//! Every failure surfaced by this crate carries a stable numeric code and a
//! message pair (canonical error name plus the server's diagnostic text).
//! Failures detected before any native call use the sentinel code `-1`.

use thiserror::Error;

use crate::driver::ErrorState;

/// Sentinel code for failures raised before any native call was attempted.
pub const PRECONDITION_CODE: i32 = -1;

/// A structured directory-operation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LdapError {
    /// The operation could not even be attempted: invalid input detected
    /// before any network interaction (empty URI, mismatched parallel-query
    /// argument counts, pre-session option rejected).
    #[error("{0}")]
    Precondition(String),

    /// A native operation was attempted against a live session and judged
    /// failed. Code and diagnostic come from the session's error state at
    /// failure time; the compare operation's inconclusive sentinel is judged
    /// identically.
    #[error("{name}: {diagnostic}")]
    Operation {
        /// Native numeric result code.
        code: i32,
        /// Canonical name for the result code.
        name: &'static str,
        /// Server-side diagnostic text, possibly empty.
        diagnostic: String,
    },
}

impl LdapError {
    /// Creates a precondition failure.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Builds an operation failure from a session's current error state.
    pub fn from_error_state(state: &ErrorState) -> Self {
        Self::Operation {
            code: state.code,
            name: result_code_name(state.code),
            diagnostic: state.diagnostic.clone(),
        }
    }

    /// Returns the numeric failure code.
    ///
    /// `-1` for precondition failures, the native result code otherwise.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Precondition(_) => PRECONDITION_CODE,
            Self::Operation { code, .. } => *code,
        }
    }

    /// Returns the full human-readable message.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether this failure was detected before any native call.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }
}

/// Result type for directory operations.
pub type LdapResult<T> = Result<T, LdapError>;

/// Canonical name for an LDAP result code (RFC 4511 plus the common
/// client-side codes).
#[must_use]
pub const fn result_code_name(code: i32) -> &'static str {
    match code {
        -1 => "Can't contact LDAP server",
        0 => "Success",
        1 => "Operations error",
        2 => "Protocol error",
        3 => "Time limit exceeded",
        4 => "Size limit exceeded",
        5 => "Compare false",
        6 => "Compare true",
        7 => "Authentication method not supported",
        8 => "Stronger authentication required",
        10 => "Referral",
        11 => "Administrative limit exceeded",
        12 => "Critical extension is unavailable",
        13 => "Confidentiality required",
        14 => "SASL bind in progress",
        16 => "No such attribute",
        17 => "Undefined attribute type",
        18 => "Inappropriate matching",
        19 => "Constraint violation",
        20 => "Type or value exists",
        21 => "Invalid syntax",
        32 => "No such object",
        33 => "Alias problem",
        34 => "Invalid DN syntax",
        36 => "Alias dereferencing problem",
        48 => "Inappropriate authentication",
        49 => "Invalid credentials",
        50 => "Insufficient access rights",
        51 => "Busy",
        52 => "Unavailable",
        53 => "Unwilling to perform",
        54 => "Loop detected",
        64 => "Naming violation",
        65 => "Object class violation",
        66 => "Not allowed on non-leaf",
        67 => "Not allowed on RDN",
        68 => "Already exists",
        69 => "Cannot modify object class",
        71 => "Affects multiple DSAs",
        80 => "Other",
        89 => "Bad parameter to an ldap routine",
        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_code_is_sentinel() {
        let err = LdapError::precondition("empty URI");
        assert_eq!(err.code(), PRECONDITION_CODE);
        assert!(err.is_precondition());
        assert_eq!(err.message(), "empty URI");
    }

    #[test]
    fn operation_failure_carries_native_state() {
        let state = ErrorState {
            code: 49,
            diagnostic: "80090308: LdapErr: DSID-0C09042A".to_string(),
        };
        let err = LdapError::from_error_state(&state);
        assert_eq!(err.code(), 49);
        assert!(!err.is_precondition());
        assert_eq!(
            err.message(),
            "Invalid credentials: 80090308: LdapErr: DSID-0C09042A"
        );
    }

    #[test]
    fn unknown_codes_get_a_stable_name() {
        assert_eq!(result_code_name(4095), "Unknown error");
        assert_eq!(result_code_name(0), "Success");
        assert_eq!(result_code_name(32), "No such object");
    }
}
