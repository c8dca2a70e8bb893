//! The single chokepoint through which every protocol call passes.
//!
//! Each session operation is one variant of a closed set; [`execute`]
//! dispatches the variant to the driver, judges the native outcome, and
//! translates any failure through the session's error state. One invocation,
//! one judgment, no retries.

use tracing::{debug, warn};

use crate::driver::{CompareOutcome, DirectoryDriver, OptionId, OptionValue};
use crate::error::{LdapError, LdapResult};
use crate::response::RawSearchResponse;
use crate::search::{SearchOptions, SearchTarget};

/// The closed set of session operations.
#[derive(Debug)]
pub(crate) enum Operation<'a> {
    /// Set a client/session option.
    SetOption {
        option: OptionId,
        value: OptionValue,
    },
    /// Read a client/session option.
    GetOption { option: OptionId },
    /// Upgrade the session transport in-band.
    StartTls,
    /// Simple bind.
    Bind { dn: &'a str, password: &'a str },
    /// Attribute-value assertion.
    Compare {
        dn: &'a str,
        attribute: &'a str,
        value: &'a str,
    },
    /// Multi-target search, one multiplexed round trip.
    Search {
        targets: &'a [SearchTarget],
        options: &'a SearchOptions,
    },
}

impl Operation<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::SetOption { .. } => "set_option",
            Self::GetOption { .. } => "get_option",
            Self::StartTls => "start_tls",
            Self::Bind { .. } => "bind",
            Self::Compare { .. } => "compare",
            Self::Search { .. } => "search",
        }
    }
}

/// Discriminated operation result.
///
/// Keeps legitimate-but-empty results (no entries found, compare no-match)
/// distinct from failure; the two are never collapsed into one signal.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// The operation succeeded and produces no value.
    Done,
    /// An option value.
    Value(OptionValue),
    /// A conclusive compare result.
    Compared(bool),
    /// Per-target raw responses, positionally aligned with the request.
    Responses(Vec<RawSearchResponse>),
}

/// Executes one operation against the session and judges the outcome.
///
/// Judging follows the native conventions: boolean operations fail on
/// `false`, value-producing operations fail when nothing comes back, and the
/// compare operation additionally fails on its inconclusive sentinel. Every
/// failure is translated from the session's current native error state.
pub(crate) async fn execute<D: DirectoryDriver>(
    driver: &mut D,
    op: Operation<'_>,
) -> LdapResult<Outcome> {
    let name = op.name();
    debug!(operation = name, "executing directory operation");

    let outcome = match op {
        Operation::SetOption { option, value } => {
            driver.set_option(option, value).await.then_some(Outcome::Done)
        }
        Operation::GetOption { option } => driver.get_option(option).await.map(Outcome::Value),
        Operation::StartTls => driver.start_tls().await.then_some(Outcome::Done),
        Operation::Bind { dn, password } => {
            driver.simple_bind(dn, password).await.then_some(Outcome::Done)
        }
        Operation::Compare {
            dn,
            attribute,
            value,
        } => match driver.compare(dn, attribute, value).await {
            CompareOutcome::True => Some(Outcome::Compared(true)),
            CompareOutcome::False => Some(Outcome::Compared(false)),
            CompareOutcome::Undefined => None,
        },
        Operation::Search { targets, options } => {
            match driver.search(targets, options).await {
                Some(responses) => {
                    report_diagnostics(driver, &responses).await;
                    Some(Outcome::Responses(responses))
                }
                None => None,
            }
        }
    };

    match outcome {
        Some(outcome) => Ok(outcome),
        None => {
            let failure = LdapError::from_error_state(&driver.error_state());
            debug!(operation = name, code = failure.code(), "operation failed");
            Err(failure)
        }
    }
}

/// Reads the secondary result diagnostics of each response.
///
/// Informational only: the primary success is already established and a
/// missing or failing diagnostic never masks it.
async fn report_diagnostics<D: DirectoryDriver>(driver: &mut D, responses: &[RawSearchResponse]) {
    for (slot, response) in responses.iter().enumerate() {
        match driver.parse_result(response).await {
            Some(diag) => debug!(
                slot,
                code = diag.code,
                matched_dn = %diag.matched_dn,
                referrals = diag.referrals.len(),
                "result diagnostics"
            ),
            None => warn!(slot, "result diagnostics unavailable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportSecurity;
    use crate::driver::ErrorState;
    use crate::response::ResultDiagnostic;
    use async_trait::async_trait;

    /// Minimal driver with canned outcomes.
    struct Canned {
        compare: CompareOutcome,
        search: Option<Vec<RawSearchResponse>>,
        diagnostics: bool,
        error: ErrorState,
    }

    impl Default for Canned {
        fn default() -> Self {
            Self {
                compare: CompareOutcome::False,
                search: Some(Vec::new()),
                diagnostics: false,
                error: ErrorState {
                    code: 80,
                    diagnostic: "internal error".to_string(),
                },
            }
        }
    }

    #[async_trait]
    impl DirectoryDriver for Canned {
        fn set_debug_level(_level: u32) -> bool {
            true
        }

        async fn connect(_uri: &str, _transport: &TransportSecurity) -> Option<Self> {
            Some(Self::default())
        }

        async fn set_option(&mut self, _option: OptionId, _value: OptionValue) -> bool {
            true
        }

        async fn get_option(&mut self, _option: OptionId) -> Option<OptionValue> {
            None
        }

        async fn start_tls(&mut self) -> bool {
            true
        }

        async fn simple_bind(&mut self, _dn: &str, _password: &str) -> bool {
            true
        }

        async fn compare(&mut self, _dn: &str, _attribute: &str, _value: &str) -> CompareOutcome {
            self.compare
        }

        async fn search(
            &mut self,
            _targets: &[SearchTarget],
            _options: &SearchOptions,
        ) -> Option<Vec<RawSearchResponse>> {
            self.search.clone()
        }

        async fn parse_result(
            &mut self,
            _response: &RawSearchResponse,
        ) -> Option<ResultDiagnostic> {
            self.diagnostics.then(ResultDiagnostic::default)
        }

        async fn disconnect(&mut self) {}

        fn error_state(&self) -> ErrorState {
            self.error.clone()
        }
    }

    #[tokio::test]
    async fn compare_sentinel_is_a_failure() {
        let mut driver = Canned {
            compare: CompareOutcome::Undefined,
            error: ErrorState {
                code: 32,
                diagnostic: String::new(),
            },
            ..Canned::default()
        };
        let err = execute(
            &mut driver,
            Operation::Compare {
                dn: "cn=a,dc=x",
                attribute: "mail",
                value: "a@x",
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), 32);
    }

    #[tokio::test]
    async fn conclusive_compare_outcomes_succeed() {
        for (canned, expected) in [(CompareOutcome::True, true), (CompareOutcome::False, false)] {
            let mut driver = Canned {
                compare: canned,
                ..Canned::default()
            };
            let outcome = execute(
                &mut driver,
                Operation::Compare {
                    dn: "cn=a,dc=x",
                    attribute: "mail",
                    value: "a@x",
                },
            )
            .await
            .unwrap();
            assert!(matches!(outcome, Outcome::Compared(b) if b == expected));
        }
    }

    #[tokio::test]
    async fn empty_search_is_success_not_failure() {
        let mut driver = Canned::default();
        let outcome = execute(
            &mut driver,
            Operation::Search {
                targets: &[SearchTarget {
                    base: "dc=x".to_string(),
                    filter: "(cn=nobody)".to_string(),
                }],
                options: &SearchOptions::default(),
            },
        )
        .await
        .unwrap();
        assert!(matches!(outcome, Outcome::Responses(r) if r.is_empty()));
    }

    #[tokio::test]
    async fn missing_diagnostics_do_not_mask_success() {
        let mut driver = Canned {
            search: Some(vec![RawSearchResponse::default()]),
            diagnostics: false,
            ..Canned::default()
        };
        let outcome = execute(
            &mut driver,
            Operation::Search {
                targets: &[SearchTarget {
                    base: "dc=x".to_string(),
                    filter: "(objectClass=*)".to_string(),
                }],
                options: &SearchOptions::default(),
            },
        )
        .await
        .unwrap();
        assert!(matches!(outcome, Outcome::Responses(r) if r.len() == 1));
    }

    #[tokio::test]
    async fn failed_search_translates_error_state() {
        let mut driver = Canned {
            search: None,
            error: ErrorState {
                code: 3,
                diagnostic: "time limit exceeded".to_string(),
            },
            ..Canned::default()
        };
        let err = execute(
            &mut driver,
            Operation::Search {
                targets: &[],
                options: &SearchOptions::default(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), 3);
        assert_eq!(err.message(), "Time limit exceeded: time limit exceeded");
    }

    #[tokio::test]
    async fn absent_option_value_is_a_failure() {
        let mut driver = Canned::default();
        let err = execute(
            &mut driver,
            Operation::GetOption {
                option: OptionId::ProtocolVersion,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), 80);
    }
}
