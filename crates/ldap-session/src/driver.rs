//! The seam between this crate and the native protocol implementation.
//!
//! Everything below the [`DirectoryDriver`] trait (TCP, TLS handshake, BER
//! encoding, the wire protocol itself) belongs to the underlying LDAP client
//! library. The trait mirrors the native surface the session layer needs and
//! nothing more; the production implementation is
//! [`Ldap3Driver`](crate::native::Ldap3Driver).
//!
//! Driver methods report outcomes the way the native libraries do: boolean
//! operations yield `false` on failure, value-producing operations yield
//! nothing, and the driver records the cause in its error state for the
//! executor to read back. The driver never raises structured failures itself.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TransportSecurity;
use crate::response::{RawSearchResponse, ResultDiagnostic};
use crate::search::{SearchOptions, SearchTarget};

/// Client and session options the session layer can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionId {
    /// Negotiated protocol version (numeric, minimum 3).
    ProtocolVersion,
    /// Native library debug/trace level.
    DebugLevel,
    /// Timeout applied to individual protocol round trips.
    NetworkTimeout,
    /// Whether referrals are chased automatically.
    Referrals,
}

/// Value shapes an option can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    /// Numeric value.
    Number(i64),
    /// Textual value.
    Text(String),
    /// Boolean flag.
    Flag(bool),
    /// Time span.
    Span(Duration),
}

impl OptionValue {
    /// Returns the numeric value, if this is a number.
    #[must_use]
    pub const fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// The three logical outcomes of the compare operation.
///
/// `Undefined` is the native sentinel for "inconclusive/error" and is never a
/// caller-visible result; the executor judges it a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOutcome {
    /// The entry holds the asserted value.
    True,
    /// The entry does not hold the asserted value.
    False,
    /// The operation could not be decided.
    Undefined,
}

/// A session's current native error state.
///
/// The equivalent of reading `LDAP_OPT_ERROR_NUMBER` and
/// `LDAP_OPT_ERROR_STRING`: the code and diagnostic text left behind by the
/// most recent failed operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorState {
    /// Native numeric result code.
    pub code: i32,
    /// Server-supplied diagnostic text, possibly empty.
    pub diagnostic: String,
}

/// The native directory-library surface.
///
/// A driver value only exists for a session whose connect call succeeded;
/// invalid handles are unrepresentable. All methods take `&mut self` — one
/// session supports one logical operation at a time.
#[async_trait]
pub trait DirectoryDriver: Send + Sized {
    /// Applies the debug/trace level before any session exists.
    ///
    /// Returns `false` when the native library rejects the level.
    fn set_debug_level(level: u32) -> bool;

    /// Opens a session to `uri` with the given transport security.
    ///
    /// Returns `None` when no usable handle could be obtained; the cause is
    /// only available through the driver's own logging since no session
    /// exists to query.
    async fn connect(uri: &str, transport: &TransportSecurity) -> Option<Self>;

    /// Sets a client/session option. `false` on failure.
    async fn set_option(&mut self, option: OptionId, value: OptionValue) -> bool;

    /// Reads a client/session option. `None` on failure.
    async fn get_option(&mut self, option: OptionId) -> Option<OptionValue>;

    /// Upgrades the session to an encrypted transport in-band. `false` on
    /// failure.
    async fn start_tls(&mut self) -> bool;

    /// Performs a simple bind. `false` on failure.
    async fn simple_bind(&mut self, dn: &str, password: &str) -> bool;

    /// Tests whether `dn`'s `attribute` holds `value`.
    async fn compare(&mut self, dn: &str, attribute: &str, value: &str) -> CompareOutcome;

    /// Issues all `targets` as one multiplexed round trip over this session.
    ///
    /// The session handle is replicated internally, one per parallel request
    /// slot. On success the responses are positionally aligned with
    /// `targets`; an empty per-target response is a success. `None` means the
    /// round trip failed as a whole — no partial results are ever returned.
    async fn search(
        &mut self,
        targets: &[SearchTarget],
        options: &SearchOptions,
    ) -> Option<Vec<RawSearchResponse>>;

    /// Extracts the secondary result diagnostics from a response handle.
    ///
    /// Purely informational; `None` when diagnostics are unavailable.
    async fn parse_result(&mut self, response: &RawSearchResponse) -> Option<ResultDiagnostic>;

    /// Releases the session. Errors are not reported; the session is gone
    /// either way.
    async fn disconnect(&mut self);

    /// The session's current native error state.
    fn error_state(&self) -> ErrorState;
}
