//! # ldap-session
//!
//! A client-side session abstraction over the LDAP directory-access
//! protocol: connection establishment with protocol-version negotiation,
//! bind/search/compare operations, structured failure translation, and
//! normalization of the protocol's count-prefixed search responses into flat
//! keyed records.
//!
//! The wire protocol itself (TCP, TLS, BER) lives behind the
//! [`DirectoryDriver`] seam; [`Ldap3Driver`] is the production
//! implementation.
//!
//! ```no_run
//! use ldap_session::{ConnectionConfig, LdapConnection, SearchOptions};
//!
//! # async fn run() -> ldap_session::LdapResult<()> {
//! let config = ConnectionConfig::new("ldap://directory.example.com");
//! let mut conn = LdapConnection::establish(&config).await?;
//! conn.start_tls().await?;
//! conn.bind("cn=reader,dc=example,dc=com", "secret").await?;
//!
//! let results = conn
//!     .search(
//!         vec!["ou=people,dc=example,dc=com", "ou=robots,dc=example,dc=com"],
//!         "(mail=*)",
//!         &SearchOptions::new().attributes(["cn", "mail"]),
//!     )
//!     .await?;
//! assert_eq!(results.len(), 2);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod escape;
mod executor;
pub mod native;
pub mod response;
pub mod search;

pub use config::{ConnectionConfig, TransportSecurity, PROTO_MIN_VERSION};
pub use connection::{Connection, LdapConnection};
pub use driver::{CompareOutcome, DirectoryDriver, ErrorState, OptionId, OptionValue};
pub use error::{LdapError, LdapResult, PRECONDITION_CODE};
pub use escape::{escape_dn, escape_filter};
pub use native::Ldap3Driver;
pub use response::{RawEntry, RawSearchResponse, RawValues, ResultDiagnostic, SearchRecord};
pub use search::{
    DerefPolicy, LdapControl, SearchOptions, SearchScope, SearchTarget, TargetSpec,
};
