//! Directory session lifetime and operations.

use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::driver::{DirectoryDriver, OptionId, OptionValue};
use crate::error::{LdapError, LdapResult};
use crate::executor::{execute, Operation, Outcome};
use crate::native::Ldap3Driver;
use crate::response::{self, SearchRecord};
use crate::search::{self, SearchOptions, TargetSpec};

/// One directory-server session.
///
/// A value of this type only exists after a verified successful connect; an
/// invalid session handle is unrepresentable. Every operation takes
/// `&mut self` — the underlying protocol session is stateful and supports one
/// logical operation at a time. Callers needing concurrent traffic use
/// separate connections.
#[derive(Debug)]
pub struct Connection<D> {
    uri: String,
    driver: D,
    negotiated_version: i32,
}

/// A session over the production `ldap3`-backed driver.
pub type LdapConnection = Connection<Ldap3Driver>;

impl<D: DirectoryDriver> Connection<D> {
    /// Establishes a session.
    ///
    /// Applies the configured debug level first (its failure is a
    /// precondition failure — no session exists yet to query for native
    /// error state), rejects an empty URI before any native call, connects,
    /// then raises the negotiated protocol version to the configured minimum
    /// when the driver reports less.
    ///
    /// ## Errors
    ///
    /// Precondition failures for a rejected debug level, an empty URI, or a
    /// connect call yielding no usable handle; operation failures for any
    /// option call failing against the live session.
    pub async fn establish(config: &ConnectionConfig) -> LdapResult<Self> {
        if !D::set_debug_level(config.debug_level) {
            return Err(LdapError::precondition(
                "failed to set the debug level option",
            ));
        }
        if config.uri.is_empty() {
            return Err(LdapError::precondition("invalid LDAP URI"));
        }

        let driver = D::connect(&config.uri, &config.transport)
            .await
            .ok_or_else(|| LdapError::precondition("invalid LDAP URI"))?;
        let mut conn = Self {
            uri: config.uri.clone(),
            driver,
            negotiated_version: 0,
        };

        if let Some(timeout) = config.network_timeout {
            conn.set_opt(OptionId::NetworkTimeout, OptionValue::Span(timeout))
                .await?;
        }

        let reported = conn
            .get_opt(OptionId::ProtocolVersion)
            .await?
            .as_number()
            .and_then(|n| i32::try_from(n).ok())
            .unwrap_or(0);
        if reported < config.min_version {
            conn.set_opt(
                OptionId::ProtocolVersion,
                OptionValue::Number(i64::from(config.min_version)),
            )
            .await?;
            conn.negotiated_version = config.min_version;
        } else {
            conn.negotiated_version = reported;
        }

        info!(
            uri = %conn.uri,
            version = conn.negotiated_version,
            "directory session established"
        );
        Ok(conn)
    }

    /// The URI this session was established against.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The negotiated protocol version.
    #[must_use]
    pub const fn negotiated_version(&self) -> i32 {
        self.negotiated_version
    }

    /// Returns a reference to the driver.
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Returns a mutable reference to the driver.
    #[must_use]
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Sets a client/session option.
    pub async fn set_opt(&mut self, option: OptionId, value: OptionValue) -> LdapResult<()> {
        execute(&mut self.driver, Operation::SetOption { option, value }).await?;
        Ok(())
    }

    /// Reads a client/session option.
    pub async fn get_opt(&mut self, option: OptionId) -> LdapResult<OptionValue> {
        let outcome = execute(&mut self.driver, Operation::GetOption { option }).await?;
        let Outcome::Value(value) = outcome else {
            unreachable!("get_option yields a value")
        };
        Ok(value)
    }

    /// Upgrades the session to an encrypted transport.
    ///
    /// A no-op when the URI already denotes a secure-transport scheme.
    /// Returns the connection itself to support call chaining.
    pub async fn start_tls(&mut self) -> LdapResult<&mut Self> {
        if self.uri.starts_with("ldaps://") {
            debug!(uri = %self.uri, "transport already secure, skipping STARTTLS");
            return Ok(self);
        }
        execute(&mut self.driver, Operation::StartTls).await?;
        Ok(self)
    }

    /// Performs a simple bind.
    pub async fn bind(&mut self, dn: &str, password: &str) -> LdapResult<()> {
        execute(&mut self.driver, Operation::Bind { dn, password }).await?;
        Ok(())
    }

    /// Tests whether `dn`'s `attribute` holds `value`.
    ///
    /// The native "inconclusive" sentinel is reported as a failure, never as
    /// a third boolean state.
    pub async fn compare(&mut self, dn: &str, attribute: &str, value: &str) -> LdapResult<bool> {
        let outcome = execute(
            &mut self.driver,
            Operation::Compare {
                dn,
                attribute,
                value,
            },
        )
        .await?;
        let Outcome::Compared(matched) = outcome else {
            unreachable!("compare yields a boolean")
        };
        Ok(matched)
    }

    /// Searches one or many base/filter targets in one round trip.
    ///
    /// `base` and `filter` each accept a single value or a sequence; when
    /// both are sequences their lengths must match exactly, otherwise the
    /// scalar side is broadcast. Returns one flattened record list per
    /// target, positionally aligned with the expanded inputs.
    pub async fn search(
        &mut self,
        base: impl Into<TargetSpec>,
        filter: impl Into<TargetSpec>,
        options: &SearchOptions,
    ) -> LdapResult<Vec<Vec<SearchRecord>>> {
        let targets = search::expand(base.into(), filter.into())?;
        let outcome = execute(
            &mut self.driver,
            Operation::Search {
                targets: &targets,
                options,
            },
        )
        .await?;
        let Outcome::Responses(responses) = outcome else {
            unreachable!("search yields responses")
        };
        Ok(responses.into_iter().map(response::parse).collect())
    }

    /// Releases the session.
    pub async fn close(mut self) {
        self.driver.disconnect().await;
    }
}
