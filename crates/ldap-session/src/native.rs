//! Production driver backed by the `ldap3` crate.
//!
//! The driver owns one protocol session. Parallel search replicates the
//! session handle, one per request slot; `ldap3` multiplexes the replicated
//! handles' requests over the single underlying connection.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::future;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, SearchEntry};
use tracing::{trace, warn};

use crate::config::TransportSecurity;
use crate::driver::{CompareOutcome, DirectoryDriver, ErrorState, OptionId, OptionValue};
use crate::response::{RawEntry, RawSearchResponse, RawValues, ResultDiagnostic};
use crate::search::{SearchOptions, SearchTarget};

/// Library-wide debug level, the pre-session equivalent of the per-session
/// `DebugLevel` option.
static DEBUG_LEVEL: AtomicU32 = AtomicU32::new(0);

const PARAM_ERROR: i32 = 89;
const CONTACT_ERROR: i32 = -1;

/// One `ldap3`-backed protocol session.
pub struct Ldap3Driver {
    uri: String,
    ldap: Ldap,
    transport: TransportSecurity,
    options: HashMap<OptionId, OptionValue>,
    last_error: ErrorState,
}

impl Ldap3Driver {
    async fn open(
        uri: &str,
        transport: &TransportSecurity,
        starttls: bool,
    ) -> Result<Ldap, String> {
        let mut settings = LdapConnSettings::new();
        if starttls {
            settings = settings.set_starttls(true);
        }
        if !transport.verify_certificates {
            settings = settings.set_no_tls_verify(true);
        }
        if let Some(connector) = tls_connector(transport)? {
            settings = settings.set_connector(connector);
        }

        let (conn, ldap) = LdapConnAsync::with_settings(settings, uri)
            .await
            .map_err(|e| e.to_string())?;
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP connection driver error: {e}");
            }
        });
        Ok(ldap)
    }

    fn timeout(&self) -> Option<Duration> {
        match self.options.get(&OptionId::NetworkTimeout) {
            Some(OptionValue::Span(t)) if !t.is_zero() => Some(*t),
            _ => None,
        }
    }

    fn clear_error(&mut self) {
        self.last_error = ErrorState::default();
    }

    fn record(&mut self, code: i32, diagnostic: impl Into<String>) {
        self.last_error = ErrorState {
            code,
            diagnostic: diagnostic.into(),
        };
    }

    fn record_result(&mut self, result: &ldap3::LdapResult) {
        self.record(
            i32::try_from(result.rc).unwrap_or(i32::MAX),
            result.text.clone(),
        );
    }

    fn record_native(&mut self, err: &ldap3::LdapError) {
        match err {
            ldap3::LdapError::LdapResult { result } => self.record_result(result),
            other => self.record(CONTACT_ERROR, other.to_string()),
        }
    }

    fn raw_response(entries: Vec<ldap3::ResultEntry>, proto: ldap3::LdapResult) -> RawSearchResponse {
        let mut raw_entries = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = SearchEntry::construct(entry);
            let mut names = Vec::new();
            let mut values = HashMap::new();
            for (name, vals) in entry.attrs {
                names.push(name.clone());
                values.insert(
                    name,
                    RawValues {
                        count: vals.len(),
                        values: vals,
                    },
                );
            }
            // Binary values are carried as lossy text, matching the shape of
            // the native count-prefixed response.
            for (name, vals) in entry.bin_attrs {
                let vals: Vec<String> = vals
                    .into_iter()
                    .map(|v| String::from_utf8_lossy(&v).into_owned())
                    .collect();
                names.push(name.clone());
                values.insert(
                    name,
                    RawValues {
                        count: vals.len(),
                        values: vals,
                    },
                );
            }
            raw_entries.push(RawEntry {
                dn: entry.dn,
                count: names.len(),
                names,
                values,
            });
        }
        RawSearchResponse {
            count: raw_entries.len(),
            entries: raw_entries,
            diagnostic: Some(ResultDiagnostic {
                code: i32::try_from(proto.rc).unwrap_or(i32::MAX),
                matched_dn: proto.matched,
                message: proto.text,
                referrals: proto.refs,
            }),
        }
    }
}

#[async_trait]
impl DirectoryDriver for Ldap3Driver {
    fn set_debug_level(level: u32) -> bool {
        DEBUG_LEVEL.store(level, Ordering::Relaxed);
        trace!(level, "native debug level set");
        true
    }

    async fn connect(uri: &str, transport: &TransportSecurity) -> Option<Self> {
        match Self::open(uri, transport, false).await {
            Ok(ldap) => {
                let mut options = HashMap::new();
                options.insert(
                    OptionId::DebugLevel,
                    OptionValue::Number(i64::from(DEBUG_LEVEL.load(Ordering::Relaxed))),
                );
                Some(Self {
                    uri: uri.to_string(),
                    ldap,
                    transport: transport.clone(),
                    options,
                    last_error: ErrorState::default(),
                })
            }
            Err(msg) => {
                warn!(uri, error = %msg, "LDAP connect failed");
                None
            }
        }
    }

    async fn set_option(&mut self, option: OptionId, value: OptionValue) -> bool {
        match store_option(&mut self.options, option, value) {
            Ok(()) => {
                self.clear_error();
                true
            }
            Err(diagnostic) => {
                self.record(PARAM_ERROR, diagnostic);
                false
            }
        }
    }

    async fn get_option(&mut self, option: OptionId) -> Option<OptionValue> {
        Some(read_option(&self.options, option))
    }

    async fn start_tls(&mut self) -> bool {
        // In-band upgrade, modelled as a reconnect negotiating STARTTLS on
        // the same URI. Bind state from before the upgrade does not survive;
        // the expected call order is establish, then start_tls, then bind.
        match Self::open(&self.uri, &self.transport, true).await {
            Ok(upgraded) => {
                let mut old = std::mem::replace(&mut self.ldap, upgraded);
                let _ = old.unbind().await;
                self.clear_error();
                true
            }
            Err(msg) => {
                self.record(CONTACT_ERROR, msg);
                false
            }
        }
    }

    async fn simple_bind(&mut self, dn: &str, password: &str) -> bool {
        if let Some(t) = self.timeout() {
            self.ldap.with_timeout(t);
        }
        match self.ldap.simple_bind(dn, password).await {
            Ok(result) if result.rc == 0 => {
                self.clear_error();
                true
            }
            Ok(result) => {
                self.record_result(&result);
                false
            }
            Err(e) => {
                self.record_native(&e);
                false
            }
        }
    }

    async fn compare(&mut self, dn: &str, attribute: &str, value: &str) -> CompareOutcome {
        if let Some(t) = self.timeout() {
            self.ldap.with_timeout(t);
        }
        match self.ldap.compare(dn, attribute, value).await {
            Ok(result) => match result.equal() {
                Ok(true) => {
                    self.clear_error();
                    CompareOutcome::True
                }
                Ok(false) => {
                    self.clear_error();
                    CompareOutcome::False
                }
                Err(e) => {
                    self.record_native(&e);
                    CompareOutcome::Undefined
                }
            },
            Err(e) => {
                self.record_native(&e);
                CompareOutcome::Undefined
            }
        }
    }

    async fn search(
        &mut self,
        targets: &[SearchTarget],
        options: &SearchOptions,
    ) -> Option<Vec<RawSearchResponse>> {
        let scope = options.scope.to_ldap3();
        let deref = options.deref.to_ldap3();
        let sizelimit = options.size_limit.max(0);
        let timelimit = options.time_limit.max(0);
        let typesonly = options.attributes_only;
        let timeout = self.timeout();
        let controls: Option<Vec<ldap3::controls::RawControl>> = options
            .controls
            .as_ref()
            .map(|cs| cs.iter().map(|c| c.to_ldap3()).collect());

        let mut pending = Vec::with_capacity(targets.len());
        for target in targets {
            // One replicated session handle per parallel request slot; all
            // slots multiplex over the single underlying connection.
            let mut handle = self.ldap.clone();
            let attrs = options.attributes.clone();
            let controls = controls.clone();
            let base = target.base.clone();
            let filter = target.filter.clone();
            pending.push(async move {
                handle.with_search_options(
                    ldap3::SearchOptions::new()
                        .deref(deref)
                        .sizelimit(sizelimit)
                        .timelimit(timelimit)
                        .typesonly(typesonly),
                );
                if let Some(t) = timeout {
                    handle.with_timeout(t);
                }
                if let Some(cs) = controls {
                    handle.with_controls(cs);
                }
                handle.search(&base, scope, &filter, attrs).await
            });
        }

        let mut responses = Vec::with_capacity(targets.len());
        for settled in future::join_all(pending).await {
            match settled.and_then(ldap3::SearchResult::success) {
                Ok((entries, proto)) => responses.push(Self::raw_response(entries, proto)),
                Err(e) => {
                    // The round trip fails as a whole; no partial results.
                    self.record_native(&e);
                    return None;
                }
            }
        }
        self.clear_error();
        Some(responses)
    }

    async fn parse_result(&mut self, response: &RawSearchResponse) -> Option<ResultDiagnostic> {
        response.diagnostic.clone()
    }

    async fn disconnect(&mut self) {
        let _ = self.ldap.unbind().await;
    }

    fn error_state(&self) -> ErrorState {
        self.last_error.clone()
    }
}

fn store_option(
    options: &mut HashMap<OptionId, OptionValue>,
    option: OptionId,
    value: OptionValue,
) -> Result<(), String> {
    let accepted = match (option, &value) {
        // ldap3 only speaks protocol version 3.
        (OptionId::ProtocolVersion, OptionValue::Number(v)) => *v == 3,
        (OptionId::DebugLevel, OptionValue::Number(v)) => *v >= 0,
        (OptionId::NetworkTimeout, OptionValue::Span(_)) => true,
        (OptionId::Referrals, OptionValue::Flag(_)) => true,
        _ => false,
    };
    if accepted {
        options.insert(option, value);
        Ok(())
    } else {
        Err(format!("unsupported value for option {option:?}"))
    }
}

fn read_option(options: &HashMap<OptionId, OptionValue>, option: OptionId) -> OptionValue {
    options.get(&option).cloned().unwrap_or(match option {
        OptionId::ProtocolVersion => OptionValue::Number(3),
        OptionId::DebugLevel => OptionValue::Number(0),
        OptionId::NetworkTimeout => OptionValue::Span(Duration::ZERO),
        OptionId::Referrals => OptionValue::Flag(false),
    })
}

fn tls_connector(transport: &TransportSecurity) -> Result<Option<native_tls::TlsConnector>, String> {
    if transport.ca_cert_file.is_none() && transport.ca_cert_dir.is_none() {
        return Ok(None);
    }

    let mut builder = native_tls::TlsConnector::builder();
    if !transport.verify_certificates {
        builder.danger_accept_invalid_certs(true);
    }
    if let Some(file) = &transport.ca_cert_file {
        add_trust_anchor(&mut builder, file)?;
    }
    if let Some(dir) = &transport.ca_cert_dir {
        let entries = fs::read_dir(dir)
            .map_err(|e| format!("cannot read CA directory {}: {e}", dir.display()))?;
        for entry in entries {
            let path = entry
                .map_err(|e| format!("cannot read CA directory {}: {e}", dir.display()))?
                .path();
            let is_cert = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pem") || ext.eq_ignore_ascii_case("crt"));
            if is_cert {
                add_trust_anchor(&mut builder, &path)?;
            }
        }
    }
    builder.build().map(Some).map_err(|e| e.to_string())
}

fn add_trust_anchor(
    builder: &mut native_tls::TlsConnectorBuilder,
    path: &Path,
) -> Result<(), String> {
    let pem = fs::read(path)
        .map_err(|e| format!("cannot read CA certificate {}: {e}", path.display()))?;
    let cert = native_tls::Certificate::from_pem(&pem)
        .map_err(|e| format!("invalid CA certificate {}: {e}", path.display()))?;
    builder.add_root_certificate(cert);
    Ok(())
}
