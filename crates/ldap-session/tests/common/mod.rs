//! Shared test support: a scripted in-memory directory driver.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use async_trait::async_trait;
use ldap_session::{
    CompareOutcome, DirectoryDriver, ErrorState, OptionId, OptionValue, RawEntry,
    RawSearchResponse, RawValues, ResultDiagnostic, SearchOptions, SearchTarget,
    TransportSecurity,
};

/// Canned behavior for one test, installed per thread before establishing a
/// connection.
#[derive(Debug, Clone)]
pub struct Script {
    pub debug_ok: bool,
    pub connect_ok: bool,
    pub reported_version: i64,
    pub bind_ok: bool,
    pub compare: CompareOutcome,
    pub start_tls_ok: bool,
    /// `None` means the search round trip fails as a whole.
    pub responses: Option<Vec<RawSearchResponse>>,
    pub with_diagnostics: bool,
    /// Error state left behind by any scripted failure.
    pub error: ErrorState,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            debug_ok: true,
            connect_ok: true,
            reported_version: 3,
            bind_ok: true,
            compare: CompareOutcome::False,
            start_tls_ok: true,
            responses: Some(Vec::new()),
            with_diagnostics: true,
            error: ErrorState {
                code: 80,
                diagnostic: "scripted failure".to_string(),
            },
        }
    }
}

thread_local! {
    static SCRIPT: RefCell<Script> = RefCell::new(Script::default());
    static CONNECT_CALLS: Cell<usize> = const { Cell::new(0) };
}

/// Installs the script for the current test thread and resets counters.
pub fn install(script: Script) {
    SCRIPT.with(|s| *s.borrow_mut() = script);
    CONNECT_CALLS.with(|c| c.set(0));
}

/// Number of native connect calls observed since [`install`].
pub fn connect_calls() -> usize {
    CONNECT_CALLS.with(Cell::get)
}

/// A driver whose outcomes are fully scripted; records every operation.
#[derive(Debug)]
pub struct ScriptedDirectory {
    script: Script,
    last_error: ErrorState,
    /// Operations performed, in order.
    pub log: Vec<String>,
}

#[async_trait]
impl DirectoryDriver for ScriptedDirectory {
    fn set_debug_level(_level: u32) -> bool {
        SCRIPT.with(|s| s.borrow().debug_ok)
    }

    async fn connect(uri: &str, _transport: &TransportSecurity) -> Option<Self> {
        CONNECT_CALLS.with(|c| c.set(c.get() + 1));
        let script = SCRIPT.with(|s| s.borrow().clone());
        if !script.connect_ok {
            return None;
        }
        Some(Self {
            script,
            last_error: ErrorState::default(),
            log: vec![format!("connect {uri}")],
        })
    }

    async fn set_option(&mut self, option: OptionId, value: OptionValue) -> bool {
        self.log.push(format!("set_option {option:?} {value:?}"));
        true
    }

    async fn get_option(&mut self, option: OptionId) -> Option<OptionValue> {
        self.log.push(format!("get_option {option:?}"));
        Some(match option {
            OptionId::ProtocolVersion => OptionValue::Number(self.script.reported_version),
            _ => OptionValue::Number(0),
        })
    }

    async fn start_tls(&mut self) -> bool {
        self.log.push("start_tls".to_string());
        if !self.script.start_tls_ok {
            self.last_error = self.script.error.clone();
        }
        self.script.start_tls_ok
    }

    async fn simple_bind(&mut self, dn: &str, _password: &str) -> bool {
        self.log.push(format!("bind {dn}"));
        if !self.script.bind_ok {
            self.last_error = self.script.error.clone();
        }
        self.script.bind_ok
    }

    async fn compare(&mut self, dn: &str, attribute: &str, value: &str) -> CompareOutcome {
        self.log.push(format!("compare {dn} {attribute}={value}"));
        if self.script.compare == CompareOutcome::Undefined {
            self.last_error = self.script.error.clone();
        }
        self.script.compare
    }

    async fn search(
        &mut self,
        targets: &[SearchTarget],
        _options: &SearchOptions,
    ) -> Option<Vec<RawSearchResponse>> {
        let described: Vec<String> = targets
            .iter()
            .map(|t| format!("{}?{}", t.base, t.filter))
            .collect();
        self.log.push(format!("search [{}]", described.join(", ")));
        match self.script.responses.clone() {
            Some(responses) => Some(responses),
            None => {
                self.last_error = self.script.error.clone();
                None
            }
        }
    }

    async fn parse_result(&mut self, response: &RawSearchResponse) -> Option<ResultDiagnostic> {
        if self.script.with_diagnostics {
            response.diagnostic.clone().or_else(|| Some(ResultDiagnostic::default()))
        } else {
            None
        }
    }

    async fn disconnect(&mut self) {
        self.log.push("disconnect".to_string());
    }

    fn error_state(&self) -> ErrorState {
        self.last_error.clone()
    }
}

/// Builds a raw response from `(dn, [(attr, [values])])` tuples.
pub fn raw_response(entries: &[(&str, &[(&str, &[&str])])]) -> RawSearchResponse {
    let entries: Vec<RawEntry> = entries
        .iter()
        .map(|(dn, attrs)| {
            let mut names = Vec::new();
            let mut values = std::collections::HashMap::new();
            for (name, vals) in attrs.iter() {
                names.push((*name).to_string());
                values.insert(
                    (*name).to_string(),
                    RawValues {
                        count: vals.len(),
                        values: vals.iter().map(|v| (*v).to_string()).collect(),
                    },
                );
            }
            RawEntry {
                dn: (*dn).to_string(),
                count: names.len(),
                names,
                values,
            }
        })
        .collect();
    RawSearchResponse {
        count: entries.len(),
        entries,
        diagnostic: None,
    }
}
