//! Structured log records and the per-scenario / per-run results that replace
//! a global error counter.

use crate::port::PortId;
use crate::shadow::ShadowMemory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Error,
    AssertFailure,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Debug => "DBG",
            Severity::Info => "INF",
            Severity::Error => "ERR",
            Severity::AssertFailure => "ASSERT",
        }
    }

    /// Error and assertion records count against the run.
    pub fn is_failure(self) -> bool {
        matches!(self, Severity::Error | Severity::AssertFailure)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub severity: Severity,
    /// Simulation time the record was emitted at.
    pub time: u64,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogRecord {
    pub fn new(severity: Severity, time: u64, message: impl Into<String>) -> Self {
        Self {
            severity,
            time,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, key: &'static str, value: impl ToString) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:08}] {}: {}", self.time, self.severity.label(), self.message)?;
        for (key, value) in &self.fields {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// Receives every record the testbench emits.
pub trait LogSink {
    fn record(&mut self, record: &LogRecord);
}

/// Forwards records to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn record(&mut self, record: &LogRecord) {
        match record.severity {
            severity if severity.is_failure() => log::error!("{record}"),
            Severity::Info => log::info!("{record}"),
            _ => log::debug!("{record}"),
        }
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub records: Vec<LogRecord>,
}

impl LogSink for CollectingSink {
    fn record(&mut self, record: &LogRecord) {
        self.records.push(record.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Ready asserted while request was low.
    ProtocolViolation,
    DataMismatch {
        address: u32,
        expected: u32,
        observed: u32,
    },
    Timeout {
        limit: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub time: u64,
    pub iteration: u32,
    /// `None` for run-level failures such as a timeout.
    pub port: Option<PortId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read { data: u32 },
    Write { be: u8, data: u32 },
}

/// A handshake observed on a controller port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub iteration: u32,
    pub port: PortId,
    pub addr: u32,
    pub access: Access,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every sequence drained.
    Done,
    /// Iteration limit reached first.
    Aborted,
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub outcome: Outcome,
    pub iterations: u32,
    pub failures: Vec<Failure>,
    pub completions: Vec<Completion>,
    /// Shadow memory as it stood when the scenario ended.
    pub shadow: ShadowMemory,
}

impl ScenarioReport {
    pub fn error_count(&self) -> usize {
        self.failures.len()
    }

    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Done && self.failures.is_empty()
    }

    pub fn protocol_violations(&self) -> impl Iterator<Item = &Failure> {
        self.failures
            .iter()
            .filter(|f| f.kind == FailureKind::ProtocolViolation)
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &Failure> {
        self.failures
            .iter()
            .filter(|f| matches!(f.kind, FailureKind::DataMismatch { .. }))
    }

    pub fn completions_on(&self, port: PortId) -> impl Iterator<Item = &Completion> {
        self.completions.iter().filter(move |c| c.port == port)
    }

    /// Data returned by every completed read, in completion order.
    pub fn reads(&self) -> impl Iterator<Item = (PortId, u32, u32)> + '_ {
        self.completions.iter().filter_map(|c| match c.access {
            Access::Read { data } => Some((c.port, c.addr, data)),
            Access::Write { .. } => None,
        })
    }
}

/// Results of every scenario in one run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub scenarios: Vec<ScenarioReport>,
}

impl RunSummary {
    pub fn push(&mut self, report: ScenarioReport) {
        self.scenarios.push(report);
    }

    pub fn error_count(&self) -> usize {
        self.scenarios.iter().map(ScenarioReport::error_count).sum()
    }

    pub fn timeouts(&self) -> usize {
        self.scenarios
            .iter()
            .filter(|r| r.outcome == Outcome::Aborted)
            .count()
    }

    pub fn passed(&self) -> bool {
        self.error_count() == 0
    }
}
