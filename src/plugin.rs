//! Monitoring plugin response (Nagios / Icinga2 plugin API).
//!
//! One line on stdout, `STATUS: message, message | 'label'=value...`, and
//! the status as exit code.

use std::fmt;
use std::process::ExitCode;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
}

impl Status {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("invalid performance data label {0:?}")]
    InvalidLabel(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerfValue {
    Int(u64),
    Float(f64),
}

impl PerfValue {
    fn as_f64(self) -> f64 {
        match self {
            PerfValue::Int(n) => n as f64,
            PerfValue::Float(x) => x,
        }
    }
}

impl From<u64> for PerfValue {
    fn from(n: u64) -> Self {
        PerfValue::Int(n)
    }
}

impl From<f64> for PerfValue {
    fn from(x: f64) -> Self {
        PerfValue::Float(x)
    }
}

impl fmt::Display for PerfValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerfValue::Int(n) => write!(f, "{n}"),
            PerfValue::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Upper bounds: a value above `warn` is WARNING, above `crit` CRITICAL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warn: Option<f64>,
    pub crit: Option<f64>,
}

impl Thresholds {
    pub fn new(warn: f64, crit: f64) -> Self {
        Self {
            warn: Some(warn),
            crit: Some(crit),
        }
    }

    pub fn evaluate(&self, value: f64) -> Status {
        if self.crit.is_some_and(|crit| value > crit) {
            Status::Critical
        } else if self.warn.is_some_and(|warn| value > warn) {
            Status::Warning
        } else {
            Status::Ok
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerfPoint {
    label: String,
    value: PerfValue,
    unit: &'static str,
    thresholds: Option<Thresholds>,
}

impl PerfPoint {
    pub fn new(label: impl Into<String>, value: impl Into<PerfValue>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            unit: "",
            thresholds: None,
        }
    }

    pub fn unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    fn status(&self) -> Status {
        self.thresholds
            .map_or(Status::Ok, |t| t.evaluate(self.value.as_f64()))
    }
}

impl fmt::Display for PerfPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'={}{}", self.label, self.value, self.unit)?;
        let (warn, crit) = self
            .thresholds
            .map_or((None, None), |t| (t.warn, t.crit));
        let bound = |b: Option<f64>| b.map(|b| b.to_string()).unwrap_or_default();
        // warn;crit;min;max
        write!(f, ";{};{};;", bound(warn), bound(crit))
    }
}

#[derive(Debug)]
pub struct Response {
    status: Status,
    default_ok_message: String,
    messages: Vec<String>,
    perf: Vec<PerfPoint>,
}

impl Response {
    pub fn new(default_ok_message: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            default_ok_message: default_ok_message.into(),
            messages: Vec::new(),
            perf: Vec::new(),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Record `message`, raising the status if `status` is more severe.
    pub fn update_status(&mut self, status: Status, message: impl Into<String>) {
        self.raise(status);
        self.messages.push(message.into());
    }

    /// Turn a failed check into UNKNOWN with the whole error chain as
    /// message.
    pub fn update_status_on_error(&mut self, err: &anyhow::Error) {
        self.update_status(Status::Unknown, format!("{err:#}"));
    }

    /// Add a performance data point; its thresholds raise the status.
    pub fn add_perf_point(&mut self, point: PerfPoint) -> Result<(), PluginError> {
        if point.label.is_empty() || point.label.contains(['\'', '=']) {
            return Err(PluginError::InvalidLabel(point.label));
        }
        self.raise(point.status());
        self.perf.push(point);
        Ok(())
    }

    fn raise(&mut self, status: Status) {
        self.status = self.status.max(status);
    }

    pub fn output(&self) -> String {
        let mut out = format!("{}: ", self.status);
        if self.messages.is_empty() {
            out.push_str(&self.default_ok_message);
        } else {
            out.push_str(&self.messages.join(", "));
        }
        if !self.perf.is_empty() {
            let perf: Vec<String> = self.perf.iter().map(PerfPoint::to_string).collect();
            out.push_str(" | ");
            out.push_str(&perf.join(" "));
        }
        out
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.status.code())
    }
}
