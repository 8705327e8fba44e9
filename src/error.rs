//! Error types for the stagelock coordinator.
//!
//! Every failure that crosses a component boundary is a [`Error`]: a fixed
//! category ([`ErrorKind`]), a logging severity ([`Severity`]), an operation
//! trail recording which components the failure passed through, and optional
//! resource context (the resource contract and request involved).
//!
//! Kind and severity are decided where the error is created and are never
//! overridden by outer wrappers; wrapping with [`Error::at`] only extends the
//! trail. The dispatch boundary surfaces the rendered trail as the single
//! error message of the rejected invocation and logs it once at the carried
//! severity.

use thiserror::Error as ThisError;

/// Category of a coordinator failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input fields. Caller-fixable, never retried.
    InvalidInput,
    /// The referenced request or lock does not exist.
    NotFound,
    /// Lock contention, a state-machine violation, or a resource contract's
    /// business rejection. The caller must resolve the conflict before
    /// retrying; this layer never retries on its own.
    Conflict,
    /// Storage or protocol-adapter fault. An environment problem rather than
    /// a caller problem.
    Unexpected,
}

impl ErrorKind {
    /// Stable name used in boundary logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

/// Severity at which a failure is logged at the dispatch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warn,
    Info,
    Debug,
}

/// Structured coordinator error.
///
/// Constructed with one of the kind-specific constructors, then enriched
/// field-by-field: [`Error::at`] appends an operation name to the trail,
/// [`Error::with_contract`] / [`Error::with_request`] attach resource
/// context. Context attached closest to the failure wins; outer attachments
/// never overwrite it.
#[derive(Debug, ThisError)]
#[error("{}", self.render())]
pub struct Error {
    kind: ErrorKind,
    severity: Severity,
    /// Operation names, innermost first.
    ops: Vec<&'static str>,
    contract: Option<String>,
    request_id: Option<String>,
    message: String,
}

impl Error {
    fn new(kind: ErrorKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            ops: Vec::new(),
            contract: None,
            request_id: None,
            message: message.into(),
        }
    }

    /// A malformed-input failure. Logged at debug severity: the caller sent
    /// something this layer rejects by contract.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, Severity::Debug, message)
    }

    /// A missing request or lock. Logged at info severity.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, Severity::Info, message)
    }

    /// A lock, state-machine, or business-rule conflict. Logged at warn
    /// severity: contention is the signal an operator watches for.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, Severity::Warn, message)
    }

    /// A storage or protocol fault. Logged at error severity.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, Severity::Error, message)
    }

    /// Append `op` to the operation trail. Called by each operation an error
    /// propagates through, innermost first.
    pub fn at(mut self, op: &'static str) -> Self {
        self.ops.push(op);
        self
    }

    /// Attach the resource contract involved, unless one was already attached
    /// closer to the failure.
    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract.get_or_insert_with(|| contract.into());
        self
    }

    /// Attach the request involved, unless one was already attached closer to
    /// the failure.
    pub fn with_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id.get_or_insert_with(|| request_id.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Operation trail, innermost first.
    pub fn operations(&self) -> &[&'static str] {
        &self.ops
    }

    pub fn contract(&self) -> Option<&str> {
        self.contract.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for op in self.ops.iter().rev() {
            out.push_str(op);
            out.push_str(": ");
        }
        out.push_str(&self.message);
        out
    }
}

/// Result type alias for coordinator operations.
pub type Result<T> = std::result::Result<T, Error>;
