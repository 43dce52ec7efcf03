//! Non-fatal diagnostics and the sinks that collect them.
//!
//! Dependency errors never abort a generation pass. They are reported through a
//! [`DiagnosticSink`], the affected root is stubbed, and sibling roots proceed.

use std::fmt;
use std::sync::Arc;

use tracing::error;

use crate::key::TypeKey;

/// What went wrong while resolving a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A provider transitively requires itself
    CircularDependency,
    /// A required input has no provider
    MissingDependency,
    /// An asynchronous provider is needed from a synchronous context
    RequiresAsync,
    /// Several declared providers satisfy one type
    AmbiguousDependency,
}

impl DiagnosticKind {
    /// Stable diagnostic code.
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::CircularDependency => "DI0101",
            DiagnosticKind::MissingDependency => "DI0102",
            DiagnosticKind::RequiresAsync => "DI0103",
            DiagnosticKind::AmbiguousDependency => "DI0106",
        }
    }
}

/// Position of the container declaration a diagnostic refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: Arc<str>,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: &str, line: u32, column: u32) -> Self {
        Self { file: Arc::from(file), line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A dependency error found while checking one root.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Diagnostic, DiagnosticKind, TypeKey};
///
/// let diagnostic = Diagnostic::new(
///     DiagnosticKind::MissingDependency,
///     TypeKey::named("A"),
///     TypeKey::named("D"),
/// );
///
/// assert_eq!(diagnostic.code(), "DI0102");
/// assert_eq!(
///     diagnostic.to_string(),
///     "error DI0102: Error while resolving dependencies for 'A': We have no source for instance of type 'D'"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// The root whose resolution failed
    pub root: TypeKey,
    /// The type the error is about
    pub offending: TypeKey,
    /// Candidate count, for ambiguous dependencies
    pub candidates: usize,
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, root: TypeKey, offending: TypeKey) -> Self {
        Self { kind, root, offending, candidates: 0, location: None }
    }

    pub fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> String {
        let detail = match self.kind {
            DiagnosticKind::CircularDependency => format!("'{}' has a circular dependency", self.offending),
            DiagnosticKind::MissingDependency => {
                format!("We have no source for instance of type '{}'", self.offending)
            }
            DiagnosticKind::RequiresAsync => {
                format!("'{}' can only be resolved asynchronously.", self.offending)
            }
            DiagnosticKind::AmbiguousDependency => format!(
                "We have {} sources for instance of type '{}' and no best source",
                self.candidates, self.offending
            ),
        };
        format!("Error while resolving dependencies for '{}': {}", self.root, detail)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{}: ", location)?;
        }
        write!(f, "error {}: {}", self.code(), self.message())
    }
}

/// Receives diagnostics as they are found.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn report(&mut self, diagnostic: Diagnostic) {
        (**self).report(diagnostic);
    }
}

/// Adapts a closure into a sink.
///
/// ```rust
/// use ferrous_inject::{Diagnostic, DiagnosticKind, DiagnosticSink, FnSink, TypeKey};
///
/// let mut codes = Vec::new();
/// let mut sink = FnSink(|d: Diagnostic| codes.push(d.code()));
/// sink.report(Diagnostic::new(
///     DiagnosticKind::CircularDependency,
///     TypeKey::named("A"),
///     TypeKey::named("A"),
/// ));
/// drop(sink);
/// assert_eq!(codes, ["DI0101"]);
/// ```
pub struct FnSink<F>(pub F);

impl<F: FnMut(Diagnostic)> DiagnosticSink for FnSink<F> {
    fn report(&mut self, diagnostic: Diagnostic) {
        (self.0)(diagnostic);
    }
}

/// Logs every diagnostic through `tracing` at error level.
#[derive(Debug, Default)]
pub struct TracingSink {
    reported: usize,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of diagnostics logged so far.
    pub fn reported(&self) -> usize {
        self.reported
    }
}

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.reported += 1;
        error!(
            code = diagnostic.code(),
            root = %diagnostic.root,
            offending = %diagnostic.offending,
            "{}",
            diagnostic.message()
        );
    }
}
