use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};

/// Prefix carried by every panic raised through [`guarantee!`].
pub const INTERNAL_ERROR: &str = "internal compiler error";

/// A compiler diagnostic (error or warning).
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: String) -> Self {
        Self {
            severity: Severity::Error,
            message,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Whether this diagnostic reports a failed [`guarantee!`].
    pub fn is_internal(&self) -> bool {
        self.message.contains(INTERNAL_ERROR)
    }

    /// Render the diagnostic to stderr using ariadne.
    ///
    /// `origin` names what was being processed (a target file, a
    /// compilation unit). There is no source text to point into, so the
    /// report carries the message, notes and help only.
    pub fn render(&self, origin: &str) {
        use ariadne::{Report, ReportKind, Source};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let mut report =
            Report::<(&str, Range<usize>)>::build(kind, origin, 0).with_message(&self.message);

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        // Writing to stderr can only fail if stderr is closed.
        let _ = report.finish().eprint((origin, Source::from("")));
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], origin: &str) {
    for diag in diagnostics {
        diag.render(origin);
    }
}

/// Fatal internal-consistency check.
///
/// A failed guarantee means the compiler itself is wrong (two tables out of
/// sync, a combination nobody designed for). It is not a recoverable
/// condition: it aborts the enclosing compilation unit, which
/// [`catch_internal_error`] turns into a diagnostic.
#[macro_export]
macro_rules! guarantee {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            panic!("{}: {}", $crate::diagnostic::INTERNAL_ERROR, format_args!($($arg)+));
        }
    };
}

/// Run `f` as one compilation unit. A failed [`guarantee!`] inside it
/// becomes an error diagnostic naming the unit; any other panic is not
/// ours to handle and keeps unwinding.
pub fn catch_internal_error<T>(unit: &str, f: impl FnOnce() -> T) -> Result<T, Diagnostic> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => match panic_message(payload.as_ref()).map(str::to_string) {
            Some(msg) if msg.starts_with(INTERNAL_ERROR) => {
                log::error!("compilation of '{}' aborted: {}", unit, msg);
                Err(Diagnostic::error(format!("{} (in '{}')", msg, unit))
                    .with_note("compilation of this unit was abandoned".to_string()))
            }
            _ => panic::resume_unwind(payload),
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
    if let Some(s) = payload.downcast_ref::<String>() {
        Some(s.as_str())
    } else {
        payload.downcast_ref::<&'static str>().copied()
    }
}
