use serde::Serialize;

use crate::span::Span;

/// A compiler diagnostic (error or warning).
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
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

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    fn report(&self, filename: &str) -> ariadne::Report<'static, (String, std::ops::Range<usize>)> {
        use ariadne::{Color, Label, Report, ReportKind};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let file = filename.to_string();
        let mut report = Report::build(kind, file.clone(), self.span.start as usize)
            .with_message(&self.message)
            .with_label(
                Label::new((file, self.span.start as usize..self.span.end as usize))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report.finish()
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, listing: &str) {
        use ariadne::Source;

        if let Err(err) = self
            .report(filename)
            .eprint((filename.to_string(), Source::from(listing)))
        {
            tracing::warn!("failed to render diagnostic: {err}");
        }
    }

    /// Render the diagnostic into a string, without colors.
    pub fn render_to_string(&self, filename: &str, listing: &str) -> String {
        use ariadne::Source;

        let mut buf = Vec::new();
        let written = self
            .report(filename)
            .write((filename.to_string(), Source::from(listing)), &mut buf);
        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.message.clone(),
        }
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, listing: &str) {
    for diag in diagnostics {
        diag.render(filename, listing);
    }
}
