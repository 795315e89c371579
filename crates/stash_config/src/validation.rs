use std::{fmt, path::Path};

use crate::{StashConfig, StoreBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The config loads, but probably not the way it was meant.
    Warning,
    /// The config is rejected and defaults are used instead.
    Error,
}

/// One finding, tied to the `section.key` it is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub key: &'static str,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{level}: {}: {}", self.key, self.message)
    }
}

/// Findings for a loaded `stash.conf`, in the order they were checked.
#[derive(Debug, Default)]
pub struct ConfigReport {
    issues: Vec<Issue>,
}

impl ConfigReport {
    pub fn is_ok(&self) -> bool {
        !self.has_errors()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.by_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.by_severity(Severity::Warning)
    }

    /// One indented line per issue, errors before warnings.
    pub fn format(&self) -> String {
        self.errors()
            .chain(self.warnings())
            .map(|issue| format!("  {issue}\n"))
            .collect()
    }

    fn by_severity(&self, severity: Severity) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    fn push(&mut self, severity: Severity, key: &'static str, message: impl Into<String>) {
        self.issues.push(Issue {
            severity,
            key,
            message: message.into(),
        });
    }
}

pub fn validate(cfg: &StashConfig) -> ConfigReport {
    let mut report = ConfigReport::default();

    validate_global(cfg, &mut report);
    validate_store(cfg, &mut report);
    validate_server(cfg, &mut report);

    report
}

fn validate_global(cfg: &StashConfig, report: &mut ConfigReport) {
    if cfg.global.log_level.trim().is_empty() {
        report.push(
            Severity::Warning,
            "global.log_level",
            "empty; nothing is logged unless RUST_LOG is set",
        );
    }
}

fn validate_store(cfg: &StashConfig, report: &mut ConfigReport) {
    if cfg.store.backend == StoreBackend::Memory {
        report.push(
            Severity::Warning,
            "store.backend",
            "memory: --clear-cache from another process cannot reach this server",
        );
        if cfg.store.path.is_some() {
            report.push(Severity::Warning, "store.path", "ignored with the memory backend");
        }
        return;
    }

    let Some(path) = cfg.store.path.as_deref() else {
        return;
    };
    if path.trim().is_empty() {
        report.push(Severity::Error, "store.path", "empty");
    } else if Path::new(path).is_dir() {
        report.push(
            Severity::Error,
            "store.path",
            format!("'{path}' is a directory, expected a database file"),
        );
    }
}

fn validate_server(cfg: &StashConfig, report: &mut ConfigReport) {
    if let Err(e) = cfg.server.host() {
        report.push(
            Severity::Error,
            "server.host",
            format!("'{}' is not an IP address ({e})", cfg.server.host),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{Severity, validate};
    use crate::{StashConfig, StoreBackend};

    #[test]
    fn default_config_is_clean() {
        let report = validate(&StashConfig::default());
        assert!(report.is_ok());
        assert!(!report.has_warnings());
        assert!(report.issues().is_empty());
        assert!(report.format().is_empty());
    }

    #[test]
    fn bad_host_and_empty_path_are_errors() {
        let mut cfg = StashConfig::default();
        cfg.server.host = "localhost:80".into();
        cfg.store.path = Some("  ".into());

        let report = validate(&cfg);
        assert!(report.has_errors());

        let keys: Vec<_> = report.errors().map(|i| i.key).collect();
        assert_eq!(keys, ["store.path", "server.host"]);
        assert!(report.format().starts_with("  error: store.path: empty\n"));
    }

    #[test]
    fn directory_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = StashConfig::default();
        cfg.store.path = Some(dir.path().display().to_string());

        let report = validate(&cfg);
        let issue = report.errors().next().expect("error");
        assert_eq!(issue.key, "store.path");
        assert!(issue.message.contains("is a directory"));
    }

    #[test]
    fn memory_backend_warns_and_errors_come_first() {
        let mut cfg = StashConfig::default();
        cfg.store.backend = StoreBackend::Memory;
        cfg.store.path = Some("/tmp/unused.sqlite".into());
        cfg.server.host = "nope".into();

        let report = validate(&cfg);
        assert_eq!(report.warnings().count(), 2);
        assert_eq!(report.issues()[0].severity, Severity::Warning);

        let rendered = report.format();
        assert!(rendered.starts_with("  error: server.host:"));
        assert!(rendered.contains("  warning: store.backend: memory"));
    }
}
