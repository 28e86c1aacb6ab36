// Audit module for Threshold Recovery Node
//
// Append-only, line-oriented event trail. Lines carry the blinded wallet
// identifier, never the raw public key, so the log is safe to ship off-box.
// Durability is best-effort: a lost tail entry never fails a request.

use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use tracing::error;

/// Audited event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent {
    Register,
    LivenessUpdate,
    LivenessRejected,
    Status,
    SharePickup,
    SharePickupDenied,
    ShareRelease,
    ShareReleaseBlocked,
}

impl AuditEvent {
    /// Stable wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::Register => "REGISTER",
            AuditEvent::LivenessUpdate => "LIVENESS_UPDATE",
            AuditEvent::LivenessRejected => "LIVENESS_REJECTED",
            AuditEvent::Status => "STATUS",
            AuditEvent::SharePickup => "SHARE_PICKUP",
            AuditEvent::SharePickupDenied => "SHARE_PICKUP_DENIED",
            AuditEvent::ShareRelease => "SHARE_RELEASE",
            AuditEvent::ShareReleaseBlocked => "SHARE_RELEASE_BLOCKED",
        }
    }
}

/// Append-only audit log
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Create a logger appending to the file at `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Append one event line: `timestamp | wallet_hint | event | detail`.
    ///
    /// Concurrent writers interleave whole lines through O_APPEND. Failures
    /// are reported through tracing and otherwise swallowed.
    pub fn log(&self, wallet_hint: &str, event: AuditEvent, detail: &str) {
        let line = format!(
            "{} | {} | {} | {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            wallet_hint,
            event.as_str(),
            detail
        );

        let result = OpenOptions::new()
            .append(true)
            .create(true)
            .mode(0o600)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));

        if let Err(e) = result {
            error!("Failed to append audit entry to {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_entries_append_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(&path);

        log.log("wallet-a", AuditEvent::Register, "success");
        log.log("wallet-a", AuditEvent::SharePickupDenied, "recovery locked");

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("| wallet-a | REGISTER | success"));
        assert!(lines[1].contains("| SHARE_PICKUP_DENIED | recovery locked"));
    }

    #[test]
    fn test_log_failure_does_not_panic() {
        let log = AuditLog::new("/nonexistent-dir/audit.log");
        log.log("wallet-a", AuditEvent::Status, "");
    }
}
