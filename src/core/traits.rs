//! Seam traits for the dependency conflict engine.
//!
//! These are the boundaries the specification calls out as external
//! collaborators: the package index metadata service (C3) and the package
//! manager invoked to enact a plan (C6). Production code wires a real HTTP
//! client / subprocess adapter; tests wire an in-memory fixture.

use async_trait::async_trait;

use super::{Result, Version};

/// Queries a package index for released versions and per-version
/// requirement strings.
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Released, non-yanked versions of `name`, descending. Pre-releases are
    /// excluded unless every available version is a pre-release.
    async fn versions(&self, name: &str) -> Result<Vec<Version>>;

    /// Raw `requires_dist`-style requirement strings declared by `name` at
    /// `version`.
    async fn requires(&self, name: &str, version: &Version) -> Result<Vec<String>>;
}

/// The minimum package-manager surface the executor and lock/restore
/// facility need: install, uninstall, and enumerate what's installed.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Uninstalls `name`, whatever version is currently installed.
    async fn uninstall(&self, name: &str) -> Result<CommandOutcome>;

    /// Installs the exact `version` of `name`.
    async fn install(&self, name: &str, version: &Version) -> Result<CommandOutcome>;

    /// Lists everything currently installed, as (normalized name, version) pairs.
    async fn list_installed(&self) -> Result<Vec<(String, Version)>>;
}

/// The result of a single package-manager invocation.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Process exit status (0 == success).
    pub status: i32,
    /// Combined stdout/stderr capture.
    pub output: String,
}

impl CommandOutcome {
    /// Whether the command completed successfully.
    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// A synthetic success outcome, used by dry-run and by fixtures.
    pub fn success(output: impl Into<String>) -> Self {
        Self { status: 0, output: output.into() }
    }
}

/// Cooperative cancellation signal checked between index calls and between
/// executor items (§5). Not preemptive: a caller must poll
/// [`CancellationToken::is_cancelled`] at a suspension point.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl CancellationToken {
    /// A token that is not yet cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token cancelled. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Whether [`CancellationToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn command_outcome_success_helper() {
        let outcome = CommandOutcome::success("dry run: would install foo==1.0.0");
        assert!(outcome.is_success());
    }
}
