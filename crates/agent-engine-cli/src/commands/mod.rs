//! Command drivers.

use std::process::ExitCode;

pub mod cleanup;
pub mod deploy;
pub mod list;
pub mod run_flow;
pub mod send;
pub mod sessions;

/// How a driver finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Nothing is deployed.
    NoDeployments,
    /// No usable session could be obtained.
    NoSession,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Completed => Self::SUCCESS,
            Outcome::NoDeployments | Outcome::NoSession => Self::from(1u8),
        }
    }
}
