//! # Domain Errors
//!
//! Error types for the contract extension subsystem.

use shared_types::Address;
use thiserror::Error;

use super::value_objects::ShareStep;

/// Contract extension errors.
///
/// One variant per external collaborator so a log line names who failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtensionError {
    /// Ledger RPC failure (transaction lookup, subscription setup).
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Malformed event payload or encoded value.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Management contract read or write failed.
    #[error("Management contract error: {0}")]
    ManagementContract(String),

    /// Private transaction manager call failed.
    #[error("Private transaction manager error: {0}")]
    PrivateTransactionManager(String),

    /// Account manager could not build transaction options.
    #[error("Account manager error: {0}")]
    Accounts(String),

    /// State dump for the target contract failed.
    #[error("State fetch error: {0}")]
    StateFetch(String),

    /// Registry snapshot could not be loaded or saved.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// No open extension for this management contract.
    #[error("Extension contract not found: {0}")]
    ExtensionNotFound(Address),

    /// The local node holds no signing credentials for this account.
    #[error("No local credentials for account {0}")]
    MissingCredentials(Address),

    /// Watchers are already running.
    #[error("Extension service already started")]
    AlreadyStarted,

    /// Log subscription failed.
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for extension operations.
pub type ExtensionResult<T> = Result<T, ExtensionError>;

/// Failure of one step of the state-share protocol.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("State share failed at {step}: {source}")]
pub struct StateShareError {
    /// Step that failed.
    pub step: ShareStep,
    /// Underlying failure.
    #[source]
    pub source: ExtensionError,
}

impl StateShareError {
    /// True when the node simply is not the proposal's creator.
    pub fn is_not_creator(&self) -> bool {
        matches!(self.source, ExtensionError::MissingCredentials(_))
    }
}

/// Tag a fallible protocol step with its [`ShareStep`].
pub trait StepContext<T> {
    /// Attach the step identifier to the error.
    fn at(self, step: ShareStep) -> Result<T, StateShareError>;
}

impl<T> StepContext<T> for ExtensionResult<T> {
    fn at(self, step: ShareStep) -> Result<T, StateShareError> {
        self.map_err(|source| StateShareError { step, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = ExtensionError::ExtensionNotFound(Address([0xcc; 20]));
        assert!(err.to_string().contains("0xcccc"));
    }

    #[test]
    fn test_step_context_names_step() {
        let result: ExtensionResult<()> =
            Err(ExtensionError::StateFetch("missing trie node".into()));
        let err = result.at(ShareStep::FetchState).unwrap_err();

        assert_eq!(err.step, ShareStep::FetchState);
        assert!(err.to_string().contains("fetch_state"));
        assert!(err.to_string().contains("missing trie node"));
        assert!(!err.is_not_creator());
    }

    #[test]
    fn test_missing_credentials_is_not_creator() {
        let err = StateShareError {
            step: ShareStep::CheckCredentials,
            source: ExtensionError::MissingCredentials(Address([1u8; 20])),
        };
        assert!(err.is_not_creator());
    }
}
