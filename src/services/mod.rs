pub mod health_checker;
pub mod log_store;
pub mod registry;
pub mod secrets;
pub mod vault;

pub use health_checker::{CheckOutcome, HealthChecker};
pub use log_store::ActivityLog;
pub use registry::ServerRegistry;
pub use secrets::{Secret, SecretCipher};
pub use vault::CredentialVault;
