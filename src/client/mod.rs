pub mod rules_client;
pub mod status;

pub use rules_client::{ClientError, InstallResponse, RulesClient};
pub use status::{PackageStatus, PrepackagedStatus, PENDING_COUNTERS};
