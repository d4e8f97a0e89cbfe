use crate::poller::StatusSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const RULES_NOT_INSTALLED: &str = "rules_not_installed";
pub const RULES_NOT_UPDATED: &str = "rules_not_updated";
pub const TIMELINES_NOT_INSTALLED: &str = "timelines_not_installed";
pub const TIMELINES_NOT_UPDATED: &str = "timelines_not_updated";

/// Counters that must all reach zero for an install to have taken effect
pub const PENDING_COUNTERS: [&str; 4] = [
    RULES_NOT_INSTALLED,
    RULES_NOT_UPDATED,
    TIMELINES_NOT_INSTALLED,
    TIMELINES_NOT_UPDATED,
];

/// Body of the pre-packaged status endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepackagedStatus {
    #[serde(default)]
    pub rules_custom_installed: Option<u64>,
    #[serde(default)]
    pub rules_installed: Option<u64>,
    #[serde(default)]
    pub rules_not_installed: Option<u64>,
    #[serde(default)]
    pub rules_not_updated: Option<u64>,
    #[serde(default)]
    pub timelines_installed: Option<u64>,
    #[serde(default)]
    pub timelines_not_installed: Option<u64>,
    #[serde(default)]
    pub timelines_not_updated: Option<u64>,
}

/// Coarse install state derived from the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    /// Nothing from the package is installed yet
    NotInstalled,
    /// Part of the package is installed
    SomeNotInstalled,
    NeedsUpdate,
    Installed,
    Unknown,
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackageStatus::NotInstalled => "not installed",
            PackageStatus::SomeNotInstalled => "partially installed",
            PackageStatus::NeedsUpdate => "update available",
            PackageStatus::Installed => "installed",
            PackageStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl PrepackagedStatus {
    pub fn classify(&self) -> PackageStatus {
        let (
            Some(rules_installed),
            Some(rules_not_installed),
            Some(rules_not_updated),
            Some(timelines_installed),
            Some(timelines_not_installed),
            Some(timelines_not_updated),
        ) = (
            self.rules_installed,
            self.rules_not_installed,
            self.rules_not_updated,
            self.timelines_installed,
            self.timelines_not_installed,
            self.timelines_not_updated,
        )
        else {
            return PackageStatus::Unknown;
        };

        if rules_installed == 0 && timelines_installed == 0 {
            if rules_not_installed > 0 || timelines_not_installed > 0 {
                return PackageStatus::NotInstalled;
            }
            return PackageStatus::Installed;
        }

        if rules_not_installed > 0 || timelines_not_installed > 0 {
            return PackageStatus::SomeNotInstalled;
        }

        if rules_not_updated > 0 || timelines_not_updated > 0 {
            return PackageStatus::NeedsUpdate;
        }

        PackageStatus::Installed
    }

    pub fn to_snapshot(&self) -> StatusSnapshot {
        StatusSnapshot::from_counters([
            ("rules_custom_installed", self.rules_custom_installed),
            ("rules_installed", self.rules_installed),
            (RULES_NOT_INSTALLED, self.rules_not_installed),
            (RULES_NOT_UPDATED, self.rules_not_updated),
            ("timelines_installed", self.timelines_installed),
            (TIMELINES_NOT_INSTALLED, self.timelines_not_installed),
            (TIMELINES_NOT_UPDATED, self.timelines_not_updated),
        ])
    }
}

impl From<PrepackagedStatus> for StatusSnapshot {
    fn from(status: PrepackagedStatus) -> Self {
        status.to_snapshot()
    }
}
