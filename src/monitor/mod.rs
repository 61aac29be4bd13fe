//! Host condition flags to mount role edges.
//!
//! The host reports raw condition flags at whatever rate it likes, repeats
//! included. [`RoleMonitor`] keeps the last level for each role and only
//! yields an edge when a level actually changes.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::playback::Role;

/// Condition flags the host can report. Anything else is ignored.
///
/// Names are matched case-insensitively, so the host's own spellings
/// (`Mounted`, `Mounted2`, `RidingPillion`) work as well as snake case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionFlag {
    /// Mounted and in control of the mount.
    Mounted,
    /// Riding as a passenger on someone else's mount.
    RidingPillion,
    Other(String),
}

impl ConditionFlag {
    pub fn role(&self) -> Option<Role> {
        match self {
            ConditionFlag::Mounted => Some(Role::Driving),
            ConditionFlag::RidingPillion => Some(Role::Passenger),
            ConditionFlag::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ConditionFlag::Mounted => "mounted",
            ConditionFlag::RidingPillion => "riding_pillion",
            ConditionFlag::Other(name) => name,
        }
    }
}

impl FromStr for ConditionFlag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let flag = match s.trim().to_ascii_lowercase().as_str() {
            "mounted" | "driving" => ConditionFlag::Mounted,
            "riding_pillion" | "ridingpillion" | "mounted2" | "passenger" => {
                ConditionFlag::RidingPillion
            }
            other => ConditionFlag::Other(other.to_string()),
        };
        Ok(flag)
    }
}

impl From<String> for ConditionFlag {
    fn from(name: String) -> Self {
        match name.parse() {
            Ok(flag) => flag,
            Err(never) => match never {},
        }
    }
}

impl From<ConditionFlag> for String {
    fn from(flag: ConditionFlag) -> Self {
        flag.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleState {
    pub driving_mounted: bool,
    pub passenger_mounted: bool,
}

impl RoleState {
    fn get_mut(&mut self, role: Role) -> &mut bool {
        match role {
            Role::Driving => &mut self.driving_mounted,
            Role::Passenger => &mut self.passenger_mounted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEdge {
    pub role: Role,
    pub old: bool,
    pub new: bool,
}

#[derive(Debug, Default)]
pub struct RoleMonitor {
    state: RoleState,
}

impl RoleMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RoleState {
        self.state
    }

    /// Record a raw flag update. Returns the edge if the role level changed.
    pub fn observe(&mut self, flag: &ConditionFlag, value: bool) -> Option<RoleEdge> {
        let Some(role) = flag.role() else {
            debug!("Ignoring condition flag {}", flag.as_str());
            return None;
        };

        let level = self.state.get_mut(role);
        if *level == value {
            debug!("Duplicate {:?} notification ({}), ignored", role, value);
            return None;
        }

        let old = std::mem::replace(level, value);
        Some(RoleEdge {
            role,
            old,
            new: value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_parsing() {
        assert_eq!("mounted".parse::<ConditionFlag>().unwrap(), ConditionFlag::Mounted);
        assert_eq!(
            "Mounted2".parse::<ConditionFlag>().unwrap(),
            ConditionFlag::RidingPillion
        );
        assert_eq!(
            "passenger".parse::<ConditionFlag>().unwrap(),
            ConditionFlag::RidingPillion
        );
        assert_eq!(
            "swimming".parse::<ConditionFlag>().unwrap(),
            ConditionFlag::Other("swimming".to_string())
        );
    }

    #[test]
    fn test_host_flag_names_deserialize() {
        for (name, role) in [
            ("Mounted", Role::Driving),
            ("Mounted2", Role::Passenger),
            ("RidingPillion", Role::Passenger),
        ] {
            let flag: ConditionFlag = serde_json::from_str(&format!("\"{name}\"")).unwrap();
            assert_eq!(flag.role(), Some(role), "{name}");
        }
    }

    #[test]
    fn test_flag_serializes_canonical_name() {
        let json = serde_json::to_string(&ConditionFlag::RidingPillion).unwrap();
        assert_eq!(json, "\"riding_pillion\"");
    }

    #[test]
    fn test_flag_deserialization() {
        let flag: ConditionFlag = serde_json::from_str("\"riding_pillion\"").unwrap();
        assert_eq!(flag, ConditionFlag::RidingPillion);

        let flag: ConditionFlag = serde_json::from_str("\"mounted2\"").unwrap();
        assert_eq!(flag, ConditionFlag::RidingPillion);

        let flag: ConditionFlag = serde_json::from_str("\"in_combat\"").unwrap();
        assert_eq!(flag, ConditionFlag::Other("in_combat".to_string()));
    }

    #[test]
    fn test_edges_only_on_change() {
        let mut monitor = RoleMonitor::new();

        let edge = monitor.observe(&ConditionFlag::Mounted, true).unwrap();
        assert_eq!(
            edge,
            RoleEdge {
                role: Role::Driving,
                old: false,
                new: true
            }
        );

        assert!(monitor.observe(&ConditionFlag::Mounted, true).is_none());

        let edge = monitor.observe(&ConditionFlag::Mounted, false).unwrap();
        assert!(edge.old);
        assert!(!edge.new);
    }

    #[test]
    fn test_initial_false_is_not_an_edge() {
        let mut monitor = RoleMonitor::new();
        assert!(monitor.observe(&ConditionFlag::RidingPillion, false).is_none());
    }

    #[test]
    fn test_roles_are_independent() {
        let mut monitor = RoleMonitor::new();
        monitor.observe(&ConditionFlag::Mounted, true);
        let edge = monitor.observe(&ConditionFlag::RidingPillion, true).unwrap();
        assert_eq!(edge.role, Role::Passenger);

        let state = monitor.state();
        assert!(state.driving_mounted);
        assert!(state.passenger_mounted);
    }

    #[test]
    fn test_other_flags_ignored() {
        let mut monitor = RoleMonitor::new();
        assert!(monitor
            .observe(&ConditionFlag::Other("in_combat".into()), true)
            .is_none());
        assert_eq!(monitor.state(), RoleState::default());
    }
}
