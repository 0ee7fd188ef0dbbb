//! Reaction to receiver transport faults

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Per-deployment choice of what a transport fault does to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultPolicy {
    /// Close and reopen the receiver connection, then sync again
    #[default]
    SelfHeal,

    /// End the bridge with an error and let the host's supervisor restart the process
    Escalate,

    /// Terminate the process immediately with the configured status
    Exit,
}

/// What the bridge does about one particular fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    Reconnect,
    Escalate,
    Exit(i32),
}

impl FaultPolicy {
    pub fn action(self, exit_code: i32) -> FaultAction {
        match self {
            FaultPolicy::SelfHeal => FaultAction::Reconnect,
            FaultPolicy::Escalate => FaultAction::Escalate,
            FaultPolicy::Exit => FaultAction::Exit(exit_code),
        }
    }
}

impl Display for FaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultPolicy::SelfHeal => write!(f, "self-heal"),
            FaultPolicy::Escalate => write!(f, "escalate"),
            FaultPolicy::Exit => write!(f, "exit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_policy_to_action() {
        assert_eq!(FaultPolicy::SelfHeal.action(3), FaultAction::Reconnect);
        assert_eq!(FaultPolicy::Escalate.action(3), FaultAction::Escalate);
        assert_eq!(FaultPolicy::Exit.action(3), FaultAction::Exit(3));
    }

    #[test]
    fn self_heal_is_the_default() {
        assert_eq!(FaultPolicy::default(), FaultPolicy::SelfHeal);
    }

    #[test]
    fn parses_kebab_case_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: FaultPolicy,
        }

        let parsed: Wrapper = toml::from_str("policy = \"self-heal\"").unwrap();
        assert_eq!(parsed.policy, FaultPolicy::SelfHeal);
        let parsed: Wrapper = toml::from_str("policy = \"exit\"").unwrap();
        assert_eq!(parsed.policy, FaultPolicy::Exit);
        assert!(toml::from_str::<Wrapper>("policy = \"restart\"").is_err());
    }
}
