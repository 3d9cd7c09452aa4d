/// Audience resolver: decides whether a rule is aimed at the current subject.
///
/// A rule carries a non-empty set of audience tags. The rule is relevant when
/// ANY tag matches the subject's role. Soft and hard support collapse onto
/// the single `Support` role.
///
/// `IN_LANE` always matches here: whether the subject is actually laning
/// against the rule's hero right now is decided by the host before it asks.
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "safelane")]
    Carry,
    Mid,
    Offlane,
    #[serde(alias = "soft_support", alias = "hard_support")]
    Support,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Carry, Role::Mid, Role::Offlane, Role::Support];

    pub fn is_core(self) -> bool {
        matches!(self, Role::Carry | Role::Mid | Role::Offlane)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Carry   => "carry",
            Role::Mid     => "mid",
            Role::Offlane => "offlane",
            Role::Support => "support",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "carry" | "safelane" => Ok(Role::Carry),
            "mid"               => Ok(Role::Mid),
            "offlane"           => Ok(Role::Offlane),
            "support" | "soft_support" | "hard_support" => Ok(Role::Support),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudienceTag {
    All,
    InLane,
    RoleCore,
    RoleMid,
    RoleCarry,
    RoleOfflane,
    RoleSupport,
    RoleSupportSoft,
    RoleSupportHard,
}

impl AudienceTag {
    pub fn matches(self, role: Role) -> bool {
        match self {
            AudienceTag::All | AudienceTag::InLane => true,
            AudienceTag::RoleCore    => role.is_core(),
            AudienceTag::RoleMid     => role == Role::Mid,
            AudienceTag::RoleCarry   => role == Role::Carry,
            AudienceTag::RoleOfflane => role == Role::Offlane,
            AudienceTag::RoleSupport
            | AudienceTag::RoleSupportSoft
            | AudienceTag::RoleSupportHard => role == Role::Support,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AudienceTag::All             => "ALL",
            AudienceTag::InLane          => "IN_LANE",
            AudienceTag::RoleCore        => "ROLE_CORE",
            AudienceTag::RoleMid         => "ROLE_MID",
            AudienceTag::RoleCarry       => "ROLE_CARRY",
            AudienceTag::RoleOfflane     => "ROLE_OFFLANE",
            AudienceTag::RoleSupport     => "ROLE_SUPPORT",
            AudienceTag::RoleSupportSoft => "ROLE_SUPPORT_SOFT",
            AudienceTag::RoleSupportHard => "ROLE_SUPPORT_HARD",
        }
    }
}

impl FromStr for AudienceTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALL"               => Ok(AudienceTag::All),
            "IN_LANE"           => Ok(AudienceTag::InLane),
            "ROLE_CORE"         => Ok(AudienceTag::RoleCore),
            "ROLE_MID"          => Ok(AudienceTag::RoleMid),
            "ROLE_CARRY"        => Ok(AudienceTag::RoleCarry),
            "ROLE_OFFLANE"      => Ok(AudienceTag::RoleOfflane),
            "ROLE_SUPPORT"      => Ok(AudienceTag::RoleSupport),
            "ROLE_SUPPORT_SOFT" => Ok(AudienceTag::RoleSupportSoft),
            "ROLE_SUPPORT_HARD" => Ok(AudienceTag::RoleSupportHard),
            other               => Err(format!("unknown audience tag '{}'", other)),
        }
    }
}

/// True iff any tag in `tags` matches `role`.
pub fn is_relevant(tags: &[AudienceTag], role: Role) -> bool {
    tags.iter().any(|t| t.matches(role))
}

/// True iff the rule is relevant to at least one of `roles`.
pub fn is_relevant_for_any(tags: &[AudienceTag], roles: &[Role]) -> bool {
    roles.iter().any(|r| is_relevant(tags, *r))
}

/// Every role the tag set reaches, in `Role::ALL` order.
pub fn matching_roles(tags: &[AudienceTag]) -> Vec<Role> {
    Role::ALL.into_iter().filter(|r| is_relevant(tags, *r)).collect()
}

/// Parse a catalog audience list. Duplicates are dropped, first occurrence
/// wins; an empty list or an unknown tag rejects the rule.
pub fn parse_audience(rule_id: &str, raw: &[String]) -> Result<Vec<AudienceTag>, ConfigurationError> {
    if raw.is_empty() {
        return Err(ConfigurationError::new(rule_id, "audience must not be empty"));
    }
    let mut tags = Vec::with_capacity(raw.len());
    for entry in raw {
        let tag = entry
            .trim()
            .parse::<AudienceTag>()
            .map_err(|e| ConfigurationError::new(rule_id, e))?;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_covers_three_roles() {
        let tags = [AudienceTag::RoleCore];
        assert!(is_relevant(&tags, Role::Carry));
        assert!(is_relevant(&tags, Role::Mid));
        assert!(is_relevant(&tags, Role::Offlane));
        assert!(!is_relevant(&tags, Role::Support));
    }

    #[test]
    fn support_variants_collapse() {
        for tag in [AudienceTag::RoleSupport, AudienceTag::RoleSupportSoft, AudienceTag::RoleSupportHard] {
            assert_eq!(matching_roles(&[tag]), vec![Role::Support]);
        }
    }

    #[test]
    fn tags_are_or_combined() {
        let tags = [AudienceTag::RoleSupport, AudienceTag::RoleMid];
        assert!(is_relevant(&tags, Role::Support));
        assert!(is_relevant(&tags, Role::Mid));
        assert!(!is_relevant(&tags, Role::Carry));
        assert!(!is_relevant(&tags, Role::Offlane));

        // Mid is part of core, so support+core reaches mid too
        let tags = [AudienceTag::RoleSupport, AudienceTag::RoleCore];
        assert_eq!(matching_roles(&tags), Role::ALL.to_vec());
    }

    #[test]
    fn all_and_in_lane_always_match() {
        assert_eq!(matching_roles(&[AudienceTag::All]), Role::ALL.to_vec());
        assert_eq!(matching_roles(&[AudienceTag::InLane]), Role::ALL.to_vec());
    }

    #[test]
    fn relevant_for_any_scans_a_roster() {
        let tags = [AudienceTag::RoleCarry];
        assert!(is_relevant_for_any(&tags, &[Role::Support, Role::Carry]));
        assert!(!is_relevant_for_any(&tags, &[Role::Support, Role::Mid]));
        assert!(!is_relevant_for_any(&tags, &[]));
    }

    #[test]
    fn parses_and_dedups() {
        let raw = vec!["ROLE_MID".to_owned(), "ALL".to_owned(), "ROLE_MID".to_owned()];
        let tags = parse_audience("r1", &raw).unwrap();
        assert_eq!(tags, vec![AudienceTag::RoleMid, AudienceTag::All]);
    }

    #[test]
    fn rejects_empty_and_unknown() {
        let err = parse_audience("r1", &[]).unwrap_err();
        assert_eq!(err.rule_id, "r1");

        let err = parse_audience("r2", &["ROLE_JUNGLE".to_owned()]).unwrap_err();
        assert_eq!(err.rule_id, "r2");
        assert!(err.reason.contains("ROLE_JUNGLE"));
    }

    #[test]
    fn role_parsing() {
        assert_eq!("hard_support".parse::<Role>(), Ok(Role::Support));
        assert_eq!("MID".parse::<Role>(), Ok(Role::Mid));
        assert!("jungler".parse::<Role>().is_err());
    }
}
