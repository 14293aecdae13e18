//! Cross-flag constraints checked after parsing completes.

use std::collections::HashSet;

use crate::error::UsageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Optional,
    Required,
    ExactlyOne,
    AtLeastOne,
    AtMostOne,
}

/// A flag that belongs to a group: its data key and the spelling used in messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub key: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagGroup {
    kind: GroupKind,
    desc: String,
    members: Vec<GroupMember>,
}

impl FlagGroup {
    pub fn new(kind: GroupKind, desc: impl Into<String>, members: Vec<GroupMember>) -> Self {
        Self {
            kind,
            desc: desc.into(),
            members,
        }
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn members(&self) -> &[GroupMember] {
        &self.members
    }

    /// Check the group against the set of flag keys recognized during a parse.
    pub fn validate(&self, seen: &HashSet<String>) -> Vec<UsageError> {
        let seen_names: Vec<String> = self
            .members
            .iter()
            .filter(|m| seen.contains(&m.key))
            .map(|m| m.display_name.clone())
            .collect();
        let group = self.desc.clone();

        match self.kind {
            GroupKind::Optional => Vec::new(),
            GroupKind::Required => self
                .members
                .iter()
                .filter(|m| !seen.contains(&m.key))
                .map(|m| UsageError::FlagRequired {
                    flag: m.display_name.clone(),
                })
                .collect(),
            GroupKind::ExactlyOne => match seen_names.len() {
                0 => vec![UsageError::ExactlyOneMissing { group }],
                1 => Vec::new(),
                _ => vec![UsageError::ExactlyOneConflict {
                    group,
                    seen: seen_names,
                }],
            },
            GroupKind::AtLeastOne if seen_names.is_empty() => {
                vec![UsageError::AtLeastOneMissing { group }]
            }
            GroupKind::AtLeastOne => Vec::new(),
            GroupKind::AtMostOne if seen_names.len() > 1 => vec![UsageError::AtMostOneConflict {
                group,
                seen: seen_names,
            }],
            GroupKind::AtMostOne => Vec::new(),
        }
    }
}
