//! Ghost groups: named sets of ghosts whose relevancy is decided together.
//! A ghost that belongs to any group loses static optimization, so the
//! manager tracks membership both ways.

use std::collections::HashMap;

use thiserror::Error;

use crate::types::GhostId;

pub type GhostGroupId = u16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GhostGroupError {
    #[error("Ghost group {0} does not exist")]
    UnknownGroup(GhostGroupId),
    #[error("Ghost {ghost:?} is already in group {group}")]
    AlreadyMember { group: GhostGroupId, ghost: GhostId },
    #[error("Ghost {ghost:?} is not in group {group}")]
    NotMember { group: GhostGroupId, ghost: GhostId },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GhostGroup {
    members: Vec<GhostId>,
}

impl GhostGroup {
    pub fn members(&self) -> &[GhostId] {
        &self.members
    }

    pub fn contains(&self, ghost: GhostId) -> bool {
        self.members.contains(&ghost)
    }
}

#[derive(Debug, Default)]
pub struct GhostGroupManager {
    groups: HashMap<GhostGroupId, GhostGroup>,
    memberships: HashMap<GhostId, Vec<GhostGroupId>>,
    next_id: GhostGroupId,
}

impl GhostGroupManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_group(&mut self) -> GhostGroupId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.groups.insert(id, GhostGroup::default());
        id
    }

    /// Destroys a group and releases its members. The ghosts themselves are
    /// untouched; only the grouping goes away.
    pub fn destroy_group(&mut self, group: GhostGroupId) -> Result<(), GhostGroupError> {
        let Some(removed) = self.groups.remove(&group) else {
            return Err(GhostGroupError::UnknownGroup(group));
        };
        for ghost in removed.members {
            if let Some(groups) = self.memberships.get_mut(&ghost) {
                groups.retain(|id| *id != group);
                if groups.is_empty() {
                    self.memberships.remove(&ghost);
                }
            }
        }
        Ok(())
    }

    pub fn add_member(
        &mut self,
        group: GhostGroupId,
        ghost: GhostId,
    ) -> Result<(), GhostGroupError> {
        let Some(entry) = self.groups.get_mut(&group) else {
            return Err(GhostGroupError::UnknownGroup(group));
        };
        if entry.contains(ghost) {
            return Err(GhostGroupError::AlreadyMember { group, ghost });
        }
        entry.members.push(ghost);
        self.memberships.entry(ghost).or_default().push(group);
        Ok(())
    }

    pub fn remove_member(
        &mut self,
        group: GhostGroupId,
        ghost: GhostId,
    ) -> Result<(), GhostGroupError> {
        let Some(entry) = self.groups.get_mut(&group) else {
            return Err(GhostGroupError::UnknownGroup(group));
        };
        if !entry.contains(ghost) {
            return Err(GhostGroupError::NotMember { group, ghost });
        }
        entry.members.retain(|member| *member != ghost);
        if let Some(groups) = self.memberships.get_mut(&ghost) {
            groups.retain(|id| *id != group);
            if groups.is_empty() {
                self.memberships.remove(&ghost);
            }
        }
        Ok(())
    }

    /// Called on despawn so a recycled ghost id never inherits groupings.
    pub fn remove_from_all(&mut self, ghost: GhostId) {
        let Some(groups) = self.memberships.remove(&ghost) else {
            return;
        };
        for group in groups {
            if let Some(entry) = self.groups.get_mut(&group) {
                entry.members.retain(|member| *member != ghost);
            }
        }
    }

    pub fn group(&self, group: GhostGroupId) -> Result<&GhostGroup, GhostGroupError> {
        self.groups
            .get(&group)
            .ok_or(GhostGroupError::UnknownGroup(group))
    }

    pub fn is_member(&self, ghost: GhostId) -> bool {
        self.memberships.contains_key(&ghost)
    }

    pub fn groups_of(&self, ghost: GhostId) -> &[GhostGroupId] {
        self.memberships
            .get(&ghost)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
