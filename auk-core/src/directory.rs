//! Directory entities: friends, groups, group members.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Permission tier of a member within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    Owner,
    Administrator,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friend {
    pub uin: i64,
    pub nickname: String,
    pub remark: String,
    pub face_id: i16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub uin: i64,
    pub nickname: String,
    pub card_name: String,
    pub join_time: i64,
    pub level: u16,
    pub permission: Permission,
    pub special_title: String,
}

impl GroupMember {
    /// Card name when set, nickname otherwise.
    pub fn display_name(&self) -> &str {
        if self.card_name.is_empty() { &self.nickname } else { &self.card_name }
    }
}

/// A group and its cached member list.
///
/// The member list has its own lock, distinct from the client's
/// whole-group-list lock: splicing one group's members must not block
/// lookups across the rest of the directory.
#[derive(Debug)]
pub struct Group {
    pub uin: i64,
    pub code: i64,
    pub name: String,
    pub owner_uin: i64,
    pub member_count: u16,
    pub max_member_count: u16,
    members: Mutex<Vec<GroupMember>>,
}

impl Group {
    pub fn new(
        uin: i64,
        code: i64,
        name: String,
        owner_uin: i64,
        member_count: u16,
        max_member_count: u16,
    ) -> Self {
        Self {
            uin,
            code,
            name,
            owner_uin,
            member_count,
            max_member_count,
            members: Mutex::new(Vec::new()),
        }
    }

    pub fn set_members(&self, members: Vec<GroupMember>) {
        *self.members.lock().expect("member list poisoned") = members;
    }

    pub fn members(&self) -> Vec<GroupMember> {
        self.members.lock().expect("member list poisoned").clone()
    }

    pub fn find_member(&self, uin: i64) -> Option<GroupMember> {
        self.members
            .lock()
            .expect("member list poisoned")
            .iter()
            .find(|m| m.uin == uin)
            .cloned()
    }

    /// Remove a member by uin: linear scan and splice under the group's
    /// own lock.
    pub fn remove_member(&self, uin: i64) {
        let mut members = self.members.lock().expect("member list poisoned");
        if let Some(idx) = members.iter().position(|m| m.uin == uin) {
            members.remove(idx);
        }
    }

    /// This account's permission tier in the group.
    pub fn self_permission(&self, self_uin: i64) -> Permission {
        self.find_member(self_uin).map(|m| m.permission).unwrap_or(Permission::Member)
    }

    pub fn administrator_or_owner(&self, self_uin: i64) -> bool {
        matches!(
            self.self_permission(self_uin),
            Permission::Administrator | Permission::Owner
        )
    }
}

/// In-memory friend and group caches.
///
/// The two list locks cover whole-list replacement and linear lookups;
/// member splicing inside one group takes that group's own lock (see
/// [`Group`]).
#[derive(Debug, Default)]
pub struct DirectoryCache {
    friends: Mutex<Vec<std::sync::Arc<Friend>>>,
    groups: Mutex<Vec<std::sync::Arc<Group>>>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_friends(&self, friends: Vec<std::sync::Arc<Friend>>) {
        *self.friends.lock().expect("friend list poisoned") = friends;
    }

    pub fn friends(&self) -> Vec<std::sync::Arc<Friend>> {
        self.friends.lock().expect("friend list poisoned").clone()
    }

    pub fn find_friend(&self, uin: i64) -> Option<std::sync::Arc<Friend>> {
        self.friends
            .lock()
            .expect("friend list poisoned")
            .iter()
            .find(|f| f.uin == uin)
            .cloned()
    }

    pub fn set_groups(&self, groups: Vec<std::sync::Arc<Group>>) {
        *self.groups.lock().expect("group list poisoned") = groups;
    }

    pub fn groups(&self) -> Vec<std::sync::Arc<Group>> {
        self.groups.lock().expect("group list poisoned").clone()
    }

    pub fn find_group(&self, code: i64) -> Option<std::sync::Arc<Group>> {
        self.groups
            .lock()
            .expect("group list poisoned")
            .iter()
            .find(|g| g.code == code)
            .cloned()
    }

    pub fn find_group_by_uin(&self, uin: i64) -> Option<std::sync::Arc<Group>> {
        self.groups
            .lock()
            .expect("group list poisoned")
            .iter()
            .find(|g| g.uin == uin)
            .cloned()
    }
}

/// Group uin as derived from the group code, used as the destination of
/// upload-slot requests.
pub fn group_uin_from_code(code: i64) -> i64 {
    let left = code / 1000000;
    let prefix = match left {
        0..=10 => left + 202,
        11..=19 => left + 469,
        20..=66 => left + 2080,
        67..=156 => left + 1943,
        157..=209 => left + 1990,
        210..=309 => left + 3890,
        310..=499 => left + 3490,
        _ => left,
    };
    prefix * 1000000 + code % 1000000
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn member(uin: i64, permission: Permission) -> GroupMember {
        GroupMember {
            uin,
            nickname: format!("nick{uin}"),
            card_name: String::new(),
            join_time: 0,
            level: 1,
            permission,
            special_title: String::new(),
        }
    }

    fn group() -> Group {
        let g = Group::new(1000, 2000, "test".into(), 11, 3, 200);
        g.set_members(vec![
            member(11, Permission::Owner),
            member(12, Permission::Administrator),
            member(13, Permission::Member),
        ]);
        g
    }

    #[test]
    fn find_and_remove_member() {
        let g = group();
        assert!(g.find_member(12).is_some());
        g.remove_member(12);
        assert!(g.find_member(12).is_none());
        assert_eq!(g.members().len(), 2);
        // Removing an absent member is a no-op.
        g.remove_member(999);
        assert_eq!(g.members().len(), 2);
    }

    #[test]
    fn permission_helpers() {
        let g = group();
        assert_eq!(g.self_permission(11), Permission::Owner);
        assert!(g.administrator_or_owner(12));
        assert!(!g.administrator_or_owner(13));
        // Unknown uins fall back to plain member.
        assert_eq!(g.self_permission(404), Permission::Member);
    }

    #[test]
    fn display_name_prefers_card() {
        let mut m = member(5, Permission::Member);
        assert_eq!(m.display_name(), "nick5");
        m.card_name = "card".into();
        assert_eq!(m.display_name(), "card");
    }

    #[test]
    fn group_uin_derivation() {
        assert_eq!(group_uin_from_code(5_123_456), 207_123_456);
        assert_eq!(group_uin_from_code(15_000_001), 484_000_001);
        assert_eq!(group_uin_from_code(500_000_000), 500_000_000);
    }

    #[test]
    fn cache_lookup_and_swap() {
        use std::sync::Arc;

        let cache = DirectoryCache::new();
        cache.set_friends(vec![Arc::new(Friend {
            uin: 7,
            nickname: "seven".into(),
            remark: String::new(),
            face_id: 0,
        })]);
        assert!(cache.find_friend(7).is_some());
        assert!(cache.find_friend(8).is_none());

        cache.set_groups(vec![Arc::new(group())]);
        assert!(cache.find_group(2000).is_some());
        assert!(cache.find_group_by_uin(1000).is_some());
        assert!(cache.find_group(1).is_none());

        // Wholesale replacement drops the old entries.
        cache.set_groups(Vec::new());
        assert!(cache.groups().is_empty());
    }
}
