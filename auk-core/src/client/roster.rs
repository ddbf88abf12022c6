//! Roster operations: friend list, group list, member lists, and the
//! group administration calls.

use std::sync::Arc;

use tracing::debug;

use crate::client::Client;
use crate::directory::{Group, GroupMember, Permission};
use crate::error::AukError;
use crate::packet::PacketKind;
use crate::protocol::{commands, encode, Response};
use crate::protocol::messaging::GroupAdminRequest;
use crate::protocol::roster::{
    FriendListRequest, FriendListResponse, GroupListRequest, MemberListRequest, FRIEND_PAGE_SIZE,
};

impl Client {
    // ── Friends ──────────────────────────────────────────────────

    /// Fetch the full friend list: pages of up to 150 entries, starting
    /// at the accumulated count, until the server-reported total is
    /// reached.
    pub async fn get_friend_list(&self) -> Result<FriendListResponse, AukError> {
        let mut aggregated = FriendListResponse { total_count: 0, list: Vec::new() };
        loop {
            let body = encode(&FriendListRequest {
                start: aggregated.list.len() as i16,
                count: FRIEND_PAGE_SIZE,
            })?;
            let envelope = self.engine.envelope(PacketKind::Simple, commands::FRIEND_LIST, body);
            let page = match self.engine.send_and_wait(&envelope).await? {
                Some(Response::FriendList(page)) => page,
                _ => return Err(AukError::UnexpectedResponse { command: commands::FRIEND_LIST }),
            };
            aggregated.total_count = page.total_count;
            aggregated.list.extend(page.list);
            if aggregated.list.len() as i32 >= aggregated.total_count {
                break;
            }
        }
        Ok(aggregated)
    }

    /// Refresh the cached friend list.
    pub async fn reload_friend_list(&self) -> Result<(), AukError> {
        let response = self.get_friend_list().await?;
        self.engine.directory.set_friends(response.list.into_iter().map(Arc::new).collect());
        Ok(())
    }

    // ── Groups ───────────────────────────────────────────────────

    /// Fetch all groups, then each group's member list. A member-list
    /// failure skips that group rather than failing the whole fetch.
    pub async fn get_group_list(&self) -> Result<Vec<Arc<Group>>, AukError> {
        let body = encode(&GroupListRequest { cookie: Vec::new() })?;
        let envelope = self.engine.envelope(PacketKind::Simple, commands::GROUP_LIST, body);
        let response = match self.engine.send_and_wait(&envelope).await? {
            Some(Response::GroupList(response)) => response,
            _ => return Err(AukError::UnexpectedResponse { command: commands::GROUP_LIST }),
        };

        let groups: Vec<Arc<Group>> = response
            .groups
            .into_iter()
            .map(|entry| {
                Arc::new(Group::new(
                    entry.uin,
                    entry.code,
                    entry.name,
                    entry.owner_uin,
                    entry.member_count,
                    entry.max_member_count,
                ))
            })
            .collect();

        for group in &groups {
            match self.get_group_members(group).await {
                Ok(members) => group.set_members(members),
                Err(e) => {
                    debug!(group_code = group.code, error = %e, "member list fetch failed");
                }
            }
        }
        Ok(groups)
    }

    /// Fetch one group's member list, paged by the server's next-uin
    /// cursor until it returns 0. The configured owner always carries
    /// the Owner permission, whatever the per-member payload says.
    pub async fn get_group_members(&self, group: &Group) -> Result<Vec<GroupMember>, AukError> {
        let mut next_uin = 0i64;
        let mut members = Vec::new();
        loop {
            let body = encode(&MemberListRequest {
                group_uin: group.uin,
                group_code: group.code,
                next_uin,
            })?;
            let envelope = self.engine.envelope(PacketKind::Simple, commands::MEMBER_LIST, body);
            let page = match self.engine.send_and_wait(&envelope).await? {
                Some(Response::MemberList(page)) => page,
                _ => return Err(AukError::UnexpectedResponse { command: commands::MEMBER_LIST }),
            };
            next_uin = page.next_uin;
            for mut member in page.members {
                if member.uin == group.owner_uin {
                    member.permission = Permission::Owner;
                }
                members.push(member);
            }
            if next_uin == 0 {
                return Ok(members);
            }
        }
    }

    /// Refresh the cached group list. Serialized against concurrent
    /// reloads; the cache swap itself happens under the list lock.
    pub async fn reload_group_list(&self) -> Result<(), AukError> {
        let _guard = self.engine.reload_guard.lock().await;
        let groups = self.get_group_list().await?;
        self.engine.directory.set_groups(groups);
        Ok(())
    }

    // ── Group administration ─────────────────────────────────────

    async fn group_admin(&self, request: GroupAdminRequest) -> Result<(), AukError> {
        let body = encode(&request)?;
        let envelope = self.engine.envelope(PacketKind::Simple, commands::GROUP_ADMIN, body);
        self.engine.send_and_wait(&envelope).await.map(|_| ())
    }

    pub async fn edit_member_card(
        &self,
        group_code: i64,
        member_uin: i64,
        card: &str,
    ) -> Result<(), AukError> {
        self.group_admin(GroupAdminRequest::EditMemberCard {
            group_code,
            member_uin,
            card: card.to_owned(),
        })
        .await
    }

    pub async fn edit_member_special_title(
        &self,
        group_code: i64,
        member_uin: i64,
        title: &str,
    ) -> Result<(), AukError> {
        self.group_admin(GroupAdminRequest::EditSpecialTitle {
            group_code,
            member_uin,
            title: title.to_owned(),
        })
        .await
    }

    pub async fn update_group_name(&self, group_code: i64, name: &str) -> Result<(), AukError> {
        self.group_admin(GroupAdminRequest::UpdateGroupName { group_code, name: name.to_owned() })
            .await
    }

    pub async fn group_mute_all(&self, group_code: i64, mute: bool) -> Result<(), AukError> {
        self.group_admin(GroupAdminRequest::MuteAll { group_code, mute }).await
    }

    pub async fn group_mute(
        &self,
        group_code: i64,
        member_uin: i64,
        seconds: u32,
    ) -> Result<(), AukError> {
        self.group_admin(GroupAdminRequest::MuteMember { group_code, member_uin, seconds }).await
    }

    pub async fn kick_group_member(
        &self,
        group_code: i64,
        member_uin: i64,
        message: &str,
    ) -> Result<(), AukError> {
        self.group_admin(GroupAdminRequest::KickMember {
            group_code,
            member_uin,
            message: message.to_owned(),
        })
        .await
    }

    pub async fn quit_group(&self, group_code: i64) -> Result<(), AukError> {
        self.group_admin(GroupAdminRequest::Quit { group_code }).await
    }
}
