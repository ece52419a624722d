//! Group and membership registry persistence.
//!
//! # Responsibility
//! - Persist groups and per-(group, user) membership records.
//! - Answer role-fact lookups for the authorization gate.
//!
//! # Invariants
//! - One membership row per (group, user) (table primary key).
//! - `is_representative` implies `accepted` (table `CHECK`).
//! - Deleting a group cascades to memberships, tasks, reactions and
//!   templates through foreign keys.

use crate::model::group::{normalize_group_name, Group, GroupView, Membership};
use crate::model::{EntityKind, GroupId, UserId};
use crate::repo::{bool_to_int, now_ms, parse_flag, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const MEMBERSHIP_SELECT_SQL: &str = "SELECT
    group_id,
    user_id,
    accepted,
    is_representative,
    joined_at
FROM memberships";

/// Repository interface for groups and their memberships.
pub trait MembershipRepository {
    fn insert_group(&self, group_id: GroupId, name: &str) -> RepoResult<Group>;
    fn get_group(&self, group_id: GroupId) -> RepoResult<Option<Group>>;
    fn delete_group(&self, group_id: GroupId) -> RepoResult<()>;

    fn insert_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
        accepted: bool,
        is_representative: bool,
    ) -> RepoResult<Membership>;
    fn get_membership(&self, group_id: GroupId, user_id: UserId)
        -> RepoResult<Option<Membership>>;
    fn set_accepted(&self, group_id: GroupId, user_id: UserId) -> RepoResult<Membership>;
    fn set_representative(
        &self,
        group_id: GroupId,
        user_id: UserId,
        is_representative: bool,
    ) -> RepoResult<Membership>;
    fn delete_membership(&self, group_id: GroupId, user_id: UserId) -> RepoResult<()>;

    /// Members ordered by join time; pending rows only when
    /// `accepted_only` is `false`.
    fn list_members(&self, group_id: GroupId, accepted_only: bool)
        -> RepoResult<Vec<Membership>>;
    fn count_representatives(&self, group_id: GroupId) -> RepoResult<u32>;
    /// Groups where `user_id` is an accepted member, by name.
    fn list_groups_for_user(&self, user_id: UserId) -> RepoResult<Vec<GroupView>>;
}

/// SQLite-backed membership registry.
pub struct SqliteMembershipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMembershipRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn require_membership(&self, group_id: GroupId, user_id: UserId) -> RepoResult<Membership> {
        self.get_membership(group_id, user_id)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Membership, user_id))
    }
}

impl MembershipRepository for SqliteMembershipRepository<'_> {
    fn insert_group(&self, group_id: GroupId, name: &str) -> RepoResult<Group> {
        let name = normalize_group_name(name)?;
        let created_at = now_ms();
        self.conn.execute(
            "INSERT INTO groups (group_id, name, created_at) VALUES (?1, ?2, ?3);",
            params![group_id.to_string(), name.as_str(), created_at],
        )?;
        Ok(Group {
            group_id,
            name,
            created_at,
        })
    }

    fn get_group(&self, group_id: GroupId) -> RepoResult<Option<Group>> {
        let mut stmt = self
            .conn
            .prepare("SELECT group_id, name, created_at FROM groups WHERE group_id = ?1;")?;
        let mut rows = stmt.query([group_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_group_row(row)?));
        }
        Ok(None)
    }

    fn delete_group(&self, group_id: GroupId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM groups WHERE group_id = ?1;", [group_id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Group, group_id));
        }
        Ok(())
    }

    fn insert_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
        accepted: bool,
        is_representative: bool,
    ) -> RepoResult<Membership> {
        let membership = Membership {
            group_id,
            user_id,
            accepted,
            is_representative: accepted && is_representative,
            joined_at: now_ms(),
        };
        self.conn.execute(
            "INSERT INTO memberships (group_id, user_id, accepted, is_representative, joined_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                group_id.to_string(),
                user_id.to_string(),
                bool_to_int(membership.accepted),
                bool_to_int(membership.is_representative),
                membership.joined_at,
            ],
        )?;
        Ok(membership)
    }

    fn get_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> RepoResult<Option<Membership>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMBERSHIP_SELECT_SQL} WHERE group_id = ?1 AND user_id = ?2;"
        ))?;
        let mut rows = stmt.query([group_id.to_string(), user_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_membership_row(row)?));
        }
        Ok(None)
    }

    fn set_accepted(&self, group_id: GroupId, user_id: UserId) -> RepoResult<Membership> {
        let changed = self.conn.execute(
            "UPDATE memberships SET accepted = 1 WHERE group_id = ?1 AND user_id = ?2;",
            [group_id.to_string(), user_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Membership, user_id));
        }
        self.require_membership(group_id, user_id)
    }

    fn set_representative(
        &self,
        group_id: GroupId,
        user_id: UserId,
        is_representative: bool,
    ) -> RepoResult<Membership> {
        let changed = self.conn.execute(
            "UPDATE memberships
             SET is_representative = ?1
             WHERE group_id = ?2 AND user_id = ?3 AND accepted = 1;",
            params![
                bool_to_int(is_representative),
                group_id.to_string(),
                user_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Membership, user_id));
        }
        self.require_membership(group_id, user_id)
    }

    fn delete_membership(&self, group_id: GroupId, user_id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM memberships WHERE group_id = ?1 AND user_id = ?2;",
            [group_id.to_string(), user_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Membership, user_id));
        }
        Ok(())
    }

    fn list_members(
        &self,
        group_id: GroupId,
        accepted_only: bool,
    ) -> RepoResult<Vec<Membership>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMBERSHIP_SELECT_SQL}
             WHERE group_id = ?1
               AND (?2 = 0 OR accepted = 1)
             ORDER BY joined_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query(params![group_id.to_string(), bool_to_int(accepted_only)])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_membership_row(row)?);
        }
        Ok(members)
    }

    fn count_representatives(&self, group_id: GroupId) -> RepoResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM memberships
             WHERE group_id = ?1 AND accepted = 1 AND is_representative = 1;",
            [group_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_groups_for_user(&self, user_id: UserId) -> RepoResult<Vec<GroupView>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                g.group_id,
                g.name,
                g.created_at,
                m.user_id,
                m.accepted,
                m.is_representative,
                m.joined_at
             FROM memberships m
             INNER JOIN groups g ON g.group_id = m.group_id
             WHERE m.user_id = ?1 AND m.accepted = 1
             ORDER BY g.name ASC, g.group_id ASC;",
        )?;
        let mut rows = stmt.query([user_id.to_string()])?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(GroupView {
                group: parse_group_row(row)?,
                my_membership: parse_membership_row(row)?,
            });
        }
        Ok(groups)
    }
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<Group> {
    let group_id: String = row.get("group_id")?;
    Ok(Group {
        group_id: parse_uuid("groups.group_id", &group_id)?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_membership_row(row: &Row<'_>) -> RepoResult<Membership> {
    let group_id: String = row.get("group_id")?;
    let user_id: String = row.get("user_id")?;
    let accepted = parse_flag("memberships.accepted", row.get("accepted")?)?;
    let is_representative =
        parse_flag("memberships.is_representative", row.get("is_representative")?)?;
    if is_representative && !accepted {
        return Err(RepoError::InvalidData(format!(
            "pending membership {group_id}/{user_id} cannot be representative"
        )));
    }

    Ok(Membership {
        group_id: parse_uuid("memberships.group_id", &group_id)?,
        user_id: parse_uuid("memberships.user_id", &user_id)?,
        accepted,
        is_representative,
        joined_at: row.get("joined_at")?,
    })
}
