//! Group lifecycle and membership registry operations.
//!
//! Membership state machine per (group, user):
//! none -> pending (`request_join`) -> accepted (`decide(accept)`)
//! -> none (`leave` / `remove_member`); pending -> none (`decide(reject)`).
//! Leaving clears the member's reactions on the group's tasks.
//! A group always keeps at least one representative.

use crate::auth::{Operation, Relation, RoleFacts, Target};
use crate::model::group::{normalize_group_name, GroupView, Membership};
use crate::model::{EntityKind, GroupId, UserId};
use crate::repo::membership_repo::{MembershipRepository, SqliteMembershipRepository};
use crate::repo::reaction_repo::{ReactionRepository, SqliteReactionRepository};
use crate::service::engine::{
    admit, guard, require_accepted_member, require_group, SchedulingEngine,
};
use crate::service::error::{ConflictReason, EngineError, EngineResult};
use crate::service::session::Session;
use log::info;
use rusqlite::Connection;
use uuid::Uuid;

/// Outcome of a representative's join decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinDecision {
    Accepted(Membership),
    Rejected,
}

impl SchedulingEngine<'_> {
    /// Creates a group; the creator becomes its first accepted
    /// representative in the same transaction.
    pub fn create_group(&mut self, session: &Session, name: &str) -> EngineResult<GroupView> {
        let view = self.write("create_group", |tx| {
            let group_id = Uuid::new_v4();
            admit(
                session,
                group_id,
                RoleFacts::outsider(),
                Operation::CreateGroup,
                Target::Group(group_id),
            )?;
            let name = normalize_group_name(name)?;
            let registry = SqliteMembershipRepository::new(tx);
            let group = registry.insert_group(group_id, &name)?;
            let my_membership =
                registry.insert_membership(group.group_id, session.user_id(), true, true)?;
            Ok(GroupView {
                group,
                my_membership,
            })
        })?;

        info!(
            "event=group_create module=engine status=ok group_id={}",
            view.group.group_id
        );
        Ok(view)
    }

    /// Reads a group together with the caller's own membership.
    ///
    /// Pending requesters may read it to see their status.
    pub fn get_group(&mut self, session: &Session, group_id: GroupId) -> EngineResult<GroupView> {
        self.read("get_group", |tx| {
            let group = require_group(tx, group_id)?;
            guard(
                tx,
                session,
                group_id,
                Operation::ViewGroup,
                Target::Group(group_id),
            )?;
            let my_membership = SqliteMembershipRepository::new(tx)
                .get_membership(group_id, session.user_id())?
                .ok_or_else(|| EngineError::not_found(EntityKind::Membership, session.user_id()))?;
            Ok(GroupView {
                group,
                my_membership,
            })
        })
    }

    /// Groups the caller is an accepted member of.
    pub fn list_groups_for_user(&mut self, session: &Session) -> EngineResult<Vec<GroupView>> {
        self.read("list_groups_for_user", |tx| {
            Ok(SqliteMembershipRepository::new(tx).list_groups_for_user(session.user_id())?)
        })
    }

    /// Files a pending join request.
    ///
    /// `name_confirmation` must equal the group's display name (after trim);
    /// a mismatch is reported as the group not existing.
    ///
    /// # Errors
    /// - `NotFound(group)` for an unknown group or a name mismatch.
    /// - `Conflict` when the caller already has a pending or accepted record.
    pub fn request_join(
        &mut self,
        session: &Session,
        group_id: GroupId,
        name_confirmation: &str,
    ) -> EngineResult<Membership> {
        let membership = self.write("request_join", |tx| {
            let group = require_group(tx, group_id)?;
            if group.name != name_confirmation.trim() {
                return Err(EngineError::not_found(EntityKind::Group, group_id));
            }

            let facts = guard(
                tx,
                session,
                group_id,
                Operation::RequestJoin,
                Target::Group(group_id),
            )?;
            let user_id = session.user_id();
            if facts.relation != Relation::Outsider {
                return Err(EngineError::Conflict(ConflictReason::DuplicateMembership {
                    group_id,
                    user_id,
                    pending: facts.relation == Relation::Pending,
                }));
            }
            Ok(SqliteMembershipRepository::new(tx)
                .insert_membership(group_id, user_id, false, false)?)
        })?;

        info!("event=join_request module=engine status=ok group_id={group_id}");
        Ok(membership)
    }

    /// Accepts or rejects a pending join request.
    ///
    /// Accepting an already accepted member returns it unchanged, so the
    /// call is retry-safe. Rejecting requires a pending record.
    pub fn decide(
        &mut self,
        session: &Session,
        group_id: GroupId,
        target: UserId,
        accept: bool,
    ) -> EngineResult<JoinDecision> {
        let decision = self.write("decide_join", |tx| {
            require_group(tx, group_id)?;
            guard(
                tx,
                session,
                group_id,
                Operation::DecideJoin,
                Target::Member(target),
            )?;

            let registry = SqliteMembershipRepository::new(tx);
            let membership = registry
                .get_membership(group_id, target)?
                .ok_or_else(|| EngineError::not_found(EntityKind::Membership, target))?;

            match (membership.accepted, accept) {
                (true, true) => Ok(JoinDecision::Accepted(membership)),
                (true, false) => Err(EngineError::not_found(EntityKind::Membership, target)),
                (false, true) => Ok(JoinDecision::Accepted(
                    registry.set_accepted(group_id, target)?,
                )),
                (false, false) => {
                    registry.delete_membership(group_id, target)?;
                    Ok(JoinDecision::Rejected)
                }
            }
        })?;

        info!(
            "event=join_decide module=engine status=ok group_id={group_id} accepted={}",
            matches!(decision, JoinDecision::Accepted(_))
        );
        Ok(decision)
    }

    /// Removes the caller's own accepted membership.
    ///
    /// # Errors
    /// - `Conflict(SoleRepresentative)` when the caller is the only
    ///   representative; they must promote someone or dissolve the group.
    pub fn leave(&mut self, session: &Session, group_id: GroupId) -> EngineResult<()> {
        self.write("leave_group", |tx| {
            require_group(tx, group_id)?;
            let facts = guard(
                tx,
                session,
                group_id,
                Operation::LeaveGroup,
                Target::Member(session.user_id()),
            )?;
            if facts.is_representative() {
                ensure_other_representative(tx, group_id)?;
            }
            depart(tx, group_id, session.user_id())
        })?;

        info!("event=group_leave module=engine status=ok group_id={group_id}");
        Ok(())
    }

    /// Removes another accepted member; removing oneself is `leave`.
    pub fn remove_member(
        &mut self,
        session: &Session,
        group_id: GroupId,
        target: UserId,
    ) -> EngineResult<()> {
        if target == session.user_id() {
            return self.leave(session, group_id);
        }

        self.write("remove_member", |tx| {
            require_group(tx, group_id)?;
            guard(
                tx,
                session,
                group_id,
                Operation::RemoveMember,
                Target::Member(target),
            )?;
            require_accepted_member(tx, group_id, target)?;
            depart(tx, group_id, target)
        })?;

        info!("event=member_remove module=engine status=ok group_id={group_id}");
        Ok(())
    }

    /// Promotes or demotes an accepted member.
    ///
    /// Demoting the last representative is a `Conflict`.
    pub fn set_representative(
        &mut self,
        session: &Session,
        group_id: GroupId,
        target: UserId,
        is_representative: bool,
    ) -> EngineResult<Membership> {
        let membership = self.write("set_representative", |tx| {
            require_group(tx, group_id)?;
            guard(
                tx,
                session,
                group_id,
                Operation::SetRepresentative,
                Target::Member(target),
            )?;
            let current = require_accepted_member(tx, group_id, target)?;
            if current.is_representative == is_representative {
                return Ok(current);
            }
            if current.is_representative {
                ensure_other_representative(tx, group_id)?;
            }
            Ok(SqliteMembershipRepository::new(tx).set_representative(
                group_id,
                target,
                is_representative,
            )?)
        })?;

        info!(
            "event=representative_set module=engine status=ok group_id={group_id} is_representative={is_representative}"
        );
        Ok(membership)
    }

    /// Lists members; pending requests are visible to representatives only.
    pub fn list_members(
        &mut self,
        session: &Session,
        group_id: GroupId,
        accepted_only: bool,
    ) -> EngineResult<Vec<Membership>> {
        let operation = if accepted_only {
            Operation::ViewGroupContent
        } else {
            Operation::ViewPendingMembers
        };
        self.read("list_members", |tx| {
            require_group(tx, group_id)?;
            guard(tx, session, group_id, operation, Target::Group(group_id))?;
            Ok(SqliteMembershipRepository::new(tx).list_members(group_id, accepted_only)?)
        })
    }

    /// Deletes the group and, through cascading keys, its tasks, reactions,
    /// memberships and templates, all in one transaction.
    pub fn dissolve(&mut self, session: &Session, group_id: GroupId) -> EngineResult<()> {
        self.write("dissolve_group", |tx| {
            require_group(tx, group_id)?;
            guard(
                tx,
                session,
                group_id,
                Operation::DissolveGroup,
                Target::Group(group_id),
            )?;
            Ok(SqliteMembershipRepository::new(tx).delete_group(group_id)?)
        })?;

        info!("event=group_dissolve module=engine status=ok group_id={group_id}");
        Ok(())
    }
}

/// Drops an accepted membership together with the member's answers and
/// assignments on the group's tasks; a later rejoin starts undecided.
fn depart(conn: &Connection, group_id: GroupId, user_id: UserId) -> EngineResult<()> {
    SqliteReactionRepository::new(conn).delete_member_reactions(group_id, user_id)?;
    Ok(SqliteMembershipRepository::new(conn).delete_membership(group_id, user_id)?)
}

fn ensure_other_representative(conn: &Connection, group_id: GroupId) -> EngineResult<()> {
    if SqliteMembershipRepository::new(conn).count_representatives(group_id)? <= 1 {
        return Err(EngineError::Conflict(ConflictReason::SoleRepresentative {
            group_id,
        }));
    }
    Ok(())
}
