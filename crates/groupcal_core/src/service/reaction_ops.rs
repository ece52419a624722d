//! Reaction ledger operations and the per-task roster view.

use crate::auth::{Operation, Target};
use crate::model::group::Membership;
use crate::model::reaction::{Reaction, ReactionState};
use crate::model::{TaskId, UserId};
use crate::repo::membership_repo::{MembershipRepository, SqliteMembershipRepository};
use crate::repo::reaction_repo::{ReactionRepository, SqliteReactionRepository};
use crate::service::engine::{guard, require_accepted_member, require_task, SchedulingEngine};
use crate::service::error::EngineResult;
use crate::service::session::Session;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One state's slice of the roster: the first users to show and how many
/// more there are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterBucket {
    pub shown: Vec<UserId>,
    pub remaining: u32,
}

impl RosterBucket {
    fn collect(users: Vec<UserId>, limit: usize) -> Self {
        let remaining = users.len().saturating_sub(limit);
        let mut shown = users;
        shown.truncate(limit);
        Self {
            shown,
            remaining: u32::try_from(remaining).unwrap_or(u32::MAX),
        }
    }

    /// Everyone in this state, shown or not.
    pub fn total(&self) -> u32 {
        u32::try_from(self.shown.len())
            .unwrap_or(u32::MAX)
            .saturating_add(self.remaining)
    }
}

/// Truncated join/absent/undecided lists for a task card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRoster {
    pub task_id: TaskId,
    pub join: RosterBucket,
    pub absent: RosterBucket,
    pub undecided: RosterBucket,
    pub assigned: Vec<UserId>,
}

impl SchedulingEngine<'_> {
    /// Records `subject`'s answer on a task.
    ///
    /// Only the subject may answer for themself. Setting the same answer
    /// twice leaves the same record. Assignment made by representatives is
    /// preserved.
    pub fn set_reaction(
        &mut self,
        session: &Session,
        task_id: TaskId,
        subject: UserId,
        state: ReactionState,
        comment: Option<&str>,
    ) -> EngineResult<Reaction> {
        let reaction = self.write("set_reaction", |tx| {
            let task = require_task(tx, task_id)?;
            guard(
                tx,
                session,
                task.group_id,
                Operation::SetReaction,
                Target::Member(subject),
            )?;

            let ledger = SqliteReactionRepository::new(tx);
            let current = ledger
                .get_reaction(task_id, subject)?
                .unwrap_or_else(|| Reaction::undecided(task_id, subject));
            let updated = current.answered(state, comment);
            ledger.save_reaction(&updated)?;
            Ok(updated)
        })?;

        info!(
            "event=reaction_set module=engine status=ok task_id={task_id} state={}",
            reaction.state.as_str()
        );
        Ok(reaction)
    }

    /// Stored reaction records for a task, earliest responder first.
    pub fn list_reactions(
        &mut self,
        session: &Session,
        task_id: TaskId,
    ) -> EngineResult<Vec<Reaction>> {
        self.read("list_reactions", |tx| {
            let task = require_task(tx, task_id)?;
            guard(
                tx,
                session,
                task.group_id,
                Operation::ViewGroupContent,
                Target::Task(task_id),
            )?;
            Ok(SqliteReactionRepository::new(tx).list_reactions(task_id)?)
        })
    }

    /// Marks or unmarks an accepted member as assigned to a task.
    ///
    /// The member's own answer and comment are left untouched.
    pub fn set_assignment(
        &mut self,
        session: &Session,
        task_id: TaskId,
        target: UserId,
        assigned: bool,
    ) -> EngineResult<Reaction> {
        let reaction = self.write("set_assignment", |tx| {
            let task = require_task(tx, task_id)?;
            guard(
                tx,
                session,
                task.group_id,
                Operation::AssignTask,
                Target::Member(target),
            )?;
            require_accepted_member(tx, task.group_id, target)?;

            let ledger = SqliteReactionRepository::new(tx);
            let mut record = ledger
                .get_reaction(task_id, target)?
                .unwrap_or_else(|| Reaction::undecided(task_id, target));
            record.is_assigned = assigned;
            ledger.save_reaction(&record)?;
            Ok(record)
        })?;

        info!(
            "event=assignment_set module=engine status=ok task_id={task_id} assigned={assigned}"
        );
        Ok(reaction)
    }

    /// Builds the truncated roster shown on a task card.
    ///
    /// Only current accepted members are counted; members without a record
    /// are undecided. Join/absent keep response order, undecided keeps
    /// membership order.
    pub fn reaction_roster(
        &mut self,
        session: &Session,
        task_id: TaskId,
        limit: usize,
    ) -> EngineResult<ReactionRoster> {
        self.read("reaction_roster", |tx| {
            let task = require_task(tx, task_id)?;
            guard(
                tx,
                session,
                task.group_id,
                Operation::ViewGroupContent,
                Target::Task(task_id),
            )?;

            let members = SqliteMembershipRepository::new(tx).list_members(task.group_id, true)?;
            let reactions = SqliteReactionRepository::new(tx).list_reactions(task_id)?;
            Ok(build_roster(task_id, &members, &reactions, limit))
        })
    }
}

fn build_roster(
    task_id: TaskId,
    members: &[Membership],
    reactions: &[Reaction],
    limit: usize,
) -> ReactionRoster {
    let by_user: HashMap<UserId, &Reaction> = reactions
        .iter()
        .map(|reaction| (reaction.user_id, reaction))
        .collect();
    let is_member = |user_id: &UserId| members.iter().any(|m| m.user_id == *user_id);

    let answered = |state: ReactionState| {
        reactions
            .iter()
            .filter(|r| r.state == state && is_member(&r.user_id))
            .map(|r| r.user_id)
            .collect::<Vec<_>>()
    };
    let undecided = members
        .iter()
        .filter(|m| {
            by_user
                .get(&m.user_id)
                .map_or(true, |r| r.state == ReactionState::Undecided)
        })
        .map(|m| m.user_id)
        .collect::<Vec<_>>();
    let assigned = members
        .iter()
        .filter(|m| by_user.get(&m.user_id).is_some_and(|r| r.is_assigned))
        .map(|m| m.user_id)
        .collect();

    ReactionRoster {
        task_id,
        join: RosterBucket::collect(answered(ReactionState::Join), limit),
        absent: RosterBucket::collect(answered(ReactionState::Absent), limit),
        undecided: RosterBucket::collect(undecided, limit),
        assigned,
    }
}

#[cfg(test)]
mod tests {
    use super::{build_roster, RosterBucket};
    use crate::model::group::Membership;
    use crate::model::reaction::{Reaction, ReactionState};
    use uuid::Uuid;

    fn member(group_id: Uuid) -> Membership {
        Membership {
            group_id,
            user_id: Uuid::new_v4(),
            accepted: true,
            is_representative: false,
            joined_at: 0,
        }
    }

    #[test]
    fn bucket_truncates_and_counts_remainder() {
        let users: Vec<Uuid> = (0..7).map(|_| Uuid::new_v4()).collect();
        let bucket = RosterBucket::collect(users.clone(), 5);
        assert_eq!(bucket.shown, users[..5].to_vec());
        assert_eq!(bucket.remaining, 2);
        assert_eq!(bucket.total(), 7);
    }

    #[test]
    fn roster_ignores_former_members_and_fills_undecided() {
        let group_id = Uuid::new_v4();
        let task_id = Uuid::new_v4();
        let members = vec![member(group_id), member(group_id), member(group_id)];
        let former = Uuid::new_v4();

        let reactions = vec![
            Reaction::undecided(task_id, former).answered(ReactionState::Join, None),
            Reaction::undecided(task_id, members[1].user_id).answered(ReactionState::Join, None),
            Reaction::undecided(task_id, members[2].user_id)
                .answered(ReactionState::Absent, Some("away")),
        ];

        let roster = build_roster(task_id, &members, &reactions, 5);
        assert_eq!(roster.join.shown, vec![members[1].user_id]);
        assert_eq!(roster.absent.shown, vec![members[2].user_id]);
        assert_eq!(roster.undecided.shown, vec![members[0].user_id]);
        assert!(roster.assigned.is_empty());
    }
}
