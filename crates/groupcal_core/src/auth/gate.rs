//! Role facts, operation catalog and the allow/deny policy.

use crate::model::group::Membership;
use crate::model::{GroupId, TaskId, TemplateId, UserId};
use std::fmt::{Display, Formatter};

/// Actor's relation to the group that owns the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Relation {
    /// No membership record.
    Outsider,
    /// Join request awaiting a decision.
    Pending,
    /// Accepted, not a representative.
    Member,
    /// Accepted representative.
    Representative,
}

/// Role facts read from the membership registry for one (group, actor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleFacts {
    pub relation: Relation,
}

impl RoleFacts {
    pub fn from_membership(membership: Option<&Membership>) -> Self {
        let relation = match membership {
            None => Relation::Outsider,
            Some(m) if !m.accepted => Relation::Pending,
            Some(m) if m.is_representative => Relation::Representative,
            Some(_) => Relation::Member,
        };
        Self { relation }
    }

    pub fn outsider() -> Self {
        Self {
            relation: Relation::Outsider,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.relation >= Relation::Member
    }

    pub fn is_representative(&self) -> bool {
        self.relation == Relation::Representative
    }
}

/// Every operation routed through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Open a new group; the actor has no relation to it yet.
    CreateGroup,
    /// File a join request. Existing records are a conflict, not a denial.
    RequestJoin,
    /// Read the group record and one's own membership status.
    ViewGroup,
    /// Read tasks, reactions, members and templates.
    ViewGroupContent,
    ViewPendingMembers,
    CreateTask,
    UpdateTask,
    MoveTask,
    DeleteTask,
    ManageTemplates,
    AssignTask,
    SetReaction,
    DecideJoin,
    RemoveMember,
    SetRepresentative,
    LeaveGroup,
    DissolveGroup,
}

impl Operation {
    /// Stable snake_case name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateGroup => "create_group",
            Self::RequestJoin => "request_join",
            Self::ViewGroup => "view_group",
            Self::ViewGroupContent => "view_group_content",
            Self::ViewPendingMembers => "view_pending_members",
            Self::CreateTask => "create_task",
            Self::UpdateTask => "update_task",
            Self::MoveTask => "move_task",
            Self::DeleteTask => "delete_task",
            Self::ManageTemplates => "manage_templates",
            Self::AssignTask => "assign_task",
            Self::SetReaction => "set_reaction",
            Self::DecideJoin => "decide_join",
            Self::RemoveMember => "remove_member",
            Self::SetRepresentative => "set_representative",
            Self::LeaveGroup => "leave_group",
            Self::DissolveGroup => "dissolve_group",
        }
    }

    fn requirement(self) -> Requirement {
        match self {
            Self::CreateGroup | Self::RequestJoin => Requirement::Anyone,
            Self::ViewGroup => Requirement::MembershipRecord,
            Self::ViewGroupContent => Requirement::AcceptedMember,
            Self::SetReaction | Self::LeaveGroup => Requirement::AcceptedMember,
            Self::ViewPendingMembers
            | Self::CreateTask
            | Self::UpdateTask
            | Self::MoveTask
            | Self::DeleteTask
            | Self::ManageTemplates
            | Self::AssignTask
            | Self::DecideJoin
            | Self::RemoveMember
            | Self::SetRepresentative
            | Self::DissolveGroup => Requirement::Representative,
        }
    }

    fn self_only(self) -> bool {
        matches!(self, Self::SetReaction | Self::LeaveGroup)
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an operation is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Group(GroupId),
    Task(TaskId),
    Template(TemplateId),
    /// A specific user's record (membership or reaction subject).
    Member(UserId),
}

/// The condition a denied actor failed to meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Any authenticated actor, outsiders included.
    Anyone,
    /// Any membership record, pending included.
    MembershipRecord,
    AcceptedMember,
    Representative,
    /// The subject of the target must be the actor.
    SelfOnly,
}

impl Requirement {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anyone => "anyone",
            Self::MembershipRecord => "membership_record",
            Self::AcceptedMember => "accepted_member",
            Self::Representative => "representative",
            Self::SelfOnly => "self_only",
        }
    }

    fn is_met_by(self, facts: &RoleFacts) -> bool {
        match self {
            Self::Anyone => true,
            Self::MembershipRecord => facts.relation != Relation::Outsider,
            Self::AcceptedMember => facts.is_accepted(),
            Self::Representative => facts.is_representative(),
            Self::SelfOnly => true,
        }
    }
}

impl Display for Requirement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(Requirement),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decides whether `actor` may perform `operation` on `target`.
///
/// Role checks come first; the self-only check for reactions and leaving
/// runs only once the role requirement holds.
pub fn authorize(
    actor: UserId,
    facts: &RoleFacts,
    operation: Operation,
    target: &Target,
) -> AccessDecision {
    let requirement = operation.requirement();
    if !requirement.is_met_by(facts) {
        return AccessDecision::Deny(requirement);
    }

    if operation.self_only() {
        match target {
            Target::Member(subject) if *subject == actor => {}
            _ => return AccessDecision::Deny(Requirement::SelfOnly),
        }
    }

    AccessDecision::Allow
}

#[cfg(test)]
mod tests {
    use super::{authorize, AccessDecision, Operation, Relation, Requirement, RoleFacts, Target};
    use crate::model::group::Membership;
    use uuid::Uuid;

    fn facts(relation: Relation) -> RoleFacts {
        RoleFacts { relation }
    }

    const REPRESENTATIVE_ONLY: &[Operation] = &[
        Operation::ViewPendingMembers,
        Operation::CreateTask,
        Operation::UpdateTask,
        Operation::MoveTask,
        Operation::DeleteTask,
        Operation::ManageTemplates,
        Operation::AssignTask,
        Operation::DecideJoin,
        Operation::RemoveMember,
        Operation::SetRepresentative,
        Operation::DissolveGroup,
    ];

    #[test]
    fn role_facts_follow_membership_record() {
        let mut membership = Membership {
            group_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            accepted: false,
            is_representative: false,
            joined_at: 0,
        };
        assert_eq!(RoleFacts::from_membership(None).relation, Relation::Outsider);
        assert_eq!(
            RoleFacts::from_membership(Some(&membership)).relation,
            Relation::Pending
        );
        membership.accepted = true;
        assert_eq!(
            RoleFacts::from_membership(Some(&membership)).relation,
            Relation::Member
        );
        membership.is_representative = true;
        assert_eq!(
            RoleFacts::from_membership(Some(&membership)).relation,
            Relation::Representative
        );
    }

    #[test]
    fn representative_operations_deny_plain_members() {
        let actor = Uuid::new_v4();
        let target = Target::Group(Uuid::new_v4());
        for op in REPRESENTATIVE_ONLY {
            assert_eq!(
                authorize(actor, &facts(Relation::Member), *op, &target),
                AccessDecision::Deny(Requirement::Representative),
                "{op} must require a representative"
            );
            assert!(authorize(actor, &facts(Relation::Representative), *op, &target).is_allowed());
        }
    }

    #[test]
    fn creating_and_joining_groups_are_open_to_every_relation() {
        let actor = Uuid::new_v4();
        let target = Target::Group(Uuid::new_v4());
        for relation in [
            Relation::Outsider,
            Relation::Pending,
            Relation::Member,
            Relation::Representative,
        ] {
            for op in [Operation::CreateGroup, Operation::RequestJoin] {
                assert!(
                    authorize(actor, &facts(relation), op, &target).is_allowed(),
                    "{op} must be allowed for {relation:?}"
                );
            }
        }
        assert!(authorize(
            actor,
            &RoleFacts::outsider(),
            Operation::CreateGroup,
            &target
        )
        .is_allowed());
    }

    #[test]
    fn content_reads_need_accepted_membership() {
        let actor = Uuid::new_v4();
        let target = Target::Group(Uuid::new_v4());
        for relation in [Relation::Outsider, Relation::Pending] {
            assert_eq!(
                authorize(actor, &facts(relation), Operation::ViewGroupContent, &target),
                AccessDecision::Deny(Requirement::AcceptedMember)
            );
        }
        assert!(authorize(
            actor,
            &facts(Relation::Member),
            Operation::ViewGroupContent,
            &target
        )
        .is_allowed());
    }

    #[test]
    fn pending_user_may_view_group_but_outsider_may_not() {
        let actor = Uuid::new_v4();
        let target = Target::Group(Uuid::new_v4());
        assert!(authorize(actor, &facts(Relation::Pending), Operation::ViewGroup, &target)
            .is_allowed());
        assert_eq!(
            authorize(actor, &facts(Relation::Outsider), Operation::ViewGroup, &target),
            AccessDecision::Deny(Requirement::MembershipRecord)
        );
    }

    #[test]
    fn reactions_are_self_only_even_for_representatives() {
        let actor = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(authorize(
            actor,
            &facts(Relation::Member),
            Operation::SetReaction,
            &Target::Member(actor)
        )
        .is_allowed());
        assert_eq!(
            authorize(
                actor,
                &facts(Relation::Representative),
                Operation::SetReaction,
                &Target::Member(other)
            ),
            AccessDecision::Deny(Requirement::SelfOnly)
        );
    }

    #[test]
    fn leaving_requires_accepted_self() {
        let actor = Uuid::new_v4();
        assert_eq!(
            authorize(
                actor,
                &facts(Relation::Pending),
                Operation::LeaveGroup,
                &Target::Member(actor)
            ),
            AccessDecision::Deny(Requirement::AcceptedMember)
        );
        assert_eq!(
            authorize(
                actor,
                &facts(Relation::Member),
                Operation::LeaveGroup,
                &Target::Group(Uuid::new_v4())
            ),
            AccessDecision::Deny(Requirement::SelfOnly)
        );
    }
}
