use chrono::NaiveDate;
use groupcal_core::db::open_db_in_memory;
use groupcal_core::{
    EngineError, ErrorKind, GroupId, NewTask, ReactionState, Requirement, SchedulingEngine,
    Session, TaskId,
};
use uuid::Uuid;

fn user() -> Session {
    Session::new(Uuid::new_v4())
}

fn setup(
    engine: &mut SchedulingEngine<'_>,
    rep: &Session,
    members: &[&Session],
) -> (GroupId, TaskId) {
    let group_id = engine
        .create_group(rep, "Choir")
        .unwrap()
        .group
        .group_id;
    for member in members {
        engine.request_join(member, group_id, "Choir").unwrap();
        engine.decide(rep, group_id, member.user_id(), true).unwrap();
    }
    let task = engine
        .create_task(
            rep,
            group_id,
            &NewTask::all_day("Rehearsal", NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()),
        )
        .unwrap();
    (group_id, task.task_id)
}

#[test]
fn members_answer_only_for_themselves() {
    let mut conn = open_db_in_memory().unwrap();
    let mut engine = SchedulingEngine::try_new(&mut conn).unwrap();
    let rep = user();
    let alice = user();
    let bob = user();
    let (_, task_id) = setup(&mut engine, &rep, &[&alice, &bob]);

    let answered = engine
        .set_reaction(&alice, task_id, alice.user_id(), ReactionState::Join, Some(" late "))
        .unwrap();
    assert_eq!(answered.state, ReactionState::Join);
    assert_eq!(answered.comment.as_deref(), Some("late"));

    let err = engine
        .set_reaction(&alice, task_id, bob.user_id(), ReactionState::Absent, None)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Forbidden {
            requirement: Requirement::SelfOnly,
            ..
        }
    ));
    // Representatives cannot answer for others either.
    let err = engine
        .set_reaction(&rep, task_id, bob.user_id(), ReactionState::Join, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let reactions = engine.list_reactions(&bob, task_id).unwrap();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].user_id, alice.user_id());
}

#[test]
fn setting_the_same_answer_twice_is_stable() {
    let mut conn = open_db_in_memory().unwrap();
    let mut engine = SchedulingEngine::try_new(&mut conn).unwrap();
    let rep = user();
    let alice = user();
    let (_, task_id) = setup(&mut engine, &rep, &[&alice]);

    let first = engine
        .set_reaction(&alice, task_id, alice.user_id(), ReactionState::Absent, None)
        .unwrap();
    let second = engine
        .set_reaction(&alice, task_id, alice.user_id(), ReactionState::Absent, None)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(engine.list_reactions(&rep, task_id).unwrap(), vec![second]);
}

#[test]
fn pending_and_outside_users_cannot_react() {
    let mut conn = open_db_in_memory().unwrap();
    let mut engine = SchedulingEngine::try_new(&mut conn).unwrap();
    let rep = user();
    let pending = user();
    let outsider = user();
    let (group_id, task_id) = setup(&mut engine, &rep, &[]);
    engine.request_join(&pending, group_id, "Choir").unwrap();

    for session in [&pending, &outsider] {
        let err = engine
            .set_reaction(session, task_id, session.user_id(), ReactionState::Join, None)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Forbidden {
                requirement: Requirement::AcceptedMember,
                ..
            }
        ));
    }

    let missing = engine
        .set_reaction(&rep, Uuid::new_v4(), rep.user_id(), ReactionState::Join, None)
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}

#[test]
fn assignment_is_independent_of_the_members_answer() {
    let mut conn = open_db_in_memory().unwrap();
    let mut engine = SchedulingEngine::try_new(&mut conn).unwrap();
    let rep = user();
    let alice = user();
    let (_, task_id) = setup(&mut engine, &rep, &[&alice]);

    engine
        .set_reaction(&alice, task_id, alice.user_id(), ReactionState::Absent, Some("sick"))
        .unwrap();
    let assigned = engine
        .set_assignment(&rep, task_id, alice.user_id(), true)
        .unwrap();
    assert!(assigned.is_assigned);
    assert_eq!(assigned.state, ReactionState::Absent);
    assert_eq!(assigned.comment.as_deref(), Some("sick"));

    // The member's next answer keeps the assignment.
    let answered = engine
        .set_reaction(&alice, task_id, alice.user_id(), ReactionState::Join, None)
        .unwrap();
    assert!(answered.is_assigned);
    assert_eq!(answered.comment, None);

    let err = engine
        .set_assignment(&alice, task_id, alice.user_id(), false)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[test]
fn assignment_requires_an_accepted_target() {
    let mut conn = open_db_in_memory().unwrap();
    let mut engine = SchedulingEngine::try_new(&mut conn).unwrap();
    let rep = user();
    let pending = user();
    let (group_id, task_id) = setup(&mut engine, &rep, &[]);
    engine.request_join(&pending, group_id, "Choir").unwrap();

    for target in [pending.user_id(), Uuid::new_v4()] {
        let err = engine.set_assignment(&rep, task_id, target, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[test]
fn clearing_back_to_default_removes_the_record() {
    let mut conn = open_db_in_memory().unwrap();
    let mut engine = SchedulingEngine::try_new(&mut conn).unwrap();
    let rep = user();
    let alice = user();
    let (_, task_id) = setup(&mut engine, &rep, &[&alice]);

    engine
        .set_assignment(&rep, task_id, alice.user_id(), true)
        .unwrap();
    assert_eq!(engine.list_reactions(&rep, task_id).unwrap().len(), 1);

    let cleared = engine
        .set_assignment(&rep, task_id, alice.user_id(), false)
        .unwrap();
    assert!(cleared.is_default());
    assert!(engine.list_reactions(&rep, task_id).unwrap().is_empty());
}

#[test]
fn roster_buckets_truncate_and_count_the_rest() {
    let mut conn = open_db_in_memory().unwrap();
    let mut engine = SchedulingEngine::try_new(&mut conn).unwrap();
    let rep = user();
    let members: Vec<Session> = (0..4).map(|_| user()).collect();
    let member_refs: Vec<&Session> = members.iter().collect();
    let (_, task_id) = setup(&mut engine, &rep, &member_refs);

    for member in &members[..3] {
        engine
            .set_reaction(member, task_id, member.user_id(), ReactionState::Join, None)
            .unwrap();
    }
    engine
        .set_reaction(&members[3], task_id, members[3].user_id(), ReactionState::Absent, None)
        .unwrap();
    engine
        .set_assignment(&rep, task_id, rep.user_id(), true)
        .unwrap();

    let roster = engine.reaction_roster(&members[0], task_id, 2).unwrap();
    assert_eq!(
        roster.join.shown,
        vec![members[0].user_id(), members[1].user_id()]
    );
    assert_eq!(roster.join.remaining, 1);
    assert_eq!(roster.join.total(), 3);
    assert_eq!(roster.absent.shown, vec![members[3].user_id()]);
    assert_eq!(roster.absent.remaining, 0);
    assert_eq!(roster.undecided.shown, vec![rep.user_id()]);
    assert_eq!(roster.assigned, vec![rep.user_id()]);

    let outsider = user();
    let err = engine.reaction_roster(&outsider, task_id, 2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[test]
fn deleting_a_task_drops_its_reactions() {
    let mut conn = open_db_in_memory().unwrap();
    let mut engine = SchedulingEngine::try_new(&mut conn).unwrap();
    let rep = user();
    let alice = user();
    let (_, task_id) = setup(&mut engine, &rep, &[&alice]);
    engine
        .set_reaction(&alice, task_id, alice.user_id(), ReactionState::Join, None)
        .unwrap();

    engine.delete_task(&rep, task_id).unwrap();
    assert_eq!(
        engine.list_reactions(&rep, task_id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    drop(engine);

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM reactions;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn leaving_one_group_keeps_reactions_in_another() {
    let mut conn = open_db_in_memory().unwrap();
    let mut engine = SchedulingEngine::try_new(&mut conn).unwrap();
    let rep = user();
    let other_rep = user();
    let alice = user();
    let (group_id, task_id) = setup(&mut engine, &rep, &[&alice]);
    let (_, other_task) = setup(&mut engine, &other_rep, &[&alice]);

    for task in [task_id, other_task] {
        engine
            .set_reaction(&alice, task, alice.user_id(), ReactionState::Absent, None)
            .unwrap();
    }

    engine.leave(&alice, group_id).unwrap();
    assert!(engine.list_reactions(&rep, task_id).unwrap().is_empty());
    let kept = engine.list_reactions(&other_rep, other_task).unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].user_id, alice.user_id());
    assert_eq!(kept[0].state, ReactionState::Absent);
}
