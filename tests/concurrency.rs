use rteams::Error;
use rteams::engine::{Actor, Engine, MemoryStore};
use rteams::model::{Profile, ProjectId, Role, Roster, StudentId, TeamId, TeamSizes};
use std::thread;

const ROUNDS: usize = 50;

fn fixture(students: usize, capacities: &[usize]) -> (Roster, ProjectId, Vec<StudentId>, Vec<TeamId>) {
    let mut roster = Roster::new();
    let students = (0..students)
        .map(|i| roster.add_student(Profile::new(&format!("s{i}@x.org"), &format!("S{i}"))))
        .collect::<Vec<_>>();
    let emails = (0..students.len())
        .map(|i| format!("s{i}@x.org"))
        .collect::<Vec<_>>();
    let project = roster.add_project("p", TeamSizes::new(1, 4).unwrap(), &emails);
    let teams = capacities
        .iter()
        .enumerate()
        .map(|(i, &c)| roster.add_team(Some(project), &format!("Team {}", i + 1), c).unwrap())
        .collect();
    (roster, project, students, teams)
}

#[test]
fn last_seat_is_taken_once() {
    for _ in 0..ROUNDS {
        let (roster, _, s, t) = fixture(3, &[2]);
        let engine = Engine::new(MemoryStore::new(roster));
        let actor = Actor::System;
        engine.join(&actor, s[0], t[0], Role::Leader).unwrap();
        let team = t[0];
        let results = thread::scope(|scope| {
            let handles = [s[1], s[2]].map(|student| {
                let (engine, actor) = (&engine, &actor);
                scope.spawn(move || engine.join(actor, student, team, Role::Member))
            });
            handles.map(|h| h.join().unwrap())
        });
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(Error::TeamFull {
                capacity: 2,
                ..
            })
        )));
        let roster = engine.snapshot().unwrap();
        assert_eq!(roster.team(t[0]).unwrap().size(), 2);
    }
}

#[test]
fn racing_moves_leave_the_loser_in_place() {
    for _ in 0..ROUNDS {
        // Team 1 has one free seat, teams 2 and 3 each hold one contender.
        let (roster, project, s, t) = fixture(3, &[2, 2, 2]);
        let engine = Engine::new(MemoryStore::new(roster));
        let actor = Actor::System;
        engine.join(&actor, s[0], t[0], Role::Member).unwrap();
        engine.join(&actor, s[1], t[1], Role::Member).unwrap();
        engine.join(&actor, s[2], t[2], Role::Member).unwrap();
        let target = t[0];
        let results = thread::scope(|scope| {
            let handles = [s[1], s[2]].map(|student| {
                let (engine, actor) = (&engine, &actor);
                scope.spawn(move || engine.move_student(actor, project, student, Some(target)))
            });
            handles.map(|h| h.join().unwrap())
        });
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let roster = engine.snapshot().unwrap();
        assert_eq!(roster.team(t[0]).unwrap().size(), 2);
        for (student, origin) in [(s[1], t[1]), (s[2], t[2])] {
            let team = roster.team_of(student, project).unwrap();
            assert!(team == t[0] || team == origin);
            assert_eq!(roster.memberships_of(student).len(), 1);
        }
    }
}

#[test]
fn concurrent_stragglers_and_joins_respect_capacity() {
    for _ in 0..ROUNDS {
        let (roster, project, s, t) = fixture(6, &[2, 2]);
        let engine = Engine::new(MemoryStore::new(roster));
        let actor = Actor::System;
        thread::scope(|scope| {
            let (engine, actor, s, t) = (&engine, &actor, &s, &t);
            scope.spawn(move || engine.auto_assign_stragglers(actor, project));
            scope.spawn(move || {
                for &student in &s[..3] {
                    let _ = engine.join(actor, student, t[1], Role::Member);
                }
            });
        });
        let roster = engine.snapshot().unwrap();
        for &team in &t {
            let team = roster.team(team).unwrap();
            assert!(team.size() <= team.capacity);
        }
        for &student in &s {
            assert!(roster.memberships_of(student).len() <= 1);
        }
        assert_eq!(roster.unassigned(project).unwrap().len(), 2);
    }
}
