//! The mutation engine is the only way memberships change. Every operation
//! validates and writes inside a single store transaction, so a refused
//! request leaves no trace and two requests racing for the last seat of a
//! team cannot both get it.

pub use self::notify::{Event, LogNotifier, Notifier};
pub use self::store::{MemoryStore, Store};

use crate::algos::{BalanceReport, CandidateTeam, Permutation, balance, partition_and_balance};
use crate::error::{Entity, Error};
use crate::model::{
    DEFAULT_CAPACITY, Membership, Profile, Project, ProjectId, ProjectStatus, Role, Roster,
    Student, StudentId, Team, TeamId, TeamSizes, normalize_email,
};
use std::fmt;
use tracing::{debug, info, instrument, warn};

mod notify;
mod store;

/// Who is asking for a change.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Actor {
    Instructor(String),
    Student(StudentId),
    /// Automated flows: team generation, straggler assignment, rebalancing.
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Instructor(name) => write!(f, "instructor {name}"),
            Actor::Student(s) => write!(f, "{s}"),
            Actor::System => f.write_str("system"),
        }
    }
}

/// Teams created by [`Engine::generate`].
#[derive(Clone, Debug, PartialEq)]
pub struct Generation {
    pub teams: Vec<TeamId>,
    /// Students which did not fit in the maximum number of teams.
    pub leftover: Vec<StudentId>,
    pub report: BalanceReport,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StragglerReport {
    pub assigned: Vec<Membership>,
    /// Stragglers left without a team because every team was full.
    pub remaining: Vec<StudentId>,
}

impl StragglerReport {
    pub fn count(&self) -> usize {
        self.assigned.len()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub sizes: Option<(usize, usize)>,
    pub status: Option<ProjectStatus>,
}

pub struct Engine<S, N = LogNotifier> {
    store: S,
    notifier: N,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S) -> Engine<S> {
        Engine {
            store,
            notifier: LogNotifier,
        }
    }
}

fn joined_event(roster: &Roster, membership: &Membership) -> Result<Event, Error> {
    let student = roster.student(membership.student)?;
    let team = roster.team(membership.team)?;
    let project = membership
        .project
        .map(|p| roster.project(p).map(|p| p.name.clone()))
        .transpose()?;
    Ok(Event::Joined {
        email: student.email.clone(),
        name: student.name.clone(),
        team: team.name.clone(),
        project,
    })
}

/// Seat a student in a team. Returns the membership and whether it is new.
/// With `switch`, a membership in another team of the same project is given
/// up; without it, that membership is an error.
fn admit(
    roster: &mut Roster,
    student: StudentId,
    team: TeamId,
    role: Role,
    switch: bool,
) -> Result<(Membership, bool), Error> {
    roster.student(student)?;
    let project = roster.team(team)?.project;
    if let Some(p) = project {
        roster.project(p)?.ensure_active()?;
    }
    let target = roster.team(team)?;
    if let Some(membership) = target.membership_of(student) {
        return Ok((membership, false));
    }
    if target.is_full() {
        return Err(Error::TeamFull {
            team,
            capacity: target.capacity,
        });
    }
    if let Some(current) = project.and_then(|p| roster.team_of(student, p)) {
        if !switch {
            return Err(Error::AlreadyAssigned {
                student,
                team: current,
            });
        }
        roster.team_mut(current)?.remove(student);
    }
    Ok((roster.team_mut(team)?.push(student, role), true))
}

fn commit(
    roster: &mut Roster,
    project: ProjectId,
    candidates: &[CandidateTeam<'_>],
) -> Result<(Vec<TeamId>, Vec<Event>), Error> {
    let sizes = {
        let project = roster.project(project)?;
        project.ensure_active()?;
        project.sizes
    };
    let mut teams = Vec::with_capacity(candidates.len());
    let mut events = Vec::new();
    for candidate in candidates {
        let name = format!("Team {}", roster.next_team_number(project)?);
        let team = roster.add_team(Some(project), &name, sizes.max())?;
        for (i, student) in candidate.members.iter().enumerate() {
            let role = if i == 0 { Role::Leader } else { Role::Member };
            let (membership, _) = admit(roster, student.id, team, role, false)?;
            events.push(joined_event(roster, &membership)?);
        }
        teams.push(team);
    }
    Ok((teams, events))
}

impl<S: Store, N: Notifier> Engine<S, N> {
    pub fn with_notifier(store: S, notifier: N) -> Engine<S, N> {
        Engine { store, notifier }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn snapshot(&self) -> Result<Roster, Error> {
        self.store.snapshot()
    }

    fn publish(&self, events: &[Event]) {
        for event in events {
            if let Err(e) = self.notifier.notify(event) {
                warn!(error = %e, ?event, "cannot deliver notification");
            }
        }
    }

    /// Add a student to a team. A student already in another team of the
    /// same project must be moved instead.
    #[instrument(skip(self))]
    pub fn join(
        &self,
        actor: &Actor,
        student: StudentId,
        team: TeamId,
        role: Role,
    ) -> Result<Membership, Error> {
        let (membership, event) = self.store.atomically(|roster| {
            let (membership, created) = admit(roster, student, team, role, false)?;
            let event = if created {
                Some(joined_event(roster, &membership)?)
            } else {
                None
            };
            Ok((membership, event))
        })?;
        info!(%actor, %student, %team, "student joined team");
        self.publish(event.as_slice());
        Ok(membership)
    }

    /// Join a team of a project the student has been invited to, leaving the
    /// student's current team of that project if any.
    #[instrument(skip(self))]
    pub fn accept_invitation(
        &self,
        actor: &Actor,
        student: StudentId,
        team: TeamId,
    ) -> Result<Membership, Error> {
        let (membership, event) = self.store.atomically(|roster| {
            let project = roster
                .team(team)?
                .project
                .ok_or(Error::NotFound(Entity::Team(team)))?;
            let email = &roster.student(student)?.email;
            if !roster.project(project)?.is_invited(email) {
                return Err(Error::NotInvited { student, project });
            }
            let (membership, created) = admit(roster, student, team, Role::Member, true)?;
            let event = if created {
                Some(joined_event(roster, &membership)?)
            } else {
                None
            };
            Ok((membership, event))
        })?;
        info!(%actor, %student, %team, "invitation accepted");
        self.publish(event.as_slice());
        Ok(membership)
    }

    /// Remove a student from a team. Leaving a team one is not part of
    /// succeeds without changing anything.
    #[instrument(skip(self))]
    pub fn leave(&self, actor: &Actor, student: StudentId, team: TeamId) -> Result<Team, Error> {
        let (team, removed) = self.store.atomically(|roster| {
            roster.student(student)?;
            if let Some(p) = roster.team(team)?.project {
                roster.project(p)?.ensure_active()?;
            }
            let team = roster.team_mut(team)?;
            let removed = team.remove(student);
            Ok((team.clone(), removed))
        })?;
        if removed {
            info!(%actor, %student, team = %team.id, "student left team");
        } else {
            debug!(%actor, %student, team = %team.id, "student was not a member of the team");
        }
        Ok(team)
    }

    /// Move a student to another team of the project, or out of every team
    /// of the project when `to` is `None`.
    #[instrument(skip(self))]
    pub fn move_student(
        &self,
        actor: &Actor,
        project: ProjectId,
        student: StudentId,
        to: Option<TeamId>,
    ) -> Result<Option<Membership>, Error> {
        let (membership, event) = self.store.atomically(|roster| {
            roster.project(project)?.ensure_active()?;
            roster.student(student)?;
            let current = roster.team_of(student, project);
            let Some(to) = to else {
                if let Some(current) = current {
                    roster.team_mut(current)?.remove(student);
                }
                return Ok((None, None));
            };
            let target = roster.team(to)?;
            if target.project != Some(project) {
                return Err(Error::NotFound(Entity::Team(to)));
            }
            if current == Some(to) {
                return Ok((target.membership_of(student), None));
            }
            if target.is_full() {
                return Err(Error::TeamFull {
                    team: to,
                    capacity: target.capacity,
                });
            }
            if let Some(current) = current {
                roster.team_mut(current)?.remove(student);
            }
            let membership = roster.team_mut(to)?.push(student, Role::Member);
            let event = joined_event(roster, &membership)?;
            Ok((Some(membership), Some(event)))
        })?;
        info!(%actor, %student, to = ?to, "student moved");
        self.publish(event.as_slice());
        Ok(membership)
    }

    /// Seat every invited student without a team in the first unlocked team
    /// of the project which still has room.
    #[instrument(skip(self))]
    pub fn auto_assign_stragglers(
        &self,
        actor: &Actor,
        project: ProjectId,
    ) -> Result<StragglerReport, Error> {
        let (report, events) = self.store.atomically(|roster| {
            roster.project(project)?.ensure_active()?;
            let teams = roster.teams_of(project);
            let stragglers = roster.unassigned(project)?;
            let mut report = StragglerReport::default();
            let mut events = Vec::new();
            for (i, &student) in stragglers.iter().enumerate() {
                let free = teams
                    .iter()
                    .copied()
                    .find(|&t| roster.team(t).is_ok_and(|t| !t.locked && !t.is_full()));
                let Some(team) = free else {
                    report.remaining = stragglers[i..].to_vec();
                    break;
                };
                let membership = roster.team_mut(team)?.push(student, Role::Member);
                events.push(joined_event(roster, &membership)?);
                report.assigned.push(membership);
            }
            Ok((report, events))
        })?;
        info!(
            %actor,
            %project,
            assigned = report.count(),
            remaining = report.remaining.len(),
            "stragglers have been assigned"
        );
        self.publish(&events);
        Ok(report)
    }

    #[instrument(skip(self))]
    pub fn update_team_capacity(
        &self,
        actor: &Actor,
        team: TeamId,
        capacity: usize,
    ) -> Result<Team, Error> {
        let team = self.store.atomically(|roster| {
            let current = roster.team(team)?;
            if capacity < current.size() {
                return Err(Error::BelowCurrentMembership {
                    team,
                    requested: capacity,
                    members: current.size(),
                });
            }
            match current.project {
                Some(p) => roster.project(p)?.sizes.check(capacity)?,
                None if capacity == 0 => {
                    return Err(Error::InvalidTeamSizes {
                        min: capacity,
                        max: capacity,
                    });
                }
                None => (),
            }
            let team = roster.team_mut(team)?;
            team.capacity = capacity;
            Ok(team.clone())
        })?;
        info!(%actor, team = %team.id, capacity, "team capacity updated");
        Ok(team)
    }

    /// Lock or unlock a team. Locked teams are left alone by automated
    /// operations but can still be joined or left manually.
    #[instrument(skip(self))]
    pub fn set_locked(&self, actor: &Actor, team: TeamId, locked: bool) -> Result<Team, Error> {
        let team = self.store.atomically(|roster| {
            let team = roster.team_mut(team)?;
            team.locked = locked;
            Ok(team.clone())
        })?;
        info!(%actor, team = %team.id, locked, "team lock updated");
        Ok(team)
    }

    #[instrument(skip(self))]
    pub fn rename_team(&self, actor: &Actor, team: TeamId, name: &str) -> Result<Team, Error> {
        self.store.atomically(|roster| {
            let team = roster.team_mut(team)?;
            name.clone_into(&mut team.name);
            Ok(team.clone())
        })
    }

    /// Open a team, inside a project or ad hoc. The capacity defaults to
    /// the project maximum team size.
    #[instrument(skip(self))]
    pub fn create_team(
        &self,
        actor: &Actor,
        project: Option<ProjectId>,
        name: &str,
        capacity: Option<usize>,
    ) -> Result<TeamId, Error> {
        let team = self.store.atomically(|roster| {
            let capacity = match project {
                Some(p) => {
                    let sizes = roster.project(p)?.sizes;
                    let capacity = capacity.unwrap_or(sizes.max());
                    sizes.check(capacity)?;
                    capacity
                }
                None => match capacity.unwrap_or(DEFAULT_CAPACITY) {
                    0 => return Err(Error::InvalidTeamSizes { min: 0, max: 0 }),
                    capacity => capacity,
                },
            };
            roster.add_team(project, name, capacity)
        })?;
        info!(%actor, %team, "team created");
        Ok(team)
    }

    /// Create an active project and open `invited / min` empty teams for it.
    #[instrument(skip(self, invited))]
    pub fn create_project<I, E>(
        &self,
        actor: &Actor,
        name: &str,
        min: usize,
        max: usize,
        invited: I,
    ) -> Result<(ProjectId, Vec<TeamId>), Error>
    where
        I: IntoIterator<Item = E>,
        E: AsRef<str>,
    {
        let sizes = TeamSizes::new(min, max)?;
        let (project, teams, events) = self.store.atomically(|roster| {
            let id = roster.add_project(name, sizes, invited);
            let project = roster.project(id)?;
            let count = project.initial_team_count();
            let events = project
                .invited
                .iter()
                .map(|email| Event::Invited {
                    email: email.clone(),
                    project: project.name.clone(),
                })
                .collect::<Vec<_>>();
            let teams = (1..=count)
                .map(|i| roster.add_team(Some(id), &format!("Team {i}"), sizes.max()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((id, teams, events))
        })?;
        info!(%actor, %project, teams = teams.len(), invited = events.len(), "project created");
        self.publish(&events);
        Ok((project, teams))
    }

    /// Change the name, team size bounds or status of a project. Existing
    /// teams keep their capacity.
    #[instrument(skip(self))]
    pub fn update_project(
        &self,
        actor: &Actor,
        project: ProjectId,
        update: ProjectUpdate,
    ) -> Result<Project, Error> {
        let sizes = update
            .sizes
            .map(|(min, max)| TeamSizes::new(min, max))
            .transpose()?;
        let project = self.store.atomically(|roster| {
            let project = roster.project_mut(project)?;
            if let Some(name) = update.name {
                project.name = name;
            }
            if let Some(sizes) = sizes {
                project.sizes = sizes;
            }
            if let Some(status) = update.status {
                project.status = status;
            }
            Ok(project.clone())
        })?;
        info!(%actor, project = %project.id, status = %project.status, "project updated");
        Ok(project)
    }

    /// Add emails to the invited list of a project, returning the number of
    /// addresses which were not invited yet.
    #[instrument(skip(self, emails))]
    pub fn invite<I, E>(&self, actor: &Actor, project: ProjectId, emails: I) -> Result<usize, Error>
    where
        I: IntoIterator<Item = E>,
        E: AsRef<str>,
    {
        let events = self.store.atomically(|roster| {
            let project = roster.project_mut(project)?;
            let added = emails
                .into_iter()
                .filter(|e| project.invite(e.as_ref()))
                .map(|e| normalize_email(e.as_ref()))
                .collect::<Vec<_>>();
            Ok(added
                .into_iter()
                .map(|email| Event::Invited {
                    email,
                    project: project.name.clone(),
                })
                .collect::<Vec<_>>())
        })?;
        info!(%actor, %project, added = events.len(), "students invited");
        self.publish(&events);
        Ok(events.len())
    }

    /// Create a student from a submitted profile, or update the profile of
    /// the student registered with the same email.
    #[instrument(skip(self, profile), fields(email = %profile.email))]
    pub fn register_student(&self, actor: &Actor, profile: Profile) -> Result<StudentId, Error> {
        let student = self.store.atomically(|roster| {
            match roster.student_by_email(&profile.email).map(|s| s.id) {
                Some(id) => {
                    roster.student_mut(id)?.update(profile);
                    Ok(id)
                }
                None => Ok(roster.add_student(profile)),
            }
        })?;
        info!(%actor, %student, "profile submitted");
        Ok(student)
    }

    #[instrument(skip(self, profile))]
    pub fn update_student(
        &self,
        actor: &Actor,
        student: StudentId,
        profile: Profile,
    ) -> Result<Student, Error> {
        self.store.atomically(|roster| {
            let student = roster.student_mut(student)?;
            student.update(profile);
            Ok(student.clone())
        })
    }

    /// Persist generated teams as new teams of the project. The first member
    /// of each team leads it. Either every team and membership is created,
    /// or none is.
    #[instrument(skip(self, candidates), fields(teams = candidates.len()))]
    pub fn commit_teams(
        &self,
        actor: &Actor,
        project: ProjectId,
        candidates: &[CandidateTeam<'_>],
    ) -> Result<Vec<TeamId>, Error> {
        let (teams, events) = self
            .store
            .atomically(|roster| commit(roster, project, candidates))?;
        info!(%actor, %project, teams = teams.len(), "generated teams committed");
        self.publish(&events);
        Ok(teams)
    }

    /// Split the unassigned invited students of a project into balanced
    /// teams of at most `team_size` members and commit them. `team_size`
    /// must lie within the project team size bounds.
    #[instrument(skip(self, permutation))]
    pub fn generate<P>(
        &self,
        actor: &Actor,
        project: ProjectId,
        team_size: usize,
        max_teams: usize,
        permutation: &mut P,
    ) -> Result<Generation, Error>
    where
        P: Permutation + ?Sized,
    {
        let (generation, events) = self.store.atomically(|roster| {
            {
                let project = roster.project(project)?;
                project.ensure_active()?;
                project.sizes.check(team_size)?;
            }
            let pool = roster
                .unassigned(project)?
                .into_iter()
                .map(|s| roster.student(s).cloned())
                .collect::<Result<Vec<_>, Error>>()?;
            let students = pool.iter().collect::<Vec<_>>();
            let generated = partition_and_balance(&students, team_size, max_teams, permutation)?;
            let (teams, events) = commit(roster, project, &generated.teams)?;
            let generation = Generation {
                teams,
                leftover: generated.leftover.iter().map(|s| s.id).collect(),
                report: generated.report,
            };
            Ok((generation, events))
        })?;
        info!(
            %actor,
            %project,
            teams = generation.teams.len(),
            leftover = generation.leftover.len(),
            swaps = generation.report.swaps,
            "teams have been generated"
        );
        self.publish(&events);
        Ok(generation)
    }

    /// Run the balance optimizer over the unlocked teams of a project and
    /// keep the resulting swaps.
    #[instrument(skip(self))]
    pub fn rebalance(&self, actor: &Actor, project: ProjectId) -> Result<BalanceReport, Error> {
        let (report, events) = self.store.atomically(|roster| {
            roster.project(project)?.ensure_active()?;
            let teams = roster
                .teams_of(project)
                .into_iter()
                .filter(|&t| roster.team(t).is_ok_and(|t| !t.locked))
                .collect::<Vec<_>>();
            let (report, seats) = {
                let mut candidates = Vec::with_capacity(teams.len());
                for &t in &teams {
                    candidates.push(CandidateTeam::new(
                        &roster.team(t)?.name,
                        roster.members_of(t)?,
                    ));
                }
                let report = balance(&mut candidates);
                let seats = candidates
                    .iter()
                    .map(|c| c.members.iter().map(|s| s.id).collect::<Vec<_>>())
                    .collect::<Vec<_>>();
                (report, seats)
            };
            let mut events = Vec::new();
            for (&team, students) in teams.iter().zip(&seats) {
                let newcomers = {
                    let current = roster.team(team)?;
                    students
                        .iter()
                        .copied()
                        .filter(|&s| !current.contains(s))
                        .collect::<Vec<_>>()
                };
                roster.team_mut(team)?.reseat(students);
                for student in newcomers {
                    if let Some(membership) = roster.team(team)?.membership_of(student) {
                        events.push(joined_event(roster, &membership)?);
                    }
                }
            }
            Ok((report, events))
        })?;
        info!(%actor, %project, swaps = report.swaps, "project rebalanced");
        self.publish(&events);
        Ok(report)
    }
}
