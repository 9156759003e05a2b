use super::*;
use crate::error::{Entity, Error};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Occupancy {
    pub members: usize,
    pub capacity: usize,
}

impl Occupancy {
    pub fn is_full(&self) -> bool {
        self.members >= self.capacity
    }

    pub fn free(&self) -> usize {
        self.capacity.saturating_sub(self.members)
    }
}

/// Multiset union of the skills of a set of students.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SkillProfile(BTreeMap<String, usize>);

impl SkillProfile {
    pub fn of(members: &[&Student]) -> SkillProfile {
        let mut counts = BTreeMap::new();
        for skill in members.iter().flat_map(|s| &s.skills) {
            *counts.entry(skill.clone()).or_insert(0) += 1;
        }
        SkillProfile(counts)
    }

    /// Number of distinct skills.
    pub fn distinct(&self) -> usize {
        self.0.len()
    }

    pub fn count(&self, skill: &str) -> usize {
        self.0.get(skill).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(skill, &n)| (skill.as_str(), n))
    }
}

/// Ratio of available (slot, student) pairs over all declared pairs, or 0
/// if nobody declared any availability.
#[allow(clippy::cast_precision_loss)]
pub fn availability_score(members: &[&Student]) -> f64 {
    let (total, available) = members
        .iter()
        .flat_map(|s| s.availability.declared())
        .fold((0usize, 0usize), |(total, available), (_, _, a)| {
            (total + 1, available + usize::from(a))
        });
    if total == 0 {
        0.0
    } else {
        available as f64 / total as f64
    }
}

/// Fraction of the (day, slot) pairs where at least one member is available
/// during which `candidate` is available too.
#[allow(clippy::cast_precision_loss)]
pub fn availability_overlap(members: &[&Student], candidate: &Student) -> f64 {
    let team = members
        .iter()
        .flat_map(|s| s.availability.available())
        .collect::<BTreeSet<_>>();
    if team.is_empty() {
        return 0.0;
    }
    let shared = team
        .iter()
        .filter(|(day, slot)| candidate.availability.is_available(day, slot))
        .count();
    shared as f64 / team.len() as f64
}

/// Day, then slot, then number of available students.
pub type Heatmap = BTreeMap<String, BTreeMap<String, usize>>;

pub fn availability_heatmap(members: &[&Student]) -> Heatmap {
    let mut heatmap = Heatmap::new();
    for (day, slot) in members.iter().flat_map(|s| s.availability.available()) {
        *heatmap
            .entry(day.to_owned())
            .or_default()
            .entry(slot.to_owned())
            .or_insert(0) += 1;
    }
    heatmap
}

/// Snapshot of every student, project and team, with their memberships.
/// Identifiers are indices into this structure.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    students: Vec<Student>,
    projects: Vec<Project>,
    teams: Vec<Team>,
}

impl Roster {
    pub fn new() -> Roster {
        Roster::default()
    }

    pub fn add_student(&mut self, profile: Profile) -> StudentId {
        let id = StudentId(self.students.len());
        self.students.push(Student::new(id, profile));
        id
    }

    pub fn add_project<I, S>(&mut self, name: &str, sizes: TeamSizes, invited: I) -> ProjectId
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let id = ProjectId(self.projects.len());
        self.projects.push(Project::new(id, name, sizes, invited));
        id
    }

    /// Open an empty team. Project teams are numbered after the last
    /// existing team of the project.
    pub fn add_team(
        &mut self,
        project: Option<ProjectId>,
        name: &str,
        capacity: usize,
    ) -> Result<TeamId, Error> {
        let number = project.map(|p| self.next_team_number(p)).transpose()?;
        let id = TeamId(self.teams.len());
        let mut team = Team::new(id, project, name, capacity);
        team.number = number;
        self.teams.push(team);
        Ok(id)
    }

    /// Number the next team of `project` will get.
    pub fn next_team_number(&self, project: ProjectId) -> Result<usize, Error> {
        self.project(project)?;
        Ok(self
            .teams
            .iter()
            .filter(|t| t.project == Some(project))
            .filter_map(|t| t.number)
            .max()
            .unwrap_or(0)
            + 1)
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn student(&self, StudentId(student): StudentId) -> Result<&Student, Error> {
        self.students
            .get(student)
            .ok_or(Error::NotFound(Entity::Student(StudentId(student))))
    }

    pub fn student_mut(&mut self, StudentId(student): StudentId) -> Result<&mut Student, Error> {
        self.students
            .get_mut(student)
            .ok_or(Error::NotFound(Entity::Student(StudentId(student))))
    }

    pub fn project(&self, ProjectId(project): ProjectId) -> Result<&Project, Error> {
        self.projects
            .get(project)
            .ok_or(Error::NotFound(Entity::Project(ProjectId(project))))
    }

    pub fn project_mut(&mut self, ProjectId(project): ProjectId) -> Result<&mut Project, Error> {
        self.projects
            .get_mut(project)
            .ok_or(Error::NotFound(Entity::Project(ProjectId(project))))
    }

    pub fn team(&self, TeamId(team): TeamId) -> Result<&Team, Error> {
        self.teams
            .get(team)
            .ok_or(Error::NotFound(Entity::Team(TeamId(team))))
    }

    pub fn team_mut(&mut self, TeamId(team): TeamId) -> Result<&mut Team, Error> {
        self.teams
            .get_mut(team)
            .ok_or(Error::NotFound(Entity::Team(TeamId(team))))
    }

    pub fn student_by_email(&self, email: &str) -> Option<&Student> {
        let email = normalize_email(email);
        self.students.iter().find(|s| s.email == email)
    }

    pub fn project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Teams of a project, ordered by team number.
    pub fn teams_of(&self, project: ProjectId) -> Vec<TeamId> {
        let mut teams = self
            .teams
            .iter()
            .filter(|t| t.project == Some(project))
            .map(|t| (t.number.unwrap_or(usize::MAX), t.id))
            .collect::<Vec<_>>();
        teams.sort_unstable();
        teams.into_iter().map(|(_, id)| id).collect()
    }

    /// The team of `project` the student belongs to, if any.
    pub fn team_of(&self, student: StudentId, project: ProjectId) -> Option<TeamId> {
        self.teams
            .iter()
            .find(|t| t.project == Some(project) && t.contains(student))
            .map(|t| t.id)
    }

    pub fn memberships_of(&self, student: StudentId) -> Vec<Membership> {
        self.teams
            .iter()
            .filter_map(|t| t.membership_of(student))
            .collect()
    }

    /// Registered students whose email is on the project invited list.
    pub fn invited_students(&self, project: ProjectId) -> Result<Vec<StudentId>, Error> {
        let project = self.project(project)?;
        Ok(self
            .students
            .iter()
            .filter(|s| project.invited.contains(&s.email))
            .map(|s| s.id)
            .collect())
    }

    /// Invited students without a team in the project.
    pub fn unassigned(&self, project: ProjectId) -> Result<Vec<StudentId>, Error> {
        Ok(self
            .invited_students(project)?
            .into_iter()
            .filter(|&s| self.team_of(s, project).is_none())
            .collect())
    }

    /// Invited emails for which no student has registered yet.
    pub fn pending_invitations(&self, project: ProjectId) -> Result<Vec<String>, Error> {
        Ok(self
            .project(project)?
            .invited
            .iter()
            .filter(|e| self.student_by_email(e).is_none())
            .cloned()
            .collect())
    }

    pub fn occupancy(&self, team: TeamId) -> Result<Occupancy, Error> {
        let team = self.team(team)?;
        Ok(Occupancy {
            members: team.size(),
            capacity: team.capacity,
        })
    }

    pub fn members_of(&self, team: TeamId) -> Result<Vec<&Student>, Error> {
        self.team(team)?
            .members()
            .iter()
            .map(|m| self.student(m.student))
            .collect()
    }

    pub fn skill_profile(&self, team: TeamId) -> Result<SkillProfile, Error> {
        Ok(SkillProfile::of(&self.members_of(team)?))
    }

    pub fn availability_score(&self, team: TeamId) -> Result<f64, Error> {
        Ok(availability_score(&self.members_of(team)?))
    }

    /// How well a candidate's availability matches the one of a team.
    pub fn fit(&self, team: TeamId, candidate: StudentId) -> Result<f64, Error> {
        Ok(availability_overlap(
            &self.members_of(team)?,
            self.student(candidate)?,
        ))
    }
}
