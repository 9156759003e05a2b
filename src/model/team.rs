use super::{ProjectId, StudentId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Capacity given to ad-hoc teams created without an explicit one.
pub const DEFAULT_CAPACITY: usize = 4;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TeamId(pub usize);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team #{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Leader,
    #[default]
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Leader => "leader",
            Role::Member => "member",
        })
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Role, String> {
        match s.trim().to_lowercase().as_str() {
            "leader" => Ok(Role::Leader),
            "" | "member" => Ok(Role::Member),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Member {
    pub student: StudentId,
    pub role: Role,
}

/// The relation between a student and a team, as returned to callers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Membership {
    pub student: StudentId,
    pub team: TeamId,
    pub project: Option<ProjectId>,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Team {
    pub id: TeamId,
    pub project: Option<ProjectId>,
    pub name: String,
    pub number: Option<usize>,
    pub capacity: usize,
    pub locked: bool,
    members: Vec<Member>,
}

impl Team {
    pub fn new(id: TeamId, project: Option<ProjectId>, name: &str, capacity: usize) -> Team {
        Team {
            id,
            project,
            name: name.to_owned(),
            number: None,
            capacity,
            locked: false,
            members: Vec::new(),
        }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn student_ids(&self) -> Vec<StudentId> {
        self.members.iter().map(|m| m.student).collect()
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.size() >= self.capacity
    }

    pub fn free(&self) -> usize {
        self.capacity.saturating_sub(self.size())
    }

    pub fn contains(&self, student: StudentId) -> bool {
        self.members.iter().any(|m| m.student == student)
    }

    pub fn membership_of(&self, student: StudentId) -> Option<Membership> {
        self.members
            .iter()
            .find(|m| m.student == student)
            .map(|m| self.membership(*m))
    }

    pub fn membership(&self, member: Member) -> Membership {
        Membership {
            student: member.student,
            team: self.id,
            project: self.project,
            role: member.role,
        }
    }

    /// Append a member without any capacity check. Callers are the
    /// mutation engine and loaders, which validate beforehand.
    pub(crate) fn push(&mut self, student: StudentId, role: Role) -> Membership {
        let member = Member { student, role };
        self.members.push(member);
        self.membership(member)
    }

    /// Remove a member, returning `false` if the student was not part of
    /// the team.
    pub(crate) fn remove(&mut self, student: StudentId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.student != student);
        self.members.len() != before
    }

    /// Replace the members by `students`. Students who were already in the
    /// team keep their role, newcomers are plain members.
    pub(crate) fn reseat(&mut self, students: &[StudentId]) {
        self.members = students
            .iter()
            .map(|&student| Member {
                student,
                role: self
                    .members
                    .iter()
                    .find(|m| m.student == student)
                    .map_or(Role::Member, |m| m.role),
            })
            .collect();
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
