use crate::model::{ProjectId, ProjectStatus, StudentId, TeamId};
use std::fmt;

/// An entity which could not be found in the roster.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Entity {
    Student(StudentId),
    Project(ProjectId),
    Team(TeamId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Student(s) => write!(f, "{s}"),
            Entity::Project(p) => write!(f, "{p}"),
            Entity::Team(t) => write!(f, "{t}"),
        }
    }
}

/// Every way a roster query or mutation can be refused. Validation errors
/// are returned before anything is written.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("{team} is full ({capacity} members)")]
    TeamFull { team: TeamId, capacity: usize },
    #[error("{student} is already a member of {team} for this project")]
    AlreadyAssigned { student: StudentId, team: TeamId },
    #[error("{project} is {status}")]
    ProjectNotActive {
        project: ProjectId,
        status: ProjectStatus,
    },
    #[error("cannot set capacity of {team} to {requested}: it has {members} members")]
    BelowCurrentMembership {
        team: TeamId,
        requested: usize,
        members: usize,
    },
    #[error("capacity {requested} is outside of project bounds [{min}, {max}]")]
    OutOfProjectBounds {
        requested: usize,
        min: usize,
        max: usize,
    },
    #[error("no students available for team generation")]
    NoStudentsAvailable,
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("{student} has not been invited to {project}")]
    NotInvited {
        student: StudentId,
        project: ProjectId,
    },
    #[error("invalid team sizes (min {min}, max {max})")]
    InvalidTeamSizes { min: usize, max: usize },
    #[error("not a permutation of {len} elements")]
    InvalidPermutation { len: usize },
    #[error("persistence error: {0}")]
    Persistence(String),
}
