use super::normalize_email;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ProjectId(pub usize);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project #{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        })
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<ProjectStatus, String> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(ProjectStatus::Active),
            "completed" => Ok(ProjectStatus::Completed),
            "cancelled" | "canceled" => Ok(ProjectStatus::Cancelled),
            other => Err(format!("unknown project status: {other}")),
        }
    }
}

/// Inclusive team size bounds of a project.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TeamSizes {
    min: usize,
    max: usize,
}

impl TeamSizes {
    pub fn new(min: usize, max: usize) -> Result<TeamSizes, Error> {
        if min == 0 || min > max {
            return Err(Error::InvalidTeamSizes { min, max });
        }
        Ok(TeamSizes { min, max })
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn contains(&self, n: usize) -> bool {
        (self.min..=self.max).contains(&n)
    }

    pub fn check(&self, requested: usize) -> Result<(), Error> {
        if self.contains(requested) {
            Ok(())
        } else {
            Err(Error::OutOfProjectBounds {
                requested,
                min: self.min,
                max: self.max,
            })
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub sizes: TeamSizes,
    pub invited: BTreeSet<String>,
    pub status: ProjectStatus,
}

impl Project {
    pub fn new<I, S>(id: ProjectId, name: &str, sizes: TeamSizes, invited: I) -> Project
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Project {
            id,
            name: name.to_owned(),
            sizes,
            invited: invited
                .into_iter()
                .map(|e| normalize_email(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
            status: ProjectStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ProjectStatus::Active
    }

    pub fn ensure_active(&self) -> Result<(), Error> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::ProjectNotActive {
                project: self.id,
                status: self.status,
            })
        }
    }

    pub fn is_invited(&self, email: &str) -> bool {
        self.invited.contains(&normalize_email(email))
    }

    /// Add an email to the invited list, returning `false` if it was
    /// empty or already present.
    pub fn invite(&mut self, email: &str) -> bool {
        let email = normalize_email(email);
        !email.is_empty() && self.invited.insert(email)
    }

    /// Number of empty teams opened when the project is created.
    pub fn initial_team_count(&self) -> usize {
        self.invited.len() / self.sizes.min()
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
