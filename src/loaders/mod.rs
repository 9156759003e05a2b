pub use self::csv_loader::{CsvLoader, export};
pub use self::sql_loader::SqlLoader;

use crate::config::{Config, LoaderKind};
use crate::model::{Profile, ProjectId, ProjectStatus, Role, Roster, StudentId, TeamId, TeamSizes};
use eyre::{WrapErr, bail, eyre};
use std::collections::HashMap;
use tracing::debug;

mod csv_loader;
mod sql_loader;

#[derive(Clone, Debug)]
pub struct StudentRow {
    pub key: i64,
    pub profile: Profile,
}

#[derive(Clone, Debug)]
pub struct ProjectRow {
    pub key: i64,
    pub name: String,
    pub min_team_size: usize,
    pub max_team_size: usize,
    pub invited: Vec<String>,
    pub status: ProjectStatus,
}

#[derive(Clone, Debug)]
pub struct TeamRow {
    pub key: i64,
    pub project: Option<i64>,
    pub name: String,
    pub number: Option<usize>,
    pub capacity: usize,
    pub locked: bool,
}

#[derive(Clone, Debug)]
pub struct MemberRow {
    pub student: i64,
    pub team: i64,
    pub role: Role,
}

/// Storage keys of the roster entities, indexed by dense roster id. Teams
/// created since loading have no key until they are saved.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Keys {
    pub students: Vec<i64>,
    pub projects: Vec<i64>,
    pub teams: Vec<Option<i64>>,
}

impl Keys {
    pub fn student(&self, StudentId(s): StudentId) -> Option<i64> {
        self.students.get(s).copied()
    }

    pub fn project(&self, ProjectId(p): ProjectId) -> Option<i64> {
        self.projects.get(p).copied()
    }

    pub fn team(&self, TeamId(t): TeamId) -> Option<i64> {
        self.teams.get(t).copied().flatten()
    }

    /// First key above every key in `keys`, for stores which do not
    /// generate them.
    fn next(keys: impl Iterator<Item = i64>) -> i64 {
        keys.max().map_or(1, |k| k + 1)
    }
}

#[derive(Clone, Debug)]
pub struct Loaded {
    pub roster: Roster,
    pub keys: Keys,
}

/// Build a roster with dense identifiers out of storage rows, remembering
/// the storage key of every entity.
pub fn build(
    students: Vec<StudentRow>,
    projects: Vec<ProjectRow>,
    teams: Vec<TeamRow>,
    members: Vec<MemberRow>,
) -> eyre::Result<Loaded> {
    let mut roster = Roster::new();
    let mut keys = Keys::default();
    let mut student_ids = HashMap::new();
    for row in students {
        let id = roster.add_student(row.profile);
        student_ids.insert(row.key, id);
        keys.students.push(row.key);
    }
    let mut project_ids = HashMap::new();
    for row in projects {
        let sizes = TeamSizes::new(row.min_team_size, row.max_team_size)
            .wrap_err_with(|| format!("project {} has invalid team sizes", row.name))?;
        let id = roster.add_project(&row.name, sizes, &row.invited);
        roster.project_mut(id)?.status = row.status;
        project_ids.insert(row.key, id);
        keys.projects.push(row.key);
    }
    let mut team_ids = HashMap::new();
    for row in teams {
        let project = row
            .project
            .map(|p| {
                project_ids
                    .get(&p)
                    .copied()
                    .ok_or_else(|| eyre!("team {} belongs to unknown project {p}", row.name))
            })
            .transpose()?;
        let id = roster.add_team(project, &row.name, row.capacity)?;
        let team = roster.team_mut(id)?;
        if row.number.is_some() {
            team.number = row.number;
        }
        team.locked = row.locked;
        team_ids.insert(row.key, id);
        keys.teams.push(Some(row.key));
    }
    for row in members {
        let (Some(&student), Some(&team)) = (student_ids.get(&row.student), team_ids.get(&row.team))
        else {
            bail!(
                "membership of student {} in team {} references an unknown entity",
                row.student,
                row.team
            );
        };
        roster.team_mut(team)?.push(student, row.role);
    }
    debug!(
        students = roster.students().len(),
        projects = roster.projects().len(),
        teams = roster.teams().len(),
        "roster has been loaded"
    );
    Ok(Loaded { roster, keys })
}

/// Where the roster comes from and goes back to.
pub enum Source {
    Sql(SqlLoader),
    Csv(CsvLoader),
}

impl Source {
    pub async fn open(config: &Config) -> eyre::Result<Source> {
        match config.solver.loader {
            LoaderKind::Sql => {
                let sql = config
                    .sql
                    .as_ref()
                    .ok_or_else(|| eyre!("missing [sql] section in configuration"))?;
                Ok(Source::Sql(SqlLoader::new(&sql.url).await?))
            }
            LoaderKind::Csv => {
                let csv = config
                    .csv
                    .as_ref()
                    .ok_or_else(|| eyre!("missing [csv] section in configuration"))?;
                Ok(Source::Csv(CsvLoader::new(csv.clone())))
            }
        }
    }

    pub async fn load(&mut self) -> eyre::Result<Loaded> {
        match self {
            Source::Sql(loader) => loader.load().await,
            Source::Csv(loader) => loader.load(),
        }
    }

    /// Write the roster back, giving keys to entities created since loading.
    pub async fn save(&mut self, roster: &Roster, keys: &mut Keys) -> eyre::Result<()> {
        match self {
            Source::Sql(loader) => loader.save(roster, keys).await,
            Source::Csv(loader) => loader.save(roster, keys),
        }
    }
}
