use eyre::WrapErr;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    #[default]
    Sql,
    Csv,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Solver {
    pub loader: LoaderKind,
    /// Name of the project to work on. May be omitted when there is only one.
    pub project: Option<String>,
    pub team_size: usize,
    pub max_teams: usize,
    pub seed: Option<u64>,
}

impl Default for Solver {
    fn default() -> Solver {
        Solver {
            loader: LoaderKind::default(),
            project: None,
            team_size: 4,
            max_teams: 10,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Sql {
    pub url: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Csv {
    pub students: PathBuf,
    pub projects: PathBuf,
    pub teams: PathBuf,
    pub memberships: PathBuf,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub solver: Solver,
    pub sql: Option<Sql>,
    pub csv: Option<Csv>,
}

impl Config {
    pub fn load(file_name: &Path) -> eyre::Result<Config> {
        let content = std::fs::read_to_string(file_name)
            .wrap_err_with(|| format!("cannot load configuration file {}", file_name.display()))?;
        Config::parse(&content)
    }

    pub fn parse(content: &str) -> eyre::Result<Config> {
        toml::from_str(content).wrap_err("cannot parse configuration file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("[sql]\nurl = \"mysql://localhost/teams\"\n").unwrap();
        assert_eq!(config.solver, Solver::default());
        assert_eq!(config.solver.team_size, 4);
        assert_eq!(config.sql.unwrap().url, "mysql://localhost/teams");
        assert!(config.csv.is_none());
    }

    #[test]
    fn test_csv_solver() {
        let config = Config::parse(
            r#"
            [solver]
            loader = "csv"
            project = "Capstone"
            team_size = 3
            seed = 42

            [csv]
            students = "students.csv"
            projects = "projects.csv"
            teams = "teams.csv"
            memberships = "memberships.csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.solver.loader, LoaderKind::Csv);
        assert_eq!(config.solver.project.as_deref(), Some("Capstone"));
        assert_eq!(config.solver.max_teams, 10);
        assert_eq!(config.solver.seed, Some(42));
        assert_eq!(config.csv.unwrap().teams, PathBuf::from("teams.csv"));
    }

    #[test]
    fn test_invalid() {
        assert!(Config::parse("[solver]\nloader = \"ldap\"\n").is_err());
    }
}
