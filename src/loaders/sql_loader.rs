#![allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use super::{Keys, Loaded, MemberRow, ProjectRow, StudentRow, TeamRow, build};
use crate::model::{Availability, Profile, Roster, StudentId, Team};
use eyre::{WrapErr, eyre};
use sqlx::any::{AnyConnectOptions, AnyRow};
use sqlx::{AnyConnection, Connection, Row};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::{debug, trace};

/// Roster stored in a SQL database. Skills, availability and invitation
/// lists are JSON documents in text columns.
pub struct SqlLoader {
    conn: AnyConnection,
}

fn json_column<T>(row: &AnyRow, column: &str) -> eyre::Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    match row.get::<Option<String>, _>(column) {
        Some(text) if !text.trim().is_empty() => {
            serde_json::from_str(&text).wrap_err_with(|| format!("invalid JSON in column {column}"))
        }
        _ => Ok(T::default()),
    }
}

impl SqlLoader {
    pub async fn new(url: &str) -> eyre::Result<Self> {
        sqlx::any::install_default_drivers();
        Ok(Self {
            conn: AnyConnection::connect_with(&AnyConnectOptions::from_str(url)?)
                .await
                .wrap_err("cannot connect to database")?,
        })
    }

    pub async fn load(&mut self) -> eyre::Result<Loaded> {
        let students = self.load_students().await.wrap_err("cannot load students")?;
        let projects = self.load_projects().await.wrap_err("cannot load projects")?;
        let teams = self.load_teams().await.wrap_err("cannot load teams")?;
        let members = self
            .load_members()
            .await
            .wrap_err("cannot load team members")?;
        build(students, projects, teams, members)
    }

    async fn load_students(&mut self) -> eyre::Result<Vec<StudentRow>> {
        sqlx::query(
            "SELECT id, email, name, major, year, interests, skills, availability FROM students",
        )
        .map(|row: AnyRow| -> eyre::Result<StudentRow> {
            let email: String = row.get("email");
            let name: String = row.get("name");
            let mut profile = Profile::new(&email, &name);
            profile.major = row.get("major");
            profile.year = row.get("year");
            profile.interests = row.get("interests");
            profile.skills = json_column::<BTreeSet<String>>(&row, "skills")?;
            profile.availability = json_column::<Availability>(&row, "availability")?;
            Ok(StudentRow {
                key: i64::from(row.get::<i32, _>("id")),
                profile,
            })
        })
        .fetch_all(&mut self.conn)
        .await?
        .into_iter()
        .collect()
    }

    async fn load_projects(&mut self) -> eyre::Result<Vec<ProjectRow>> {
        sqlx::query(
            "SELECT id, name, min_team_size, max_team_size, student_emails, status FROM projects",
        )
        .map(|row: AnyRow| -> eyre::Result<ProjectRow> {
            Ok(ProjectRow {
                key: i64::from(row.get::<i32, _>("id")),
                name: row.get("name"),
                min_team_size: row.get::<i32, _>("min_team_size") as usize,
                max_team_size: row.get::<i32, _>("max_team_size") as usize,
                invited: json_column(&row, "student_emails")?,
                status: row
                    .get::<String, _>("status")
                    .parse()
                    .map_err(|e: String| eyre!(e))?,
            })
        })
        .fetch_all(&mut self.conn)
        .await?
        .into_iter()
        .collect()
    }

    async fn load_teams(&mut self) -> eyre::Result<Vec<TeamRow>> {
        sqlx::query("SELECT id, project_id, name, team_number, max_members, locked FROM teams")
            .map(|row: AnyRow| -> eyre::Result<TeamRow> {
                Ok(TeamRow {
                    key: i64::from(row.get::<i32, _>("id")),
                    project: row.get::<Option<i32>, _>("project_id").map(i64::from),
                    name: row.get("name"),
                    number: row
                        .get::<Option<i32>, _>("team_number")
                        .map(|n| n as usize),
                    capacity: row.get::<i32, _>("max_members") as usize,
                    locked: row.get::<i32, _>("locked") != 0,
                })
            })
            .fetch_all(&mut self.conn)
            .await?
            .into_iter()
            .collect()
    }

    async fn load_members(&mut self) -> eyre::Result<Vec<MemberRow>> {
        sqlx::query("SELECT student_id, team_id, role FROM team_members")
            .map(|row: AnyRow| -> eyre::Result<MemberRow> {
                Ok(MemberRow {
                    student: i64::from(row.get::<i32, _>("student_id")),
                    team: i64::from(row.get::<i32, _>("team_id")),
                    role: row
                        .get::<Option<String>, _>("role")
                        .unwrap_or_default()
                        .parse()
                        .map_err(|e: String| eyre!(e))?,
                })
            })
            .fetch_all(&mut self.conn)
            .await?
            .into_iter()
            .collect()
    }

    /// Write teams and memberships back in one transaction. Teams without a
    /// key are inserted and receive the key generated by the database.
    pub async fn save(&mut self, roster: &Roster, keys: &mut Keys) -> eyre::Result<()> {
        let mut trans = self.conn.begin().await?;
        for team in roster.teams() {
            let project = team
                .project
                .map(|p| {
                    keys.project(p)
                        .ok_or_else(|| eyre!("project of {} has never been saved", team.name))
                })
                .transpose()?;
            let key = match keys.team(team.id) {
                Some(key) => {
                    sqlx::query(
                        "UPDATE teams SET name=?, team_number=?, max_members=?, locked=? WHERE id=?",
                    )
                    .bind(team.name.clone())
                    .bind(team.number.map(|n| n as i32))
                    .bind(team.capacity as i32)
                    .bind(i32::from(team.locked))
                    .bind(key)
                    .execute(&mut *trans)
                    .await
                    .wrap_err_with(|| format!("cannot update team {}", team.name))?;
                    sqlx::query("DELETE FROM team_members WHERE team_id=?")
                        .bind(key)
                        .execute(&mut *trans)
                        .await
                        .wrap_err("cannot clear team members")?;
                    key
                }
                None => insert_team(&mut trans, team, project).await?,
            };
            if keys.teams.len() <= team.id.0 {
                keys.teams.resize(team.id.0 + 1, None);
            }
            keys.teams[team.id.0] = Some(key);
            for member in team.members() {
                let student = student_key(keys, member.student)?;
                sqlx::query("INSERT INTO team_members (student_id, team_id, role) VALUES (?, ?, ?)")
                    .bind(student)
                    .bind(key)
                    .bind(member.role.to_string())
                    .execute(&mut *trans)
                    .await
                    .wrap_err("cannot save team member")?;
            }
            trace!(team = %team.name, key, members = team.size(), "team saved");
        }
        trans
            .commit()
            .await
            .wrap_err("error when committing transaction")?;
        debug!(teams = roster.teams().len(), "teams have been saved");
        Ok(())
    }
}

fn student_key(keys: &Keys, student: StudentId) -> eyre::Result<i64> {
    keys.student(student)
        .ok_or_else(|| eyre!("{student} has never been saved"))
}

async fn insert_team(
    trans: &mut sqlx::Transaction<'_, sqlx::Any>,
    team: &Team,
    project: Option<i64>,
) -> eyre::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO teams (project_id, name, team_number, max_members, locked) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(project)
    .bind(team.name.clone())
    .bind(team.number.map(|n| n as i32))
    .bind(team.capacity as i32)
    .bind(i32::from(team.locked))
    .execute(&mut **trans)
    .await
    .wrap_err_with(|| format!("cannot insert team {}", team.name))?;
    result
        .last_insert_id()
        .ok_or_else(|| eyre!("database did not return a key for team {}", team.name))
}
