use super::{Keys, Loaded, MemberRow, ProjectRow, StudentRow, TeamRow, build};
use crate::config;
use crate::model::{Availability, Profile, ProjectId, ProjectStatus, Role, Roster};
use eyre::{WrapErr, eyre};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Separator of list cells (skills, invited emails).
const LIST_SEPARATOR: &str = ";";

#[derive(Debug, Deserialize, Serialize)]
struct StudentRecord {
    id: i64,
    email: String,
    name: String,
    major: Option<String>,
    year: Option<String>,
    interests: Option<String>,
    skills: String,
    /// JSON object mapping days to slots to availability.
    availability: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct ProjectRecord {
    id: i64,
    name: String,
    min_team_size: usize,
    max_team_size: usize,
    student_emails: String,
    status: ProjectStatus,
}

#[derive(Debug, Deserialize, Serialize)]
struct TeamRecord {
    id: i64,
    project_id: Option<i64>,
    name: String,
    team_number: Option<usize>,
    max_members: usize,
    locked: bool,
}

#[derive(Debug, Deserialize, Serialize)]
struct MemberRecord {
    student_id: i64,
    team_id: i64,
    role: Role,
}

fn split_list(cell: &str) -> Vec<String> {
    cell.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn join_list<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

fn read<T: serde::de::DeserializeOwned>(path: &Path) -> eyre::Result<Vec<T>> {
    csv::Reader::from_path(path)
        .wrap_err_with(|| format!("cannot open {}", path.display()))?
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .wrap_err_with(|| format!("cannot read {}", path.display()))
}

fn write<T: Serialize>(path: &Path, records: &[T]) -> eyre::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .wrap_err_with(|| format!("cannot create {}", path.display()))?;
    for record in records {
        writer
            .serialize(record)
            .wrap_err_with(|| format!("cannot write {}", path.display()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Roster stored in four CSV files with headers.
pub struct CsvLoader {
    files: config::Csv,
}

impl CsvLoader {
    pub fn new(files: config::Csv) -> CsvLoader {
        CsvLoader { files }
    }

    pub fn load(&mut self) -> eyre::Result<Loaded> {
        let students = read::<StudentRecord>(&self.files.students)?
            .into_iter()
            .map(|r| -> eyre::Result<StudentRow> {
                let availability = if r.availability.trim().is_empty() {
                    Availability::default()
                } else {
                    serde_json::from_str(&r.availability)
                        .wrap_err_with(|| format!("invalid availability for {}", r.email))?
                };
                let mut profile = Profile::new(&r.email, &r.name)
                    .with_skills(split_list(&r.skills))
                    .with_availability(availability);
                profile.major = r.major;
                profile.year = r.year;
                profile.interests = r.interests;
                Ok(StudentRow {
                    key: r.id,
                    profile,
                })
            })
            .collect::<eyre::Result<Vec<_>>>()?;
        let projects = read::<ProjectRecord>(&self.files.projects)?
            .into_iter()
            .map(|r| ProjectRow {
                key: r.id,
                invited: split_list(&r.student_emails),
                name: r.name,
                min_team_size: r.min_team_size,
                max_team_size: r.max_team_size,
                status: r.status,
            })
            .collect();
        let teams = read::<TeamRecord>(&self.files.teams)?
            .into_iter()
            .map(|r| TeamRow {
                key: r.id,
                project: r.project_id,
                name: r.name,
                number: r.team_number,
                capacity: r.max_members,
                locked: r.locked,
            })
            .collect();
        let members = read::<MemberRecord>(&self.files.memberships)?
            .into_iter()
            .map(|r| MemberRow {
                student: r.student_id,
                team: r.team_id,
                role: r.role,
            })
            .collect();
        build(students, projects, teams, members)
    }

    /// Rewrite every file. Entities created since loading get the next
    /// free key of their file.
    pub fn save(&mut self, roster: &Roster, keys: &mut Keys) -> eyre::Result<()> {
        assign_keys(roster, keys);
        let students = roster
            .students()
            .iter()
            .zip(&keys.students)
            .map(|(s, &id)| -> eyre::Result<StudentRecord> {
                Ok(StudentRecord {
                    id,
                    email: s.email.clone(),
                    name: s.name.clone(),
                    major: s.major.clone(),
                    year: s.year.clone(),
                    interests: s.interests.clone(),
                    skills: join_list(&s.skills),
                    availability: serde_json::to_string(&s.availability)?,
                })
            })
            .collect::<eyre::Result<Vec<_>>>()?;
        let projects = roster
            .projects()
            .iter()
            .zip(&keys.projects)
            .map(|(p, &id)| ProjectRecord {
                id,
                name: p.name.clone(),
                min_team_size: p.sizes.min(),
                max_team_size: p.sizes.max(),
                student_emails: join_list(&p.invited),
                status: p.status,
            })
            .collect::<Vec<_>>();
        let mut teams = Vec::new();
        let mut members = Vec::new();
        for team in roster.teams() {
            let id = keys
                .team(team.id)
                .ok_or_else(|| eyre!("{} has no key", team.name))?;
            teams.push(TeamRecord {
                id,
                project_id: team.project.and_then(|p| keys.project(p)),
                name: team.name.clone(),
                team_number: team.number,
                max_members: team.capacity,
                locked: team.locked,
            });
            for member in team.members() {
                members.push(MemberRecord {
                    student_id: keys
                        .student(member.student)
                        .ok_or_else(|| eyre!("{} has no key", member.student))?,
                    team_id: id,
                    role: member.role,
                });
            }
        }
        write(&self.files.students, &students)?;
        write(&self.files.projects, &projects)?;
        write(&self.files.teams, &teams)?;
        write(&self.files.memberships, &members)?;
        debug!(
            teams = teams.len(),
            memberships = members.len(),
            "roster has been saved"
        );
        Ok(())
    }
}

fn assign_keys(roster: &Roster, keys: &mut Keys) {
    while keys.students.len() < roster.students().len() {
        let next = Keys::next(keys.students.iter().copied());
        keys.students.push(next);
    }
    while keys.projects.len() < roster.projects().len() {
        let next = Keys::next(keys.projects.iter().copied());
        keys.projects.push(next);
    }
    keys.teams.resize(roster.teams().len(), None);
    for t in 0..keys.teams.len() {
        if keys.teams[t].is_none() {
            let next = Keys::next(keys.teams.iter().flatten().copied());
            keys.teams[t] = Some(next);
        }
    }
}

#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    team_number: Option<usize>,
    team: &'a str,
    name: &'a str,
    email: &'a str,
    role: Role,
    skills: String,
}

/// Write one row per membership of the teams of `project`.
pub fn export(roster: &Roster, project: ProjectId, path: &Path) -> eyre::Result<()> {
    let mut records = Vec::new();
    for team in roster.teams_of(project) {
        let team = roster.team(team)?;
        for member in team.members() {
            let student = roster.student(member.student)?;
            records.push(ExportRecord {
                team_number: team.number,
                team: &team.name,
                name: &student.name,
                email: &student.email,
                role: member.role,
                skills: join_list(&student.skills),
            });
        }
    }
    write(path, &records)?;
    debug!(rows = records.len(), path = %path.display(), "memberships exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StudentId, TeamId};
    use std::fs;
    use tempfile::TempDir;

    fn fixture(dir: &TempDir) -> config::Csv {
        let files = config::Csv {
            students: dir.path().join("students.csv"),
            projects: dir.path().join("projects.csv"),
            teams: dir.path().join("teams.csv"),
            memberships: dir.path().join("memberships.csv"),
        };
        fs::write(
            &files.students,
            "id,email,name,major,year,interests,skills,availability\n\
             10,Ada@Example.org,Ada,CS,3,,rust;sql,\"{\"\"Mon\"\":{\"\"9\"\":true}}\"\n\
             11,bob@example.org,Bob,,,,ui,\n",
        )
        .unwrap();
        fs::write(
            &files.projects,
            "id,name,min_team_size,max_team_size,student_emails,status\n\
             3,Capstone,1,3,ada@example.org;bob@example.org;eve@example.org,active\n",
        )
        .unwrap();
        fs::write(
            &files.teams,
            "id,project_id,name,team_number,max_members,locked\n\
             7,3,Team 1,1,3,false\n",
        )
        .unwrap();
        fs::write(
            &files.memberships,
            "student_id,team_id,role\n10,7,leader\n",
        )
        .unwrap();
        files
    }

    #[test]
    fn test_load() {
        let dir = TempDir::new().unwrap();
        let loaded = CsvLoader::new(fixture(&dir)).load().unwrap();
        let r = &loaded.roster;
        let ada = r.student_by_email("ada@example.org").unwrap();
        assert_eq!(ada.major.as_deref(), Some("CS"));
        assert_eq!(ada.interests, None);
        assert!(ada.availability.is_available("Mon", "9"));
        assert_eq!(ada.skills.len(), 2);
        assert_eq!(r.pending_invitations(ProjectId(0)).unwrap(), vec!["eve@example.org"]);
        assert_eq!(
            r.team(TeamId(0)).unwrap().membership_of(ada.id).map(|m| m.role),
            Some(Role::Leader)
        );
        assert_eq!(loaded.keys.students, vec![10, 11]);
    }

    #[test]
    fn test_save_keys_new_teams() {
        let dir = TempDir::new().unwrap();
        let files = fixture(&dir);
        let mut loader = CsvLoader::new(files.clone());
        let Loaded {
            mut roster,
            mut keys,
        } = loader.load().unwrap();
        let t = roster.add_team(Some(ProjectId(0)), "Team 2", 2).unwrap();
        roster.team_mut(t).unwrap().push(StudentId(1), Role::Member);
        loader.save(&roster, &mut keys).unwrap();
        assert_eq!(keys.team(t), Some(8));
        let reloaded = CsvLoader::new(files).load().unwrap();
        let team = reloaded.roster.team(TeamId(1)).unwrap();
        assert_eq!(team.name, "Team 2");
        assert_eq!(team.number, Some(2));
        assert_eq!(team.student_ids(), vec![StudentId(1)]);
        assert!(reloaded.roster.student(StudentId(0)).unwrap().availability.is_available("Mon", "9"));
    }

    #[test]
    fn test_export() {
        let dir = TempDir::new().unwrap();
        let loaded = CsvLoader::new(fixture(&dir)).load().unwrap();
        let path = dir.path().join("export.csv");
        export(&loaded.roster, ProjectId(0), &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "team_number,team,name,email,role,skills\n1,Team 1,Ada,ada@example.org,leader,rust;sql\n"
        );
    }
}
