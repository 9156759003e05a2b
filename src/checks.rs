use crate::model::{ProjectId, Roster};
use eyre::bail;
use std::collections::HashMap;
use tracing::warn;

/// Warn about non-empty teams which are below the minimum team size of
/// their project.
pub fn check_team_sizes(roster: &Roster, project: ProjectId) {
    let Ok(p) = roster.project(project) else {
        return;
    };
    for team in roster.teams_of(project) {
        if let Ok(t) = roster.team(team) {
            if !t.is_empty() && t.size() < p.sizes.min() {
                warn!(
                    team = %t,
                    members = t.size(),
                    min = p.sizes.min(),
                    "team is below the project minimum size"
                );
            }
        }
    }
}

/// Check that no student is in two teams of the same project and that no
/// team is over capacity.
pub fn ensure_consistent(roster: &Roster) -> eyre::Result<()> {
    let mut seen = HashMap::new();
    for team in roster.teams() {
        if team.size() > team.capacity {
            bail!(
                "team {} has {} members for a capacity of {}",
                team.name,
                team.size(),
                team.capacity
            );
        }
        let Some(project) = team.project else {
            continue;
        };
        for member in team.members() {
            if let Some(other) = seen.insert((project, member.student), team.id) {
                bail!(
                    "{} is a member of both {} and {} in {}",
                    member.student,
                    other,
                    team.id,
                    project
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Profile, Role, TeamSizes};

    #[test]
    fn test_ensure_consistent() {
        let mut r = Roster::new();
        let s = r.add_student(Profile::new("a@x.org", "A"));
        let p = r.add_project("p", TeamSizes::new(1, 2).unwrap(), ["a@x.org"]);
        let t1 = r.add_team(Some(p), "Team 1", 1).unwrap();
        let t2 = r.add_team(Some(p), "Team 2", 1).unwrap();
        let adhoc = r.add_team(None, "Ad hoc", 1).unwrap();
        r.team_mut(t1).unwrap().push(s, Role::Member);
        r.team_mut(adhoc).unwrap().push(s, Role::Member);
        assert!(ensure_consistent(&r).is_ok());
        r.team_mut(t2).unwrap().push(s, Role::Member);
        assert!(ensure_consistent(&r).is_err());
        r.team_mut(t2).unwrap().remove(s);
        r.team_mut(t1).unwrap().capacity = 0;
        assert!(ensure_consistent(&r).is_err());
    }
}
