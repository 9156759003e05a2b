use crate::algos::team_score;
use crate::error::Error;
use crate::model::{ProjectId, Roster, TeamId, availability_score};

#[derive(Clone, Debug, PartialEq)]
pub struct TeamStats {
    pub team: TeamId,
    pub members: usize,
    pub capacity: usize,
    pub distinct_skills: usize,
    pub availability: f64,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Statistics {
    pub teams: Vec<TeamStats>,
    pub invited: usize,
    pub assigned: usize,
    pub unassigned: usize,
    pub pending: usize,
}

impl Statistics {
    pub fn total_score(&self) -> f64 {
        self.teams.iter().map(|t| t.score).sum()
    }

    pub fn free_seats(&self) -> usize {
        self.teams
            .iter()
            .map(|t| t.capacity.saturating_sub(t.members))
            .sum()
    }
}

pub fn statistics(roster: &Roster, project: ProjectId) -> Result<Statistics, Error> {
    let teams = roster
        .teams_of(project)
        .into_iter()
        .map(|team| {
            let members = roster.members_of(team)?;
            let occupancy = roster.occupancy(team)?;
            Ok(TeamStats {
                team,
                members: occupancy.members,
                capacity: occupancy.capacity,
                distinct_skills: roster.skill_profile(team)?.distinct(),
                availability: availability_score(&members),
                score: team_score(&members),
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    let invited = roster.invited_students(project)?.len();
    let unassigned = roster.unassigned(project)?.len();
    Ok(Statistics {
        teams,
        invited,
        assigned: invited - unassigned,
        unassigned,
        pending: roster.pending_invitations(project)?.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Availability, Profile, Role, TeamSizes};

    #[test]
    fn test_statistics() {
        let mut r = Roster::new();
        let a = r.add_student(
            Profile::new("a@x.org", "A")
                .with_skills(["rust", "ui"])
                .with_availability(Availability::new().with("Mon", "9", true)),
        );
        r.add_student(Profile::new("b@x.org", "B"));
        let p = r.add_project(
            "p",
            TeamSizes::new(1, 3).unwrap(),
            ["a@x.org", "b@x.org", "c@x.org"],
        );
        let t = r.add_team(Some(p), "Team 1", 3).unwrap();
        r.team_mut(t).unwrap().push(a, Role::Leader);
        let stats = statistics(&r, p).unwrap();
        assert_eq!(stats.invited, 2);
        assert_eq!(stats.assigned, 1);
        assert_eq!(stats.unassigned, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.free_seats(), 2);
        assert_eq!(stats.teams[0].distinct_skills, 2);
        assert!((stats.total_score() - 3.0).abs() < 1e-9);
    }
}
