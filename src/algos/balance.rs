use crate::model::{SkillProfile, Student, availability_score};
use tracing::{debug, instrument, trace};

/// Number of improvement passes over every pair of teams.
pub const MAX_PASSES: usize = 3;

/// A team which has not been persisted yet.
#[derive(Clone, Debug)]
pub struct CandidateTeam<'a> {
    pub name: String,
    pub members: Vec<&'a Student>,
}

impl<'a> CandidateTeam<'a> {
    pub fn new(name: &str, members: Vec<&'a Student>) -> CandidateTeam<'a> {
        CandidateTeam {
            name: name.to_owned(),
            members,
        }
    }

    pub fn skill_profile(&self) -> SkillProfile {
        SkillProfile::of(&self.members)
    }

    pub fn score(&self) -> f64 {
        team_score(&self.members)
    }
}

/// Distinct skill count plus availability score.
#[allow(clippy::cast_precision_loss)]
pub fn team_score(members: &[&Student]) -> f64 {
    SkillProfile::of(members).distinct() as f64 + availability_score(members)
}

pub fn total_score(teams: &[CandidateTeam<'_>]) -> f64 {
    teams.iter().map(CandidateTeam::score).sum()
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BalanceReport {
    pub passes: usize,
    pub swaps: usize,
    pub score_before: f64,
    pub score_after: f64,
}

/// Hill-climb by swapping members between every pair of teams, keeping a
/// swap only when it strictly increases the two teams' summed score.
///
/// The cost is O(passes × teams² × team_size²), which limits this to small
/// numbers of teams. Teams are modified in place.
#[instrument(skip_all, fields(teams = teams.len()))]
pub fn balance(teams: &mut [CandidateTeam<'_>]) -> BalanceReport {
    let mut report = BalanceReport {
        score_before: total_score(teams),
        ..BalanceReport::default()
    };
    for _ in 0..MAX_PASSES {
        report.passes += 1;
        let mut swaps = 0;
        for i in 0..teams.len() {
            for j in i + 1..teams.len() {
                let (left, right) = teams.split_at_mut(j);
                swaps += try_swaps(&mut left[i], &mut right[0]);
            }
        }
        report.swaps += swaps;
        if swaps == 0 {
            break;
        }
    }
    report.score_after = total_score(teams);
    debug!(
        passes = report.passes,
        before = report.score_before,
        after = report.score_after,
        "teams have been balanced"
    );
    report
}

/// Try every swap between two teams, returning the number of swaps kept.
fn try_swaps<'a>(first: &mut CandidateTeam<'a>, second: &mut CandidateTeam<'a>) -> usize {
    let mut kept = 0;
    for k in 0..first.members.len() {
        for l in 0..second.members.len() {
            let before = first.score() + second.score();
            std::mem::swap(&mut first.members[k], &mut second.members[l]);
            let after = first.score() + second.score();
            if after <= before {
                std::mem::swap(&mut first.members[k], &mut second.members[l]);
            } else {
                trace!(
                    first = %first.name,
                    second = %second.name,
                    before,
                    after,
                    "keeping swap"
                );
                kept += 1;
            }
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Availability, Profile, StudentId};

    fn student(id: usize, skills: &[&str]) -> Student {
        Student::new(
            StudentId(id),
            Profile::new(&format!("s{id}@example.org"), &format!("S{id}"))
                .with_skills(skills.iter().copied()),
        )
    }

    fn ids(team: &CandidateTeam<'_>) -> Vec<usize> {
        team.members.iter().map(|s| s.id.0).collect()
    }

    #[test]
    fn test_swap_improves_diversity() {
        let s = [
            student(0, &["rust"]),
            student(1, &["rust"]),
            student(2, &["ui"]),
            student(3, &["ui"]),
        ];
        let mut teams = vec![
            CandidateTeam::new("A", vec![&s[0], &s[1]]),
            CandidateTeam::new("B", vec![&s[2], &s[3]]),
        ];
        let report = balance(&mut teams);
        assert_eq!(report.swaps, 1);
        assert_eq!(report.passes, 2);
        assert!((report.score_before - 2.0).abs() < 1e-9);
        assert!((report.score_after - 4.0).abs() < 1e-9);
        assert_eq!(ids(&teams[0]), vec![2, 1]);
        assert_eq!(ids(&teams[1]), vec![0, 3]);
    }

    #[test]
    fn test_equal_scores_are_rejected() {
        let s = [
            student(0, &["rust"]),
            student(1, &["rust"]),
            student(2, &["rust"]),
        ];
        let mut teams = vec![
            CandidateTeam::new("A", vec![&s[0], &s[1]]),
            CandidateTeam::new("B", vec![&s[2]]),
        ];
        let report = balance(&mut teams);
        assert_eq!(report.swaps, 0);
        assert_eq!(report.passes, 1);
        assert_eq!(ids(&teams[0]), vec![0, 1]);
        assert_eq!(ids(&teams[1]), vec![2]);
    }

    #[test]
    fn test_score_counts_availability() {
        let mut a = student(0, &["rust", "sql"]);
        a.availability = Availability::new()
            .with("Mon", "9", true)
            .with("Tue", "9", false);
        let team = CandidateTeam::new("A", vec![&a]);
        assert!((team.score() - 2.5).abs() < 1e-9);
        assert_eq!(team.skill_profile().distinct(), 2);
    }

    #[test]
    fn test_never_lowers_score() {
        let s = (0..12)
            .map(|i| student(i, &[["a", "b", "c", "d", "e"][i % 5], ["x", "y"][i % 2]]))
            .collect::<Vec<_>>();
        let mut teams = s
            .chunks(4)
            .enumerate()
            .map(|(i, chunk)| CandidateTeam::new(&format!("Team {}", i + 1), chunk.iter().collect()))
            .collect::<Vec<_>>();
        let report = balance(&mut teams);
        assert!(report.score_after >= report.score_before);
        assert!(report.passes <= MAX_PASSES);
        assert!(teams.iter().all(|t| t.members.len() == 4));
    }
}
