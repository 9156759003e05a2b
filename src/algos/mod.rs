pub use self::balance::{BalanceReport, CandidateTeam, MAX_PASSES, balance, team_score, total_score};
pub use self::partition::{FixedPermutation, Partition, Permutation, RandomPermutation, partition};

use crate::error::Error;
use crate::model::Student;

mod balance;
mod partition;

/// Teams proposed for a set of students, before they are committed.
#[derive(Clone, Debug)]
pub struct Generated<'a> {
    pub teams: Vec<CandidateTeam<'a>>,
    pub leftover: Vec<&'a Student>,
    pub report: BalanceReport,
}

/// Partition `students` into teams of at most `team_size` members and
/// balance them. Nothing is persisted.
pub fn partition_and_balance<'a, P>(
    students: &[&'a Student],
    team_size: usize,
    max_teams: usize,
    permutation: &mut P,
) -> Result<Generated<'a>, Error>
where
    P: Permutation + ?Sized,
{
    let Partition { teams, leftover } = partition(students, team_size, max_teams, permutation)?;
    let mut teams = teams
        .into_iter()
        .enumerate()
        .map(|(i, members)| CandidateTeam::new(&format!("Team {}", i + 1), members))
        .collect::<Vec<_>>();
    let report = balance(&mut teams);
    Ok(Generated {
        teams,
        leftover,
        report,
    })
}
