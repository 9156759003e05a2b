use crate::error::Error;
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::{debug, instrument};

/// Source of the order in which students are dealt into teams.
pub trait Permutation {
    /// Return a permutation of `0..len`.
    fn permutation(&mut self, len: usize) -> Vec<usize>;
}

/// Uniform shuffle driven by a random number generator.
pub struct RandomPermutation<R> {
    rng: R,
}

impl RandomPermutation<StdRng> {
    pub fn seeded(seed: u64) -> RandomPermutation<StdRng> {
        RandomPermutation {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_os_rng() -> RandomPermutation<StdRng> {
        RandomPermutation {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl<R: Rng> Permutation for RandomPermutation<R> {
    fn permutation(&mut self, len: usize) -> Vec<usize> {
        let mut order = (0..len).collect::<Vec<_>>();
        order.shuffle(&mut self.rng);
        order
    }
}

/// A permutation decided in advance.
#[derive(Clone, Debug)]
pub struct FixedPermutation(pub Vec<usize>);

impl FixedPermutation {
    pub fn identity(len: usize) -> FixedPermutation {
        FixedPermutation((0..len).collect())
    }
}

impl Permutation for FixedPermutation {
    fn permutation(&mut self, _len: usize) -> Vec<usize> {
        self.0.clone()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Partition<T> {
    pub teams: Vec<Vec<T>>,
    /// Students which did not fit in `max_teams` teams.
    pub leftover: Vec<T>,
}

fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &i in order {
        match seen.get_mut(i) {
            Some(s) if !*s => *s = true,
            _ => return false,
        }
    }
    true
}

/// Deal `items` in permuted order into `min(ceil(n / team_size), max_teams)`
/// consecutive groups of at most `team_size` elements.
#[instrument(skip_all, fields(students = items.len(), team_size = team_size, max_teams = max_teams))]
pub fn partition<T, P>(
    items: &[T],
    team_size: usize,
    max_teams: usize,
    permutation: &mut P,
) -> Result<Partition<T>, Error>
where
    T: Clone,
    P: Permutation + ?Sized,
{
    if team_size == 0 {
        return Err(Error::InvalidTeamSizes {
            min: team_size,
            max: team_size,
        });
    }
    if items.is_empty() {
        return Err(Error::NoStudentsAvailable);
    }
    let order = permutation.permutation(items.len());
    if !is_permutation(&order, items.len()) {
        return Err(Error::InvalidPermutation { len: items.len() });
    }
    let mut shuffled = order.into_iter().map(|i| items[i].clone()).collect::<Vec<_>>();
    let count = items.len().div_ceil(team_size).min(max_teams);
    let seated = (count * team_size).min(shuffled.len());
    let leftover = shuffled.split_off(seated);
    let teams = shuffled
        .chunks(team_size)
        .map(<[T]>::to_vec)
        .collect::<Vec<_>>();
    debug!(
        teams = teams.len(),
        leftover = leftover.len(),
        "students have been partitioned"
    );
    Ok(Partition { teams, leftover })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes<T>(p: &Partition<T>) -> Vec<usize> {
        p.teams.iter().map(Vec::len).collect()
    }

    #[test]
    fn test_ten_students_three_teams() {
        let students = (0..10).collect::<Vec<_>>();
        let p = partition(&students, 4, 3, &mut FixedPermutation::identity(10)).unwrap();
        assert_eq!(sizes(&p), vec![4, 4, 2]);
        assert!(p.leftover.is_empty());
        assert_eq!(p.teams[2], vec![8, 9]);
    }

    #[test]
    fn test_max_teams_leaves_leftover() {
        let students = (0..10).collect::<Vec<_>>();
        let p = partition(&students, 3, 2, &mut FixedPermutation::identity(10)).unwrap();
        assert_eq!(sizes(&p), vec![3, 3]);
        assert_eq!(p.leftover, vec![6, 7, 8, 9]);
        let p = partition(&students, 3, 0, &mut FixedPermutation::identity(10)).unwrap();
        assert!(p.teams.is_empty());
        assert_eq!(p.leftover.len(), 10);
    }

    #[test]
    fn test_permutation_is_applied() {
        let students = ["a", "b", "c", "d"];
        let mut order = FixedPermutation(vec![3, 1, 0, 2]);
        let p = partition(&students, 2, 5, &mut order).unwrap();
        assert_eq!(p.teams, vec![vec!["d", "b"], vec!["a", "c"]]);
    }

    #[test]
    fn test_errors() {
        let none: [u8; 0] = [];
        assert_eq!(
            partition(&none, 4, 3, &mut FixedPermutation::identity(0)),
            Err(Error::NoStudentsAvailable)
        );
        assert_eq!(
            partition(&[1, 2], 0, 3, &mut FixedPermutation::identity(2)),
            Err(Error::InvalidTeamSizes { min: 0, max: 0 })
        );
        assert_eq!(
            partition(&[1, 2], 1, 3, &mut FixedPermutation(vec![1, 1])),
            Err(Error::InvalidPermutation { len: 2 })
        );
        assert_eq!(
            partition(&[1, 2], 1, 3, &mut FixedPermutation(vec![0])),
            Err(Error::InvalidPermutation { len: 2 })
        );
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let a = RandomPermutation::seeded(42).permutation(20);
        let b = RandomPermutation::seeded(42).permutation(20);
        assert_eq!(a, b);
        assert!(is_permutation(&a, 20));
    }
}
