use crate::error::Error;
use crate::model::Roster;
use std::sync::RwLock;

/// Storage collaborator of the mutation engine.
pub trait Store {
    /// Run `f` on a working copy of the roster and commit the copy only if
    /// `f` succeeds. No other mutation may interleave with `f`.
    fn atomically<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Roster) -> Result<T, Error>;

    /// A consistent copy of the current roster.
    fn snapshot(&self) -> Result<Roster, Error>;
}

/// Roster kept in memory. Writers are serialised, readers share the lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    roster: RwLock<Roster>,
}

impl MemoryStore {
    pub fn new(roster: Roster) -> MemoryStore {
        MemoryStore {
            roster: RwLock::new(roster),
        }
    }

    pub fn into_inner(self) -> Result<Roster, Error> {
        self.roster.into_inner().map_err(|_| poisoned())
    }
}

fn poisoned() -> Error {
    Error::Persistence("roster lock poisoned".to_owned())
}

impl Store for MemoryStore {
    fn atomically<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Roster) -> Result<T, Error>,
    {
        let mut roster = self.roster.write().map_err(|_| poisoned())?;
        let mut working = roster.clone();
        let result = f(&mut working)?;
        *roster = working;
        Ok(result)
    }

    fn snapshot(&self) -> Result<Roster, Error> {
        Ok(self.roster.read().map_err(|_| poisoned())?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Profile;

    #[test]
    fn test_failed_closure_is_not_committed() {
        let store = MemoryStore::new(Roster::new());
        let result: Result<(), Error> = store.atomically(|r| {
            r.add_student(Profile::new("a@x.org", "A"));
            Err(Error::NoStudentsAvailable)
        });
        assert_eq!(result, Err(Error::NoStudentsAvailable));
        assert!(store.snapshot().unwrap().students().is_empty());
        store
            .atomically(|r| Ok(r.add_student(Profile::new("a@x.org", "A"))))
            .unwrap();
        assert_eq!(store.into_inner().unwrap().students().len(), 1);
    }
}
