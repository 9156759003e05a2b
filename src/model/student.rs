use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct StudentId(pub usize);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "student #{}", self.0)
    }
}

/// Sparse weekly availability: day, then time slot, then whether the
/// student is available. Neither axis is a fixed calendar.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Availability(BTreeMap<String, BTreeMap<String, bool>>);

impl Availability {
    pub fn new() -> Availability {
        Availability::default()
    }

    #[must_use]
    pub fn with(mut self, day: &str, slot: &str, available: bool) -> Availability {
        self.set(day, slot, available);
        self
    }

    pub fn set(&mut self, day: &str, slot: &str, available: bool) {
        self.0
            .entry(day.to_owned())
            .or_default()
            .insert(slot.to_owned(), available);
    }

    pub fn is_available(&self, day: &str, slot: &str) -> bool {
        self.0
            .get(day)
            .and_then(|slots| slots.get(slot))
            .copied()
            .unwrap_or(false)
    }

    /// Every declared slot, available or not.
    pub fn declared(&self) -> impl Iterator<Item = (&str, &str, bool)> {
        self.0.iter().flat_map(|(day, slots)| {
            slots
                .iter()
                .map(move |(slot, &available)| (day.as_str(), slot.as_str(), available))
        })
    }

    pub fn available(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declared()
            .filter_map(|(day, slot, available)| available.then_some((day, slot)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }
}

/// Attributes submitted by a student when filling in their profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub email: String,
    pub name: String,
    pub major: Option<String>,
    pub year: Option<String>,
    pub interests: Option<String>,
    pub skills: BTreeSet<String>,
    pub availability: Availability,
}

impl Profile {
    pub fn new(email: &str, name: &str) -> Profile {
        Profile {
            email: normalize_email(email),
            name: name.to_owned(),
            ..Profile::default()
        }
    }

    #[must_use]
    pub fn with_skills<I, S>(mut self, skills: I) -> Profile
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_availability(mut self, availability: Availability) -> Profile {
        self.availability = availability;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Student {
    pub id: StudentId,
    pub email: String,
    pub name: String,
    pub major: Option<String>,
    pub year: Option<String>,
    pub interests: Option<String>,
    pub skills: BTreeSet<String>,
    pub availability: Availability,
}

impl Student {
    pub fn new(id: StudentId, profile: Profile) -> Student {
        Student {
            id,
            email: normalize_email(&profile.email),
            name: profile.name,
            major: profile.major,
            year: profile.year,
            interests: profile.interests,
            skills: profile.skills,
            availability: profile.availability,
        }
    }

    /// Replace every profile attribute except the email, which is the
    /// student identity.
    pub fn update(&mut self, profile: Profile) {
        self.name = profile.name;
        self.major = profile.major;
        self.year = profile.year;
        self.interests = profile.interests;
        self.skills = profile.skills;
        self.availability = profile.availability;
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability() {
        let a = Availability::new()
            .with("Monday", "9:00 AM", true)
            .with("Monday", "10:00 AM", false)
            .with("Friday", "2:00 PM", true);
        assert!(a.is_available("Monday", "9:00 AM"));
        assert!(!a.is_available("Monday", "10:00 AM"));
        assert!(!a.is_available("Sunday", "9:00 AM"));
        assert_eq!(a.declared().count(), 3);
        assert_eq!(
            a.available().collect::<Vec<_>>(),
            vec![("Friday", "2:00 PM"), ("Monday", "9:00 AM")]
        );
        assert!(Availability::new().is_empty());
    }

    #[test]
    fn test_update_keeps_email() {
        let mut s = Student::new(StudentId(0), Profile::new(" Ada@Example.org ", "Ada"));
        assert_eq!(s.email, "ada@example.org");
        s.update(Profile::new("other@example.org", "Ada L.").with_skills(["rust"]));
        assert_eq!(s.email, "ada@example.org");
        assert_eq!(s.name, "Ada L.");
        assert!(s.skills.contains("rust"));
    }
}
