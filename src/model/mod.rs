pub use self::project::{Project, ProjectId, ProjectStatus, TeamSizes};
pub use self::roster::{
    Heatmap, Occupancy, Roster, SkillProfile, availability_heatmap, availability_overlap,
    availability_score,
};
pub use self::student::{Availability, Profile, Student, StudentId, normalize_email};
pub use self::team::{DEFAULT_CAPACITY, Member, Membership, Role, Team, TeamId};

mod project;
mod roster;
mod student;
mod team;
