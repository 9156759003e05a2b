use crate::engine::StragglerReport;
use crate::error::Error;
use crate::model::{ProjectId, Role, Roster, availability_heatmap};
use crate::stats;

pub fn display_details(roster: &Roster, project: ProjectId) -> Result<(), Error> {
    let p = roster.project(project)?;
    println!("{} ({}, teams of {} to {}):", p.name, p.status, p.sizes.min(), p.sizes.max());
    for team in roster.teams_of(project) {
        let t = roster.team(team)?;
        print!("  {} ({}/{})", t.name, t.size(), t.capacity);
        if t.locked {
            print!(" (locked)");
        }
        let skills = roster
            .skill_profile(team)?
            .iter()
            .map(|(skill, n)| {
                if n > 1 {
                    format!("{skill} x{n}")
                } else {
                    skill.to_owned()
                }
            })
            .collect::<Vec<_>>();
        if !skills.is_empty() {
            print!(" [{}]", skills.join(", "));
        }
        println!();
        let mut members = t
            .members()
            .iter()
            .map(|m| Ok((roster.student(m.student)?, m.role)))
            .collect::<Result<Vec<_>, Error>>()?;
        members.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name));
        for (student, role) in members {
            print!("    - {}", student.name);
            if role == Role::Leader {
                print!(" (leader)");
            }
            if !student.skills.is_empty() {
                print!(
                    " [{}]",
                    student.skills.iter().cloned().collect::<Vec<_>>().join(", ")
                );
            }
            println!();
        }
    }
    println!();
    Ok(())
}

pub fn display_stats(roster: &Roster, project: ProjectId) -> Result<(), Error> {
    let stats = stats::statistics(roster, project)?;
    println!(
        "Students assigned/unassigned/invited: {}/{}/{}",
        stats.assigned, stats.unassigned, stats.invited
    );
    if stats.pending > 0 {
        println!("Invitations not answered yet: {}", stats.pending);
    }
    println!("Free seats: {}", stats.free_seats());
    println!("Team scores (skills + availability):");
    for t in &stats.teams {
        println!(
            "  - {}: {:.2} ({} skills, {:.0}% available)",
            roster.team(t.team)?.name,
            t.score,
            t.distinct_skills,
            100.0 * t.availability
        );
    }
    println!("Total score: {:.2}", stats.total_score());
    Ok(())
}

pub fn display_stragglers(roster: &Roster, report: &StragglerReport) -> Result<(), Error> {
    println!("Stragglers assigned: {}", report.count());
    for m in &report.assigned {
        println!(
            "  - {} -> {}",
            roster.student(m.student)?.name,
            roster.team(m.team)?.name
        );
    }
    if !report.remaining.is_empty() {
        println!("Stragglers without a team (no room left):");
        for &s in &report.remaining {
            println!("  - {}", roster.student(s)?.name);
        }
    }
    Ok(())
}

pub fn display_empty(roster: &Roster, project: ProjectId) -> Result<(), Error> {
    let mut empty = Vec::new();
    for team in roster.teams_of(project) {
        let t = roster.team(team)?;
        if t.is_empty() {
            empty.push(t.name.as_str());
        }
    }
    if !empty.is_empty() {
        println!("Empty teams:");
        for name in empty {
            println!("  - {name}");
        }
    }
    Ok(())
}

pub fn display_heatmap(roster: &Roster, project: ProjectId) -> Result<(), Error> {
    let students = roster
        .invited_students(project)?
        .into_iter()
        .map(|s| roster.student(s))
        .collect::<Result<Vec<_>, Error>>()?;
    let heatmap = availability_heatmap(&students);
    if heatmap.is_empty() {
        return Ok(());
    }
    println!("Availability (students available per slot):");
    for (day, slots) in &heatmap {
        let slots = slots
            .iter()
            .map(|(slot, n)| format!("{slot}: {n}"))
            .collect::<Vec<_>>();
        println!("  - {day}: {}", slots.join(", "));
    }
    Ok(())
}
