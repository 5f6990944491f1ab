//! Roster wire types
//!
//! Entities of the assignment grid and the payloads used to create and patch
//! them. All types use camelCase JSON serialization to match the data file.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Display palette for people badges, indexed by `Person::color_index`
pub const PERSON_COLORS: [&str; 8] = [
    "quantum-cyan",
    "quantum-purple",
    "quantum-blue",
    "quantum-teal",
    "quantum-pink",
    "quantum-orange",
    "quantum-green",
    "quantum-yellow",
];

/// A volunteer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub nickname: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub color_index: u32,
}

impl Person {
    /// Palette colour for this person
    pub fn color(&self) -> &'static str {
        PERSON_COLORS[self.color_index as usize % PERSON_COLORS.len()]
    }
}

/// Functional committee (a matrix row)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Committee {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Program team (a matrix column)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Umbrella category; programs sharing a group collapse together
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Position within the group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Position of the group itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_order: Option<i64>,
}

impl Program {
    /// Group name, treating an empty string the same as no group
    pub fn group_name(&self) -> Option<&str> {
        self.group.as_deref().filter(|g| !g.is_empty())
    }
}

/// One person placed in one (committee, program) cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub person_id: String,
    pub committee_id: String,
    pub program_id: String,
}

impl Assignment {
    pub fn is_in_cell(&self, committee_id: &str, program_id: &str) -> bool {
        self.committee_id == committee_id && self.program_id == program_id
    }

    fn same_triple(&self, other: &NewAssignment) -> bool {
        self.person_id == other.person_id
            && self.committee_id == other.committee_id
            && self.program_id == other.program_id
    }
}

/// The four collections at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub committees: Vec<Committee>,
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

impl Snapshot {
    pub(crate) fn has_assignment(&self, candidate: &NewAssignment) -> bool {
        self.assignments.iter().any(|a| a.same_triple(candidate))
    }

    /// Drop assignments that reference a missing entity or repeat an earlier
    /// (person, committee, program) triple. Returns how many were dropped.
    pub(crate) fn prune_assignments(&mut self) -> usize {
        let people: HashSet<&str> = self.people.iter().map(|p| p.id.as_str()).collect();
        let committees: HashSet<&str> = self.committees.iter().map(|c| c.id.as_str()).collect();
        let programs: HashSet<&str> = self.programs.iter().map(|p| p.id.as_str()).collect();
        let mut seen: HashSet<(String, String, String)> = HashSet::new();

        let before = self.assignments.len();
        self.assignments.retain(|a| {
            people.contains(a.person_id.as_str())
                && committees.contains(a.committee_id.as_str())
                && programs.contains(a.program_id.as_str())
                && seen.insert((
                    a.person_id.clone(),
                    a.committee_id.clone(),
                    a.program_id.clone(),
                ))
        });
        before - self.assignments.len()
    }
}

// =============================================================================
// Create / patch payloads
// =============================================================================

/// Request body for creating a person
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    pub nickname: String,
    pub full_name: String,
    pub email: String,
    /// Omitted = round-robin over the palette
    #[serde(default)]
    pub color_index: Option<u32>,
}

/// Partial update of a person
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonPatch {
    pub nickname: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub color_index: Option<u32>,
}

impl PersonPatch {
    pub(crate) fn apply(self, person: &mut Person) {
        if let Some(nickname) = self.nickname {
            person.nickname = nickname;
        }
        if let Some(full_name) = self.full_name {
            person.full_name = full_name;
        }
        if let Some(email) = self.email {
            person.email = email;
        }
        if let Some(color_index) = self.color_index {
            person.color_index = color_index;
        }
    }
}

/// Request body for creating a committee
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommittee {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update of a committee
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitteePatch {
    pub name: Option<String>,
    /// `Some(None)` clears the description
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl CommitteePatch {
    pub(crate) fn apply(self, committee: &mut Committee) {
        if let Some(name) = self.name {
            committee.name = name;
        }
        if let Some(description) = self.description {
            committee.description = description;
        }
    }
}

/// Request body for creating a program
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProgram {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub group_order: Option<i64>,
}

/// Partial update of a program
///
/// Optional program fields take a nested `Option`: the outer level says
/// whether to touch the field, `Some(None)` clears it (JSON `null`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub group: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub order: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub group_order: Option<Option<i64>>,
}

impl ProgramPatch {
    pub(crate) fn apply(self, program: &mut Program) {
        if let Some(name) = self.name {
            program.name = name;
        }
        if let Some(description) = self.description {
            program.description = description;
        }
        if let Some(group) = self.group {
            program.group = group;
        }
        if let Some(order) = self.order {
            program.order = order;
        }
        if let Some(group_order) = self.group_order {
            program.group_order = group_order;
        }
    }
}

/// Keeps an explicit `null` apart from an absent field: absent stays `None`
/// via `#[serde(default)]`, `null` becomes `Some(None)`
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Request body for placing a person in a cell
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub person_id: String,
    pub committee_id: String,
    pub program_id: String,
}

impl NewAssignment {
    pub fn new(
        person_id: impl Into<String>,
        committee_id: impl Into<String>,
        program_id: impl Into<String>,
    ) -> Self {
        Self {
            person_id: person_id.into(),
            committee_id: committee_id.into(),
            program_id: program_id.into(),
        }
    }
}
