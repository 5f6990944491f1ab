//! Derived views over roster state
//!
//! Pure projections consumed by presentation: programs grouped into
//! categories, cell lookups, collapsed-group roll-ups, the searchable person
//! bank and the matrix column layout. Nothing here mutates state.

use crate::roster::search::FuzzyMatcher;
use crate::roster::types::{Assignment, Person, Program};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Bucket name for programs without a group
pub const UNGROUPED: &str = "Ungrouped";

/// A category of programs, in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramGroup {
    pub name: String,
    /// True for the implicit bucket of programs without a group
    pub ungrouped: bool,
    pub programs: Vec<Program>,
}

impl ProgramGroup {
    pub fn contains(&self, program_id: &str) -> bool {
        self.programs.iter().any(|p| p.id == program_id)
    }

    pub fn program_names(&self) -> Vec<String> {
        self.programs.iter().map(|p| p.name.clone()).collect()
    }
}

/// Partition programs by group.
///
/// Groups are ordered by the smallest `groupOrder` among their members;
/// groups without one come after those with one, and ties fall back to the
/// group name. Programs inside a group are ordered by `order` (missing last),
/// then by name. The ungrouped bucket, when non-empty, is always last.
pub fn group_programs(programs: &[Program]) -> Vec<ProgramGroup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut named: Vec<(ProgramGroup, Option<i64>)> = Vec::new();
    let mut loose: Vec<Program> = Vec::new();

    for program in programs {
        let Some(name) = program.group_name() else {
            loose.push(program.clone());
            continue;
        };
        let slot = *index.entry(name).or_insert_with(|| {
            named.push((
                ProgramGroup {
                    name: name.to_string(),
                    ungrouped: false,
                    programs: Vec::new(),
                },
                None,
            ));
            named.len() - 1
        });
        let (group, min_order) = &mut named[slot];
        group.programs.push(program.clone());
        if let Some(order) = program.group_order {
            *min_order = Some(min_order.map_or(order, |current| current.min(order)));
        }
    }

    named.sort_by(|(a, a_order), (b, b_order)| {
        compare_optional(*a_order, *b_order).then_with(|| a.name.cmp(&b.name))
    });

    let mut groups: Vec<ProgramGroup> = named
        .into_iter()
        .map(|(mut group, _)| {
            sort_within_group(&mut group.programs);
            group
        })
        .collect();

    if !loose.is_empty() {
        sort_within_group(&mut loose);
        groups.push(ProgramGroup {
            name: UNGROUPED.to_string(),
            ungrouped: true,
            programs: loose,
        });
    }

    groups
}

fn sort_within_group(programs: &mut [Program]) {
    programs.sort_by(|a, b| compare_optional(a.order, b.order).then_with(|| a.name.cmp(&b.name)));
}

/// Present values first, ascending; missing values last
fn compare_optional(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// All assignments in the (committee, program) cell
pub fn cell_assignments<'a>(
    assignments: &'a [Assignment],
    committee_id: &str,
    program_id: &str,
) -> Vec<&'a Assignment> {
    assignments
        .iter()
        .filter(|a| a.is_in_cell(committee_id, program_id))
        .collect()
}

/// People assigned to any program of `group` in one committee row.
///
/// Each person appears once, in order of their first assignment.
pub fn collapsed_group_people<'a>(
    people: &'a [Person],
    assignments: &[Assignment],
    committee_id: &str,
    group: &ProgramGroup,
) -> Vec<&'a Person> {
    let mut seen: HashSet<&str> = HashSet::new();
    assignments
        .iter()
        .filter(|a| a.committee_id == committee_id && group.contains(&a.program_id))
        .filter(|a| seen.insert(a.person_id.as_str()))
        .filter_map(|a| people.iter().find(|p| p.id == a.person_id))
        .collect()
}

/// Number of assignments held by each person id
pub fn assignment_counts(assignments: &[Assignment]) -> HashMap<&str, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for assignment in assignments {
        *counts.entry(assignment.person_id.as_str()).or_default() += 1;
    }
    counts
}

/// Ordering of the person bank
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersonSort {
    #[default]
    NameAsc,
    NameDesc,
    AssignmentsHigh,
    AssignmentsLow,
}

impl std::fmt::Display for PersonSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NameAsc => write!(f, "name-asc"),
            Self::NameDesc => write!(f, "name-desc"),
            Self::AssignmentsHigh => write!(f, "assignments-high"),
            Self::AssignmentsLow => write!(f, "assignments-low"),
        }
    }
}

impl std::str::FromStr for PersonSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name-asc" => Ok(Self::NameAsc),
            "name-desc" => Ok(Self::NameDesc),
            "assignments-high" => Ok(Self::AssignmentsHigh),
            "assignments-low" => Ok(Self::AssignmentsLow),
            other => Err(format!("unknown sort method: {}", other)),
        }
    }
}

/// Filter people by a fuzzy query over nickname, full name and email, then
/// sort. A blank query keeps everyone.
pub fn search_people<'a>(
    people: &'a [Person],
    assignments: &[Assignment],
    query: &str,
    sort: PersonSort,
) -> Vec<&'a Person> {
    let mut result: Vec<&Person> = match FuzzyMatcher::new(query) {
        Some(matcher) => people
            .iter()
            .filter(|p| {
                matcher.matches([p.nickname.as_str(), p.full_name.as_str(), p.email.as_str()])
            })
            .collect(),
        None => people.iter().collect(),
    };

    let counts = assignment_counts(assignments);
    let count = |p: &Person| counts.get(p.id.as_str()).copied().unwrap_or(0);

    result.sort_by(|a, b| match sort {
        PersonSort::NameAsc => compare_nicknames(a, b),
        PersonSort::NameDesc => compare_nicknames(b, a),
        PersonSort::AssignmentsHigh => count(b)
            .cmp(&count(a))
            .then_with(|| compare_nicknames(a, b)),
        PersonSort::AssignmentsLow => count(a)
            .cmp(&count(b))
            .then_with(|| compare_nicknames(a, b)),
    });

    result
}

fn compare_nicknames(a: &Person, b: &Person) -> Ordering {
    a.nickname
        .to_lowercase()
        .cmp(&b.nickname.to_lowercase())
        .then_with(|| a.nickname.cmp(&b.nickname))
}

/// One column of the assignment matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MatrixColumn {
    /// A single program of an expanded group
    #[serde(rename_all = "camelCase")]
    Program { group: String, program: Program },
    /// Placeholder standing in for every program of a collapsed group
    #[serde(rename_all = "camelCase")]
    CollapsedGroup {
        group: String,
        program_names: Vec<String>,
    },
}

impl MatrixColumn {
    pub fn group(&self) -> &str {
        match self {
            Self::Program { group, .. } | Self::CollapsedGroup { group, .. } => group,
        }
    }
}

/// Lay out matrix columns: expanded groups contribute one column per program,
/// collapsed groups a single placeholder.
pub fn matrix_columns(groups: &[ProgramGroup], expanded: &HashSet<String>) -> Vec<MatrixColumn> {
    let mut columns = Vec::new();
    for group in groups {
        if expanded.contains(&group.name) {
            columns.extend(group.programs.iter().map(|program| MatrixColumn::Program {
                group: group.name.clone(),
                program: program.clone(),
            }));
        } else {
            columns.push(MatrixColumn::CollapsedGroup {
                group: group.name.clone(),
                program_names: group.program_names(),
            });
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(id: &str, name: &str, group: Option<&str>, order: Option<i64>, group_order: Option<i64>) -> Program {
        Program {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            group: group.map(str::to_string),
            order,
            group_order,
        }
    }

    fn person(id: &str, nickname: &str, full_name: &str, email: &str) -> Person {
        Person {
            id: id.to_string(),
            nickname: nickname.to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            color_index: 0,
        }
    }

    fn assignment(id: &str, person: &str, committee: &str, program: &str) -> Assignment {
        Assignment {
            id: id.to_string(),
            person_id: person.to_string(),
            committee_id: committee.to_string(),
            program_id: program.to_string(),
        }
    }

    fn group_names(groups: &[ProgramGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.name.as_str()).collect()
    }

    #[test]
    fn test_group_order_then_ungrouped() {
        let programs = vec![
            program("a1", "Alpha", Some("A"), None, Some(1)),
            program("b1", "Beta", Some("B"), None, Some(0)),
            program("u1", "Solo", None, None, None),
        ];

        let groups = group_programs(&programs);
        assert_eq!(group_names(&groups), vec!["B", "A", UNGROUPED]);
        assert!(groups[2].ungrouped);
    }

    #[test]
    fn test_group_uses_minimum_group_order() {
        let programs = vec![
            program("a1", "A one", Some("A"), None, Some(5)),
            program("b1", "B one", Some("B"), None, Some(2)),
            program("a2", "A two", Some("A"), None, Some(1)),
        ];

        let groups = group_programs(&programs);
        assert_eq!(group_names(&groups), vec!["A", "B"]);
    }

    #[test]
    fn test_missing_group_order_sorts_by_name_after_ordered() {
        let programs = vec![
            program("z", "Z", Some("Zeta"), None, None),
            program("m", "M", Some("Mu"), None, None),
            program("o", "O", Some("Omega"), None, Some(3)),
        ];

        let groups = group_programs(&programs);
        assert_eq!(group_names(&groups), vec!["Omega", "Mu", "Zeta"]);
    }

    #[test]
    fn test_programs_sorted_by_order_then_name() {
        let programs = vec![
            program("c", "Charlie", Some("G"), None, None),
            program("b", "Bravo", Some("G"), Some(2), None),
            program("a", "Alpha", Some("G"), Some(1), None),
            program("d", "Delta", Some("G"), None, None),
        ];

        let groups = group_programs(&programs);
        let ids: Vec<&str> = groups[0].programs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_no_ungrouped_bucket_when_all_grouped() {
        let programs = vec![program("a", "Alpha", Some("G"), None, None)];
        let groups = group_programs(&programs);
        assert_eq!(groups.len(), 1);
        assert!(!groups[0].ungrouped);
    }

    #[test]
    fn test_cell_assignments() {
        let assignments = vec![
            assignment("x1", "p1", "c1", "g1"),
            assignment("x2", "p2", "c1", "g1"),
            assignment("x3", "p1", "c1", "g2"),
            assignment("x4", "p1", "c2", "g1"),
        ];

        let cell = cell_assignments(&assignments, "c1", "g1");
        let ids: Vec<&str> = cell.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["x1", "x2"]);
        assert!(cell_assignments(&assignments, "c9", "g1").is_empty());
    }

    #[test]
    fn test_collapsed_group_dedups_people() {
        let people = vec![person("p1", "JD", "Jane Doe", ""), person("p2", "Bo", "Bo Li", "")];
        let programs = vec![
            program("g1", "One", Some("G"), None, None),
            program("g2", "Two", Some("G"), None, None),
            program("h1", "Other", Some("H"), None, None),
        ];
        let assignments = vec![
            assignment("x1", "p1", "c1", "g1"),
            assignment("x2", "p1", "c1", "g2"),
            assignment("x3", "p2", "c1", "h1"),
            assignment("x4", "p2", "c2", "g1"),
        ];

        let groups = group_programs(&programs);
        let g = groups.iter().find(|g| g.name == "G").unwrap();
        let rolled = collapsed_group_people(&people, &assignments, "c1", g);
        assert_eq!(rolled.len(), 1);
        assert_eq!(rolled[0].id, "p1");
    }

    #[test]
    fn test_search_filters_with_typo() {
        let people = vec![
            person("p1", "JD", "Jane Doe", "jane@x.com"),
            person("p2", "Bo", "Robert Li", "bo@y.org"),
        ];

        let found = search_people(&people, &[], "jnae do", PersonSort::NameAsc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "p1");

        let by_email = search_people(&people, &[], "y.org", PersonSort::NameAsc);
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].id, "p2");
    }

    #[test]
    fn test_sort_by_name() {
        let people = vec![
            person("p1", "charlie", "", ""),
            person("p2", "Alice", "", ""),
            person("p3", "bob", "", ""),
        ];

        let asc: Vec<&str> = search_people(&people, &[], "", PersonSort::NameAsc)
            .iter()
            .map(|p| p.nickname.as_str())
            .collect();
        assert_eq!(asc, vec!["Alice", "bob", "charlie"]);

        let desc: Vec<&str> = search_people(&people, &[], "", PersonSort::NameDesc)
            .iter()
            .map(|p| p.nickname.as_str())
            .collect();
        assert_eq!(desc, vec!["charlie", "bob", "Alice"]);
    }

    #[test]
    fn test_sort_by_assignment_count_with_name_ties() {
        let people = vec![
            person("p1", "Cy", "", ""),
            person("p2", "Al", "", ""),
            person("p3", "Bea", "", ""),
        ];
        let assignments = vec![
            assignment("x1", "p1", "c1", "g1"),
            assignment("x2", "p1", "c1", "g2"),
            assignment("x3", "p3", "c1", "g1"),
        ];

        let high: Vec<&str> = search_people(&people, &assignments, "", PersonSort::AssignmentsHigh)
            .iter()
            .map(|p| p.nickname.as_str())
            .collect();
        assert_eq!(high, vec!["Cy", "Bea", "Al"]);

        let low: Vec<&str> = search_people(&people, &assignments, "", PersonSort::AssignmentsLow)
            .iter()
            .map(|p| p.nickname.as_str())
            .collect();
        assert_eq!(low, vec!["Al", "Bea", "Cy"]);

        let tied = vec![assignment("x1", "p1", "c1", "g1"), assignment("x2", "p2", "c1", "g1")];
        let high_tied: Vec<&str> = search_people(&people, &tied, "", PersonSort::AssignmentsHigh)
            .iter()
            .map(|p| p.nickname.as_str())
            .collect();
        assert_eq!(high_tied, vec!["Al", "Cy", "Bea"]);
    }

    #[test]
    fn test_person_sort_parse() {
        assert_eq!("assignments-high".parse::<PersonSort>(), Ok(PersonSort::AssignmentsHigh));
        assert_eq!(PersonSort::NameDesc.to_string(), "name-desc");
        assert!("loudest".parse::<PersonSort>().is_err());
    }

    #[test]
    fn test_matrix_columns_expanded_and_collapsed() {
        let programs = vec![
            program("a1", "Alpha", Some("A"), Some(1), Some(0)),
            program("a2", "Beta", Some("A"), Some(2), Some(0)),
            program("b1", "Gamma", Some("B"), None, Some(1)),
        ];
        let groups = group_programs(&programs);
        let expanded: HashSet<String> = ["A".to_string()].into_iter().collect();

        let columns = matrix_columns(&groups, &expanded);
        assert_eq!(columns.len(), 3);
        assert!(matches!(&columns[0], MatrixColumn::Program { program, .. } if program.id == "a1"));
        assert!(matches!(&columns[1], MatrixColumn::Program { program, .. } if program.id == "a2"));
        assert_eq!(
            columns[2],
            MatrixColumn::CollapsedGroup {
                group: "B".to_string(),
                program_names: vec!["Gamma".to_string()],
            }
        );
    }
}
