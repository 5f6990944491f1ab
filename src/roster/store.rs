//! Relational roster store
//!
//! Owns the four entity collections and applies every command in memory
//! before returning. Commands that change persisted state hand a fresh
//! snapshot to the attached [`SyncHandle`], which debounces the write to the
//! data service; the caller never waits on I/O.

use crate::error::{Error, Result};
use crate::roster::types::*;
use crate::roster::view::{self, MatrixColumn, PersonSort, ProgramGroup};
use crate::sync::SyncHandle;
use std::cell::OnceCell;
use std::collections::HashSet;

/// Presentation toggles; never persisted
#[derive(Debug, Clone, Default)]
pub struct UiFlags {
    pub admin: bool,
    pub bank_open: bool,
    pub expanded_groups: HashSet<String>,
}

/// Single source of truth for the assignment grid
#[derive(Debug, Default)]
pub struct RosterStore {
    data: Snapshot,
    selected_person_id: Option<String>,
    last_error: Option<String>,
    flags: UiFlags,
    admin_password: Option<String>,
    grouped: OnceCell<Vec<ProgramGroup>>,
    sync: Option<SyncHandle>,
}

impl RosterStore {
    /// Create an empty store with no data service attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that persists through `sync`
    pub fn with_sync(sync: SyncHandle) -> Self {
        Self {
            sync: Some(sync),
            ..Self::default()
        }
    }

    /// Password accepted by [`RosterStore::login`]
    pub fn with_admin_password(mut self, password: Option<String>) -> Self {
        self.admin_password = password;
        self
    }

    pub fn sync(&self) -> Option<&SyncHandle> {
        self.sync.as_ref()
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    pub fn snapshot(&self) -> &Snapshot {
        &self.data
    }

    pub fn people(&self) -> &[Person] {
        &self.data.people
    }

    pub fn committees(&self) -> &[Committee] {
        &self.data.committees
    }

    pub fn programs(&self) -> &[Program] {
        &self.data.programs
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.data.assignments
    }

    pub fn person(&self, id: &str) -> Option<&Person> {
        self.data.people.iter().find(|p| p.id == id)
    }

    pub fn committee(&self, id: &str) -> Option<&Committee> {
        self.data.committees.iter().find(|c| c.id == id)
    }

    pub fn program(&self, id: &str) -> Option<&Program> {
        self.data.programs.iter().find(|p| p.id == id)
    }

    pub fn selected_person_id(&self) -> Option<&str> {
        self.selected_person_id.as_deref()
    }

    /// Message of the most recent failed load, cleared by the next load
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn flags(&self) -> &UiFlags {
        &self.flags
    }

    // =========================================================================
    // People
    // =========================================================================

    /// Add a person; a missing colour index is assigned round-robin over the
    /// palette by current head count. Returns the new id.
    pub fn add_person(&mut self, req: NewPerson) -> String {
        let color_index = req
            .color_index
            .unwrap_or((self.data.people.len() % PERSON_COLORS.len()) as u32);
        let person = Person {
            id: generate_id(),
            nickname: req.nickname,
            full_name: req.full_name,
            email: req.email,
            color_index,
        };
        let id = person.id.clone();
        self.data.people.push(person);
        self.schedule_save();
        id
    }

    pub fn update_person(&mut self, id: &str, patch: PersonPatch) {
        if let Some(person) = self.data.people.iter_mut().find(|p| p.id == id) {
            patch.apply(person);
            self.schedule_save();
        }
    }

    /// Remove a person and every assignment that references them
    pub fn delete_person(&mut self, id: &str) {
        let before = self.data.people.len();
        self.data.people.retain(|p| p.id != id);
        if self.data.people.len() == before {
            return;
        }
        self.data.assignments.retain(|a| a.person_id != id);
        if self.selected_person_id.as_deref() == Some(id) {
            self.selected_person_id = None;
        }
        self.schedule_save();
    }

    // =========================================================================
    // Committees
    // =========================================================================

    pub fn add_committee(&mut self, req: NewCommittee) -> String {
        let committee = Committee {
            id: generate_id(),
            name: req.name,
            description: req.description,
        };
        let id = committee.id.clone();
        self.data.committees.push(committee);
        self.schedule_save();
        id
    }

    pub fn update_committee(&mut self, id: &str, patch: CommitteePatch) {
        if let Some(committee) = self.data.committees.iter_mut().find(|c| c.id == id) {
            patch.apply(committee);
            self.schedule_save();
        }
    }

    /// Remove a committee and every assignment in its row
    pub fn delete_committee(&mut self, id: &str) {
        let before = self.data.committees.len();
        self.data.committees.retain(|c| c.id != id);
        if self.data.committees.len() == before {
            return;
        }
        self.data.assignments.retain(|a| a.committee_id != id);
        self.schedule_save();
    }

    /// Replace the committee list wholesale (reordering). Assignments whose
    /// committee is no longer present are dropped.
    pub fn set_committees(&mut self, committees: Vec<Committee>) {
        self.data.committees = committees;
        let ids: HashSet<&str> = self.data.committees.iter().map(|c| c.id.as_str()).collect();
        self.data
            .assignments
            .retain(|a| ids.contains(a.committee_id.as_str()));
        self.schedule_save();
    }

    // =========================================================================
    // Programs
    // =========================================================================

    pub fn add_program(&mut self, req: NewProgram) -> String {
        let program = Program {
            id: generate_id(),
            name: req.name,
            description: req.description,
            group: req.group,
            order: req.order,
            group_order: req.group_order,
        };
        let id = program.id.clone();
        self.data.programs.push(program);
        self.grouped.take();
        self.schedule_save();
        id
    }

    pub fn update_program(&mut self, id: &str, patch: ProgramPatch) {
        if let Some(program) = self.data.programs.iter_mut().find(|p| p.id == id) {
            patch.apply(program);
            self.grouped.take();
            self.schedule_save();
        }
    }

    /// Remove a program and every assignment in its column
    pub fn delete_program(&mut self, id: &str) {
        let before = self.data.programs.len();
        self.data.programs.retain(|p| p.id != id);
        if self.data.programs.len() == before {
            return;
        }
        self.data.assignments.retain(|a| a.program_id != id);
        self.grouped.take();
        self.schedule_save();
    }

    /// Replace the program list wholesale (reordering, regrouping).
    /// Assignments whose program is no longer present are dropped.
    pub fn set_programs(&mut self, programs: Vec<Program>) {
        self.data.programs = programs;
        let ids: HashSet<&str> = self.data.programs.iter().map(|p| p.id.as_str()).collect();
        self.data
            .assignments
            .retain(|a| ids.contains(a.program_id.as_str()));
        self.grouped.take();
        self.schedule_save();
    }

    // =========================================================================
    // Assignments
    // =========================================================================

    /// Place a person in a cell.
    ///
    /// Silently ignored when the identical (person, committee, program) triple
    /// already exists or when any referenced entity is unknown. Returns the
    /// new assignment id when one was created.
    pub fn add_assignment(&mut self, req: NewAssignment) -> Option<String> {
        if self.data.has_assignment(&req) {
            tracing::debug!(
                person = %req.person_id,
                committee = %req.committee_id,
                program = %req.program_id,
                "Ignoring duplicate assignment"
            );
            return None;
        }
        if self.person(&req.person_id).is_none()
            || self.committee(&req.committee_id).is_none()
            || self.program(&req.program_id).is_none()
        {
            tracing::debug!(
                person = %req.person_id,
                committee = %req.committee_id,
                program = %req.program_id,
                "Ignoring assignment with unknown reference"
            );
            return None;
        }

        let assignment = Assignment {
            id: generate_id(),
            person_id: req.person_id,
            committee_id: req.committee_id,
            program_id: req.program_id,
        };
        let id = assignment.id.clone();
        self.data.assignments.push(assignment);
        self.schedule_save();
        Some(id)
    }

    pub fn remove_assignment(&mut self, id: &str) {
        let before = self.data.assignments.len();
        self.data.assignments.retain(|a| a.id != id);
        if self.data.assignments.len() != before {
            self.schedule_save();
        }
    }

    // =========================================================================
    // UI state (not persisted)
    // =========================================================================

    pub fn set_selected_person(&mut self, id: Option<String>) {
        self.selected_person_id = id;
    }

    /// Enter admin mode if `password` matches the configured one
    pub fn login(&mut self, password: &str) -> bool {
        let ok = self
            .admin_password
            .as_deref()
            .is_some_and(|expected| expected == password);
        if ok {
            self.flags.admin = true;
        } else {
            tracing::warn!("Rejected admin login");
        }
        ok
    }

    pub fn logout(&mut self) {
        self.flags.admin = false;
    }

    pub fn is_admin(&self) -> bool {
        self.flags.admin
    }

    pub fn set_bank_open(&mut self, open: bool) {
        self.flags.bank_open = open;
    }

    /// Flip a group between expanded and collapsed; returns the new state
    pub fn toggle_group(&mut self, group: &str) -> bool {
        if self.flags.expanded_groups.remove(group) {
            false
        } else {
            self.flags.expanded_groups.insert(group.to_string());
            true
        }
    }

    pub fn is_group_expanded(&self, group: &str) -> bool {
        self.flags.expanded_groups.contains(group)
    }

    // =========================================================================
    // Derived views
    // =========================================================================

    /// Programs grouped into categories, memoised until programs change
    pub fn grouped_programs(&self) -> &[ProgramGroup] {
        self.grouped
            .get_or_init(|| view::group_programs(&self.data.programs))
    }

    pub fn cell_assignments(&self, committee_id: &str, program_id: &str) -> Vec<&Assignment> {
        view::cell_assignments(&self.data.assignments, committee_id, program_id)
    }

    /// People in a collapsed group for one committee row; empty for an
    /// unknown group
    pub fn collapsed_group_people(&self, committee_id: &str, group: &str) -> Vec<&Person> {
        self.grouped_programs()
            .iter()
            .find(|g| g.name == group)
            .map(|g| {
                view::collapsed_group_people(
                    &self.data.people,
                    &self.data.assignments,
                    committee_id,
                    g,
                )
            })
            .unwrap_or_default()
    }

    pub fn search_people(&self, query: &str, sort: PersonSort) -> Vec<&Person> {
        view::search_people(&self.data.people, &self.data.assignments, query, sort)
    }

    pub fn assignment_count(&self, person_id: &str) -> usize {
        self.data
            .assignments
            .iter()
            .filter(|a| a.person_id == person_id)
            .count()
    }

    pub fn matrix_columns(&self) -> Vec<MatrixColumn> {
        view::matrix_columns(self.grouped_programs(), &self.flags.expanded_groups)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Replace all four collections from the data service in one step.
    ///
    /// On failure the current state is kept and the message is available via
    /// [`RosterStore::last_error`]. There is no retry.
    pub async fn load(&mut self) -> Result<()> {
        let service = self
            .sync
            .as_ref()
            .map(|s| s.service())
            .ok_or_else(|| Error::Internal("No data service attached".to_string()))?;

        // A save scheduled before the load would overwrite what is fetched
        let discarded = match &self.sync {
            Some(sync) => sync.cancel_pending().await,
            None => false,
        };

        self.last_error = None;
        match service.fetch().await {
            Ok(snapshot) => {
                tracing::info!(
                    people = snapshot.people.len(),
                    committees = snapshot.committees.len(),
                    programs = snapshot.programs.len(),
                    assignments = snapshot.assignments.len(),
                    "Loaded roster snapshot"
                );
                self.replace_all(snapshot);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load roster: {}", e);
                self.last_error = Some(e.to_string());
                if discarded {
                    self.schedule_save();
                }
                Err(e)
            }
        }
    }

    /// Persist any pending change now and wait for outstanding writes
    pub async fn flush(&self) {
        if let Some(sync) = &self.sync {
            sync.flush().await;
        }
    }

    fn replace_all(&mut self, mut snapshot: Snapshot) {
        let dropped = snapshot.prune_assignments();
        self.data = snapshot;
        self.grouped.take();
        if dropped > 0 {
            tracing::warn!(dropped, "Dropped dangling or duplicate assignments from loaded roster");
            self.schedule_save();
        }
        if let Some(selected) = &self.selected_person_id {
            if !self.data.people.iter().any(|p| &p.id == selected) {
                self.selected_person_id = None;
            }
        }
    }

    fn schedule_save(&self) {
        if let Some(sync) = &self.sync {
            sync.schedule_save(self.data.clone());
        }
    }
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
