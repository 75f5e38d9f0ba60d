use tracing::{debug, error, info, warn};

use classroom_types::{Channel, NewChannel, Role, User};

use crate::backend::{ChannelRepository, UserDirectory};
use crate::error::SubmitError;
use crate::search::{RoleSearch, SearchRequest, SearchResponse, email_matches};
use crate::selection::SelectionSet;

/// State of one "create class" dialog.
///
/// Each role has its own search box and its own selection set; nothing is
/// shared between roles. The validity flag is recomputed after every change
/// and gates [`ClassForm::submit`].
#[derive(Debug, Default)]
pub struct ClassForm {
    class_name: String,
    teacher_search: RoleSearch,
    staff_search: RoleSearch,
    student_search: RoleSearch,
    teachers: SelectionSet,
    staff: SelectionSet,
    students: SelectionSet,
    valid: bool,
}

impl ClassForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn set_class_name(&mut self, name: impl Into<String>) {
        self.class_name = name.into();
        self.revalidate();
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn selection(&self, role: Role) -> &SelectionSet {
        match role {
            Role::Teacher => &self.teachers,
            Role::Staff => &self.staff,
            Role::Student => &self.students,
        }
    }

    fn selection_mut(&mut self, role: Role) -> &mut SelectionSet {
        match role {
            Role::Teacher => &mut self.teachers,
            Role::Staff => &mut self.staff,
            Role::Student => &mut self.students,
        }
    }

    pub fn search_state(&self, role: Role) -> &RoleSearch {
        match role {
            Role::Teacher => &self.teacher_search,
            Role::Staff => &self.staff_search,
            Role::Student => &self.student_search,
        }
    }

    fn search_state_mut(&mut self, role: Role) -> &mut RoleSearch {
        match role {
            Role::Teacher => &mut self.teacher_search,
            Role::Staff => &mut self.staff_search,
            Role::Student => &mut self.student_search,
        }
    }

    pub fn term(&self, role: Role) -> &str {
        self.search_state(role).term()
    }

    pub fn results(&self, role: Role) -> &[User] {
        self.search_state(role).results()
    }

    // -- Search --

    /// Record a new term for `role` and issue a search for it. The previous
    /// results are cleared straight away.
    pub fn begin_search(&mut self, role: Role, term: &str) -> SearchRequest {
        let ticket = self.search_state_mut(role).begin(term);
        self.revalidate();
        SearchRequest {
            role,
            term: term.to_string(),
            ticket,
        }
    }

    /// Apply a finished search. Returns false if a newer search for the same
    /// role has been issued since, in which case the response is dropped.
    ///
    /// Kept: users whose email contains the term, whose role is the searched
    /// role, and who are not already selected for it. Directory order is
    /// preserved.
    pub fn apply_search(&mut self, response: SearchResponse) -> bool {
        let role = response.role;
        if !self.search_state(role).is_latest(response.ticket) {
            debug!("Dropping stale {} search for '{}'", role, response.term);
            return false;
        }

        let selected = self.selection(role);
        let results: Vec<User> = response
            .users
            .into_iter()
            .filter(|u| u.role == role && !selected.contains(u.id) && email_matches(u, &response.term))
            .collect();

        self.search_state_mut(role).set_results(results);
        self.revalidate();
        true
    }

    /// Search and apply in one step. Returns the results now shown for
    /// `role`.
    pub async fn search<D>(&mut self, directory: &D, role: Role, term: &str) -> &[User]
    where
        D: UserDirectory + ?Sized,
    {
        let request = self.begin_search(role, term);
        let response = request.run(directory).await;
        self.apply_search(response);
        self.results(role)
    }

    // -- Selection --

    /// Add `user` to the `role` selection and clear that role's search box.
    pub fn select(&mut self, user: User, role: Role) {
        self.selection_mut(role).insert(user);
        self.search_state_mut(role).reset();
        self.revalidate();
    }

    pub fn deselect(&mut self, user: &User, role: Role) {
        self.selection_mut(role).remove(user.id);
        self.revalidate();
    }

    // -- Submission --

    fn revalidate(&mut self) {
        self.valid = !self.class_name.trim().is_empty()
            && !self.teachers.is_empty()
            && !self.staff.is_empty()
            && !self.students.is_empty();
    }

    /// Create the class.
    ///
    /// Reads the existing classes, proposes `1 + max(class_id)` and refuses a
    /// name that is already taken. On success the form is cleared; on any
    /// error it is left exactly as it was.
    pub async fn submit<R>(&mut self, repo: &R) -> Result<Channel, SubmitError>
    where
        R: ChannelRepository + ?Sized,
    {
        if !self.valid {
            warn!("Class submission blocked: required fields missing");
            return Err(SubmitError::Incomplete);
        }

        let name = self.class_name.clone();

        let existing = repo.list().await.map_err(|e| {
            error!("Error fetching classes: {}", e);
            SubmitError::Remote(e)
        })?;

        let sequence_id = next_sequence_id(&existing);

        if existing.iter().any(|c| c.display_name == name) {
            warn!("Class name already exists: {}", name);
            return Err(SubmitError::DuplicateName(name));
        }

        let new = NewChannel {
            sequence_id,
            display_name: name.clone(),
            teacher_emails: self.teachers.emails(),
            student_emails: self.students.emails(),
            staff_emails: self.staff.emails(),
        };

        let created = repo.create(new).await.map_err(|e| {
            if e.is_conflict() {
                warn!("Class name taken before create: {}", name);
                SubmitError::DuplicateName(name.clone())
            } else {
                error!("Error creating class: {}", e);
                SubmitError::Remote(e)
            }
        })?;

        info!("Created class '{}' (class_id {})", created.display_name, created.sequence_id);
        self.clear();
        Ok(created)
    }

    fn clear(&mut self) {
        self.class_name.clear();
        for role in Role::ALL {
            self.selection_mut(role).clear();
            self.search_state_mut(role).reset();
        }
        self.valid = false;
    }
}

/// One past the largest `class_id`, or 1 for an empty list.
pub fn next_sequence_id(existing: &[Channel]) -> i64 {
    existing.iter().map(|c| c.sequence_id).max().unwrap_or(0) + 1
}
