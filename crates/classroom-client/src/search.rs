use tracing::error;

use classroom_types::{Role, User, email_contains};

use crate::backend::UserDirectory;

/// True if `user`'s email contains `term`, ignoring case.
pub fn email_matches(user: &User, term: &str) -> bool {
    email_contains(&user.email, term)
}

/// Search box state for one role.
///
/// Every search issued gets a ticket; only the response carrying the latest
/// ticket may replace `results`. Anything older is dropped, so a slow reply
/// for an earlier term can never overwrite a newer one.
#[derive(Debug, Default)]
pub struct RoleSearch {
    term: String,
    results: Vec<User>,
    latest: u64,
}

impl RoleSearch {
    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn results(&self) -> &[User] {
        &self.results
    }

    pub(crate) fn begin(&mut self, term: &str) -> u64 {
        self.latest += 1;
        self.term = term.to_string();
        self.results.clear();
        self.latest
    }

    /// Clear term and results and orphan any search still in flight.
    pub(crate) fn reset(&mut self) {
        self.latest += 1;
        self.term.clear();
        self.results.clear();
    }

    pub(crate) fn is_latest(&self, ticket: u64) -> bool {
        ticket == self.latest
    }

    pub(crate) fn set_results(&mut self, results: Vec<User>) {
        self.results = results;
    }
}

/// An issued search, detached from the form so several can be awaited at
/// once.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub role: Role,
    pub term: String,
    pub(crate) ticket: u64,
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub role: Role,
    pub term: String,
    pub users: Vec<User>,
    pub(crate) ticket: u64,
}

impl SearchRequest {
    /// Query the directory. A failed lookup is logged and yields no users.
    pub async fn run<D>(self, directory: &D) -> SearchResponse
    where
        D: UserDirectory + ?Sized,
    {
        let users = match directory.search(&self.term).await {
            Ok(users) => users,
            Err(e) => {
                error!("Error searching {} users for '{}': {}", self.role, self.term, e);
                Vec::new()
            }
        };

        SearchResponse {
            role: self.role,
            term: self.term,
            users,
            ticket: self.ticket,
        }
    }
}
