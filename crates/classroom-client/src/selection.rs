use std::collections::BTreeMap;

use classroom_types::User;

/// Users picked for one role, keyed by user id.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    users: BTreeMap<i64, User>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user. Returns false, leaving the set unchanged, if a user with
    /// the same id is already present.
    pub fn insert(&mut self, user: User) -> bool {
        if self.users.contains_key(&user.id) {
            return false;
        }
        self.users.insert(user.id, user);
        true
    }

    pub fn remove(&mut self, id: i64) -> Option<User> {
        self.users.remove(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.users.contains_key(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn emails(&self) -> Vec<String> {
        self.users.values().map(|u| u.email.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }
}

#[cfg(test)]
mod tests {
    use classroom_types::Role;

    use super::*;

    fn user(id: i64, email: &str) -> User {
        User {
            id,
            username: format!("user{}", id),
            name: format!("User {}", id),
            email: email.to_string(),
            role: Role::Student,
            status: "active".to_string(),
        }
    }

    #[test]
    fn insert_is_keyed_by_id() {
        let mut set = SelectionSet::new();
        assert!(set.insert(user(1, "a@school.edu")));
        assert!(!set.insert(user(1, "changed@school.edu")));
        assert_eq!(set.len(), 1);
        assert_eq!(set.emails(), ["a@school.edu"]);
    }

    #[test]
    fn remove_absent_user_is_noop() {
        let mut set = SelectionSet::new();
        set.insert(user(1, "a@school.edu"));
        assert!(set.remove(2).is_none());
        assert!(set.remove(1).is_some());
        assert!(set.remove(1).is_none());
        assert!(set.is_empty());
    }
}
