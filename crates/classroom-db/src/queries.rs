use std::collections::HashMap;

use anyhow::Result;
use classroom_types::api::NewUser;
use classroom_types::{Channel, NewChannel, Role, email_contains};
use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info};

use crate::Database;
use crate::models::{ChannelRow, CreateChannelOutcome, MemberRow, UserRow, parse_timestamp};

impl Database {
    // -- Users --

    /// Users whose email contains `term`, ignoring case, ordered by id. An
    /// empty term matches everyone.
    pub fn search_users(&self, term: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| query_users_by_email(conn, term))
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Insert a user, or update the existing one with the same email.
    /// Returns the user's id.
    pub fn upsert_user(&self, user: &NewUser) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let id = conn.query_row(
                "INSERT INTO users (username, name, email, role, status)
                 VALUES (?1, ?2, ?3, ?4, COALESCE(?5, 'active'))
                 ON CONFLICT(email) DO UPDATE SET
                    username = excluded.username,
                    name = excluded.name,
                    role = excluded.role,
                    status = excluded.status
                 RETURNING id",
                rusqlite::params![
                    user.username,
                    user.name,
                    user.email,
                    user.role.as_str(),
                    user.status,
                ],
                |row| row.get(0),
            )?;
            Ok(id)
        })
    }

    // -- Channels --

    /// Every channel ordered by `class_id`, with member emails grouped by role
    /// in the order they were added.
    pub fn list_channels(&self) -> Result<Vec<Channel>> {
        self.with_conn(|conn| {
            let channels = query_channels(conn)?;
            let members = query_all_members(conn)?;

            let mut by_channel: HashMap<i64, Vec<MemberRow>> = HashMap::new();
            for m in members {
                by_channel.entry(m.channel_id).or_default().push(m);
            }

            channels
                .into_iter()
                .map(|row| -> Result<Channel> {
                    let members = by_channel.remove(&row.id).unwrap_or_default();
                    let mut channel = row.into_channel();
                    for m in members {
                        push_email(&mut channel, m.role.parse()?, m.email);
                    }
                    Ok(channel)
                })
                .collect()
        })
    }

    /// Members of the channel with the given `class_id`, or `None` when no
    /// such channel exists.
    pub fn channel_members(&self, class_id: i64) -> Result<Option<Vec<MemberRow>>> {
        self.with_conn(|conn| {
            let Some(channel) = query_channel_by_class_id(conn, class_id)? else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT cm.channel_id, cm.user_id, u.email, u.name, cm.role
                 FROM channel_members cm
                 JOIN users u ON cm.user_id = u.id
                 WHERE cm.channel_id = ?1
                 ORDER BY cm.rowid",
            )?;
            let rows = stmt
                .query_map([channel.id], member_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Some(rows))
        })
    }

    /// Create a channel and its membership rows in one immediate transaction.
    ///
    /// The name check, the `class_id` assignment and the member inserts all
    /// happen under the write lock, so two concurrent creates can neither
    /// share a name nor a `class_id`. The proposed `sequence_id` in `new` is
    /// ignored; the stored one is `1 + max(class_id)`.
    pub fn create_channel(&self, new: &NewChannel) -> Result<CreateChannelOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM channels WHERE name = ?1)",
                [&new.display_name],
                |row| row.get(0),
            )?;
            if taken {
                return Ok(CreateChannelOutcome::DuplicateName);
            }

            // Resolve every email before writing anything. Matching is exact: emails
            // differing only in case may belong to different users.
            let mut members: Vec<(i64, Role, String)> = Vec::new();
            for role in Role::ALL {
                for email in new.emails(role) {
                    let found: Option<(i64, String, String)> = tx
                        .query_row(
                            "SELECT id, email, role FROM users WHERE email = ?1",
                            [email],
                            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                        )
                        .optional()?;

                    let Some((user_id, stored_email, actual)) = found else {
                        return Ok(CreateChannelOutcome::UnknownEmail(email.clone()));
                    };
                    let actual: Role = actual.parse()?;
                    if actual != role {
                        return Ok(CreateChannelOutcome::RoleMismatch {
                            email: email.clone(),
                            expected: role,
                            actual,
                        });
                    }
                    if !members.iter().any(|(id, _, _)| *id == user_id) {
                        members.push((user_id, role, stored_email));
                    }
                }
            }

            let class_id: i64 = tx.query_row(
                "SELECT COALESCE(MAX(class_id), 0) + 1 FROM channels",
                [],
                |row| row.get(0),
            )?;
            if new.sequence_id != class_id {
                debug!(
                    "Proposed class_id {} is stale, assigning {}",
                    new.sequence_id, class_id
                );
            }

            tx.execute(
                "INSERT INTO channels (class_id, name) VALUES (?1, ?2)",
                rusqlite::params![class_id, new.display_name],
            )?;
            let channel_id = tx.last_insert_rowid();

            for (user_id, role, _) in &members {
                tx.execute(
                    "INSERT INTO channel_members (channel_id, user_id, role) VALUES (?1, ?2, ?3)",
                    rusqlite::params![channel_id, user_id, role.as_str()],
                )?;
            }

            let created_at: String = tx.query_row(
                "SELECT created_at FROM channels WHERE id = ?1",
                [channel_id],
                |row| row.get(0),
            )?;

            tx.commit()?;

            let mut channel = Channel {
                sequence_id: class_id,
                display_name: new.display_name.clone(),
                teacher_emails: Vec::new(),
                student_emails: Vec::new(),
                staff_emails: Vec::new(),
                created_at: parse_timestamp(&created_at),
            };
            for (_, role, email) in members {
                push_email(&mut channel, role, email);
            }

            info!(
                "Created class '{}' (class_id {}) with {} members",
                channel.display_name,
                class_id,
                channel.teacher_emails.len()
                    + channel.staff_emails.len()
                    + channel.student_emails.len()
            );
            Ok(CreateChannelOutcome::Created(channel))
        })
    }
}

fn push_email(channel: &mut Channel, role: Role, email: String) {
    match role {
        Role::Teacher => channel.teacher_emails.push(email),
        Role::Staff => channel.staff_emails.push(email),
        Role::Student => channel.student_emails.push(email),
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        role: row.get(4)?,
        status: row.get(5)?,
    })
}

fn member_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemberRow> {
    Ok(MemberRow {
        channel_id: row.get(0)?,
        user_id: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        role: row.get(4)?,
    })
}

fn query_users_by_email(conn: &Connection, term: &str) -> Result<Vec<UserRow>> {
    // SQLite LIKE only folds ASCII case, so matching happens here
    let mut stmt =
        conn.prepare("SELECT id, username, name, email, role, status FROM users ORDER BY id")?;

    let mut rows = Vec::new();
    for row in stmt.query_map([], user_from_row)? {
        let row = row?;
        if email_contains(&row.email, term) {
            rows.push(row);
        }
    }

    Ok(rows)
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, name, email, role, status FROM users WHERE id = ?1")?;

    let row = stmt.query_row([id], user_from_row).optional()?;

    Ok(row)
}

fn query_channels(conn: &Connection) -> Result<Vec<ChannelRow>> {
    let mut stmt =
        conn.prepare("SELECT id, class_id, name, created_at FROM channels ORDER BY class_id")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ChannelRow {
                id: row.get(0)?,
                class_id: row.get(1)?,
                name: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_channel_by_class_id(conn: &Connection, class_id: i64) -> Result<Option<ChannelRow>> {
    let mut stmt =
        conn.prepare("SELECT id, class_id, name, created_at FROM channels WHERE class_id = ?1")?;

    let row = stmt
        .query_row([class_id], |row| {
            Ok(ChannelRow {
                id: row.get(0)?,
                class_id: row.get(1)?,
                name: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_all_members(conn: &Connection) -> Result<Vec<MemberRow>> {
    // JOIN users to fetch emails in a single query (no N+1 per channel)
    let mut stmt = conn.prepare(
        "SELECT cm.channel_id, cm.user_id, u.email, u.name, cm.role
         FROM channel_members cm
         JOIN users u ON cm.user_id = u.id
         ORDER BY cm.rowid",
    )?;

    let rows = stmt
        .query_map([], member_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, email: &str, role: Role) -> NewUser {
        NewUser {
            username: username.to_string(),
            name: username.to_string(),
            email: email.to_string(),
            role,
            status: None,
        }
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.upsert_user(&user("tina", "Tina@School.edu", Role::Teacher)).unwrap();
        db.upsert_user(&user("sam", "sam@school.edu", Role::Staff)).unwrap();
        db.upsert_user(&user("stu", "stu@school.edu", Role::Student)).unwrap();
        db.upsert_user(&user("sue", "sue@other.org", Role::Student)).unwrap();
        db
    }

    fn class(name: &str, teachers: &[&str], staff: &[&str], students: &[&str]) -> NewChannel {
        let owned = |list: &[&str]| -> Vec<String> { list.iter().map(|s| s.to_string()).collect() };
        NewChannel {
            sequence_id: 0,
            display_name: name.to_string(),
            teacher_emails: owned(teachers),
            staff_emails: owned(staff),
            student_emails: owned(students),
        }
    }

    #[test]
    fn search_matches_email_substring_ignoring_case() {
        let db = seeded();

        let emails: Vec<String> = db
            .search_users("SCHOOL")
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        assert_eq!(emails, ["Tina@School.edu", "sam@school.edu", "stu@school.edu"]);

        assert_eq!(db.search_users("").unwrap().len(), 4);
        assert!(db.search_users("nobody").unwrap().is_empty());
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let db = seeded();
        assert!(db.search_users("%").unwrap().is_empty());
        assert!(db.search_users("s_m").unwrap().is_empty());
    }

    #[test]
    fn search_folds_non_ascii_case() {
        let db = seeded();
        db.upsert_user(&user("elodie", "élodie@school.edu", Role::Student)).unwrap();

        let hits = db.search_users("ÉLODIE").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].email, "élodie@school.edu");
        assert_eq!(db.search_users("élodie").unwrap().len(), 1);
    }

    #[test]
    fn upsert_updates_existing_email() {
        let db = seeded();
        let id = db.upsert_user(&user("sam", "sam@school.edu", Role::Teacher)).unwrap();
        let row = db.get_user(id).unwrap().unwrap();
        assert_eq!(row.into_user().unwrap().role, Role::Teacher);
        assert_eq!(db.search_users("").unwrap().len(), 4);
    }

    #[test]
    fn create_assigns_next_class_id_and_writes_members() {
        let db = seeded();

        let outcome = db
            .create_channel(&class("Math101", &["Tina@School.edu"], &["sam@school.edu"], &["stu@school.edu"]))
            .unwrap();
        let CreateChannelOutcome::Created(first) = outcome else {
            panic!("expected create");
        };
        assert_eq!(first.sequence_id, 1);
        assert_eq!(first.teacher_emails, ["Tina@School.edu"]);

        let mut proposal = class("Science202", &["Tina@School.edu"], &["sam@school.edu"], &["stu@school.edu", "sue@other.org"]);
        proposal.sequence_id = 1;
        let CreateChannelOutcome::Created(second) = db.create_channel(&proposal).unwrap() else {
            panic!("expected create");
        };
        assert_eq!(second.sequence_id, 2);

        let members = db.channel_members(2).unwrap().unwrap();
        let emails: Vec<&str> = members.iter().map(|m| m.email.as_str()).collect();
        assert_eq!(emails, ["Tina@School.edu", "sam@school.edu", "stu@school.edu", "sue@other.org"]);

        let listed = db.list_channels().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].display_name, "Science202");
        assert_eq!(listed[1].student_emails, ["stu@school.edu", "sue@other.org"]);
        assert_eq!(listed[1].staff_emails, ["sam@school.edu"]);
    }

    #[test]
    fn emails_differing_in_case_resolve_to_their_own_user() {
        let db = seeded();
        let upper = db.upsert_user(&user("pat", "Pat@school.edu", Role::Teacher)).unwrap();
        let lower = db.upsert_user(&user("patty", "pat@school.edu", Role::Student)).unwrap();
        assert_ne!(upper, lower);

        let new = class("Art", &["Tina@School.edu"], &["sam@school.edu"], &["pat@school.edu"]);
        let CreateChannelOutcome::Created(created) = db.create_channel(&new).unwrap() else {
            panic!("expected create");
        };
        assert_eq!(created.student_emails, ["pat@school.edu"]);

        let members = db.channel_members(created.sequence_id).unwrap().unwrap();
        let student = members.iter().find(|m| m.role == "student").unwrap();
        assert_eq!(student.user_id, lower);

        // A case-variant of a stored email is not a known user
        let new = class("Music", &["tina@school.edu"], &["sam@school.edu"], &["stu@school.edu"]);
        assert_eq!(
            db.create_channel(&new).unwrap(),
            CreateChannelOutcome::UnknownEmail("tina@school.edu".to_string())
        );
    }

    #[test]
    fn duplicate_name_writes_nothing() {
        let db = seeded();
        let new = class("Math101", &["Tina@School.edu"], &["sam@school.edu"], &["stu@school.edu"]);
        assert!(matches!(db.create_channel(&new).unwrap(), CreateChannelOutcome::Created(_)));

        assert_eq!(db.create_channel(&new).unwrap(), CreateChannelOutcome::DuplicateName);
        assert_eq!(db.list_channels().unwrap().len(), 1);
    }

    #[test]
    fn unknown_email_rolls_back() {
        let db = seeded();
        let new = class("Art", &["Tina@School.edu"], &["ghost@school.edu"], &["stu@school.edu"]);

        assert_eq!(
            db.create_channel(&new).unwrap(),
            CreateChannelOutcome::UnknownEmail("ghost@school.edu".to_string())
        );
        assert!(db.list_channels().unwrap().is_empty());
        assert!(db.channel_members(1).unwrap().is_none());
    }

    #[test]
    fn role_mismatch_rolls_back() {
        let db = seeded();
        let new = class("Art", &["stu@school.edu"], &["sam@school.edu"], &["sue@other.org"]);

        assert_eq!(
            db.create_channel(&new).unwrap(),
            CreateChannelOutcome::RoleMismatch {
                email: "stu@school.edu".to_string(),
                expected: Role::Teacher,
                actual: Role::Student,
            }
        );
        assert!(db.list_channels().unwrap().is_empty());
    }
}
