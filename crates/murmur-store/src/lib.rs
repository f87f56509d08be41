#![forbid(unsafe_code)]

mod comments;
mod posts;
mod schema;
mod social;

pub use posts::{PostFilter, PostRecord};

use murmur_core::{Error, Result};
use murmur_model::{Group, GroupId, GroupSlug, User, UserId, Username};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const CRATE_NAME: &str = "murmur-store";

/// The persisted relational records and their integrity constraints. One
/// connection, autocommit; every write is a single-row-affecting statement.
pub struct EntityStore {
    conn: Connection,
}

impl EntityStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| Error::storage("open database", e))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::storage("open database", e))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // SQLite leaves foreign keys off unless asked; the cascade and
        // set-null policies depend on it.
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| Error::storage("enable foreign keys", e))?;
        conn.execute_batch(schema::SCHEMA_SQL)
            .map_err(|e| Error::storage("apply schema", e))?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- users ---

    pub fn create_user(&self, username: &Username, display_name: &str) -> Result<User> {
        self.conn
            .execute(
                "INSERT INTO users (username, display_name) VALUES (?1, ?2)",
                (username.as_str(), display_name),
            )
            .map_err(|e| Error::storage("create user", e))?;
        Ok(User {
            id: UserId(self.conn.last_insert_rowid()),
            username: username.as_str().to_string(),
            display_name: display_name.to_string(),
        })
    }

    /// Fetches the user, creating the record on first sight. Account
    /// provisioning proper belongs to the identity collaborator; this is the
    /// minimal default it needs.
    pub fn ensure_user(&self, username: &Username, display_name: &str) -> Result<User> {
        if let Some(user) = self.user_by_name(username.as_str())? {
            return Ok(user);
        }
        self.create_user(username, display_name)
    }

    pub fn user_by_name(&self, username: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, username, display_name FROM users WHERE username = ?1",
                [username],
                |row| {
                    Ok(User {
                        id: UserId(row.get(0)?),
                        username: row.get(1)?,
                        display_name: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|e| Error::storage("load user", e))
    }

    pub fn user_by_id(&self, id: UserId) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, username, display_name FROM users WHERE id = ?1",
                [id.get()],
                |row| {
                    Ok(User {
                        id: UserId(row.get(0)?),
                        username: row.get(1)?,
                        display_name: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|e| Error::storage("load user", e))
    }

    pub fn delete_user(&self, id: UserId) -> Result<()> {
        self.conn
            .execute("DELETE FROM users WHERE id = ?1", [id.get()])
            .map_err(|e| Error::storage("delete user", e))?;
        Ok(())
    }

    // --- groups ---

    pub fn create_group(&self, title: &str, slug: &GroupSlug, description: &str) -> Result<Group> {
        self.conn
            .execute(
                "INSERT INTO groups (title, slug, description) VALUES (?1, ?2, ?3)",
                (title, slug.as_str(), description),
            )
            .map_err(|e| Error::storage("create group", e))?;
        Ok(Group {
            id: GroupId(self.conn.last_insert_rowid()),
            title: title.to_string(),
            slug: slug.as_str().to_string(),
            description: description.to_string(),
        })
    }

    pub fn group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        self.conn
            .query_row(
                "SELECT id, title, slug, description FROM groups WHERE slug = ?1",
                [slug],
                |row| {
                    Ok(Group {
                        id: GroupId(row.get(0)?),
                        title: row.get(1)?,
                        slug: row.get(2)?,
                        description: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(|e| Error::storage("load group", e))
    }

    pub fn group_by_id(&self, id: GroupId) -> Result<Option<Group>> {
        self.conn
            .query_row(
                "SELECT id, title, slug, description FROM groups WHERE id = ?1",
                [id.get()],
                |row| {
                    Ok(Group {
                        id: GroupId(row.get(0)?),
                        title: row.get(1)?,
                        slug: row.get(2)?,
                        description: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(|e| Error::storage("load group", e))
    }

    pub fn all_groups(&self) -> Result<Vec<Group>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, title, slug, description FROM groups ORDER BY title ASC")
            .map_err(|e| Error::storage("list groups", e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Group {
                    id: GroupId(row.get(0)?),
                    title: row.get(1)?,
                    slug: row.get(2)?,
                    description: row.get(3)?,
                })
            })
            .map_err(|e| Error::storage("list groups", e))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::storage("list groups", e))
    }

    pub fn delete_group(&self, id: GroupId) -> Result<()> {
        self.conn
            .execute("DELETE FROM groups WHERE id = ?1", [id.get()])
            .map_err(|e| Error::storage("delete group", e))?;
        Ok(())
    }
}
