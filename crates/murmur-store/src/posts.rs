// SPDX-License-Identifier: Apache-2.0

use crate::EntityStore;
use chrono::{DateTime, Utc};
use murmur_core::{Error, Result};
use murmur_model::{Group, GroupId, Post, PostId, User, UserId};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Row};

/// Scope filter for post queries. Unset fields select everything.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub author: Option<UserId>,
    pub group: Option<GroupId>,
    /// Restrict to posts authored by any of these users. `Some(&[])` matches
    /// nothing (an empty following set yields an empty feed, not an error).
    pub authors: Option<Vec<UserId>>,
}

impl PostFilter {
    #[must_use]
    pub fn by_author(author: UserId) -> Self {
        Self {
            author: Some(author),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by_group(group: GroupId) -> Self {
        Self {
            group: Some(group),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by_authors(authors: Vec<UserId>) -> Self {
        Self {
            authors: Some(authors),
            ..Self::default()
        }
    }

    fn matches_nothing(&self) -> bool {
        matches!(&self.authors, Some(list) if list.is_empty())
    }

    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut parts: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        if let Some(author) = self.author {
            parts.push("p.author_id = ?".to_string());
            params.push(Value::Integer(author.get()));
        }
        if let Some(group) = self.group {
            parts.push("p.group_id = ?".to_string());
            params.push(Value::Integer(group.get()));
        }
        if let Some(authors) = &self.authors {
            let placeholders = vec!["?"; authors.len()].join(", ");
            parts.push(format!("p.author_id IN ({placeholders})"));
            params.extend(authors.iter().map(|id| Value::Integer(id.get())));
        }
        if parts.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", parts.join(" AND ")), params)
        }
    }
}

/// A post row with author and group attached by the same statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub post: Post,
    pub author: User,
    pub group: Option<Group>,
}

const POST_COLUMNS: &str = "p.id, p.author_id, p.group_id, p.text, p.published_at, p.image, \
     u.username, u.display_name, g.title, g.slug, g.description";

const POST_FROM: &str =
    "FROM posts p JOIN users u ON u.id = p.author_id LEFT JOIN groups g ON g.id = p.group_id";

fn timestamp_from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| Error::storage("decode timestamp", format!("out of range: {ms}")))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<(PostRecord, i64)> {
    let published_ms: i64 = row.get(4)?;
    let group_title: Option<String> = row.get(8)?;
    let group_id: Option<i64> = row.get(2)?;
    let group = match (group_id, group_title) {
        (Some(id), Some(title)) => Some(Group {
            id: GroupId(id),
            title,
            slug: row.get(9)?,
            description: row.get(10)?,
        }),
        _ => None,
    };
    let record = PostRecord {
        post: Post {
            id: PostId(row.get(0)?),
            author_id: UserId(row.get(1)?),
            group_id: group.as_ref().map(|g| g.id),
            text: row.get(3)?,
            // Placeholder; the caller range-checks the raw millis and
            // patches the real instant in.
            published_at: DateTime::<Utc>::MIN_UTC,
            image: row.get(5)?,
        },
        author: User {
            id: UserId(row.get(1)?),
            username: row.get(6)?,
            display_name: row.get(7)?,
        },
        group,
    };
    Ok((record, published_ms))
}

impl EntityStore {
    /// Creates a post stamped with the supplied publication instant. The
    /// timestamp is immutable from here on.
    pub fn create_post(
        &self,
        author: UserId,
        text: &str,
        group: Option<GroupId>,
        image: Option<String>,
        published_at: DateTime<Utc>,
    ) -> Result<Post> {
        self.conn()
            .execute(
                "INSERT INTO posts (author_id, group_id, text, published_at, image) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    author.get(),
                    group.map(GroupId::get),
                    text,
                    published_at.timestamp_millis(),
                    image.as_deref(),
                ),
            )
            .map_err(|e| Error::storage("create post", e))?;
        Ok(Post {
            id: PostId(self.conn().last_insert_rowid()),
            author_id: author,
            group_id: group,
            text: text.to_string(),
            published_at,
            image,
        })
    }

    /// Updates the mutable fields only; `published_at` is never touched. A
    /// `None` image keeps whatever is stored.
    pub fn update_post(
        &self,
        id: PostId,
        text: &str,
        group: Option<GroupId>,
        image: Option<&str>,
    ) -> Result<()> {
        let changed = self
            .conn()
            .execute(
                "UPDATE posts SET text = ?1, group_id = ?2, image = COALESCE(?3, image) \
                 WHERE id = ?4",
                (text, group.map(GroupId::get), image, id.get()),
            )
            .map_err(|e| Error::storage("update post", e))?;
        if changed == 0 {
            return Err(Error::not_found("post", id.to_string()));
        }
        Ok(())
    }

    pub fn post_by_id(&self, id: PostId) -> Result<Option<PostRecord>> {
        let sql = format!("SELECT {POST_COLUMNS} {POST_FROM} WHERE p.id = ?");
        self.fetch_one(&sql, vec![Value::Integer(id.get())])
    }

    /// The detail-view lookup: the post must exist *and* belong to the named
    /// author.
    pub fn post_of_author(&self, username: &str, id: PostId) -> Result<Option<PostRecord>> {
        let sql = format!("SELECT {POST_COLUMNS} {POST_FROM} WHERE p.id = ? AND u.username = ?");
        self.fetch_one(
            &sql,
            vec![
                Value::Integer(id.get()),
                Value::Text(username.to_string()),
            ],
        )
    }

    pub fn count_posts(&self, filter: &PostFilter) -> Result<usize> {
        if filter.matches_nothing() {
            return Ok(0);
        }
        let (where_sql, params) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM posts p{where_sql}");
        let count: i64 = self
            .conn()
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))
            .map_err(|e| Error::storage("count posts", e))?;
        Ok(count as usize)
    }

    /// One ordered page of posts with author and group eagerly attached.
    /// Ordering is total and stable: newest publication instant first, ties
    /// broken by row insertion order.
    pub fn posts_page(
        &self,
        filter: &PostFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>> {
        if filter.matches_nothing() {
            return Ok(Vec::new());
        }
        let (where_sql, mut params) = filter.where_clause();
        let sql = format!(
            "SELECT {POST_COLUMNS} {POST_FROM}{where_sql} \
             ORDER BY p.published_at DESC, p.id ASC LIMIT ? OFFSET ?"
        );
        params.push(Value::Integer(limit as i64));
        params.push(Value::Integer(offset as i64));

        let mut stmt = self
            .conn()
            .prepare_cached(&sql)
            .map_err(|e| Error::storage("page posts", e))?;
        let mapped = stmt
            .query_map(params_from_iter(params.iter()), record_from_row)
            .map_err(|e| Error::storage("page posts", e))?;

        let mut records = Vec::new();
        for item in mapped {
            let (mut record, published_ms) = item.map_err(|e| Error::storage("page posts", e))?;
            record.post.published_at = timestamp_from_millis(published_ms)?;
            records.push(record);
        }
        Ok(records)
    }

    fn fetch_one(&self, sql: &str, params: Vec<Value>) -> Result<Option<PostRecord>> {
        let mut stmt = self
            .conn()
            .prepare_cached(sql)
            .map_err(|e| Error::storage("load post", e))?;
        let mut rows = stmt
            .query_map(params_from_iter(params.iter()), record_from_row)
            .map_err(|e| Error::storage("load post", e))?;
        match rows.next() {
            None => Ok(None),
            Some(item) => {
                let (mut record, published_ms) =
                    item.map_err(|e| Error::storage("load post", e))?;
                record.post.published_at = timestamp_from_millis(published_ms)?;
                Ok(Some(record))
            }
        }
    }
}
