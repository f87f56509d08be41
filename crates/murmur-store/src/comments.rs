// SPDX-License-Identifier: Apache-2.0

use crate::EntityStore;
use chrono::{DateTime, Utc};
use murmur_core::{Error, Result};
use murmur_model::{Comment, CommentId, CommentView, PostId, User, UserId};
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use std::collections::BTreeMap;

impl EntityStore {
    pub fn create_comment(
        &self,
        post: PostId,
        author: UserId,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Comment> {
        self.conn()
            .execute(
                "INSERT INTO comments (post_id, author_id, text, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                (post.get(), author.get(), text, created_at.timestamp_millis()),
            )
            .map_err(|e| Error::storage("create comment", e))?;
        Ok(Comment {
            id: CommentId(self.conn().last_insert_rowid()),
            post_id: post,
            author_id: author,
            text: text.to_string(),
            created_at,
        })
    }

    /// Batched comment fetch for a page of posts: one statement, comments
    /// grouped by post, newest first. Posts without comments get no entry.
    pub fn comments_for_posts(
        &self,
        posts: &[PostId],
    ) -> Result<BTreeMap<PostId, Vec<CommentView>>> {
        if posts.is_empty() {
            return Ok(BTreeMap::new());
        }
        let placeholders = vec!["?"; posts.len()].join(", ");
        let sql = format!(
            "SELECT c.id, c.post_id, c.author_id, c.text, c.created_at, \
                    u.username, u.display_name \
             FROM comments c JOIN users u ON u.id = c.author_id \
             WHERE c.post_id IN ({placeholders}) \
             ORDER BY c.created_at DESC, c.id ASC"
        );
        let params: Vec<Value> = posts.iter().map(|id| Value::Integer(id.get())).collect();

        let mut stmt = self
            .conn()
            .prepare_cached(&sql)
            .map_err(|e| Error::storage("load comments", e))?;
        let mapped = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                let created_ms: i64 = row.get(4)?;
                Ok((
                    Comment {
                        id: CommentId(row.get(0)?),
                        post_id: PostId(row.get(1)?),
                        author_id: UserId(row.get(2)?),
                        text: row.get(3)?,
                        created_at: DateTime::<Utc>::MIN_UTC,
                    },
                    User {
                        id: UserId(row.get(2)?),
                        username: row.get(5)?,
                        display_name: row.get(6)?,
                    },
                    created_ms,
                ))
            })
            .map_err(|e| Error::storage("load comments", e))?;

        let mut by_post: BTreeMap<PostId, Vec<CommentView>> = BTreeMap::new();
        for item in mapped {
            let (mut comment, author, created_ms) =
                item.map_err(|e| Error::storage("load comments", e))?;
            comment.created_at = DateTime::<Utc>::from_timestamp_millis(created_ms)
                .ok_or_else(|| {
                    Error::storage("decode timestamp", format!("out of range: {created_ms}"))
                })?;
            by_post
                .entry(comment.post_id)
                .or_default()
                .push(CommentView { comment, author });
        }
        Ok(by_post)
    }

    pub fn comment_count(&self, post: PostId) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
                [post.get()],
                |row| row.get(0),
            )
            .map_err(|e| Error::storage("count comments", e))?;
        Ok(count as usize)
    }
}
