// SPDX-License-Identifier: Apache-2.0

//! Follow edges. Self-follow, double-follow, and unfollow of an absent
//! edge are idempotent no-ops: they succeed without touching the edge set.

use crate::EntityStore;
use murmur_core::{Error, Result};
use murmur_model::UserId;

impl EntityStore {
    pub fn follow(&self, follower: UserId, target: UserId) -> Result<()> {
        if follower == target {
            return Ok(());
        }
        if self.is_following(follower, target)? {
            return Ok(());
        }
        self.conn()
            .execute(
                "INSERT INTO follows (follower_id, followed_id) VALUES (?1, ?2)",
                (follower.get(), target.get()),
            )
            .map_err(|e| Error::storage("create follow edge", e))?;
        Ok(())
    }

    pub fn unfollow(&self, follower: UserId, target: UserId) -> Result<()> {
        self.conn()
            .execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                (follower.get(), target.get()),
            )
            .map_err(|e| Error::storage("delete follow edge", e))?;
        Ok(())
    }

    pub fn is_following(&self, follower: UserId, target: UserId) -> Result<bool> {
        let count: i64 = self
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                (follower.get(), target.get()),
                |row| row.get(0),
            )
            .map_err(|e| Error::storage("check follow edge", e))?;
        Ok(count > 0)
    }

    /// Everyone the user follows, in a stable order.
    pub fn following_set(&self, follower: UserId) -> Result<Vec<UserId>> {
        let mut stmt = self
            .conn()
            .prepare_cached(
                "SELECT DISTINCT followed_id FROM follows WHERE follower_id = ?1 \
                 ORDER BY followed_id ASC",
            )
            .map_err(|e| Error::storage("load following set", e))?;
        let rows = stmt
            .query_map([follower.get()], |row| row.get(0).map(UserId))
            .map_err(|e| Error::storage("load following set", e))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::storage("load following set", e))
    }

    pub fn follower_count(&self, user: UserId) -> Result<usize> {
        self.count_edges("SELECT COUNT(*) FROM follows WHERE followed_id = ?1", user)
    }

    pub fn following_count(&self, user: UserId) -> Result<usize> {
        self.count_edges("SELECT COUNT(*) FROM follows WHERE follower_id = ?1", user)
    }

    /// Raw edge count between a pair, double edges included. Exists so tests
    /// can assert the application-level double-follow check holds.
    pub fn follow_edge_count(&self, follower: UserId, target: UserId) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                (follower.get(), target.get()),
                |row| row.get(0),
            )
            .map_err(|e| Error::storage("count follow edges", e))?;
        Ok(count as usize)
    }

    fn count_edges(&self, sql: &str, user: UserId) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row(sql, [user.get()], |row| row.get(0))
            .map_err(|e| Error::storage("count follow edges", e))?;
        Ok(count as usize)
    }
}
