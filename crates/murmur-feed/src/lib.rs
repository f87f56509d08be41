#![forbid(unsafe_code)]

//! Feed composition: selects the scope filter, issues one page query through
//! the entity store, and attaches comment collections before rendering.

mod paginate;

pub use paginate::{Page, Paginator, DEFAULT_PAGE_SIZE};

use murmur_core::{Error, Result};
use murmur_model::{Group, PostId, PostView, User, UserId};
use murmur_store::{EntityStore, PostFilter, PostRecord};

pub const CRATE_NAME: &str = "murmur-feed";

/// The filter criterion selecting which posts populate a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FeedScope {
    Global,
    Group(String),
    Author(String),
    Following(UserId),
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: Group,
    pub page: Page<PostView>,
}

#[derive(Debug, Clone)]
pub struct AuthorFeed {
    pub author: User,
    pub page: Page<PostView>,
    /// Whether the requesting identity currently follows this author;
    /// false for anonymous requesters.
    pub following: bool,
    pub follower_count: usize,
    pub following_count: usize,
}

/// Builds ordered, paginated feeds with author/group/comments eagerly
/// attached.
pub struct FeedService<'a> {
    store: &'a EntityStore,
    paginator: Paginator,
}

impl<'a> FeedService<'a> {
    #[must_use]
    pub fn new(store: &'a EntityStore, page_size: usize) -> Self {
        Self {
            store,
            paginator: Paginator::new(page_size),
        }
    }

    pub fn global(&self, requested_page: i64) -> Result<Page<PostView>> {
        self.page_for(&PostFilter::default(), requested_page)
    }

    pub fn group(&self, slug: &str, requested_page: i64) -> Result<GroupFeed> {
        let group = self
            .store
            .group_by_slug(slug)?
            .ok_or_else(|| Error::not_found("group", slug))?;
        let page = self.page_for(&PostFilter::by_group(group.id), requested_page)?;
        Ok(GroupFeed { group, page })
    }

    pub fn author(
        &self,
        username: &str,
        viewer: Option<UserId>,
        requested_page: i64,
    ) -> Result<AuthorFeed> {
        let author = self
            .store
            .user_by_name(username)?
            .ok_or_else(|| Error::not_found("user", username))?;
        let page = self.page_for(&PostFilter::by_author(author.id), requested_page)?;
        let following = match viewer {
            None => false,
            Some(viewer) => self.store.is_following(viewer, author.id)?,
        };
        let follower_count = self.store.follower_count(author.id)?;
        let following_count = self.store.following_count(author.id)?;
        Ok(AuthorFeed {
            author,
            page,
            following,
            follower_count,
            following_count,
        })
    }

    /// Posts authored by anyone the viewer follows. An empty following set
    /// yields an empty page, not an error.
    pub fn following(&self, viewer: UserId, requested_page: i64) -> Result<Page<PostView>> {
        let authors = self.store.following_set(viewer)?;
        self.page_for(&PostFilter::by_authors(authors), requested_page)
    }

    pub fn scoped(&self, scope: &FeedScope, requested_page: i64) -> Result<Page<PostView>> {
        match scope {
            FeedScope::Global => self.global(requested_page),
            FeedScope::Group(slug) => self.group(slug, requested_page).map(|feed| feed.page),
            FeedScope::Author(name) => {
                self.author(name, None, requested_page).map(|feed| feed.page)
            }
            FeedScope::Following(viewer) => self.following(*viewer, requested_page),
        }
    }

    /// Single-post view for the detail page, 404 when the id does not
    /// resolve under the named author.
    pub fn post_detail(&self, username: &str, post: PostId) -> Result<PostView> {
        let record = self
            .store
            .post_of_author(username, post)?
            .ok_or_else(|| Error::not_found("post", post.to_string()))?;
        let mut views = self.attach_comments(vec![record])?;
        views
            .pop()
            .ok_or_else(|| Error::not_found("post", post.to_string()))
    }

    fn page_for(&self, filter: &PostFilter, requested_page: i64) -> Result<Page<PostView>> {
        let total = self.store.count_posts(filter)?;
        let (number, offset) = self.paginator.clamp(total, requested_page);
        let records = self
            .store
            .posts_page(filter, self.paginator.page_size(), offset)?;
        let views = self.attach_comments(records)?;
        Ok(self.paginator.assemble(views, total, number))
    }

    fn attach_comments(&self, records: Vec<PostRecord>) -> Result<Vec<PostView>> {
        let ids: Vec<PostId> = records.iter().map(|r| r.post.id).collect();
        let mut comments = self.store.comments_for_posts(&ids)?;
        Ok(records
            .into_iter()
            .map(|record| PostView {
                comments: comments.remove(&record.post.id).unwrap_or_default(),
                post: record.post,
                author: record.author,
                group: record.group,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use murmur_model::{GroupSlug, Username};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn seeded() -> (EntityStore, User, User) {
        let store = EntityStore::open_in_memory().unwrap();
        let alice = store
            .create_user(&Username::parse("alice").unwrap(), "Alice")
            .unwrap();
        let bob = store
            .create_user(&Username::parse("bob").unwrap(), "Bob")
            .unwrap();
        (store, alice, bob)
    }

    #[test]
    fn global_feed_attaches_comments_eagerly() {
        let (store, alice, bob) = seeded();
        let post = store.create_post(alice.id, "hello", None, None, ts(0)).unwrap();
        store.create_comment(post.id, bob.id, "hi!", ts(1)).unwrap();

        let feeds = FeedService::new(&store, 10);
        let page = feeds.global(1).unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].comments.len(), 1);
        assert_eq!(page.items[0].comments[0].author.username, "bob");
    }

    #[test]
    fn unknown_group_and_author_are_not_found() {
        let (store, ..) = seeded();
        let feeds = FeedService::new(&store, 10);
        assert!(feeds.group("ghost-group", 1).unwrap_err().is_not_found());
        assert!(feeds.author("ghost", None, 1).unwrap_err().is_not_found());
    }

    #[test]
    fn author_feed_reports_follow_status() {
        let (store, alice, bob) = seeded();
        store.create_post(bob.id, "from bob", None, None, ts(0)).unwrap();

        let feeds = FeedService::new(&store, 10);
        let anonymous = feeds.author("bob", None, 1).unwrap();
        assert!(!anonymous.following);

        store.follow(alice.id, bob.id).unwrap();
        let viewed = feeds.author("bob", Some(alice.id), 1).unwrap();
        assert!(viewed.following);
        assert_eq!(viewed.follower_count, 1);
        assert_eq!(viewed.page.total_count, 1);
    }

    #[test]
    fn following_feed_contains_exactly_followed_authors_posts() {
        let (store, alice, bob) = seeded();
        let carol = store
            .create_user(&Username::parse("carol").unwrap(), "Carol")
            .unwrap();
        store.create_post(bob.id, "from bob", None, None, ts(1)).unwrap();
        store.create_post(carol.id, "from carol", None, None, ts(2)).unwrap();

        let feeds = FeedService::new(&store, 10);

        // Empty following set: empty page, not an error.
        let empty = feeds.following(alice.id, 1).unwrap();
        assert_eq!(empty.total_count, 0);
        assert!(empty.items.is_empty());

        store.follow(alice.id, bob.id).unwrap();
        let page = feeds.following(alice.id, 1).unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].author.username, "bob");
    }

    #[test]
    fn page_clamping_applies_to_feeds() {
        let (store, alice, _) = seeded();
        for i in 0..25 {
            store
                .create_post(alice.id, &format!("post {i}"), None, None, ts(i))
                .unwrap();
        }

        let feeds = FeedService::new(&store, 10);
        let clamped_low = feeds.global(0).unwrap();
        assert_eq!(clamped_low.number, 1);
        assert_eq!(clamped_low.items.len(), 10);

        let clamped_high = feeds.global(99).unwrap();
        assert_eq!(clamped_high.number, 3);
        assert_eq!(clamped_high.items.len(), 5);
        assert!(clamped_high.has_previous);
        assert!(!clamped_high.has_next);
    }

    #[test]
    fn group_feed_selects_only_group_posts() {
        let (store, alice, _) = seeded();
        let group = store
            .create_group("Rust", &GroupSlug::parse("rust").unwrap(), "rustaceans")
            .unwrap();
        store.create_post(alice.id, "in group", Some(group.id), None, ts(1)).unwrap();
        store.create_post(alice.id, "loose", None, None, ts(2)).unwrap();

        let feeds = FeedService::new(&store, 10);
        let feed = feeds.group("rust", 1).unwrap();
        assert_eq!(feed.group.title, "Rust");
        assert_eq!(feed.page.total_count, 1);
        assert_eq!(feed.page.items[0].post.text, "in group");
    }

    #[test]
    fn detail_view_resolves_by_author_and_id() {
        let (store, alice, bob) = seeded();
        let post = store.create_post(alice.id, "mine", None, None, ts(0)).unwrap();
        store.create_comment(post.id, bob.id, "nice", ts(1)).unwrap();

        let feeds = FeedService::new(&store, 10);
        let view = feeds.post_detail("alice", post.id).unwrap();
        assert_eq!(view.post.id, post.id);
        assert_eq!(view.comments.len(), 1);

        assert!(feeds.post_detail("bob", post.id).unwrap_err().is_not_found());
    }
}
