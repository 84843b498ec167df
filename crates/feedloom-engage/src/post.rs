#![forbid(unsafe_code)]

//! Post identity and engagement value types.
//!
//! # Invariants
//!
//! 1. **Key uniqueness**: two distinct posts must produce distinct
//!    [`PostId`] values; the id is opaque and stable for the lifetime of
//!    the feed's working set.
//! 2. **Counter floor**: engagement counters are unsigned and never wrap;
//!    decrements saturate at zero.
//! 3. **Snapshot purity**: [`EngagementSnapshot`] is a plain value — reading
//!    one has no side effects and holds no locks.

use core::fmt;

/// Opaque stable identifier of a post, as handed out by the feed pipeline.
///
/// The engine never interprets the contents; it is only a registry key.
///
/// # Construction
///
/// ```
/// # use feedloom_engage::PostId;
/// let id = PostId::new("at://alice.com/post/3jk7");
/// assert_eq!(id.as_str(), "at://alice.com/post/3jk7");
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PostId(String);

impl PostId {
    /// Create a post id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PostId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The two toggleable engagement actions on a post.
///
/// Reply is deliberately absent: it is a fire-once dispatch with no local
/// state machine, handled by the card layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EngagementAction {
    /// The like (heart) control.
    Like,
    /// The repost (retweet) control.
    Repost,
}

impl fmt::Display for EngagementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Like => f.write_str("like"),
            Self::Repost => f.write_str("repost"),
        }
    }
}

/// Per-viewer engagement state of a single post, as the view renders it.
///
/// This is the optimistic (visible) state: a toggle is reflected here
/// immediately, before the remote system of record confirms it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EngagementSnapshot {
    /// Whether the viewer's like record exists (optimistically).
    pub liked: bool,
    /// Total like count including the viewer's optimistic contribution.
    pub like_count: u32,
    /// Whether the viewer's repost record exists (optimistically).
    pub reposted: bool,
    /// Total repost count including the viewer's optimistic contribution.
    pub repost_count: u32,
}

impl EngagementSnapshot {
    /// The flag for one action.
    #[must_use]
    pub fn flag(&self, action: EngagementAction) -> bool {
        match action {
            EngagementAction::Like => self.liked,
            EngagementAction::Repost => self.reposted,
        }
    }

    /// The counter for one action.
    #[must_use]
    pub fn count(&self, action: EngagementAction) -> u32 {
        match action {
            EngagementAction::Like => self.like_count,
            EngagementAction::Repost => self.repost_count,
        }
    }
}

/// Server-confirmed starting state for a post entering the working set.
///
/// Built from a feed fetch response; the engine treats these values as the
/// confirmed baseline that rollbacks return to.
///
/// # Example
///
/// ```
/// # use feedloom_engage::EngagementSeed;
/// let seed = EngagementSeed::new("p1").likes(10).reposts(2).liked(true);
/// assert_eq!(seed.like_count, 10);
/// assert!(seed.liked);
/// ```
#[derive(Clone, Debug)]
pub struct EngagementSeed {
    /// The post this seed describes.
    pub id: PostId,
    /// Confirmed like count.
    pub like_count: u32,
    /// Whether the viewer already has a like record.
    pub liked: bool,
    /// Confirmed repost count.
    pub repost_count: u32,
    /// Whether the viewer already has a repost record.
    pub reposted: bool,
}

impl EngagementSeed {
    /// Seed for a post the viewer has not engaged with, with zero counts.
    #[must_use]
    pub fn new(id: impl Into<PostId>) -> Self {
        Self {
            id: id.into(),
            like_count: 0,
            liked: false,
            repost_count: 0,
            reposted: false,
        }
    }

    /// Set the confirmed like count.
    #[must_use]
    pub fn likes(mut self, count: u32) -> Self {
        self.like_count = count;
        self
    }

    /// Set whether the viewer's like record already exists.
    #[must_use]
    pub fn liked(mut self, liked: bool) -> Self {
        self.liked = liked;
        self
    }

    /// Set the confirmed repost count.
    #[must_use]
    pub fn reposts(mut self, count: u32) -> Self {
        self.repost_count = count;
        self
    }

    /// Set whether the viewer's repost record already exists.
    #[must_use]
    pub fn reposted(mut self, reposted: bool) -> Self {
        self.reposted = reposted;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_id_round_trip() {
        let id = PostId::new("p1");
        assert_eq!(id.as_str(), "p1");
        assert_eq!(id.to_string(), "p1");
        assert_eq!(id, PostId::from("p1"));
        assert_ne!(id, PostId::from("p2"));
    }

    #[test]
    fn action_display() {
        assert_eq!(EngagementAction::Like.to_string(), "like");
        assert_eq!(EngagementAction::Repost.to_string(), "repost");
    }

    #[test]
    fn snapshot_accessors_by_action() {
        let snap = EngagementSnapshot {
            liked: true,
            like_count: 6,
            reposted: false,
            repost_count: 2,
        };
        assert!(snap.flag(EngagementAction::Like));
        assert!(!snap.flag(EngagementAction::Repost));
        assert_eq!(snap.count(EngagementAction::Like), 6);
        assert_eq!(snap.count(EngagementAction::Repost), 2);
    }

    #[test]
    fn seed_builder() {
        let seed = EngagementSeed::new("p1")
            .likes(10)
            .liked(true)
            .reposts(3)
            .reposted(false);
        assert_eq!(seed.id.as_str(), "p1");
        assert_eq!(seed.like_count, 10);
        assert!(seed.liked);
        assert_eq!(seed.repost_count, 3);
        assert!(!seed.reposted);
    }
}
