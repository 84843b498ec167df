#![forbid(unsafe_code)]

//! Card data: the author line, body text, and feed metadata a post card
//! renders around its engagement controls.

use web_time::SystemTime;

use feedloom_engage::PostId;

/// Author identity as the card displays it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuthorMeta {
    handle: String,
    display_name: Option<String>,
}

impl AuthorMeta {
    /// Author with a bare handle.
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            display_name: None,
        }
    }

    /// Set the optional display name.
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// The account handle.
    #[must_use]
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// The name the card shows: display name when set, handle otherwise.
    #[must_use]
    pub fn shown_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.handle)
    }
}

/// One post as the feed card renders it.
///
/// Engagement flags and counters live in the engagement engine, keyed by
/// [`id`](Self::id); the card holds everything else.
#[derive(Clone, Debug)]
pub struct PostCard {
    id: PostId,
    author: AuthorMeta,
    text: String,
    indexed_at: SystemTime,
    reply_count: u32,
    reposted_by: Option<AuthorMeta>,
}

impl PostCard {
    /// A card with no replies and no repost attribution.
    #[must_use]
    pub fn new(id: impl Into<PostId>, author: AuthorMeta, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author,
            text: text.into(),
            indexed_at: SystemTime::now(),
            reply_count: 0,
            reposted_by: None,
        }
    }

    /// Set the time the feed indexed this post.
    #[must_use]
    pub fn indexed_at(mut self, at: SystemTime) -> Self {
        self.indexed_at = at;
        self
    }

    /// Set the reply count shown on the reply control.
    #[must_use]
    pub fn replies(mut self, count: u32) -> Self {
        self.reply_count = count;
        self
    }

    /// Mark this card as reaching the feed through someone's repost.
    #[must_use]
    pub fn reposted_by(mut self, who: AuthorMeta) -> Self {
        self.reposted_by = Some(who);
        self
    }

    /// The post's stable id, also the engagement engine key.
    #[must_use]
    pub fn id(&self) -> &PostId {
        &self.id
    }

    /// The post's author.
    #[must_use]
    pub fn author(&self) -> &AuthorMeta {
        &self.author
    }

    /// The body text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// When the feed indexed the post.
    #[must_use]
    pub fn indexed(&self) -> SystemTime {
        self.indexed_at
    }

    /// Reply count for the reply control.
    #[must_use]
    pub fn reply_count(&self) -> u32 {
        self.reply_count
    }

    /// Who reposted this into the viewer's feed, if anyone.
    #[must_use]
    pub fn reposter(&self) -> Option<&AuthorMeta> {
        self.reposted_by.as_ref()
    }

    /// Banner line above the card when the post arrived via a repost.
    #[must_use]
    pub fn repost_banner(&self) -> Option<String> {
        self.reposted_by
            .as_ref()
            .map(|who| format!("Reposted by {}", who.shown_name()))
    }
}
