#![forbid(unsafe_code)]

//! Reply dispatch.
//!
//! Unlike like and repost, reply has no local state machine: tapping the
//! reply control hands the post id to an injected composer hook and the
//! card is done with it. Nothing is read back and nothing is pending.

use tracing::debug;

use feedloom_engage::PostId;

type ComposerHook = Box<dyn Fn(&PostId)>;

/// Fire-once bridge from the reply control to the host's composer.
pub struct ReplyDispatch {
    open_composer: ComposerHook,
}

impl ReplyDispatch {
    /// Wrap the host's composer entry point.
    #[must_use]
    pub fn new(open_composer: impl Fn(&PostId) + 'static) -> Self {
        Self {
            open_composer: Box::new(open_composer),
        }
    }

    /// Open the composer targeting `post`. Invokes the hook exactly once.
    pub fn reply_to(&self, post: &PostId) {
        debug!(%post, "opening composer");
        (self.open_composer)(post);
    }
}

impl std::fmt::Debug for ReplyDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyDispatch").finish_non_exhaustive()
    }
}
