#![forbid(unsafe_code)]

//! feedloom-card: the post-card view model.
//!
//! Everything a feed card shows besides the live engagement state: author
//! line, body, relative timestamp, repost attribution banner, and the
//! reduction of an engagement snapshot to icon highlight + count. The live
//! state itself comes from `feedloom-engage`, keyed by the card's post id.
//!
//! ```
//! use feedloom_card::{AuthorMeta, ControlStyle, PostCard, control};
//! use feedloom_engage::{EngagementAction, EngagementSnapshot};
//!
//! let card = PostCard::new("p1", AuthorMeta::new("alice.test"), "hello").replies(2);
//! assert_eq!(card.reply_count(), 2);
//!
//! let snap = EngagementSnapshot { liked: true, like_count: 6, ..Default::default() };
//! assert_eq!(control(&snap, EngagementAction::Like).style, ControlStyle::Active);
//! ```

pub mod card;
pub mod controls;
pub mod reply;
pub mod timeago;

pub use card::{AuthorMeta, PostCard};
pub use controls::{ControlState, ControlStyle, control};
pub use reply::ReplyDispatch;
pub use timeago::ago;
