#![forbid(unsafe_code)]

//! Engagement control styling.
//!
//! The card's icon row shows one control per engagement action. Each
//! control has a highlight state (filled red heart vs. outline, green
//! repost arrows vs. neutral) and a count. This module reduces an
//! [`EngagementSnapshot`] to exactly that, so the render layer never
//! inspects engagement flags itself.

use feedloom_engage::{EngagementAction, EngagementSnapshot};

/// Highlight state of an engagement control's icon.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ControlStyle {
    /// Neutral icon: the viewer has no record for this action.
    #[default]
    Inactive,
    /// Highlighted icon: the viewer's record exists (optimistically).
    Active,
}

/// What one engagement control renders.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ControlState {
    /// Icon highlight.
    pub style: ControlStyle,
    /// Count displayed next to the icon.
    pub count: u32,
}

/// The control state for one action under the given snapshot.
#[must_use]
pub fn control(snapshot: &EngagementSnapshot, action: EngagementAction) -> ControlState {
    ControlState {
        style: if snapshot.flag(action) {
            ControlStyle::Active
        } else {
            ControlStyle::Inactive
        },
        count: snapshot.count(action),
    }
}
