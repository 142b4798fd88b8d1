use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reaction_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    /// Resulting reaction after the user presses `self`
    ///
    /// Pressing the active reaction clears it; pressing the opposite one
    /// swaps over.
    pub fn apply_to(self, current: Option<ReactionKind>) -> Option<ReactionKind> {
        match current {
            Some(existing) if existing == self => None,
            _ => Some(self),
        }
    }
}
