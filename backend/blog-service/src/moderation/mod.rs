//! Content moderation core
//!
//! Pure logic with no database access: typed targets, the visibility
//! filter, reply thread assembly, report rules and mute/block registries.

pub mod registry;
pub mod reply_tree;
pub mod report;
pub mod target;
pub mod visibility;

pub use registry::{BlockEntry, BlockRegistry, MuteEntry, MuteRegistry, Toggle};
pub use reply_tree::{build_reply_tree, Threaded, TreeNode, MAX_REPLY_DEPTH};
pub use report::{ModerationAction, ReportDraft, ReviewPlan};
pub use target::{Target, TargetType};
pub use visibility::{Moderated, ViewerContext};
