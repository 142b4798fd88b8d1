/// Database access shared by several services
///
/// Reactions and user relations are touched from posts, comments, replies
/// and the block flow, so their queries live here rather than in one service.
pub mod reaction_repo;
pub mod relation_repo;

pub use reaction_repo::Reactable;
