//! 服务模块

pub mod conversation;
pub mod debounce;
pub mod session;
pub mod suggestions;

pub use conversation::{ConversationState, REFINED_QUERY_SUFFIX, translate_answer};
pub use debounce::{DEFAULT_DEBOUNCE, Debouncer, SequenceGuard};
pub use session::{
    Pagination, SearchSession, SearchSessionState, SessionOptions, create_search_session,
};
pub use suggestions::{SuggestionCoordinator, merge_suggestions};
