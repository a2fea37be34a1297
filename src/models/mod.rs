//! 数据模型模块

pub mod query;
pub mod response;
pub mod tire;
pub mod wire;

pub use query::{SearchFilters, SearchQuery};
pub use response::{
    AnswerOption, ConversationPayload, FollowUpQuestion, SearchResponse, SearchStatistics,
    SuggestionSource, TireSuggestion,
};
pub use tire::{Axle, SearchResultItem, SizeKind, TireSize, VehicleInfo};
pub use wire::{RawSearchResponse, decode_search_response};
