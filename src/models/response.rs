//! 规范化后的搜索响应

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::tire::{SearchResultItem, VehicleInfo};

/// 追问选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub value: String,
    pub label: String,
}

/// 追问问题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    /// 答案对应的字段，例如 "seasonality"
    pub field: String,
    /// 问题文本
    pub question: String,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    /// 附加上下文（例如已识别的 brand / model）
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl FollowUpQuestion {
    /// 查找选项标签
    pub fn label_for(&self, value: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
    }

    /// 读取字符串类型的上下文值
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// 对话（追问）载荷
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationPayload {
    pub active: bool,
    pub message: String,
    pub follow_up_questions: Vec<FollowUpQuestion>,
}

/// 搜索响应
///
/// 不变量：`items.len() <= total`。存在活跃的 `conversation` 时 `items`
/// 可以为空，此时查询并未穷尽。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<SearchResultItem>,
    pub total: usize,
    pub has_more: bool,
    pub suggestions: Vec<String>,
    pub conversation: Option<ConversationPayload>,
    pub vehicle: Option<VehicleInfo>,
}

impl SearchResponse {
    pub fn is_conversation(&self) -> bool {
        self.conversation.as_ref().is_some_and(|c| c.active)
    }
}

/// 联想来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Remote,
    History,
}

/// 输入联想项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TireSuggestion {
    pub text: String,
    pub source: SuggestionSource,
}

impl TireSuggestion {
    pub fn remote(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: SuggestionSource::Remote,
        }
    }

    pub fn history(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: SuggestionSource::History,
        }
    }
}

/// 搜索统计（`GET /tire_search/statistics`）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchStatistics {
    pub total_searches: u64,
    pub unique_queries: u64,
    pub average_results: f64,
    pub top_brands: Vec<String>,
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
}
