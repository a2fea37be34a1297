//! `POST /tire_search` 响应的线上格式及规范化
//!
//! 后端历史上返回过两种结构：
//! - 旧版多结果结构：`{results[], total, pagination, ...}`
//! - 扁平单车型结构：`{tire_sizes[], car_info, ...}`
//!
//! 以 `tire_sizes` 键是否存在区分两者，并在边界处统一转换为 [`SearchResponse`]。

use serde::Deserialize;
use tracing::warn;

use crate::error::{AppError, Result};
use crate::models::response::{ConversationPayload, FollowUpQuestion, SearchResponse};
use crate::models::tire::{SearchResultItem, TireSize, VehicleInfo};

/// 两种响应结构共有的字段
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConversationFields {
    pub suggestions: Vec<String>,
    pub conversation_mode: Option<bool>,
    pub follow_up_questions: Vec<FollowUpQuestion>,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawPagination {
    pub offset: usize,
    pub limit: usize,
    pub has_more: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RawResultItem {
    pub id: i64,
    #[serde(alias = "brand")]
    pub brand_name: String,
    #[serde(alias = "model")]
    pub model_name: String,
    #[serde(default)]
    pub year_from: Option<u32>,
    #[serde(default)]
    pub year_to: Option<u32>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub tire_sizes: Vec<TireSize>,
    #[serde(default, alias = "score")]
    pub match_score: Option<f32>,
}

impl From<RawResultItem> for SearchResultItem {
    fn from(raw: RawResultItem) -> Self {
        let year_from = raw.year_from.or(raw.year).unwrap_or_default();
        let year_to = raw.year_to.or(raw.year).unwrap_or(year_from);
        SearchResultItem {
            id: raw.id,
            brand_name: raw.brand_name,
            model_name: raw.model_name,
            year_from,
            year_to,
            tire_sizes: raw.tire_sizes,
            match_score: raw.match_score,
        }
    }
}

/// 旧版多结果结构
#[derive(Debug, Deserialize)]
pub struct LegacyResponse {
    #[serde(default)]
    pub results: Vec<RawResultItem>,
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub pagination: Option<RawPagination>,
    #[serde(flatten)]
    pub conversation: ConversationFields,
}

/// 扁平单车型结构
#[derive(Debug, Deserialize)]
pub struct FlatVehicleResponse {
    pub tire_sizes: Vec<TireSize>,
    #[serde(default)]
    pub car_info: Option<VehicleInfo>,
    #[serde(flatten)]
    pub conversation: ConversationFields,
}

/// 显式标记的响应联合体
#[derive(Debug)]
pub enum RawSearchResponse {
    Legacy(LegacyResponse),
    FlatVehicle(FlatVehicleResponse),
}

impl RawSearchResponse {
    /// 解析响应体
    pub fn parse(body: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| AppError::Protocol(format!("响应不是合法 JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(AppError::Protocol("响应必须是 JSON 对象".to_string()));
        }

        if value.get("tire_sizes").is_some() {
            serde_json::from_value(value)
                .map(RawSearchResponse::FlatVehicle)
                .map_err(|e| AppError::Protocol(format!("扁平响应结构无效: {}", e)))
        } else {
            serde_json::from_value(value)
                .map(RawSearchResponse::Legacy)
                .map_err(|e| AppError::Protocol(format!("旧版响应结构无效: {}", e)))
        }
    }

    /// 转换为规范化的 [`SearchResponse`]
    pub fn normalize(self, requested_offset: usize) -> SearchResponse {
        match self {
            RawSearchResponse::Legacy(raw) => normalize_legacy(raw, requested_offset),
            RawSearchResponse::FlatVehicle(raw) => normalize_flat(raw),
        }
    }
}

/// 解析并规范化，供网关使用
pub fn decode_search_response(body: &str, requested_offset: usize) -> Result<SearchResponse> {
    Ok(RawSearchResponse::parse(body)?.normalize(requested_offset))
}

fn normalize_legacy(raw: LegacyResponse, requested_offset: usize) -> SearchResponse {
    let received = raw.results.len();
    let items: Vec<SearchResultItem> = raw
        .results
        .into_iter()
        .map(SearchResultItem::from)
        .filter(|item| {
            let valid = item.is_valid();
            if !valid {
                warn!(id = item.id, "Dropping result item that violates size/year invariants");
            }
            valid
        })
        .collect();

    let total = raw.total.unwrap_or(received).max(items.len());
    let offset = raw
        .pagination
        .as_ref()
        .map(|p| p.offset)
        .unwrap_or(requested_offset);
    let has_more = raw
        .pagination
        .as_ref()
        .and_then(|p| p.has_more)
        .unwrap_or(offset + received < total);

    SearchResponse {
        items,
        total,
        has_more,
        suggestions: raw.conversation.suggestions.clone(),
        conversation: conversation_payload(raw.conversation),
        vehicle: None,
    }
}

fn normalize_flat(raw: FlatVehicleResponse) -> SearchResponse {
    let sizes: Vec<TireSize> = raw
        .tire_sizes
        .into_iter()
        .filter(|size| {
            let valid = size.is_valid();
            if !valid {
                warn!(%size, "Dropping tire size with zero dimension");
            }
            valid
        })
        .collect();

    let vehicle = raw.car_info;
    let items = match (&vehicle, sizes.is_empty()) {
        (_, true) => Vec::new(),
        (Some(car), false) => vec![SearchResultItem {
            id: vehicle_id(car),
            brand_name: car.brand.clone(),
            model_name: car.model.clone(),
            year_from: car.year.unwrap_or_default(),
            year_to: car.year.unwrap_or_default(),
            tire_sizes: sizes,
            match_score: None,
        }],
        (None, false) => vec![SearchResultItem {
            id: vehicle_id(&VehicleInfo::default()),
            brand_name: String::new(),
            model_name: String::new(),
            year_from: 0,
            year_to: 0,
            tire_sizes: sizes,
            match_score: None,
        }],
    };

    SearchResponse {
        total: items.len(),
        items,
        has_more: false,
        suggestions: raw.conversation.suggestions.clone(),
        conversation: conversation_payload(raw.conversation),
        vehicle,
    }
}

fn conversation_payload(fields: ConversationFields) -> Option<ConversationPayload> {
    let active = fields
        .conversation_mode
        .unwrap_or(!fields.follow_up_questions.is_empty());

    if !active && fields.follow_up_questions.is_empty() {
        return None;
    }

    Some(ConversationPayload {
        active,
        message: fields.message.unwrap_or_default(),
        follow_up_questions: fields.follow_up_questions,
    })
}

/// 扁平结构没有 ID，由 brand|model|year 计算稳定的 FNV-1a 哈希
fn vehicle_id(car: &VehicleInfo) -> i64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let key = format!(
        "{}|{}|{}",
        car.brand.to_lowercase(),
        car.model.to_lowercase(),
        car.year.unwrap_or_default()
    );
    let hash = key
        .bytes()
        .fold(OFFSET, |acc, b| (acc ^ u64::from(b)).wrapping_mul(PRIME));
    (hash & i64::MAX as u64) as i64
}
