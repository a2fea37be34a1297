//! 搜索查询与过滤条件

use serde::{Deserialize, Serialize};

/// 搜索过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    /// 品牌
    pub brand: Option<String>,
    /// 轮毂直径（英寸）
    pub diameter: Option<u32>,
    /// 车型年份
    pub year: Option<u32>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.brand.is_none() && self.diameter.is_none() && self.year.is_none()
    }

    /// 合并过滤条件：`other` 中设置的字段覆盖当前值，未设置的保持不变
    pub fn merge(&mut self, other: SearchFilters) {
        if let Some(brand) = other.brand {
            let brand = brand.trim().to_string();
            self.brand = (!brand.is_empty()).then_some(brand);
        }
        if other.diameter.is_some() {
            self.diameter = other.diameter;
        }
        if other.year.is_some() {
            self.year = other.year;
        }
    }
}

/// 搜索请求
///
/// 每次调用构造一个新值，发出后不再修改。序列化结果即 `POST /tire_search`
/// 的请求体。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    #[serde(rename = "query")]
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diameter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<u32>,
    limit: usize,
    offset: usize,
    #[serde(rename = "use_llm")]
    use_assisted_parsing: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            brand: None,
            diameter: None,
            year: None,
            limit,
            offset: 0,
            use_assisted_parsing: false,
        }
    }

    pub fn with_filters(mut self, filters: &SearchFilters) -> Self {
        self.brand = filters.brand.clone();
        self.diameter = filters.diameter;
        self.year = filters.year;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_assisted_parsing(mut self, enabled: bool) -> Self {
        self.use_assisted_parsing = enabled;
        self
    }

    /// 同一查询的另一页
    pub fn page_at(&self, offset: usize) -> Self {
        self.clone().with_offset(offset)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    pub fn diameter(&self) -> Option<u32> {
        self.diameter
    }

    pub fn year(&self) -> Option<u32> {
        self.year
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn use_assisted_parsing(&self) -> bool {
        self.use_assisted_parsing
    }

    pub fn filters(&self) -> SearchFilters {
        SearchFilters {
            brand: self.brand.clone(),
            diameter: self.diameter,
            year: self.year,
        }
    }
}
