use serde::{Deserialize, Serialize};
use std::fmt;

/// 轮胎规格类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SizeKind {
    /// 原厂规格
    #[default]
    #[serde(alias = "oem", alias = "factory")]
    Stock,
    /// 可选规格
    #[serde(alias = "alternative", alias = "replacement")]
    Optional,
}

/// 轴位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axle {
    Front,
    Rear,
    #[serde(alias = "both")]
    All,
}

/// 轮胎规格，例如 205/55 R16
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TireSize {
    /// 胎面宽度（毫米）
    pub width: u32,
    /// 扁平比（%）
    #[serde(alias = "profile")]
    pub height: u32,
    /// 轮毂直径（英寸）
    pub diameter: u32,
    /// 规格类型
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: SizeKind,
    /// 轴位
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axle: Option<Axle>,
}

impl TireSize {
    pub fn new(width: u32, height: u32, diameter: u32) -> Self {
        Self {
            width,
            height,
            diameter,
            kind: SizeKind::Stock,
            axle: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.diameter > 0
    }
}

impl fmt::Display for TireSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} R{}", self.width, self.height, self.diameter)
    }
}

/// 搜索结果项：一个车型的轮胎配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub id: i64,
    pub brand_name: String,
    pub model_name: String,
    pub year_from: u32,
    pub year_to: u32,
    pub tire_sizes: Vec<TireSize>,
    pub match_score: Option<f32>,
}

impl SearchResultItem {
    /// 检查不变量：所有规格有效且 `year_from <= year_to`
    pub fn is_valid(&self) -> bool {
        self.year_from <= self.year_to && self.tire_sizes.iter().all(TireSize::is_valid)
    }

    /// 标题，例如 "BMW 3 Series (2019–2022)"
    pub fn title(&self) -> String {
        if self.year_from == self.year_to {
            format!("{} {} ({})", self.brand_name, self.model_name, self.year_from)
        } else {
            format!(
                "{} {} ({}–{})",
                self.brand_name, self.model_name, self.year_from, self.year_to
            )
        }
    }

    pub fn stock_sizes(&self) -> impl Iterator<Item = &TireSize> {
        self.tire_sizes
            .iter()
            .filter(|s| s.kind == SizeKind::Stock)
    }
}

/// 车辆信息（扁平响应中的 `car_info`）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleInfo {
    pub brand: String,
    pub model: String,
    pub year: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tire_size_display_and_validity() {
        let size = TireSize::new(205, 55, 16);
        assert_eq!(size.to_string(), "205/55 R16");
        assert!(size.is_valid());
        assert!(!TireSize::new(0, 55, 16).is_valid());
    }

    #[test]
    fn test_tire_size_wire_aliases() {
        let size: TireSize = serde_json::from_str(
            r#"{"width": 225, "profile": 45, "diameter": 17, "type": "optional", "axle": "rear"}"#,
        )
        .unwrap();
        assert_eq!(size.height, 45);
        assert_eq!(size.kind, SizeKind::Optional);
        assert_eq!(size.axle, Some(Axle::Rear));

        let size: TireSize =
            serde_json::from_str(r#"{"width": 225, "height": 45, "diameter": 17}"#).unwrap();
        assert_eq!(size.kind, SizeKind::Stock);
        assert!(size.axle.is_none());
    }

    #[test]
    fn test_item_invariants() {
        let mut item = SearchResultItem {
            id: 1,
            brand_name: "BMW".into(),
            model_name: "3 Series".into(),
            year_from: 2019,
            year_to: 2022,
            tire_sizes: vec![TireSize::new(225, 45, 17)],
            match_score: None,
        };
        assert!(item.is_valid());
        assert_eq!(item.title(), "BMW 3 Series (2019–2022)");

        item.year_from = 2023;
        assert!(!item.is_valid());
    }
}
