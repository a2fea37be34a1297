//! 追问对话
//!
//! 服务端无法确定轮胎参数时返回 `conversation_mode` 和一组追问。
//! 这里收集用户的回答，并把已知品牌、车型和回答拼成新的查询文本。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{ConversationPayload, FollowUpQuestion, SearchFilters, VehicleInfo};

/// 拼接查询的固定后缀
pub const REFINED_QUERY_SUFFIX: &str = "шины";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// 对话状态
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationState {
    pub active: bool,
    pub message: String,
    pub questions: Vec<FollowUpQuestion>,
    pub collected_answers: BTreeMap<String, String>,
    pub known_brand: Option<String>,
    pub known_model: Option<String>,
}

impl ConversationState {
    /// 用服务端的追问载荷激活对话
    ///
    /// 已处于活跃状态时保留之前收集的回答，问题列表被替换。
    pub fn activate(
        &mut self,
        payload: &ConversationPayload,
        vehicle: Option<&VehicleInfo>,
        filters: &SearchFilters,
    ) {
        if !payload.active {
            self.reset();
            return;
        }
        if !self.active {
            self.collected_answers.clear();
        }

        self.active = true;
        self.message = payload.message.clone();
        self.questions = payload.follow_up_questions.clone();

        let vehicle_brand = vehicle.map(|v| v.brand.as_str());
        let vehicle_model = vehicle.map(|v| v.model.as_str());
        if let Some(brand) = first_known(&self.questions, "brand", vehicle_brand, filters.brand.as_deref()) {
            self.known_brand = Some(brand);
        }
        if let Some(model) = first_known(&self.questions, "model", vehicle_model, None) {
            self.known_model = Some(model);
        }

        debug!(
            questions = self.questions.len(),
            brand = ?self.known_brand,
            model = ?self.known_model,
            "Conversation activated"
        );
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 记录回答并返回拼好的查询；对话未激活时返回 `None`
    pub fn record_answer(&mut self, field: &str, value: &str) -> Option<String> {
        if !self.active {
            return None;
        }
        let field = field.trim();
        if field.is_empty() {
            return None;
        }

        self.collected_answers
            .insert(field.to_string(), value.trim().to_string());
        Some(self.refined_query())
    }

    /// 尚未回答的问题
    pub fn pending_questions(&self) -> impl Iterator<Item = &FollowUpQuestion> {
        self.questions
            .iter()
            .filter(|q| !self.collected_answers.contains_key(&q.field))
    }

    pub fn is_complete(&self) -> bool {
        self.active && self.pending_questions().next().is_none()
    }

    /// 品牌 + 车型 + 回答（问题顺序，其余字段按字母序）+ 后缀
    pub fn refined_query(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        parts.extend(self.known_brand.clone());
        parts.extend(self.known_model.clone());

        for question in &self.questions {
            if let Some(value) = self.collected_answers.get(&question.field) {
                parts.push(translate_answer(&question.field, value, Some(question)));
            }
        }
        for (field, value) in &self.collected_answers {
            if !self.questions.iter().any(|q| &q.field == field) {
                parts.push(translate_answer(field, value, None));
            }
        }
        parts.push(REFINED_QUERY_SUFFIX.to_string());

        normalize_whitespace(&parts.join(" "))
    }
}

fn first_known(
    questions: &[FollowUpQuestion],
    key: &str,
    vehicle: Option<&str>,
    filter: Option<&str>,
) -> Option<String> {
    questions
        .iter()
        .find_map(|q| q.context_str(key))
        .or(vehicle.map(str::trim).filter(|s| !s.is_empty()))
        .or(filter.map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string)
}

/// 把回答翻译成查询用词
pub fn translate_answer(field: &str, value: &str, question: Option<&FollowUpQuestion>) -> String {
    let normalized = value.trim().to_lowercase();
    if let Some(word) = known_translation(field, &normalized) {
        return word.to_string();
    }

    if field == "diameter" {
        let digits = normalized.trim_start_matches('r');
        if let Ok(inches) = digits.parse::<u32>() {
            return format!("R{inches}");
        }
    }

    question
        .and_then(|q| q.label_for(value.trim()))
        .unwrap_or(value.trim())
        .to_string()
}

/// (字段, 取值) -> 查询用词
fn known_translation(field: &str, value: &str) -> Option<&'static str> {
    let word = match (field, value) {
        ("seasonality" | "season", "winter") => "зимние",
        ("seasonality" | "season", "summer") => "летние",
        ("seasonality" | "season", "all_season" | "all-season") => "всесезонные",
        ("studded", "true") => "шипованные",
        ("studded", "false") => "нешипованные",
        ("run_flat", "true") => "RunFlat",
        ("run_flat", "false") => "",
        _ => return None,
    };
    Some(word)
}

fn normalize_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerOption;
    use rstest::rstest;
    use serde_json::json;

    fn question(field: &str, options: &[(&str, &str)]) -> FollowUpQuestion {
        FollowUpQuestion {
            field: field.to_string(),
            question: format!("{field}?"),
            options: options
                .iter()
                .map(|(value, label)| AnswerOption {
                    value: value.to_string(),
                    label: label.to_string(),
                })
                .collect(),
            context: BTreeMap::new(),
        }
    }

    fn payload(questions: Vec<FollowUpQuestion>) -> ConversationPayload {
        ConversationPayload {
            active: true,
            message: "Уточните параметры".to_string(),
            follow_up_questions: questions,
        }
    }

    #[test]
    fn test_winter_answer_refines_query() {
        let mut state = ConversationState::default();
        state.activate(
            &payload(vec![question("seasonality", &[("winter", "зимние")])]),
            None,
            &SearchFilters::default(),
        );
        assert!(state.active);

        let refined = state.record_answer("seasonality", "winter").unwrap();
        assert!(refined.contains("зимние"));
        assert!(refined.ends_with(REFINED_QUERY_SUFFIX));
        assert!(state.is_complete());
    }

    #[test]
    fn test_brand_and_model_priority() {
        let mut q = question("diameter", &[]);
        q.context.insert("brand".into(), json!("Toyota"));

        let vehicle = VehicleInfo {
            brand: "Lexus".into(),
            model: "RX".into(),
            year: Some(2019),
        };
        let filters = SearchFilters {
            brand: Some("Kia".into()),
            ..Default::default()
        };

        let mut state = ConversationState::default();
        state.activate(&payload(vec![q]), Some(&vehicle), &filters);
        assert_eq!(state.known_brand.as_deref(), Some("Toyota"));
        assert_eq!(state.known_model.as_deref(), Some("RX"));

        assert_eq!(
            state.record_answer("diameter", "17").unwrap(),
            "Toyota RX R17 шины"
        );
    }

    #[test]
    fn test_filters_fill_missing_brand() {
        let filters = SearchFilters {
            brand: Some("Kia".into()),
            ..Default::default()
        };
        let mut state = ConversationState::default();
        state.activate(&payload(vec![question("season", &[])]), None, &filters);

        assert_eq!(state.record_answer("season", "summer").unwrap(), "Kia летние шины");
    }

    #[test]
    fn test_answers_in_question_order_then_extra_fields() {
        let mut state = ConversationState::default();
        state.activate(
            &payload(vec![
                question("studded", &[]),
                question("seasonality", &[]),
            ]),
            None,
            &SearchFilters::default(),
        );

        state.record_answer("width", "205");
        state.record_answer("seasonality", "winter");
        let refined = state.record_answer("studded", "true").unwrap();
        assert_eq!(refined, "шипованные зимние 205 шины");
    }

    #[test]
    fn test_inactive_conversation_ignores_answers() {
        let mut state = ConversationState::default();
        assert!(state.record_answer("seasonality", "winter").is_none());

        state.activate(&payload(vec![question("season", &[])]), None, &SearchFilters::default());
        state.record_answer("season", "winter");
        state.activate(&ConversationPayload::default(), None, &SearchFilters::default());
        assert_eq!(state, ConversationState::default());
    }

    #[test]
    fn test_follow_up_round_keeps_answers() {
        let mut state = ConversationState::default();
        let filters = SearchFilters::default();
        state.activate(&payload(vec![question("season", &[])]), None, &filters);
        state.record_answer("season", "winter");

        state.activate(&payload(vec![question("diameter", &[])]), None, &filters);
        assert_eq!(state.pending_questions().count(), 1);
        assert_eq!(state.record_answer("diameter", "R16").unwrap(), "R16 зимние шины");
    }

    #[rstest]
    #[case("seasonality", "Winter", "зимние")]
    #[case("season", "all-season", "всесезонные")]
    #[case("seasonality", "all_season", "всесезонные")]
    #[case("studded", "false", "нешипованные")]
    #[case("run_flat", "true", "RunFlat")]
    #[case("diameter", "16", "R16")]
    #[case("diameter", "r18", "R18")]
    #[case("width", "225", "225")]
    fn test_translate_answer(#[case] field: &str, #[case] value: &str, #[case] expected: &str) {
        assert_eq!(translate_answer(field, value, None), expected);
    }

    #[test]
    fn test_translate_falls_back_to_option_label() {
        let q = question("load_index", &[("91", "91 (615 кг)")]);
        assert_eq!(translate_answer("load_index", "91", Some(&q)), "91 (615 кг)");
        assert_eq!(translate_answer("load_index", "94", Some(&q)), "94");
    }

    #[test]
    fn test_whitespace_normalized() {
        let mut state = ConversationState::default();
        state.activate(&payload(vec![question("note", &[])]), None, &SearchFilters::default());
        let refined = state.record_answer("note", "  очень   тихие ").unwrap();
        assert_eq!(refined, "очень тихие шины");
    }
}
