//! 表单校验 - 业务能力层
//!
//! 纯函数：同样的输入总是得到同样的结果，没有副作用。
//! 所有规则都会执行，错误按字段顺序全部收集

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::models::survey::{
    PickQuestion, CHEVROLET_QUESTION, FORD_QUESTION, LEAD_LAP_MAX, LEAD_LAP_MIN,
    MANUFACTURER_QUESTION, TOYOTA_QUESTION,
};
use crate::models::{Manufacturer, SurveyForm, ValidSubmission};

/// `local@domain.tld`：`@` 恰好一个，域名部分至少含一个 `.`
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").expect("邮箱正则无效"));

/// 校验原始表单
///
/// 成功时返回规范化后的提交（去除首尾空白、解析数字），
/// 失败时返回非空的错误列表
pub fn validate(form: &SurveyForm) -> Result<ValidSubmission, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let entry_name = form.entry_name.trim();
    if entry_name.is_empty() {
        errors.push(ValidationError::EmptyField {
            field: "entry_name",
            label: "Entry Name",
        });
    }

    let email = form.email.trim();
    if !is_valid_email(email) {
        errors.push(ValidationError::InvalidEmail);
    }

    let chevrolet = check_pick(form, &CHEVROLET_QUESTION, &mut errors);
    let ford = check_pick(form, &FORD_QUESTION, &mut errors);
    let toyota = check_pick(form, &TOYOTA_QUESTION, &mut errors);
    let manufacturer =
        check_pick(form, &MANUFACTURER_QUESTION, &mut errors).and_then(Manufacturer::from_name);

    let lead_lap = parse_lead_lap(&form.lead_lap);
    if lead_lap.is_none() {
        errors.push(ValidationError::OutOfRange {
            field: "lead_lap",
            min: LEAD_LAP_MIN,
            max: LEAD_LAP_MAX,
        });
    }

    match (chevrolet, ford, toyota, manufacturer, lead_lap) {
        (Some(chevrolet), Some(ford), Some(toyota), Some(manufacturer), Some(lead_lap))
            if errors.is_empty() =>
        {
            Ok(ValidSubmission {
                entry_name: entry_name.to_string(),
                email: email.to_string(),
                chevrolet_driver: chevrolet.to_string(),
                ford_driver: ford.to_string(),
                toyota_driver: toyota.to_string(),
                manufacturer,
                lead_lap,
            })
        }
        _ => Err(errors),
    }
}

/// 邮箱基本格式检查（空字符串视为不合法）
pub fn is_valid_email(email: &str) -> bool {
    !email.is_empty() && EMAIL_RE.is_match(email)
}

/// 解析领先圈车辆数，不是整数或超出范围时返回 `None`
pub fn parse_lead_lap(raw: &str) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|n| (LEAD_LAP_MIN..=LEAD_LAP_MAX).contains(n))
}

/// 候选列表成员检查
fn check_pick<'a>(
    form: &'a SurveyForm,
    question: &PickQuestion,
    errors: &mut Vec<ValidationError>,
) -> Option<&'a str> {
    match form.pick(question.field) {
        Some(value) if question.candidates.contains(value) => Some(value),
        _ => {
            errors.push(ValidationError::InvalidChoice {
                field: question.field,
                label: question.label,
            });
            None
        }
    }
}
