//! 问卷数据模型
//!
//! 候选列表、原始表单、校验后的提交以及写入表格的记录

use chrono::DateTime;
use chrono_tz::Tz;
use phf::{phf_ordered_set, OrderedSet};
use serde::{Deserialize, Serialize};

/// 表头（列顺序即写入顺序）
///
/// 早期版本的表头为 `Timestamp, Entry Name, Email, ..., Lead Lap Count`，
/// 遇到旧表头时按不一致处理并整行覆盖
pub const SHEET_HEADERS: [&str; 8] = [
    "Timestamp",
    "Email",
    "Entry Name",
    "Chevrolet Driver",
    "Ford Driver",
    "Toyota Driver",
    "Manufacturer",
    "Lead Lap",
];

/// 时间戳单元格格式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 领先圈完赛车辆数的取值范围
pub const LEAD_LAP_MIN: u32 = 1;
pub const LEAD_LAP_MAX: u32 = 37;

pub static CHEVROLET_DRIVERS: OrderedSet<&'static str> = phf_ordered_set! {
    "Ross Chastain",
    "Austin Dillon",
    "Kyle Larson",
    "Justin Haley",
    "Kyle Busch",
    "Chase Elliott",
    "Ty Dillon",
    "A.J. Allmendinger",
    "William Byron",
    "Ricky Stenhouse",
    "Alex Bowman",
    "Michael McDowell",
    "Carson Hocevar",
    "Shane Van Gisbergen",
};

pub static FORD_DRIVERS: OrderedSet<&'static str> = phf_ordered_set! {
    "Austin Cindric",
    "Noah Gragson",
    "Brad Keselowski",
    "Ryan Blaney",
    "Chris Buescher",
    "Josh Berry",
    "Joey Logano",
    "Todd Gilliland",
    "Zane Smith",
    "Cole Custer",
    "Ryan Preece",
};

pub static TOYOTA_DRIVERS: OrderedSet<&'static str> = phf_ordered_set! {
    "Denny Hamlin",
    "Chase Briscoe",
    "Christopher Bell",
    "Bubba Wallace",
    "Riley Herbst",
    "John Hunter Nemechek",
    "Erik Jones",
    "Tyler Reddick",
    "Ty Gibbs",
};

pub static MANUFACTURERS: OrderedSet<&'static str> = phf_ordered_set! {
    "Chevrolet",
    "Ford",
    "Toyota",
};

/// 单选题描述
#[derive(Debug)]
pub struct PickQuestion {
    /// 表单字段名
    pub field: &'static str,
    /// 页面标题
    pub title: &'static str,
    /// 出错提示中使用的名称
    pub label: &'static str,
    pub candidates: &'static OrderedSet<&'static str>,
}

pub static CHEVROLET_QUESTION: PickQuestion = PickQuestion {
    field: "q1",
    title: "1. Best Chevrolet Driver",
    label: "Chevrolet Driver",
    candidates: &CHEVROLET_DRIVERS,
};

pub static FORD_QUESTION: PickQuestion = PickQuestion {
    field: "q2",
    title: "2. Best Ford Driver",
    label: "Ford Driver",
    candidates: &FORD_DRIVERS,
};

pub static TOYOTA_QUESTION: PickQuestion = PickQuestion {
    field: "q3",
    title: "3. Best Toyota Driver",
    label: "Toyota Driver",
    candidates: &TOYOTA_DRIVERS,
};

pub static MANUFACTURER_QUESTION: PickQuestion = PickQuestion {
    field: "q4",
    title: "4. Which Manufacturer Wins the Race",
    label: "winning Manufacturer",
    candidates: &MANUFACTURERS,
};

/// 页面上的全部单选题（按显示顺序）
pub static PICK_QUESTIONS: [&PickQuestion; 4] = [
    &CHEVROLET_QUESTION,
    &FORD_QUESTION,
    &TOYOTA_QUESTION,
    &MANUFACTURER_QUESTION,
];

/// 厂商
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Manufacturer {
    Chevrolet,
    Ford,
    Toyota,
}

impl Manufacturer {
    /// 标准名称
    pub fn name(self) -> &'static str {
        match self {
            Manufacturer::Chevrolet => "Chevrolet",
            Manufacturer::Ford => "Ford",
            Manufacturer::Toyota => "Toyota",
        }
    }

    /// 从名称解析（精确匹配）
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "Chevrolet" => Some(Manufacturer::Chevrolet),
            "Ford" => Some(Manufacturer::Ford),
            "Toyota" => Some(Manufacturer::Toyota),
            _ => None,
        }
    }
}

impl std::fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 浏览器提交的原始表单
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyForm {
    pub entry_name: String,
    pub email: String,
    pub q1: Option<String>,
    pub q2: Option<String>,
    pub q3: Option<String>,
    pub q4: Option<String>,
    pub lead_lap: String,
}

impl SurveyForm {
    /// 按字段名取单选题的值
    pub fn pick(&self, field: &str) -> Option<&str> {
        let value = match field {
            "q1" => &self.q1,
            "q2" => &self.q2,
            "q3" => &self.q3,
            "q4" => &self.q4,
            _ => return None,
        };
        value.as_deref()
    }
}

/// 通过校验的提交
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub entry_name: String,
    pub email: String,
    pub chevrolet_driver: String,
    pub ford_driver: String,
    pub toyota_driver: String,
    pub manufacturer: Manufacturer,
    pub lead_lap: u32,
}

/// 单元格的值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(i64),
    Text(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// 写入表格的一行记录
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub timestamp: DateTime<Tz>,
    pub submission: ValidSubmission,
}

impl SubmissionRecord {
    pub fn new(submission: ValidSubmission, timestamp: DateTime<Tz>) -> Self {
        Self {
            timestamp,
            submission,
        }
    }

    /// 按 `SHEET_HEADERS` 的列顺序展开
    pub fn to_row(&self) -> Vec<CellValue> {
        let s = &self.submission;
        vec![
            CellValue::text(self.timestamp.format(TIMESTAMP_FORMAT).to_string()),
            CellValue::text(&s.email),
            CellValue::text(&s.entry_name),
            CellValue::text(&s.chevrolet_driver),
            CellValue::text(&s.ford_driver),
            CellValue::text(&s.toyota_driver),
            CellValue::text(s.manufacturer.name()),
            CellValue::Number(i64::from(s.lead_lap)),
        ]
    }
}
