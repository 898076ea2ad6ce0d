// src/extractors/catalog.rs
//! Ready-made patterns that rule authors can paste into `pattern`,
//! `extractPattern` or a regex rule.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Date,
    Amount,
    Number,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatternTemplate {
    pub key: &'static str,
    pub name: &'static str,
    pub pattern: &'static str,
    pub example: &'static str,
    pub kind: PatternKind,
}

const fn template(
    key: &'static str,
    name: &'static str,
    pattern: &'static str,
    example: &'static str,
    kind: PatternKind,
) -> PatternTemplate {
    PatternTemplate {
        key,
        name,
        pattern,
        example,
        kind,
    }
}

static COMMON_PATTERNS: &[PatternTemplate] = &[
    // Dates
    template("DATE_YYYY_MM_DD", "日期(yyyy-MM-dd)", r"\d{4}-\d{1,2}-\d{1,2}", "2024-10-09", PatternKind::Date),
    template("DATE_CHINESE", "日期(中文)", r"\d{4}年\d{1,2}月\d{1,2}日", "2024年10月9日", PatternKind::Date),
    template("DATE_SLASH", "日期(斜线)", r"\d{4}/\d{1,2}/\d{1,2}", "2024/10/09", PatternKind::Date),
    // Amounts
    template("AMOUNT_DECIMAL", "金额(小数)", r"\d+(?:,\d{3})*(?:\.\d{2})?", "100,000.00", PatternKind::Amount),
    template("AMOUNT_CHINESE", "金额(中文)", r"[壹贰叁肆伍陆柒捌玖拾佰仟万亿]+元", "壹佰万元", PatternKind::Amount),
    template(
        "CURRENCY",
        "币种",
        r"(?:人民币|美元|欧元|日元|港币|CNY|USD|EUR|JPY|HKD)",
        "人民币",
        PatternKind::String,
    ),
    // Identifiers
    template("CONTRACT_NUMBER", "合同编号(通用)", r"[A-Z]{2,4}\d{6,12}", "HT20240001", PatternKind::String),
    template("ID_NUMBER", "编号(数字字母组合)", r"[A-Z0-9-]{6,20}", "ABC-123-456", PatternKind::String),
    template(
        "COMPANY_NAME_GENERAL",
        "公司名称(中英文通用)",
        r"[\x{4e00}-\x{9fa5}A-Za-z0-9&（）()·\s,.'-]{2,120}(?:公司|企业|集团|有限责任公司|股份有限公司|合作社|事务所|基金会|协会|联合会|委员会|管理局|局|机关|人民政府|政府|人民法院|法院|人民检察院|检察院|党委|党组|办事处|中心|研究院|学院|大学|银行|交易所|证券|保险|Co\.?\s*,?\s*Ltd\.?|Co\.?\s*,?\s*Limited|Company|Corporation|Inc\.?|LLC|Limited|Ltd\.?|Agency|Association|Foundation|Institute|University|Bank|Committee|Government|Authority|Administration|Bureau|Council|Union|Society|Office)",
        "北京某某科技有限公司",
        PatternKind::String,
    ),
    // People and contact details
    template("CHINESE_NAME", "中文姓名", r"[\x{4e00}-\x{9fa5}]{2,4}", "张三", PatternKind::String),
    template("MOBILE_PHONE", "手机号", r"\d{7,12}", "13800138000", PatternKind::String),
    template("PHONE_NUMBER", "固定电话", r"(?:0\d{2,3}-)?\d{7,8}", "010-12345678", PatternKind::String),
    template(
        "EMAIL",
        "电子邮箱",
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}",
        "example@company.com",
        PatternKind::String,
    ),
    template(
        "ADDRESS",
        "地址",
        r"[\x{4e00}-\x{9fa5}]{2,}[省市区县][\x{4e00}-\x{9fa5}\d号室栋楼单元-]+",
        "北京市海淀区XX街道XX号",
        PatternKind::String,
    ),
    // Numbers
    template("PERCENTAGE", "百分比", r"\d+(?:\.\d+)?%", "13.5%", PatternKind::Number),
    template("INTEGER", "整数", r"\d+", "12345", PatternKind::Number),
    template("DECIMAL", "小数", r"\d+\.\d+", "123.45", PatternKind::Number),
    // Free text
    template("TEXT_UNTIL_PUNCT", "文本(到标点)", r"[^，。；！？\n]+", "任意文本直到标点", PatternKind::String),
    template("TEXT_UNTIL_NEWLINE", "文本(到换行)", r"[^\n]+", "任意文本直到换行", PatternKind::String),
    template("TEXT_CHINESE", "中文文本", r"[\x{4e00}-\x{9fa5}]+", "中文文本", PatternKind::String),
    template(
        "TEXT_WITH_SPACE",
        "文本(含空格)",
        r"[\x{4e00}-\x{9fa5}a-zA-Z0-9\s]+",
        "中文 English 123",
        PatternKind::String,
    ),
    template("TIME_PERIOD", "时间段", r"\d+(?:年|个月|月|天|日)", "3年", PatternKind::String),
];

/// Every template, in display order.
pub fn common_patterns() -> &'static [PatternTemplate] {
    COMMON_PATTERNS
}

pub fn find(key: &str) -> Option<&'static PatternTemplate> {
    COMMON_PATTERNS.iter().find(|t| t.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::pattern::{PatternBudget, PatternFlags};
    use std::collections::HashSet;

    #[test]
    fn test_every_pattern_matches_its_example() {
        let budget = PatternBudget::default();
        for t in common_patterns() {
            let re = budget.compile(t.pattern, PatternFlags::default()).unwrap();
            assert!(re.is_match(t.example), "{} does not match '{}'", t.key, t.example);
        }
    }

    #[test]
    fn test_keys_are_unique() {
        let keys: HashSet<_> = common_patterns().iter().map(|t| t.key).collect();
        assert_eq!(keys.len(), common_patterns().len());
    }

    #[test]
    fn test_find() {
        assert_eq!(find("TIME_PERIOD").unwrap().example, "3年");
        assert!(find("NOPE").is_none());
    }
}
