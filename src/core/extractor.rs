use crate::domain::model::ExtractedFields;
use regex::Regex;
use std::sync::LazyLock;

// 姓名：2 到 4 個首字母大寫的單字，只在同一行內比對
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+){1,3}").unwrap());

// 日期：D{1,2}[/-]D{1,2}[/-]DDDD，不判斷日/月順序
static BIRTHDATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}[/-]\d{1,2}[/-]\d{4}").unwrap());

static ID_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2,3}[- ]\d{3,4}[- ]\d{3,4}").unwrap());

/// Best-effort field mining over raw OCR text. Each field takes the first
/// match of its own pattern; no match leaves the field unset.
pub fn extract_fields(text: &str) -> ExtractedFields {
    ExtractedFields {
        name: first_match(&NAME_RE, text),
        birthdate: first_match(&BIRTHDATE_RE, text),
        id_number: first_match(&ID_NUMBER_RE, text),
    }
}

fn first_match(re: &Regex, text: &str) -> Option<String> {
    re.find(text).map(|m| m.as_str().to_string())
}
