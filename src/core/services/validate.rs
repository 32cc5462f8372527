use crate::core::models::inquiry::InquiryCreate;
use crate::core::models::survey::{SurveyCreate, CATEGORIES};
use crate::error::Error;

pub const MAX_TITLE_LEN: usize = 120;
pub const MAX_COMMENT_LEN: usize = 1000;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 12;

/// Screened before anything reaches the store.
const NG_WORDS: &[&str] = &["死ね", "殺す", "バカ野郎", "spam-link.example"];

pub fn screen_ng_words(text: &str) -> Result<(), Error> {
    for word in NG_WORDS {
        if text.contains(word) {
            return Err(Error::Validation("使用できない言葉が含まれています".into()));
        }
    }
    Ok(())
}

pub fn validate_survey(create: &SurveyCreate) -> Result<(), Error> {
    let title = create.title.trim();
    if title.is_empty() {
        return Err(Error::Validation("タイトルを入力してください".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::Validation("タイトルが長すぎます".into()));
    }
    if !CATEGORIES.contains(&create.category.as_str()) {
        return Err(Error::Validation("カテゴリを選んでください".into()));
    }
    let options: Vec<&str> = create.options.iter().map(|o| o.trim()).filter(|o| !o.is_empty()).collect();
    if options.len() < MIN_OPTIONS {
        return Err(Error::Validation("選択肢は2つ以上入れてください".into()));
    }
    if options.len() > MAX_OPTIONS {
        return Err(Error::Validation("選択肢が多すぎます".into()));
    }
    screen_ng_words(title)?;
    for option in options {
        screen_ng_words(option)?;
    }
    Ok(())
}

pub fn validate_comment_body(body: &str) -> Result<(), Error> {
    let body = body.trim();
    if body.is_empty() {
        return Err(Error::Validation("コメントを入力してください".into()));
    }
    if body.chars().count() > MAX_COMMENT_LEN {
        return Err(Error::Validation("コメントが長すぎます".into()));
    }
    screen_ng_words(body)
}

pub fn validate_inquiry(create: &InquiryCreate) -> Result<(), Error> {
    if !is_plausible_email(&create.email) {
        return Err(Error::Validation("メールアドレスの形式が正しくありません".into()));
    }
    if create.body.trim().is_empty() {
        return Err(Error::Validation("お問い合わせ内容を入力してください".into()));
    }
    screen_ng_words(&create.body)
}

/// Shape check only; deliverability is the mail relay's problem.
fn is_plausible_email(s: &str) -> bool {
    let s = s.trim();
    match s.split_once('@') {
        None => false,
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && domain.contains('.') && !s.contains(char::is_whitespace)
        }
    }
}
