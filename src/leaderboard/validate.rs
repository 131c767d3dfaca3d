use thiserror::Error;

use crate::constants::{MAX_SCORE, USERNAME_EMOJI_RANGES, USERNAME_MAX_CHARS};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid username. Username must not be empty.")]
    EmptyUsername,

    #[error("Invalid username. Username must be at most {max} characters.")]
    UsernameTooLong { max: usize },

    #[error("Invalid username. Only alphanumeric characters and emojis are allowed.")]
    InvalidUsername,

    #[error("Invalid score. Score must be a positive integer.")]
    InvalidScore,

    #[error("Invalid score. Score must be at most {max}.")]
    ScoreTooLarge { max: i64 },
}

/// A submission that passed validation; the username is trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub username: String,
    pub score: i64,
}

pub fn submission(username: &str, score: i64) -> Result<Submission, ValidationError> {
    Ok(Submission {
        username: self::username(username)?,
        score: self::score(score)?,
    })
}

pub fn username(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyUsername);
    }

    if trimmed.chars().count() > USERNAME_MAX_CHARS {
        return Err(ValidationError::UsernameTooLong {
            max: USERNAME_MAX_CHARS,
        });
    }

    if !trimmed.chars().all(is_allowed_char) {
        return Err(ValidationError::InvalidUsername);
    }

    Ok(trimmed.to_owned())
}

pub fn score(score: i64) -> Result<i64, ValidationError> {
    if score < 1 {
        return Err(ValidationError::InvalidScore);
    }

    if score > MAX_SCORE {
        return Err(ValidationError::ScoreTooLarge { max: MAX_SCORE });
    }

    Ok(score)
}

/// ASCII word characters, any whitespace, or one of the emoji blocks.
fn is_allowed_char(c: char) -> bool {
    if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() {
        return true;
    }

    let code = c as u32;
    USERNAME_EMOJI_RANGES
        .iter()
        .any(|&(lo, hi)| (lo..=hi).contains(&code))
}
