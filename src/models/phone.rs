use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_PHONE_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    #[error("phone number is empty")]
    Empty,
    #[error("phone number is longer than 20 characters")]
    TooLong,
    #[error("phone number contains invalid character {0:?}")]
    InvalidChar(char),
    #[error("phone number has no digits")]
    NoDigits,
}

/// Идентификатор держателя брони. Сравнивается как строка после trim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    pub fn parse(raw: &str) -> Result<Self, PhoneError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(PhoneError::Empty);
        }
        if value.chars().count() > MAX_PHONE_LEN {
            return Err(PhoneError::TooLong);
        }
        if let Some(c) = value
            .chars()
            .find(|c| !(c.is_ascii_digit() || matches!(c, '+' | '-' | ' ')))
        {
            return Err(PhoneError::InvalidChar(c));
        }
        if !value.chars().any(|c| c.is_ascii_digit()) {
            return Err(PhoneError::NoDigits);
        }
        Ok(Phone(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Для логов: показываем только последние 4 цифры.
    pub fn masked(&self) -> String {
        let digits: Vec<char> = self.0.chars().filter(|c| c.is_ascii_digit()).collect();
        let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
        format!("***{}", tail)
    }
}

impl FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phone::parse(s)
    }
}

impl TryFrom<String> for Phone {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Phone::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
