// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use super::feed::FeedEntry;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid rate '{value}' for currency '{code}'")]
pub struct NumericFormatError {
    pub code: String,
    pub value: String,
}

/// A feed entry with its rate converted, valid for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyQuote {
    pub code: String,
    pub display_name: String,
    pub rate: f64,
    pub as_of: Option<NaiveDate>,
}

/// A row of the `currency` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CurrencyRecord {
    pub id: String,
    pub name: String,
    pub char_code: String,
    pub rate: f64,
    /// Assigned by the store; `None` until the record has been read back.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Parses a feed rate written with a comma decimal separator.
pub fn parse_rate(code: &str, raw: &str) -> Result<f64, NumericFormatError> {
    let invalid = || NumericFormatError {
        code: code.to_string(),
        value: raw.to_string(),
    };

    let rate: f64 = raw
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| invalid())?;

    if !rate.is_finite() || rate < 0.0 {
        return Err(invalid());
    }
    Ok(rate)
}

impl FeedEntry {
    pub fn to_quote(&self, as_of: Option<NaiveDate>) -> Result<CurrencyQuote, NumericFormatError> {
        Ok(CurrencyQuote {
            code: self.char_code.trim().to_string(),
            display_name: self.name.trim().to_string(),
            rate: parse_rate(&self.char_code, &self.value)?,
            as_of,
        })
    }
}

impl From<&CurrencyQuote> for CurrencyRecord {
    fn from(quote: &CurrencyQuote) -> Self {
        Self {
            id: quote.code.to_lowercase(),
            name: quote.display_name.clone(),
            char_code: quote.code.to_uppercase(),
            rate: quote.rate,
            updated_at: None,
        }
    }
}
