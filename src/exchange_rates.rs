// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use chrono::NaiveDate;

use crate::api::FeedSource;
use crate::currencies::RateStore;
use crate::error::CycleError;
use crate::models::{parse_feed, CurrencyRecord};

/// What a successful cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub as_of: Option<NaiveDate>,
    pub written: usize,
    /// Entries naming the home currency, which the feed never overwrites.
    pub skipped: usize,
}

/// Fetch the feed once and upsert every entry in document order.
///
/// The first failing entry aborts the rest of the cycle; rows written before
/// it stay written.
pub async fn update_currencies<F, S>(
    source: &F,
    store: &S,
    home_id: &str,
) -> Result<CycleReport, CycleError>
where
    F: FeedSource + ?Sized,
    S: RateStore + ?Sized,
{
    let body = source.fetch().await?;
    let snapshot = parse_feed(&body)?;

    let as_of = match snapshot.date() {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!(error = %e, "Feed snapshot date not understood");
            None
        }
    };
    tracing::info!(
        date = %snapshot.date,
        entries = snapshot.entries.len(),
        "Currencies received successfully"
    );

    let mut report = CycleReport {
        as_of,
        written: 0,
        skipped: 0,
    };
    for entry in &snapshot.entries {
        let quote = entry.to_quote(as_of)?;
        let record = CurrencyRecord::from(&quote);
        if record.id.eq_ignore_ascii_case(home_id) {
            tracing::warn!(id = %record.id, "Feed entry for the home currency ignored");
            report.skipped += 1;
            continue;
        }
        store.upsert(&record).await?;
        report.written += 1;
    }

    Ok(report)
}
