// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! The fetch, parse, upsert loop.
//!
//! A failed cycle is retried immediately; a successful one is followed by the
//! configured pause. The loop stops for good once its failure budget is spent.

use std::time::Duration;

use crate::api::FeedSource;
use crate::config::{FailurePolicy, HomeCurrency, PollerConfig};
use crate::currencies::RateStore;
use crate::error::CycleError;
use crate::exchange_rates::{update_currencies, CycleReport};

/// Counts failed cycles against a fixed allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureBudget {
    failures: u32,
    max: u32,
    policy: FailurePolicy,
}

impl FailureBudget {
    pub fn new(max: u32, policy: FailurePolicy) -> Self {
        Self {
            failures: 0,
            max,
            policy,
        }
    }

    /// Returns the updated count.
    pub fn record_failure(&mut self) -> u32 {
        self.failures = self.failures.saturating_add(1);
        self.failures
    }

    pub fn record_success(&mut self) {
        if self.policy == FailurePolicy::Consecutive {
            self.failures = 0;
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// True once the count is strictly above the allowance.
    pub fn exhausted(&self) -> bool {
        self.failures > self.max
    }
}

/// Summary returned when the loop gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerExit {
    pub cycles: u64,
    pub failures: u32,
}

pub struct Poller<F, S> {
    source: F,
    store: S,
    budget: FailureBudget,
    interval: Duration,
    home_id: String,
    cycles: u64,
}

impl<F, S> Poller<F, S>
where
    F: FeedSource,
    S: RateStore,
{
    pub fn new(source: F, store: S, config: &PollerConfig, home: &HomeCurrency) -> Self {
        Self {
            source,
            store,
            budget: FailureBudget::new(config.max_failures, config.failure_policy),
            interval: config.interval(),
            home_id: home.id.to_lowercase(),
            cycles: 0,
        }
    }

    #[cfg(test)]
    pub fn budget(&self) -> &FailureBudget {
        &self.budget
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one cycle and charges a failure to the budget.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        self.cycles += 1;
        let outcome = update_currencies(&self.source, &self.store, &self.home_id).await;
        match &outcome {
            Ok(report) => {
                self.budget.record_success();
                tracing::info!(
                    cycle = self.cycles,
                    written = report.written,
                    "Currencies in DB updated"
                );
            }
            Err(e) => {
                let failures = self.budget.record_failure();
                tracing::warn!(
                    cycle = self.cycles,
                    stage = e.stage(),
                    failures,
                    error = %e,
                    "Cycle failed"
                );
            }
        }
        outcome
    }

    /// Loops until the failure budget is exhausted.
    pub async fn run(mut self) -> PollerExit {
        loop {
            let outcome = self.run_cycle().await;

            if self.budget.exhausted() {
                tracing::error!(
                    failures = self.budget.failures(),
                    max = self.budget.max,
                    "Errors count greater than allowed, stopping"
                );
                return PollerExit {
                    cycles: self.cycles,
                    failures: self.budget.failures(),
                };
            }

            if outcome.is_ok() {
                tracing::info!(interval_secs = self.interval.as_secs(), "Paused");
                tokio::time::sleep(self.interval).await;
            }
        }
    }
}
