// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Investment accrual engine.
//!
//! One accrual pass walks every active investment and, per investment in a
//! single atomic unit: computes elapsed whole days since
//! `lastProfitClaim`, credits `dailyProfit × elapsedDays` to the
//! investment's `totalEarned` and the owner's `mainBalance`, advances
//! `lastProfitClaim`, records an approved `profit` transaction, and marks
//! the investment `completed` once its end date has passed. A second,
//! independent unit then credits the sponsor's referral commission.
//!
//! # At-most-once accrual
//!
//! The elapsed-day check runs inside the unit against the freshly read
//! document. Two overlapping passes race on the investment's version: the
//! loser re-runs, re-reads the advanced `lastProfitClaim`, computes
//! `elapsedDays < 1`, and no-ops. Commission is fed only with profit
//! claimed by a unit that committed in this pass, so it inherits the same
//! at-most-once guarantee.
//!
//! A single investment's failure is recorded in the [`PassSummary`] and
//! the pass continues with the remaining investments.

use crate::base::{InvestmentId, TxId};
use crate::clock::Clock;
use crate::error::LedgerError;
use crate::model::{InvestmentStatus, Transaction, TxKind, TxStatus, User};
use crate::referral::ReferralResolver;
use crate::store::LedgerStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of one accrual pass.
#[derive(Debug, Default)]
pub struct PassSummary {
    /// Active investments examined.
    pub scanned: usize,
    /// Investments whose window had not reached one full day.
    pub skipped: usize,
    /// Investments credited with profit.
    pub credited: usize,
    /// Investments transitioned to completed.
    pub completed: usize,
    /// Referral commissions credited.
    pub commissions: usize,
    /// Per-investment failures; the pass continued past each.
    pub failures: Vec<(InvestmentId, LedgerError)>,
}

/// Result of one committed accrual unit.
struct Accrued {
    owner: User,
    profit: Decimal,
    completed: bool,
}

pub struct AccrualEngine {
    store: Arc<LedgerStore>,
    clock: Arc<dyn Clock>,
    referrals: ReferralResolver,
}

impl AccrualEngine {
    pub fn new(store: Arc<LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        let referrals = ReferralResolver::new(Arc::clone(&store), Arc::clone(&clock));
        Self {
            store,
            clock,
            referrals,
        }
    }

    /// Runs one accrual pass over all active investments.
    ///
    /// Never fails as a whole: per-investment errors are collected into the
    /// summary and the remaining investments still accrue.
    pub fn run_pass(&self) -> PassSummary {
        let investments = self.store.active_investments();
        let mut summary = PassSummary {
            scanned: investments.len(),
            ..PassSummary::default()
        };

        for inv in &investments {
            match self.accrue_one(&inv.id) {
                Ok(None) => summary.skipped += 1,
                Ok(Some(accrued)) => {
                    summary.credited += 1;
                    if accrued.completed {
                        summary.completed += 1;
                    }
                    match self
                        .referrals
                        .credit_commission(&accrued.owner, accrued.profit)
                    {
                        Ok(Some(_)) => summary.commissions += 1,
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(investment = %inv.id, error = %e, "commission failed");
                            summary.failures.push((inv.id.clone(), e));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(investment = %inv.id, error = %e, "accrual failed");
                    summary.failures.push((inv.id.clone(), e));
                }
            }
        }

        tracing::info!(
            scanned = summary.scanned,
            credited = summary.credited,
            completed = summary.completed,
            commissions = summary.commissions,
            failures = summary.failures.len(),
            "accrual pass finished"
        );
        summary
    }

    /// Credits one investment's accrued profit in a single atomic unit.
    ///
    /// Returns `Ok(None)` when there is nothing to credit yet.
    fn accrue_one(&self, id: &InvestmentId) -> Result<Option<Accrued>, LedgerError> {
        let now = self.clock.now();
        // One profit record per credited window; reused across unit retries,
        // never across passes.
        let profit_tx_id = TxId(Uuid::new_v4().hyphenated().to_string());

        self.store.run_unit(|unit| {
            let mut inv = unit.investment(id)?;
            if inv.status != InvestmentStatus::Active {
                return Ok(None);
            }
            let elapsed = (now - inv.last_profit_claim).num_days();
            if elapsed < 1 {
                return Ok(None);
            }

            let profit = inv.daily_profit * Decimal::from(elapsed);
            inv.total_earned += profit;
            inv.last_profit_claim = now;
            let completed = now >= inv.end_date;
            if completed {
                inv.status = InvestmentStatus::Completed;
            }

            let mut owner = unit.user(&inv.user_id)?;
            owner.main_balance += profit;

            unit.insert_transaction(Transaction {
                id: profit_tx_id.clone(),
                user_id: owner.id.clone(),
                kind: TxKind::Profit,
                amount: profit,
                status: TxStatus::Approved,
                created_at: now,
                approved_at: Some(now),
                payment_method: None,
                account_details: None,
                product_name: Some(inv.product_name.clone()),
                from_user: None,
            })?;
            unit.put_investment(inv)?;
            unit.put_user(owner.clone())?;

            Ok(Some(Accrued {
                owner,
                profit,
                completed,
            }))
        })
    }
}
