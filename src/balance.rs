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

//! Balance mutator.
//!
//! Settles exactly one transaction together with at most one signed balance
//! delta on the owning user, in a single all-or-nothing unit. The pair
//! (terminal-state write, balance delta) either both persist or neither
//! does. The pending check runs inside the unit, so two concurrent
//! settlements of the same transaction cannot both succeed.

use crate::base::TxId;
use crate::error::LedgerError;
use crate::model::{TxStatus, User};
use crate::store::LedgerStore;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Selector for one of the three named balance fields on a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceField {
    RechargeWallet,
    MainBalance,
    TotalWithdraw,
}

impl BalanceField {
    /// Applies a signed delta, refusing to take the field below zero.
    pub fn apply(self, user: &mut User, delta: Decimal) -> Result<(), LedgerError> {
        let slot = match self {
            BalanceField::RechargeWallet => &mut user.recharge_wallet,
            BalanceField::MainBalance => &mut user.main_balance,
            BalanceField::TotalWithdraw => &mut user.total_withdraw,
        };
        let next = *slot + delta;
        if next < Decimal::ZERO {
            return Err(LedgerError::InsufficientFunds);
        }
        *slot = next;
        Ok(())
    }
}

/// Terminal outcome applied by [`BalanceMutator::settle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Approve the transaction and apply `delta` to `field` on its owner.
    Approved { field: BalanceField, delta: Decimal },
    /// Reject the transaction; no balance is touched.
    Rejected,
}

/// Applies settlement outcomes against the ledger store.
pub struct BalanceMutator {
    store: Arc<LedgerStore>,
}

impl BalanceMutator {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Settles a pending transaction.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::TransactionNotFound`] if the transaction is absent.
    /// - [`LedgerError::InvalidState`] if it is no longer pending.
    /// - [`LedgerError::UserNotFound`] if the owning user vanished.
    /// - [`LedgerError::InsufficientFunds`] if the delta would go negative.
    /// - [`LedgerError::Conflict`] after the store's retry bound.
    pub fn settle(
        &self,
        tx_id: &TxId,
        settlement: Settlement,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.store.run_unit(|unit| {
            let mut tx = unit.transaction(tx_id)?;
            match settlement {
                Settlement::Approved { field, delta } => {
                    tx.settle(TxStatus::Approved, now)?;
                    let mut user = unit.user(&tx.user_id)?;
                    field.apply(&mut user, delta)?;
                    unit.put_user(user)?;
                }
                Settlement::Rejected => {
                    tx.settle(TxStatus::Rejected, now)?;
                }
            }
            unit.put_transaction(tx)
        })
    }
}
