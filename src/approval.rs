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

//! Admin approval service.
//!
//! Approves or rejects pending recharge and withdraw requests. The actor
//! must resolve to an existing user with the admin capability. Approval
//! credits `rechargeWallet` (recharge) or `totalWithdraw` (withdraw) by the
//! transaction amount through the [`BalanceMutator`]; rejection writes only
//! the status field. The transaction kind is immutable and checked up
//! front; the pending check happens inside the settlement unit.
//!
//! There are no background retries: on [`LedgerError::Conflict`] the caller
//! re-invokes.

use crate::balance::{BalanceField, BalanceMutator, Settlement};
use crate::base::{TxId, UserId};
use crate::clock::Clock;
use crate::error::LedgerError;
use crate::model::TxKind;
use crate::store::LedgerStore;
use std::sync::Arc;

pub struct Approvals {
    store: Arc<LedgerStore>,
    mutator: BalanceMutator,
    clock: Arc<dyn Clock>,
}

impl Approvals {
    pub fn new(store: Arc<LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        let mutator = BalanceMutator::new(Arc::clone(&store));
        Self {
            store,
            mutator,
            clock,
        }
    }

    /// Approves a pending recharge, crediting the owner's recharge wallet.
    pub fn approve_recharge(&self, tx_id: &TxId, actor: &UserId) -> Result<(), LedgerError> {
        self.approve(tx_id, actor, TxKind::Recharge, BalanceField::RechargeWallet)
    }

    /// Approves a pending withdrawal, crediting the owner's withdraw total.
    ///
    /// The requested amount already left `mainBalance` at request time.
    pub fn approve_withdraw(&self, tx_id: &TxId, actor: &UserId) -> Result<(), LedgerError> {
        self.approve(tx_id, actor, TxKind::Withdraw, BalanceField::TotalWithdraw)
    }

    /// Rejects a pending recharge or withdraw request.
    ///
    /// Writes only the status field; a rejected withdrawal does not refund
    /// `mainBalance` (see DESIGN.md).
    pub fn reject(&self, tx_id: &TxId, actor: &UserId) -> Result<(), LedgerError> {
        self.authorize(actor)?;
        let tx = self
            .store
            .get_transaction(tx_id)
            .ok_or(LedgerError::TransactionNotFound)?;
        if !matches!(tx.kind, TxKind::Recharge | TxKind::Withdraw) {
            return Err(LedgerError::InvalidState);
        }

        self.mutator
            .settle(tx_id, Settlement::Rejected, self.clock.now())?;
        tracing::info!(tx = %tx_id, kind = ?tx.kind, "request rejected");
        Ok(())
    }

    fn approve(
        &self,
        tx_id: &TxId,
        actor: &UserId,
        expected: TxKind,
        field: BalanceField,
    ) -> Result<(), LedgerError> {
        self.authorize(actor)?;
        let tx = self
            .store
            .get_transaction(tx_id)
            .ok_or(LedgerError::TransactionNotFound)?;
        if tx.kind != expected {
            return Err(LedgerError::InvalidState);
        }

        // Amount and kind are immutable; the pending re-check happens inside
        // the settlement unit.
        self.mutator.settle(
            tx_id,
            Settlement::Approved {
                field,
                delta: tx.amount,
            },
            self.clock.now(),
        )?;
        tracing::info!(tx = %tx_id, kind = ?expected, amount = %tx.amount, "request approved");
        Ok(())
    }

    fn authorize(&self, actor: &UserId) -> Result<(), LedgerError> {
        match self.store.get_user(actor) {
            Some(user) if user.is_admin => Ok(()),
            _ => Err(LedgerError::Unauthorized),
        }
    }
}
