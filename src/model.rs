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

//! Ledger documents and the transaction state machine.
//!
//! Transactions follow a state machine:
//! - [`TxStatus::Pending`] → [`TxStatus::Approved`] (via admin approval)
//! - [`TxStatus::Pending`] → [`TxStatus::Rejected`] (via admin rejection)
//!
//! Both outcomes are terminal; a terminal transaction is immutable. The
//! pending check is always re-performed inside the atomic unit that writes
//! the terminal state, never only before it.
//!
//! Documents are validated at the store boundary. A document with an empty
//! id, a non-positive amount, or a negative balance is rejected rather than
//! read with defaulted fields.

use crate::base::{InvestmentId, ReferralCode, TxId, UserId};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A user account with its three named balance fields.
///
/// - `recharge_wallet` funds plan purchases and is credited by approved
///   recharges.
/// - `main_balance` accrues profit and commission and funds withdrawals.
/// - `total_withdraw` accumulates approved withdrawal amounts.
///
/// Balances are mutated exclusively inside store atomic units; the struct
/// itself carries no interior mutability.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub phone: String,
    pub name: String,
    pub recharge_wallet: Decimal,
    pub main_balance: Decimal,
    pub total_withdraw: Decimal,
    pub referral_code: ReferralCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<ReferralCode>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Validates the document shape at the store boundary.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.id.as_str().is_empty() || self.referral_code.as_str().is_empty() {
            return Err(LedgerError::MalformedDocument);
        }
        if self.recharge_wallet < Decimal::ZERO
            || self.main_balance < Decimal::ZERO
            || self.total_withdraw < Decimal::ZERO
        {
            return Err(LedgerError::MalformedDocument);
        }
        Ok(())
    }
}

/// Transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Recharge,
    Withdraw,
    Investment,
    Profit,
    Referral,
}

/// Transaction lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Approved,
    Rejected,
}

impl TxStatus {
    /// Approved and rejected are terminal; no transition leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Approved | TxStatus::Rejected)
    }
}

/// A single financial request or event.
///
/// Recharge and withdraw transactions are born `pending` by request intake;
/// investment, profit, and referral transactions are born `approved` by the
/// core itself.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TxId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub amount: Decimal,
    pub status: TxStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    /// Recharge payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// Withdraw payload: bank or UPI details supplied by the requester.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_details: Option<String>,
    /// Investment payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    /// Referral payload: phone of the user whose profit earned the commission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_user: Option<String>,
}

impl Transaction {
    /// Validates the document shape at the store boundary.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.id.as_str().is_empty() || self.user_id.as_str().is_empty() {
            return Err(LedgerError::MalformedDocument);
        }
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(())
    }

    /// Transitions the transaction to a terminal state.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidState`] if the transaction is not pending, or
    ///   the requested state is not terminal.
    pub fn settle(&mut self, status: TxStatus, at: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != TxStatus::Pending || !status.is_terminal() {
            return Err(LedgerError::InvalidState);
        }
        self.status = status;
        if status == TxStatus::Approved {
            self.approved_at = Some(at);
        }
        Ok(())
    }
}

/// Investment lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentStatus {
    Active,
    Completed,
}

/// A purchased fixed-term plan paying `daily_profit` per elapsed day.
///
/// `last_profit_claim` is the accrual high-water mark; `total_earned` is
/// monotone non-decreasing. Only the accrual engine mutates an investment
/// after purchase.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: InvestmentId,
    pub user_id: UserId,
    pub product_id: String,
    pub product_name: String,
    /// Principal, immutable after purchase.
    pub amount: Decimal,
    pub daily_profit: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: InvestmentStatus,
    pub last_profit_claim: DateTime<Utc>,
    pub total_earned: Decimal,
}

impl Investment {
    /// Validates the document shape at the store boundary.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.id.as_str().is_empty() || self.user_id.as_str().is_empty() {
            return Err(LedgerError::MalformedDocument);
        }
        if self.amount <= Decimal::ZERO || self.daily_profit <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if self.end_date < self.start_date || self.total_earned < Decimal::ZERO {
            return Err(LedgerError::MalformedDocument);
        }
        Ok(())
    }
}
