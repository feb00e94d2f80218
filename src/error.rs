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

//! Error types for ledger operations.

use thiserror::Error;

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Actor does not exist or lacks the admin capability
    #[error("actor is not an administrator")]
    Unauthorized,

    /// Transaction is not pending, or has the wrong kind for the operation
    #[error("transaction is not pending or has the wrong kind")]
    InvalidState,

    /// Referenced user document does not exist
    #[error("user not found")]
    UserNotFound,

    /// Referenced transaction document does not exist
    #[error("transaction not found")]
    TransactionNotFound,

    /// Referenced investment document does not exist
    #[error("investment not found")]
    InvestmentNotFound,

    /// A concurrent writer modified a document read by this unit; the unit
    /// was retried up to the configured attempt count before surfacing this
    #[error("concurrent modification, retry the operation")]
    Conflict,

    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Amount is below the configured minimum for the request kind
    #[error("amount is below the minimum")]
    BelowMinimum,

    /// Debit would take a balance below zero
    #[error("insufficient available funds")]
    InsufficientFunds,

    /// Duplicate transaction ID
    #[error("duplicate transaction ID")]
    DuplicateTransaction,

    /// Document ID already exists in its collection
    #[error("duplicate document ID")]
    DuplicateDocument,

    /// Referral code is already issued to another user
    #[error("referral code already taken")]
    ReferralCodeTaken,

    /// Document failed validation at the store boundary
    #[error("malformed document")]
    MalformedDocument,

    /// The backing store cannot serve requests
    #[error("ledger store unavailable")]
    StoreUnavailable,
}
