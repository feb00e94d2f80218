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

//! # Invest Ledger
//!
//! This library provides the transactional ledger engine of an investment
//! platform: admin approval of recharge and withdraw requests, daily
//! investment profit accrual, and referral commission cascades, all against
//! a document store with optimistic multi-document atomic units.
//!
//! ## Core Components
//!
//! - [`LedgerStore`]: document collections plus the atomic-unit machinery
//! - [`BalanceMutator`]: pairs one transaction settlement with one balance delta
//! - [`Approvals`]: authorizes admins and settles pending requests
//! - [`AccrualEngine`]: credits daily profit and completes expired plans
//! - [`ReferralResolver`]: credits sponsors 5% of referred users' profit
//! - [`RequestService`]: registration and client-originated requests
//!
//! ## Example
//!
//! ```
//! use invest_ledger_rs::{LedgerStore, ManualClock, NewUser, RequestService};
//! use chrono::Utc;
//! use std::sync::Arc;
//!
//! let store = Arc::new(LedgerStore::new());
//! let clock = Arc::new(ManualClock::new(Utc::now()));
//! let requests = RequestService::new(Arc::clone(&store), clock);
//!
//! let user = requests
//!     .register(NewUser {
//!         phone: "9990001111".to_string(),
//!         name: "Asha".to_string(),
//!         referred_by: None,
//!     })
//!     .unwrap();
//!
//! // The referral code is claimed in the secondary index at registration.
//! assert_eq!(store.resolve_referral(&user.referral_code), Some(user.id.clone()));
//! ```
//!
//! ## Concurrency
//!
//! Every cross-document mutation is one optimistic atomic unit: reads
//! record document versions, commit re-validates them, and conflicting
//! units retry from scratch up to a bounded attempt count. Independent
//! documents never contend; overlapping accrual passes credit each
//! investment at most once per elapsed-day window.

mod accrual;
mod approval;
mod balance;
mod base;
mod clock;
pub mod error;
mod model;
mod referral;
mod requests;
pub mod server;
pub mod settings;
mod store;

pub use accrual::{AccrualEngine, PassSummary};
pub use approval::Approvals;
pub use balance::{BalanceField, BalanceMutator, Settlement};
pub use base::{InvestmentId, ReferralCode, TxId, UserId};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::LedgerError;
pub use model::{Investment, InvestmentStatus, Transaction, TxKind, TxStatus, User};
pub use referral::{COMMISSION_RATE, ReferralResolver};
pub use requests::{MIN_RECHARGE, MIN_WITHDRAW, NewUser, PlanOrder, RequestService};
pub use store::{DEFAULT_COMMIT_ATTEMPTS, LedgerStore, Unit};
