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

//! Request intake: registration and client-originated money movements.
//!
//! Client-side validation is advisory only; every rule is re-checked here.
//! Recharge requests are pending paperwork with no balance effect until an
//! admin approves. Withdraw requests debit `mainBalance` at request time;
//! the approval later credits `totalWithdraw`, and a rejection does not
//! refund (see DESIGN.md). Plan purchases debit `rechargeWallet` and
//! create the investment and its `investment` transaction in one unit.

use crate::balance::BalanceField;
use crate::base::{InvestmentId, ReferralCode, TxId, UserId};
use crate::clock::Clock;
use crate::error::LedgerError;
use crate::model::{Investment, InvestmentStatus, Transaction, TxKind, TxStatus, User};
use crate::store::LedgerStore;
use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

/// Minimum recharge request amount.
pub const MIN_RECHARGE: Decimal = dec!(100);
/// Minimum withdrawal request amount.
pub const MIN_WITHDRAW: Decimal = dec!(200);

/// Attempts to issue a fresh referral code before giving up.
const CODE_ISSUE_ATTEMPTS: u32 = 5;

/// Registration input.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub phone: String,
    pub name: String,
    /// Sponsor's code as typed by the registrant. Stored as-is; an
    /// unresolvable code simply never earns commission.
    pub referred_by: Option<ReferralCode>,
}

/// A plan purchase described by value; the catalog itself lives elsewhere.
#[derive(Debug, Clone)]
pub struct PlanOrder {
    pub product_id: String,
    pub product_name: String,
    pub price: Decimal,
    pub duration_days: i64,
    pub daily_profit: Decimal,
}

pub struct RequestService {
    store: Arc<LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl RequestService {
    pub fn new(store: Arc<LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Registers a user with zeroed balances and a fresh unique referral code.
    pub fn register(&self, new_user: NewUser) -> Result<User, LedgerError> {
        if new_user.phone.is_empty() || new_user.name.is_empty() {
            return Err(LedgerError::MalformedDocument);
        }

        let mut user = User {
            id: UserId(Uuid::new_v4().hyphenated().to_string()),
            phone: new_user.phone,
            name: new_user.name,
            recharge_wallet: Decimal::ZERO,
            main_balance: Decimal::ZERO,
            total_withdraw: Decimal::ZERO,
            referral_code: issue_referral_code(),
            referred_by: new_user.referred_by,
            is_admin: false,
            created_at: self.clock.now(),
        };

        for _ in 0..CODE_ISSUE_ATTEMPTS {
            match self.store.register_user(user.clone()) {
                Ok(()) => return Ok(user),
                Err(LedgerError::ReferralCodeTaken) => {
                    user.referral_code = issue_referral_code();
                }
                Err(e) => return Err(e),
            }
        }
        Err(LedgerError::ReferralCodeTaken)
    }

    /// Creates a pending recharge request. No balance changes until approval.
    pub fn request_recharge(
        &self,
        user_id: &UserId,
        amount: Decimal,
        payment_method: Option<String>,
    ) -> Result<TxId, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if amount < MIN_RECHARGE {
            return Err(LedgerError::BelowMinimum);
        }

        let tx_id = TxId(Uuid::new_v4().hyphenated().to_string());
        let now = self.clock.now();
        self.store.run_unit(|unit| {
            unit.user(user_id)?;
            unit.insert_transaction(Transaction {
                id: tx_id.clone(),
                user_id: user_id.clone(),
                kind: TxKind::Recharge,
                amount,
                status: TxStatus::Pending,
                created_at: now,
                approved_at: None,
                payment_method: payment_method.clone(),
                account_details: None,
                product_name: None,
                from_user: None,
            })
        })?;
        Ok(tx_id)
    }

    /// Creates a pending withdraw request, debiting `mainBalance` up front.
    pub fn request_withdraw(
        &self,
        user_id: &UserId,
        amount: Decimal,
        account_details: String,
    ) -> Result<TxId, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if amount < MIN_WITHDRAW {
            return Err(LedgerError::BelowMinimum);
        }
        if account_details.is_empty() {
            return Err(LedgerError::MalformedDocument);
        }

        let tx_id = TxId(Uuid::new_v4().hyphenated().to_string());
        let now = self.clock.now();
        self.store.run_unit(|unit| {
            let mut user = unit.user(user_id)?;
            BalanceField::MainBalance.apply(&mut user, -amount)?;
            unit.insert_transaction(Transaction {
                id: tx_id.clone(),
                user_id: user_id.clone(),
                kind: TxKind::Withdraw,
                amount,
                status: TxStatus::Pending,
                created_at: now,
                approved_at: None,
                payment_method: None,
                account_details: Some(account_details.clone()),
                product_name: None,
                from_user: None,
            })?;
            unit.put_user(user)
        })?;
        Ok(tx_id)
    }

    /// Buys a plan: debits `rechargeWallet`, creates the active investment,
    /// and records its transaction, all in one unit.
    pub fn purchase_plan(
        &self,
        user_id: &UserId,
        order: &PlanOrder,
    ) -> Result<InvestmentId, LedgerError> {
        if order.price <= Decimal::ZERO || order.daily_profit <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if order.duration_days < 1 {
            return Err(LedgerError::MalformedDocument);
        }

        let inv_id = InvestmentId(Uuid::new_v4().hyphenated().to_string());
        let tx_id = TxId(Uuid::new_v4().hyphenated().to_string());
        let now = self.clock.now();
        self.store.run_unit(|unit| {
            let mut user = unit.user(user_id)?;
            BalanceField::RechargeWallet.apply(&mut user, -order.price)?;
            unit.insert_investment(Investment {
                id: inv_id.clone(),
                user_id: user_id.clone(),
                product_id: order.product_id.clone(),
                product_name: order.product_name.clone(),
                amount: order.price,
                daily_profit: order.daily_profit,
                start_date: now,
                end_date: now + Duration::days(order.duration_days),
                status: InvestmentStatus::Active,
                last_profit_claim: now,
                total_earned: Decimal::ZERO,
            })?;
            unit.insert_transaction(Transaction {
                id: tx_id.clone(),
                user_id: user_id.clone(),
                kind: TxKind::Investment,
                amount: order.price,
                status: TxStatus::Approved,
                created_at: now,
                approved_at: Some(now),
                payment_method: None,
                account_details: None,
                product_name: Some(order.product_name.clone()),
                from_user: None,
            })?;
            unit.put_user(user)
        })?;
        Ok(inv_id)
    }
}

fn issue_referral_code() -> ReferralCode {
    let raw = Uuid::new_v4().simple().to_string();
    ReferralCode(raw[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Utc;

    fn service() -> (Arc<LedgerStore>, RequestService) {
        let store = Arc::new(LedgerStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = RequestService::new(Arc::clone(&store), clock);
        (store, service)
    }

    fn registered(service: &RequestService) -> User {
        service
            .register(NewUser {
                phone: "9990001111".to_string(),
                name: "Asha".to_string(),
                referred_by: None,
            })
            .unwrap()
    }

    #[test]
    fn register_issues_unique_code_and_zero_balances() {
        let (store, service) = service();
        let user = registered(&service);

        assert_eq!(user.recharge_wallet, Decimal::ZERO);
        assert_eq!(user.main_balance, Decimal::ZERO);
        assert!(!user.is_admin);
        assert_eq!(user.referral_code.as_str().len(), 8);
        assert_eq!(
            store.resolve_referral(&user.referral_code),
            Some(user.id.clone())
        );
    }

    #[test]
    fn recharge_request_is_pending_with_no_balance_effect() {
        let (store, service) = service();
        let user = registered(&service);

        let tx_id = service
            .request_recharge(&user.id, dec!(250), Some("UPI".to_string()))
            .unwrap();

        let tx = store.get_transaction(&tx_id).unwrap();
        assert_eq!(tx.kind, TxKind::Recharge);
        assert_eq!(tx.status, TxStatus::Pending);
        assert_eq!(tx.payment_method.as_deref(), Some("UPI"));

        let user = store.get_user(&user.id).unwrap();
        assert_eq!(user.recharge_wallet, Decimal::ZERO);
    }

    #[test]
    fn recharge_below_minimum_rejected() {
        let (_store, service) = service();
        let user = registered(&service);
        let result = service.request_recharge(&user.id, dec!(50), None);
        assert_eq!(result, Err(LedgerError::BelowMinimum));
    }

    #[test]
    fn withdraw_debits_main_balance_at_request_time() {
        let (store, service) = service();
        let user = registered(&service);
        store
            .run_unit(|unit| {
                let mut u = unit.user(&user.id)?;
                u.main_balance = dec!(1000);
                unit.put_user(u)
            })
            .unwrap();

        let tx_id = service
            .request_withdraw(&user.id, dec!(400), "UPI: asha@bank".to_string())
            .unwrap();

        let tx = store.get_transaction(&tx_id).unwrap();
        assert_eq!(tx.status, TxStatus::Pending);
        assert_eq!(tx.account_details.as_deref(), Some("UPI: asha@bank"));

        let user = store.get_user(&user.id).unwrap();
        assert_eq!(user.main_balance, dec!(600));
        assert_eq!(user.total_withdraw, Decimal::ZERO);
    }

    #[test]
    fn withdraw_beyond_balance_leaves_nothing_behind() {
        let (store, service) = service();
        let user = registered(&service);

        let result = service.request_withdraw(&user.id, dec!(400), "UPI".to_string());
        assert_eq!(result, Err(LedgerError::InsufficientFunds));

        let fresh = store.get_user(&user.id).unwrap();
        assert_eq!(fresh.main_balance, Decimal::ZERO);
    }

    #[test]
    fn purchase_creates_investment_transaction_and_debit_together() {
        let (store, service) = service();
        let user = registered(&service);
        store
            .run_unit(|unit| {
                let mut u = unit.user(&user.id)?;
                u.recharge_wallet = dec!(500);
                unit.put_user(u)
            })
            .unwrap();

        let inv_id = service
            .purchase_plan(
                &user.id,
                &PlanOrder {
                    product_id: "p1".to_string(),
                    product_name: "Starter".to_string(),
                    price: dec!(500),
                    duration_days: 30,
                    daily_profit: dec!(35),
                },
            )
            .unwrap();

        let inv = store.get_investment(&inv_id).unwrap();
        assert_eq!(inv.status, InvestmentStatus::Active);
        assert_eq!(inv.total_earned, Decimal::ZERO);
        assert_eq!(inv.end_date - inv.start_date, Duration::days(30));

        let user = store.get_user(&user.id).unwrap();
        assert_eq!(user.recharge_wallet, Decimal::ZERO);
    }

    #[test]
    fn purchase_without_funds_creates_nothing() {
        let (store, service) = service();
        let user = registered(&service);

        let result = service.purchase_plan(
            &user.id,
            &PlanOrder {
                product_id: "p1".to_string(),
                product_name: "Starter".to_string(),
                price: dec!(500),
                duration_days: 30,
                daily_profit: dec!(35),
            },
        );
        assert_eq!(result, Err(LedgerError::InsufficientFunds));
        assert!(store.active_investments().is_empty());
    }
}
