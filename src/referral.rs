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

//! Referral commission resolver.
//!
//! Resolves a user's `referredBy` code through the referral index and
//! credits the sponsor 5% of freshly accrued profit. The credit and the
//! `referral` transaction recording it are one atomic unit. An unresolved
//! code is a no-op, not an error: `referredBy` is attribution by value,
//! not a reference the store enforces.

use crate::base::TxId;
use crate::error::LedgerError;
use crate::clock::Clock;
use crate::model::{Transaction, TxKind, TxStatus, User};
use crate::store::LedgerStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

/// Commission rate applied to a referred user's newly accrued profit.
pub const COMMISSION_RATE: Decimal = dec!(0.05);

pub struct ReferralResolver {
    store: Arc<LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl ReferralResolver {
    pub fn new(store: Arc<LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Credits the earner's sponsor, if any, with 5% of `profit`.
    ///
    /// Returns the commission amount when a sponsor was credited, `None`
    /// when the earner has no (resolvable) sponsor. The caller feeds this
    /// only with profit claimed by a committed accrual unit, which is what
    /// keeps commissions at-most-once per elapsed-day window.
    pub fn credit_commission(
        &self,
        earner: &User,
        profit: Decimal,
    ) -> Result<Option<Decimal>, LedgerError> {
        let Some(code) = &earner.referred_by else {
            return Ok(None);
        };
        if profit <= Decimal::ZERO {
            return Ok(None);
        }

        let commission = profit * COMMISSION_RATE;
        let tx_id = TxId(Uuid::new_v4().hyphenated().to_string());
        let now = self.clock.now();

        let credited = self.store.run_unit(|unit| {
            let Some(referrer_id) = unit.lookup_referrer(code) else {
                return Ok(false);
            };
            // Index entries outlive user documents only in externally
            // seeded stores; treat a dangling one as unresolved.
            let mut referrer = match unit.user(&referrer_id) {
                Ok(user) => user,
                Err(LedgerError::UserNotFound) => return Ok(false),
                Err(e) => return Err(e),
            };
            referrer.main_balance += commission;
            unit.insert_transaction(Transaction {
                id: tx_id.clone(),
                user_id: referrer_id,
                kind: TxKind::Referral,
                amount: commission,
                status: TxStatus::Approved,
                created_at: now,
                approved_at: Some(now),
                payment_method: None,
                account_details: None,
                product_name: None,
                from_user: Some(earner.phone.clone()),
            })?;
            unit.put_user(referrer)?;
            Ok(true)
        })?;

        if credited {
            tracing::info!(
                earner = %earner.id,
                code = %code,
                amount = %commission,
                "referral commission credited"
            );
            Ok(Some(commission))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{ReferralCode, UserId};
    use crate::clock::ManualClock;
    use chrono::Utc;

    fn user(id: &str, code: &str, referred_by: Option<&str>) -> User {
        User {
            id: UserId::from(id),
            phone: format!("999{id}"),
            name: id.to_uppercase(),
            recharge_wallet: Decimal::ZERO,
            main_balance: Decimal::ZERO,
            total_withdraw: Decimal::ZERO,
            referral_code: ReferralCode::from(code),
            referred_by: referred_by.map(ReferralCode::from),
            is_admin: false,
            created_at: Utc::now(),
        }
    }

    fn resolver(store: &Arc<LedgerStore>) -> ReferralResolver {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        ReferralResolver::new(Arc::clone(store), clock)
    }

    #[test]
    fn credits_five_percent_and_records_transaction() {
        let store = Arc::new(LedgerStore::new());
        store.register_user(user("sponsor", "SPON1", None)).unwrap();
        store
            .register_user(user("earner", "EARN1", Some("SPON1")))
            .unwrap();

        let earner = store.get_user(&UserId::from("earner")).unwrap();
        let credited = resolver(&store)
            .credit_commission(&earner, dec!(105))
            .unwrap();
        assert_eq!(credited, Some(dec!(5.25)));

        let sponsor = store.get_user(&UserId::from("sponsor")).unwrap();
        assert_eq!(sponsor.main_balance, dec!(5.25));
    }

    #[test]
    fn unresolved_code_is_a_noop() {
        let store = Arc::new(LedgerStore::new());
        store
            .register_user(user("earner", "EARN1", Some("NOSUCH")))
            .unwrap();

        let earner = store.get_user(&UserId::from("earner")).unwrap();
        let credited = resolver(&store)
            .credit_commission(&earner, dec!(100))
            .unwrap();
        assert_eq!(credited, None);
    }

    #[test]
    fn user_without_sponsor_is_a_noop() {
        let store = Arc::new(LedgerStore::new());
        store.register_user(user("earner", "EARN1", None)).unwrap();

        let earner = store.get_user(&UserId::from("earner")).unwrap();
        let credited = resolver(&store)
            .credit_commission(&earner, dec!(100))
            .unwrap();
        assert_eq!(credited, None);
    }

    #[test]
    fn zero_profit_earns_nothing() {
        let store = Arc::new(LedgerStore::new());
        store.register_user(user("sponsor", "SPON1", None)).unwrap();
        store
            .register_user(user("earner", "EARN1", Some("SPON1")))
            .unwrap();

        let earner = store.get_user(&UserId::from("earner")).unwrap();
        let credited = resolver(&store)
            .credit_commission(&earner, Decimal::ZERO)
            .unwrap();
        assert_eq!(credited, None);

        let sponsor = store.get_user(&UserId::from("sponsor")).unwrap();
        assert_eq!(sponsor.main_balance, Decimal::ZERO);
    }
}
