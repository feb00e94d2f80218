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

//! Admin approval service integration tests.

use chrono::Utc;
use invest_ledger_rs::{
    Approvals, LedgerError, LedgerStore, ManualClock, ReferralCode, Transaction, TxId, TxKind,
    TxStatus, User, UserId,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn make_user(id: &str, code: &str, is_admin: bool) -> User {
    User {
        id: UserId::from(id),
        phone: format!("999{id}"),
        name: id.to_uppercase(),
        recharge_wallet: Decimal::ZERO,
        main_balance: Decimal::ZERO,
        total_withdraw: Decimal::ZERO,
        referral_code: ReferralCode::from(code),
        referred_by: None,
        is_admin,
        created_at: Utc::now(),
    }
}

fn make_pending(id: &str, user: &str, kind: TxKind, amount: Decimal) -> Transaction {
    Transaction {
        id: TxId::from(id),
        user_id: UserId::from(user),
        kind,
        amount,
        status: TxStatus::Pending,
        created_at: Utc::now(),
        approved_at: None,
        payment_method: None,
        account_details: None,
        product_name: None,
        from_user: None,
    }
}

fn setup() -> (Arc<LedgerStore>, Approvals) {
    let store = Arc::new(LedgerStore::new());
    store.register_user(make_user("admin", "ADMIN1", true)).unwrap();
    store.register_user(make_user("member", "MEMB1", false)).unwrap();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let approvals = Approvals::new(Arc::clone(&store), clock);
    (store, approvals)
}

#[test]
fn approved_recharge_credits_recharge_wallet() {
    let (store, approvals) = setup();
    store
        .create_transaction(make_pending("t1", "member", TxKind::Recharge, dec!(500)))
        .unwrap();

    approvals
        .approve_recharge(&TxId::from("t1"), &UserId::from("admin"))
        .unwrap();

    let member = store.get_user(&UserId::from("member")).unwrap();
    let tx = store.get_transaction(&TxId::from("t1")).unwrap();
    assert_eq!(member.recharge_wallet, dec!(500));
    assert_eq!(tx.status, TxStatus::Approved);
    assert!(tx.approved_at.is_some());
}

#[test]
fn second_approval_is_invalid_and_credits_once() {
    let (store, approvals) = setup();
    store
        .create_transaction(make_pending("t1", "member", TxKind::Recharge, dec!(500)))
        .unwrap();

    approvals
        .approve_recharge(&TxId::from("t1"), &UserId::from("admin"))
        .unwrap();
    let second = approvals.approve_recharge(&TxId::from("t1"), &UserId::from("admin"));
    assert_eq!(second, Err(LedgerError::InvalidState));

    let member = store.get_user(&UserId::from("member")).unwrap();
    assert_eq!(member.recharge_wallet, dec!(500));
}

#[test]
fn approved_withdraw_credits_total_withdraw() {
    let (store, approvals) = setup();
    store
        .create_transaction(make_pending("t1", "member", TxKind::Withdraw, dec!(300)))
        .unwrap();

    approvals
        .approve_withdraw(&TxId::from("t1"), &UserId::from("admin"))
        .unwrap();

    let member = store.get_user(&UserId::from("member")).unwrap();
    assert_eq!(member.total_withdraw, dec!(300));
    // The requested amount left mainBalance at request time, not here.
    assert_eq!(member.main_balance, Decimal::ZERO);
}

#[test]
fn non_admin_actor_changes_nothing() {
    let (store, approvals) = setup();
    store
        .create_transaction(make_pending("t1", "member", TxKind::Recharge, dec!(500)))
        .unwrap();

    let result = approvals.approve_recharge(&TxId::from("t1"), &UserId::from("member"));
    assert_eq!(result, Err(LedgerError::Unauthorized));

    let member = store.get_user(&UserId::from("member")).unwrap();
    let tx = store.get_transaction(&TxId::from("t1")).unwrap();
    assert_eq!(member.recharge_wallet, Decimal::ZERO);
    assert_eq!(tx.status, TxStatus::Pending);
}

#[test]
fn unknown_actor_is_unauthorized() {
    let (store, approvals) = setup();
    store
        .create_transaction(make_pending("t1", "member", TxKind::Recharge, dec!(500)))
        .unwrap();

    let result = approvals.approve_recharge(&TxId::from("t1"), &UserId::from("ghost"));
    assert_eq!(result, Err(LedgerError::Unauthorized));
}

#[test]
fn kind_mismatch_is_invalid_state() {
    let (store, approvals) = setup();
    store
        .create_transaction(make_pending("t1", "member", TxKind::Withdraw, dec!(300)))
        .unwrap();

    let result = approvals.approve_recharge(&TxId::from("t1"), &UserId::from("admin"));
    assert_eq!(result, Err(LedgerError::InvalidState));

    let tx = store.get_transaction(&TxId::from("t1")).unwrap();
    assert_eq!(tx.status, TxStatus::Pending);
}

#[test]
fn missing_transaction_is_reported() {
    let (_store, approvals) = setup();
    let result = approvals.approve_recharge(&TxId::from("nope"), &UserId::from("admin"));
    assert_eq!(result, Err(LedgerError::TransactionNotFound));
}

#[test]
fn rejection_changes_only_the_status_field() {
    let (store, approvals) = setup();
    store
        .create_transaction(make_pending("t1", "member", TxKind::Withdraw, dec!(300)))
        .unwrap();
    let before = store.get_user(&UserId::from("member")).unwrap();

    approvals
        .reject(&TxId::from("t1"), &UserId::from("admin"))
        .unwrap();

    let after = store.get_user(&UserId::from("member")).unwrap();
    let tx = store.get_transaction(&TxId::from("t1")).unwrap();
    assert_eq!(tx.status, TxStatus::Rejected);
    assert_eq!(tx.approved_at, None);
    assert_eq!(before, after);
}

#[test]
fn rejected_transaction_cannot_be_approved_later() {
    let (store, approvals) = setup();
    store
        .create_transaction(make_pending("t1", "member", TxKind::Recharge, dec!(500)))
        .unwrap();

    approvals
        .reject(&TxId::from("t1"), &UserId::from("admin"))
        .unwrap();
    let result = approvals.approve_recharge(&TxId::from("t1"), &UserId::from("admin"));
    assert_eq!(result, Err(LedgerError::InvalidState));

    let member = store.get_user(&UserId::from("member")).unwrap();
    assert_eq!(member.recharge_wallet, Decimal::ZERO);
}

#[test]
fn reject_requires_admin_capability() {
    let (store, approvals) = setup();
    store
        .create_transaction(make_pending("t1", "member", TxKind::Recharge, dec!(500)))
        .unwrap();

    let result = approvals.reject(&TxId::from("t1"), &UserId::from("member"));
    assert_eq!(result, Err(LedgerError::Unauthorized));

    let tx = store.get_transaction(&TxId::from("t1")).unwrap();
    assert_eq!(tx.status, TxStatus::Pending);
}
