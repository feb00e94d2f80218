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

//! Benchmarks for the accrual engine.
//!
//! Run with: cargo bench

use chrono::{Duration, Utc};
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use invest_ledger_rs::{
    AccrualEngine, Investment, InvestmentId, InvestmentStatus, LedgerStore, ManualClock,
    ReferralCode, User, UserId,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// Seeds `size` users with one day-old active investment each. Every tenth
/// user is sponsored, so the pass also exercises the commission path.
fn seeded_engine(size: usize, elapsed_days: i64) -> AccrualEngine {
    let store = Arc::new(LedgerStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let start = clock.now();

    store
        .register_user(User {
            id: UserId::from("sponsor"),
            phone: "9990000000".to_string(),
            name: "Sponsor".to_string(),
            recharge_wallet: Decimal::ZERO,
            main_balance: Decimal::ZERO,
            total_withdraw: Decimal::ZERO,
            referral_code: ReferralCode::from("SPON1"),
            referred_by: None,
            is_admin: false,
            created_at: start,
        })
        .unwrap();

    for i in 0..size {
        let id = format!("user{i}");
        let referred_by = (i % 10 == 0).then(|| ReferralCode::from("SPON1"));
        store
            .register_user(User {
                id: UserId(id.clone()),
                phone: format!("999{i}"),
                name: id.clone(),
                recharge_wallet: Decimal::ZERO,
                main_balance: Decimal::ZERO,
                total_withdraw: Decimal::ZERO,
                referral_code: ReferralCode(format!("CODE{i}")),
                referred_by,
                is_admin: false,
                created_at: start,
            })
            .unwrap();
        store
            .create_investment(Investment {
                id: InvestmentId(format!("inv{i}")),
                user_id: UserId(id),
                product_id: "p1".to_string(),
                product_name: "Starter".to_string(),
                amount: dec!(500),
                daily_profit: dec!(35),
                start_date: start,
                end_date: start + Duration::days(365),
                status: InvestmentStatus::Active,
                last_profit_claim: start,
                total_earned: Decimal::ZERO,
            })
            .unwrap();
    }

    clock.advance(Duration::days(elapsed_days));
    AccrualEngine::new(store, clock)
}

fn bench_crediting_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("accrual_pass");
    for size in [10usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || seeded_engine(size, 1),
                |engine| engine.run_pass(),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_noop_pass(c: &mut Criterion) {
    // Nothing has elapsed, so the pass only scans and skips.
    let engine = seeded_engine(1_000, 0);
    c.bench_function("accrual_pass_noop/1000", |b| b.iter(|| engine.run_pass()));
}

criterion_group!(benches, bench_crediting_pass, bench_noop_pass);
criterion_main!(benches);
