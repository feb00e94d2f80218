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

//! Ledger store: document collections with optimistic multi-document units.
//!
//! The store holds the `users`, `transactions`, and `investments`
//! collections plus the `referralCode → userId` secondary index. It is an
//! explicit capability passed into every component constructor; nothing in
//! this crate reaches for a global.
//!
//! # Atomic units
//!
//! All cross-document mutations run through [`LedgerStore::run_unit`]. The
//! closure reads documents through a [`Unit`], which records the version of
//! every document it touches (including documents observed absent) and
//! stages writes locally. Commit re-validates every recorded version under a
//! short lock and then applies all staged writes, so the unit is
//! all-or-nothing: a conflicting concurrent writer fails the commit, the
//! whole closure re-runs from scratch, and after a bounded number of
//! attempts the operation surfaces [`LedgerError::Conflict`]. A failed unit
//! leaves every document in its pre-call state.
//!
//! # Invariants
//!
//! - Document versions only grow; a version observed at read time that no
//!   longer matches at commit time aborts the unit.
//! - Transaction IDs are unique across all transaction kinds.
//! - Referral codes are unique; the index is maintained at registration and
//!   entries are never rewritten (codes are immutable once issued).
//! - Every write path validates the document before staging it.

use crate::base::{InvestmentId, ReferralCode, TxId, UserId};
use crate::error::LedgerError;
use crate::model::{Investment, InvestmentStatus, Transaction, User};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Commit attempts per unit before surfacing [`LedgerError::Conflict`].
pub const DEFAULT_COMMIT_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
struct Versioned<T> {
    version: u64,
    doc: T,
}

/// Key of a version-tracked document read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DocKey {
    User(UserId),
    Tx(TxId),
    Investment(InvestmentId),
}

/// In-process document store with optimistic concurrency.
pub struct LedgerStore {
    users: DashMap<UserId, Versioned<User>>,
    transactions: DashMap<TxId, Versioned<Transaction>>,
    investments: DashMap<InvestmentId, Versioned<Investment>>,
    /// Secondary index: referral code → owning user. Entries are immutable.
    referral_index: DashMap<ReferralCode, UserId>,
    /// Serializes commit validation and registration.
    commit_lock: Mutex<()>,
    commit_attempts: u32,
}

impl LedgerStore {
    /// Creates an empty store with [`DEFAULT_COMMIT_ATTEMPTS`].
    pub fn new() -> Self {
        Self::with_commit_attempts(DEFAULT_COMMIT_ATTEMPTS)
    }

    /// Creates an empty store with a custom per-unit commit attempt bound.
    pub fn with_commit_attempts(commit_attempts: u32) -> Self {
        Self {
            users: DashMap::new(),
            transactions: DashMap::new(),
            investments: DashMap::new(),
            referral_index: DashMap::new(),
            commit_lock: Mutex::new(()),
            commit_attempts: commit_attempts.max(1),
        }
    }

    /// Runs `body` as one atomic unit, retrying on commit conflict.
    ///
    /// A business error returned by `body` aborts immediately with no
    /// writes; only commit-time version conflicts re-run the closure.
    ///
    /// # Errors
    ///
    /// - Whatever `body` returns, unchanged.
    /// - [`LedgerError::Conflict`] once the attempt bound is exhausted.
    pub fn run_unit<T, F>(&self, mut body: F) -> Result<T, LedgerError>
    where
        F: FnMut(&mut Unit<'_>) -> Result<T, LedgerError>,
    {
        for attempt in 1..=self.commit_attempts {
            let mut unit = Unit::new(self);
            let value = body(&mut unit)?;
            match unit.commit() {
                Ok(()) => return Ok(value),
                Err(LedgerError::Conflict) if attempt < self.commit_attempts => continue,
                Err(e) => return Err(e),
            }
        }
        Err(LedgerError::Conflict)
    }

    /// Registers a new user, claiming its referral code in the index.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DuplicateDocument`] if the user id exists.
    /// - [`LedgerError::ReferralCodeTaken`] if the code is already issued.
    /// - [`LedgerError::MalformedDocument`] if validation fails.
    pub fn register_user(&self, user: User) -> Result<(), LedgerError> {
        user.validate()?;
        let _guard = self.commit_lock.lock();
        if self.users.contains_key(&user.id) {
            return Err(LedgerError::DuplicateDocument);
        }
        // Entry API gives atomic check-and-claim on the code.
        match self.referral_index.entry(user.referral_code.clone()) {
            Entry::Occupied(_) => Err(LedgerError::ReferralCodeTaken),
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
                self.users
                    .insert(user.id.clone(), Versioned { version: 1, doc: user });
                Ok(())
            }
        }
    }

    /// Inserts a transaction document outside any larger unit.
    ///
    /// Recharge and withdraw requests normally arrive through request
    /// intake; this is the seam for externally created documents and tests.
    pub fn create_transaction(&self, tx: Transaction) -> Result<(), LedgerError> {
        self.run_unit(|unit| unit.insert_transaction(tx.clone()))
    }

    /// Inserts an investment document outside any larger unit.
    pub fn create_investment(&self, inv: Investment) -> Result<(), LedgerError> {
        self.run_unit(|unit| unit.insert_investment(inv.clone()))
    }

    /// Point read of a user document.
    pub fn get_user(&self, id: &UserId) -> Option<User> {
        self.users.get(id).map(|v| v.doc.clone())
    }

    /// Point read of a transaction document.
    pub fn get_transaction(&self, id: &TxId) -> Option<Transaction> {
        self.transactions.get(id).map(|v| v.doc.clone())
    }

    /// Point read of an investment document.
    pub fn get_investment(&self, id: &InvestmentId) -> Option<Investment> {
        self.investments.get(id).map(|v| v.doc.clone())
    }

    /// Snapshot of all currently active investments.
    pub fn active_investments(&self) -> Vec<Investment> {
        self.investments
            .iter()
            .filter(|entry| entry.value().doc.status == InvestmentStatus::Active)
            .map(|entry| entry.value().doc.clone())
            .collect()
    }

    /// Snapshot of one user's transactions, newest first.
    pub fn transactions_for_user(&self, id: &UserId) -> Vec<Transaction> {
        let mut txs: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| &entry.value().doc.user_id == id)
            .map(|entry| entry.value().doc.clone())
            .collect();
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        txs
    }

    /// Resolves a referral code to its owning user id, by value.
    pub fn resolve_referral(&self, code: &ReferralCode) -> Option<UserId> {
        self.referral_index.get(code).map(|id| id.clone())
    }

    fn version_of(&self, key: &DocKey) -> u64 {
        match key {
            DocKey::User(id) => self.users.get(id).map_or(0, |v| v.version),
            DocKey::Tx(id) => self.transactions.get(id).map_or(0, |v| v.version),
            DocKey::Investment(id) => self.investments.get(id).map_or(0, |v| v.version),
        }
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

/// One in-flight atomic unit.
///
/// Reads go through the unit so their versions are recorded; writes are
/// staged locally and only become visible when the unit commits. Reads
/// after a staged write observe the staged document.
///
/// Every `put_*` expects the document to have been read through the same
/// unit first; a blind update of a live document cannot validate and will
/// abort as a conflict.
pub struct Unit<'a> {
    store: &'a LedgerStore,
    reads: HashMap<DocKey, u64>,
    users: HashMap<UserId, User>,
    transactions: HashMap<TxId, Transaction>,
    investments: HashMap<InvestmentId, Investment>,
    dirty_users: HashSet<UserId>,
    dirty_transactions: HashSet<TxId>,
    dirty_investments: HashSet<InvestmentId>,
}

impl<'a> Unit<'a> {
    fn new(store: &'a LedgerStore) -> Self {
        Self {
            store,
            reads: HashMap::new(),
            users: HashMap::new(),
            transactions: HashMap::new(),
            investments: HashMap::new(),
            dirty_users: HashSet::new(),
            dirty_transactions: HashSet::new(),
            dirty_investments: HashSet::new(),
        }
    }

    /// Reads a user document.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UserNotFound`] if absent; absence is still recorded,
    /// so a document created concurrently invalidates the unit.
    pub fn user(&mut self, id: &UserId) -> Result<User, LedgerError> {
        if let Some(local) = self.users.get(id) {
            return Ok(local.clone());
        }
        match self.store.users.get(id) {
            Some(v) => {
                self.reads
                    .entry(DocKey::User(id.clone()))
                    .or_insert(v.version);
                self.users.insert(id.clone(), v.doc.clone());
                Ok(v.doc.clone())
            }
            None => {
                self.reads.entry(DocKey::User(id.clone())).or_insert(0);
                Err(LedgerError::UserNotFound)
            }
        }
    }

    /// Reads a transaction document.
    pub fn transaction(&mut self, id: &TxId) -> Result<Transaction, LedgerError> {
        if let Some(local) = self.transactions.get(id) {
            return Ok(local.clone());
        }
        match self.store.transactions.get(id) {
            Some(v) => {
                self.reads.entry(DocKey::Tx(id.clone())).or_insert(v.version);
                self.transactions.insert(id.clone(), v.doc.clone());
                Ok(v.doc.clone())
            }
            None => {
                self.reads.entry(DocKey::Tx(id.clone())).or_insert(0);
                Err(LedgerError::TransactionNotFound)
            }
        }
    }

    /// Reads an investment document.
    pub fn investment(&mut self, id: &InvestmentId) -> Result<Investment, LedgerError> {
        if let Some(local) = self.investments.get(id) {
            return Ok(local.clone());
        }
        match self.store.investments.get(id) {
            Some(v) => {
                self.reads
                    .entry(DocKey::Investment(id.clone()))
                    .or_insert(v.version);
                self.investments.insert(id.clone(), v.doc.clone());
                Ok(v.doc.clone())
            }
            None => {
                self.reads
                    .entry(DocKey::Investment(id.clone()))
                    .or_insert(0);
                Err(LedgerError::InvestmentNotFound)
            }
        }
    }

    /// Resolves a referral code inside the unit. Index entries are
    /// immutable, so no version is recorded for the lookup itself.
    pub fn lookup_referrer(&self, code: &ReferralCode) -> Option<UserId> {
        self.store.resolve_referral(code)
    }

    /// Stages an update to a previously read user document.
    pub fn put_user(&mut self, user: User) -> Result<(), LedgerError> {
        user.validate()?;
        debug_assert!(
            self.reads.contains_key(&DocKey::User(user.id.clone())),
            "put_user without a prior read in this unit"
        );
        self.dirty_users.insert(user.id.clone());
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    /// Stages an update to a previously read transaction document.
    pub fn put_transaction(&mut self, tx: Transaction) -> Result<(), LedgerError> {
        tx.validate()?;
        debug_assert!(
            self.reads.contains_key(&DocKey::Tx(tx.id.clone())),
            "put_transaction without a prior read in this unit"
        );
        self.dirty_transactions.insert(tx.id.clone());
        self.transactions.insert(tx.id.clone(), tx);
        Ok(())
    }

    /// Stages an update to a previously read investment document.
    pub fn put_investment(&mut self, inv: Investment) -> Result<(), LedgerError> {
        inv.validate()?;
        debug_assert!(
            self.reads.contains_key(&DocKey::Investment(inv.id.clone())),
            "put_investment without a prior read in this unit"
        );
        self.dirty_investments.insert(inv.id.clone());
        self.investments.insert(inv.id.clone(), inv);
        Ok(())
    }

    /// Stages a brand-new transaction document.
    ///
    /// # Errors
    ///
    /// [`LedgerError::DuplicateTransaction`] if the id already exists.
    pub fn insert_transaction(&mut self, tx: Transaction) -> Result<(), LedgerError> {
        tx.validate()?;
        if self.transactions.contains_key(&tx.id) || self.store.transactions.contains_key(&tx.id) {
            return Err(LedgerError::DuplicateTransaction);
        }
        // Expect the slot to still be vacant at commit.
        self.reads.insert(DocKey::Tx(tx.id.clone()), 0);
        self.dirty_transactions.insert(tx.id.clone());
        self.transactions.insert(tx.id.clone(), tx);
        Ok(())
    }

    /// Stages a brand-new investment document.
    ///
    /// # Errors
    ///
    /// [`LedgerError::DuplicateDocument`] if the id already exists.
    pub fn insert_investment(&mut self, inv: Investment) -> Result<(), LedgerError> {
        inv.validate()?;
        if self.investments.contains_key(&inv.id) || self.store.investments.contains_key(&inv.id) {
            return Err(LedgerError::DuplicateDocument);
        }
        self.reads.insert(DocKey::Investment(inv.id.clone()), 0);
        self.dirty_investments.insert(inv.id.clone());
        self.investments.insert(inv.id.clone(), inv);
        Ok(())
    }

    /// Validates every recorded read and applies all staged writes.
    fn commit(mut self) -> Result<(), LedgerError> {
        let store = self.store;
        let _guard = store.commit_lock.lock();

        for (key, expected) in &self.reads {
            if store.version_of(key) != *expected {
                return Err(LedgerError::Conflict);
            }
        }

        for id in self.dirty_users.drain() {
            let doc = self.users.remove(&id).expect("staged user missing");
            let version = store.users.get(&id).map_or(0, |v| v.version) + 1;
            store.users.insert(id, Versioned { version, doc });
        }
        for id in self.dirty_transactions.drain() {
            let doc = self.transactions.remove(&id).expect("staged transaction missing");
            let version = store.transactions.get(&id).map_or(0, |v| v.version) + 1;
            store.transactions.insert(id, Versioned { version, doc });
        }
        for id in self.dirty_investments.drain() {
            let doc = self.investments.remove(&id).expect("staged investment missing");
            let version = store.investments.get(&id).map_or(0, |v| v.version) + 1;
            store.investments.insert(id, Versioned { version, doc });
        }

        Ok(())
    }
}
