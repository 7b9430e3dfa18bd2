// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use tokio::sync::OwnedSemaphorePermit;

/// Traits to implement database transaction provider.
///
/// To guard against sharing transactions unknowingly across unrelated database queries, a concept
/// of a "permit" was introduced which does not protect from misuse but helps to make "holding" a
/// transaction explicit.
///
/// Only handles returned by `transactional` take part in the open transaction: they write into it
/// and read its uncommitted state. Every other handle of the same store keeps reading committed
/// state, so parallel readers never observe half-applied changes.
pub trait Transaction {
    type Error: Error;

    type Permit;

    /// Begins a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Permit, Self::Error>>;

    /// Rolls back the transaction and with that all uncommitted changes.
    fn rollback(&self, permit: Self::Permit) -> impl Future<Output = Result<(), Self::Error>>;

    /// Commits the transaction.
    fn commit(&self, permit: Self::Permit) -> impl Future<Output = Result<(), Self::Error>>;

    /// Handle on the same store which writes into and reads from the open transaction.
    ///
    /// Writes through any other handle fail.
    fn transactional(&self) -> Self
    where
        Self: Sized;
}

/// Proof of holding the only open transaction of a store.
///
/// A permit must always be handed back through `commit` or `rollback`. Dropping it otherwise
/// leaves a dangling transaction behind which the next `begin` refuses to replace.
#[allow(unused)]
pub struct TransactionPermit(pub(crate) OwnedSemaphorePermit);
