//! Per-key exclusive sections.
//!
//! One mutex per (warehouse, product) key, created on first use and kept for
//! the registry's lifetime. Unrelated keys never contend; acquisition is
//! bounded and surfaces `Busy` instead of waiting forever.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

use stockbook_core::{DomainError, DomainResult};

use crate::balance::BalanceKey;

/// Exclusive hold on one balance key. Dropping releases the section.
pub struct KeyGuard {
    _guard: ArcMutexGuard<RawMutex, ()>,
}

impl std::fmt::Debug for KeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGuard").finish_non_exhaustive()
    }
}

/// Registry of per-key mutexes.
#[derive(Debug, Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<BalanceKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: BalanceKey) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock();
        slots.entry(key).or_default().clone()
    }

    /// Acquire one key within `timeout`, or fail with `Busy` having written
    /// nothing.
    pub fn acquire(&self, key: BalanceKey, timeout: Duration) -> DomainResult<KeyGuard> {
        let slot = self.slot(key);
        let guard = slot
            .try_lock_arc_for(timeout)
            .ok_or_else(|| DomainError::busy(format!("balance key {key} is locked")))?;
        Ok(KeyGuard { _guard: guard })
    }

    /// Acquire two distinct keys in the deterministic global key order,
    /// never in call order. Opposing concurrent transfers therefore request
    /// the pair in the same order and cannot deadlock each other.
    ///
    /// Returns the guards in call order. The keys must differ.
    pub fn acquire_pair(
        &self,
        a: BalanceKey,
        b: BalanceKey,
        timeout: Duration,
    ) -> DomainResult<(KeyGuard, KeyGuard)> {
        debug_assert_ne!(a, b, "acquire_pair requires distinct keys");

        if a <= b {
            let first = self.acquire(a, timeout)?;
            let second = self.acquire(b, timeout)?;
            Ok((first, second))
        } else {
            let second = self.acquire(b, timeout)?;
            let first = self.acquire(a, timeout)?;
            Ok((first, second))
        }
    }
}
