use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rolegate_domain::{PermissionCode, UserId};

#[derive(Debug, Default)]
struct CacheSlot {
    generation: u64,
    permissions: Option<Arc<BTreeSet<PermissionCode>>>,
}

/// Per-user effective-permission cache.
///
/// Every user key carries a generation counter. Invalidation bumps the
/// generation and drops the cached set; a fill records the generation it
/// started from and is discarded when an invalidation intervened, so a
/// slow concurrent read can never resurrect a just-revoked permission.
/// The lock guards plain map operations only; no I/O happens while it is
/// held.
///
/// Invalidated slots are retained as generation tombstones rather than
/// removed: dropping a slot would reset its generation, and a fill that
/// began before the drop could then store a revoked set into the fresh
/// slot. The map therefore grows with the set of user ids ever queried,
/// deleted users included. Bounding it would need a grace period longer
/// than any in-flight fill; with one slot per user the retention cost is
/// accepted instead.
#[derive(Debug, Default)]
pub(crate) struct PermissionCache {
    slots: Mutex<HashMap<UserId, CacheSlot>>,
}

impl PermissionCache {
    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, CacheSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached set for the user, if one is current.
    pub(crate) fn get(&self, user_id: UserId) -> Option<Arc<BTreeSet<PermissionCode>>> {
        self.lock()
            .get(&user_id)
            .and_then(|slot| slot.permissions.clone())
    }

    /// Returns the generation a fill for this user starts from.
    pub(crate) fn fill_generation(&self, user_id: UserId) -> u64 {
        self.lock().get(&user_id).map_or(0, |slot| slot.generation)
    }

    /// Stores a filled set unless the user was invalidated after the fill
    /// began.
    pub(crate) fn store_if_current(
        &self,
        user_id: UserId,
        generation: u64,
        permissions: Arc<BTreeSet<PermissionCode>>,
    ) {
        let mut slots = self.lock();
        let slot = slots.entry(user_id).or_default();
        if slot.generation == generation {
            slot.permissions = Some(permissions);
        }
    }

    /// Drops the cached set for one user and bumps its generation.
    pub(crate) fn invalidate(&self, user_id: UserId) {
        let mut slots = self.lock();
        invalidate_slot(slots.entry(user_id).or_default());
    }

    /// Drops the cached sets for several users in one critical section.
    pub(crate) fn invalidate_many(&self, users: &[UserId]) {
        let mut slots = self.lock();
        for user_id in users {
            invalidate_slot(slots.entry(*user_id).or_default());
        }
    }

    /// Drops every cached set. Last resort when the affected user set
    /// cannot be determined.
    pub(crate) fn invalidate_all(&self) {
        let mut slots = self.lock();
        for slot in slots.values_mut() {
            invalidate_slot(slot);
        }
    }
}

fn invalidate_slot(slot: &mut CacheSlot) {
    slot.generation += 1;
    slot.permissions = None;
}
