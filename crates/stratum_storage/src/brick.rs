//! Coalesced open-addressing hash brick with a cellar.
//!
//! A brick is a fixed block of slots. The first ~86% of slots form the
//! address region — the home slot for a key is `hash(key) mod home_count`.
//! The remaining ~14% is the cellar: overflow space claimed from the high
//! end of the block, one slot at a time, and linked into the colliding
//! chain through per-slot `next` indices. When the cellar runs dry, claims
//! keep descending into the address region and chains coalesce; lookups
//! stay correct because walks match on the stored key, not the position.
//!
//! Deletion clears a slot in place and, when the slot is a chain tail,
//! unlinks it and returns it to a reclaim list. Chains never shrink in the
//! middle, so a walk started from any home slot still visits every live
//! key it could have reached before the deletion.
//!
//! The pool backend strings multiple bricks together: a chain that cannot
//! grow inside its brick ends in the [`NEXT_BRICK`] sentinel, telling the
//! walker to continue at the key's home slot in the following brick.

use stratum_core::Entity;

/// Chain terminator: no further slot.
const NO_NEXT: u32 = u32::MAX;

/// Chain sentinel: the walk continues at the key's home slot in the next
/// brick of the pool.
const NEXT_BRICK: u32 = u32::MAX - 1;

/// Result of probing a brick for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    /// The key lives at this slot index.
    Found(usize),
    /// The chain ended inside this brick; the key is nowhere.
    Absent,
    /// The chain overflowed; continue probing the next brick.
    ContinueNext,
}

#[derive(Debug)]
struct Slot<T> {
    key: Entity,
    value: Option<T>,
    next: u32,
}

impl<T> Slot<T> {
    fn vacant() -> Self {
        Self {
            key: Entity::NIL,
            value: None,
            next: NO_NEXT,
        }
    }
}

/// One fixed-capacity coalesced-hash block.
#[derive(Debug)]
pub(crate) struct Brick<T> {
    slots: Vec<Slot<T>>,
    home_count: usize,
    /// Next candidate for a cellar claim; scans downward from the top.
    cursor: usize,
    /// Slots that were claimed, emptied and unlinked — reusable as-is.
    reclaimed: Vec<u32>,
    /// Marks slots that have ever held a value, so the cursor only ever
    /// claims virgin slots and cannot collide with the reclaim list.
    touched: Vec<bool>,
    len: usize,
}

impl<T> Brick<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        assert!(capacity >= 4, "brick capacity must be at least 4");
        let home_count = (capacity * 86 / 100).max(1);
        Self {
            slots: (0..capacity).map(|_| Slot::vacant()).collect(),
            home_count,
            cursor: capacity,
            reclaimed: Vec::new(),
            touched: vec![false; capacity],
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    fn home(&self, entity: Entity) -> usize {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        entity.hash(&mut hasher);
        (hasher.finish() % self.home_count as u64) as usize
    }

    /// Walk the chain rooted at the key's home slot.
    pub(crate) fn probe(&self, entity: Entity) -> Probe {
        let mut idx = self.home(entity);
        loop {
            let slot = &self.slots[idx];
            if slot.value.is_some() && slot.key == entity {
                return Probe::Found(idx);
            }
            match slot.next {
                NO_NEXT => return Probe::Absent,
                NEXT_BRICK => return Probe::ContinueNext,
                n => idx = n as usize,
            }
        }
    }

    pub(crate) fn value(&self, idx: usize) -> Option<&T> {
        self.slots[idx].value.as_ref()
    }

    pub(crate) fn value_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.slots[idx].value.as_mut()
    }

    /// Claim a free slot: reclaimed slots first, then virgin slots from
    /// the high end of the block downward.
    fn claim_free(&mut self) -> Option<usize> {
        if let Some(idx) = self.reclaimed.pop() {
            return Some(idx as usize);
        }
        while self.cursor > 0 {
            self.cursor -= 1;
            if !self.touched[self.cursor] {
                return Some(self.cursor);
            }
        }
        None
    }

    fn occupy(&mut self, idx: usize, entity: Entity, value: T) {
        let slot = &mut self.slots[idx];
        slot.key = entity;
        slot.value = Some(value);
        self.touched[idx] = true;
        self.len += 1;
    }

    /// Insert a key known to be absent from the whole pool.
    ///
    /// On success the slot is linked into the key's chain. If no free slot
    /// remains, the value is handed back; with `chain_to_next` set, the
    /// chain tail is first marked with [`NEXT_BRICK`] so walks continue
    /// into the following brick (where the caller will insert instead).
    pub(crate) fn insert_new(
        &mut self,
        entity: Entity,
        value: T,
        chain_to_next: bool,
    ) -> Result<(), T> {
        let mut idx = self.home(entity);
        let tail = loop {
            if self.slots[idx].value.is_none() {
                // Reuse an emptied slot already on the chain path. The
                // slot may also sit on the reclaim list (a trimmed tail
                // in the address region is still some key's home); it
                // must not be handed out a second time by `claim_free`.
                self.reclaimed.retain(|&r| r as usize != idx);
                self.occupy(idx, entity, value);
                return Ok(());
            }
            match self.slots[idx].next {
                NO_NEXT => break idx,
                // Chain already overflows; this brick cannot take the key.
                NEXT_BRICK => return Err(value),
                n => idx = n as usize,
            }
        };
        match self.claim_free() {
            Some(free) => {
                self.occupy(free, entity, value);
                self.slots[tail].next = free as u32;
                Ok(())
            }
            None => {
                if chain_to_next {
                    self.slots[tail].next = NEXT_BRICK;
                }
                Err(value)
            }
        }
    }

    /// Remove a key from this brick, if its chain holds it.
    ///
    /// The slot is cleared in place so the chain structure stays walkable;
    /// the empty tail suffix of the chain is then trimmed back into the
    /// free pool. `Err(())` reports a chain that continues in the next
    /// brick without holding the key here.
    pub(crate) fn remove(&mut self, entity: Entity) -> Result<Option<T>, ()> {
        let home = self.home(entity);
        let mut idx = home;
        loop {
            let slot = &self.slots[idx];
            if slot.value.is_some() && slot.key == entity {
                let value = self.slots[idx].value.take();
                self.slots[idx].key = Entity::NIL;
                self.len -= 1;
                self.trim_chain(home);
                return Ok(value);
            }
            match slot.next {
                NO_NEXT => return Ok(None),
                NEXT_BRICK => return Err(()),
                n => idx = n as usize,
            }
        }
    }

    /// Unlink and reclaim the empty suffix of a chain.
    ///
    /// The home slot is never reclaimed (it anchors the chain), and a
    /// chain that continues into the next brick is left alone — the
    /// sentinel must survive for cross-brick walks.
    fn trim_chain(&mut self, home: usize) {
        let mut path = vec![home];
        let mut idx = home;
        loop {
            match self.slots[idx].next {
                NO_NEXT => break,
                NEXT_BRICK => return,
                n => {
                    idx = n as usize;
                    path.push(idx);
                }
            }
        }
        let cut = path
            .iter()
            .rposition(|&i| self.slots[i].value.is_some())
            .map_or(1, |last_live| last_live + 1);
        if cut >= path.len() {
            return;
        }
        self.slots[path[cut - 1]].next = NO_NEXT;
        for &i in &path[cut..] {
            self.slots[i] = Slot::vacant();
            self.reclaimed.push(i as u32);
        }
    }

    pub(crate) fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::vacant();
        }
        self.touched.fill(false);
        self.reclaimed.clear();
        self.cursor = self.slots.len();
        self.len = 0;
    }
}
