//! The per-fragment-ID context pool.
//!
//! Grounded on `rubble::link::channel_map::ChannelMap`'s "one bit per slot, in a fixed-size
//! array" pattern, generalized from a 37-channel static usage map to an 8-context free/busy
//! bitmap, and on `rubble::link::features::FeatureSet` for using the `bitflags` crate to back
//! that bitmap (rather than the raw `u8` + manual shifts `ChannelMap` uses for its larger map).
//!
//! Transmitter and Receiver each own one `ContextPool`, parameterized over their own context type
//! (`transmitter::TxContext` / `receiver::RxContext`) so each direction has its own state shape
//! instead of sharing one struct distinguished by a runtime tag.

use bitflags::bitflags;

/// Number of fragment IDs (and contexts) supported per link.
pub const NUM_CONTEXTS: usize = 8;

bitflags! {
    /// One bit per context, set when that context is free (state `UNINIT`).
    ///
    /// This mask and each context's own state must stay consistent; it is mutated only by
    /// `ContextPool::acquire`/`acquire_any_free`/`release`.
    struct FreeMask: u8 {
        const FRAG_0 = 1 << 0;
        const FRAG_1 = 1 << 1;
        const FRAG_2 = 1 << 2;
        const FRAG_3 = 1 << 3;
        const FRAG_4 = 1 << 4;
        const FRAG_5 = 1 << 5;
        const FRAG_6 = 1 << 6;
        const FRAG_7 = 1 << 7;
        const ALL = 0xFF;
    }
}

impl FreeMask {
    fn bit(frag_id: u8) -> Self {
        Self::from_bits_truncate(1 << frag_id)
    }
}

/// Returned by `acquire` when the requested context is already in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Busy;

/// Returned by `acquire_any_free` when every context is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exhausted;

/// A fixed pool of `NUM_CONTEXTS` contexts of type `C`, each named by a 3-bit fragment ID.
pub struct ContextPool<C> {
    contexts: [C; NUM_CONTEXTS],
    free: FreeMask,
    /// Where `acquire_any_free` resumes its rotating search.
    next_search: u8,
}

impl<C: Default> ContextPool<C> {
    /// Creates a pool with all contexts free.
    pub fn new() -> Self {
        Self {
            contexts: Default::default(),
            free: FreeMask::ALL,
            next_search: 0,
        }
    }
}

impl<C> ContextPool<C> {
    /// Returns whether `frag_id`'s context is free.
    pub fn is_free(&self, frag_id: u8) -> bool {
        self.free.contains(FreeMask::bit(frag_id))
    }

    /// Returns a reference to `frag_id`'s context regardless of its free/busy state.
    pub fn get(&self, frag_id: u8) -> &C {
        &self.contexts[usize::from(frag_id)]
    }

    /// Returns a mutable reference to `frag_id`'s context regardless of its free/busy state.
    pub fn get_mut(&mut self, frag_id: u8) -> &mut C {
        &mut self.contexts[usize::from(frag_id)]
    }

    /// Marks `frag_id`'s context busy and returns it, failing if it was already in use.
    pub fn acquire(&mut self, frag_id: u8) -> Result<&mut C, Busy> {
        let bit = FreeMask::bit(frag_id);
        if !self.free.contains(bit) {
            return Err(Busy);
        }
        self.free.remove(bit);
        Ok(&mut self.contexts[usize::from(frag_id)])
    }

    /// Finds any free context, starting the search from the last-used position and wrapping
    /// around, marks it busy, and returns its fragment ID along with it.
    pub fn acquire_any_free(&mut self) -> Result<(u8, &mut C), Exhausted> {
        for offset in 0..NUM_CONTEXTS as u8 {
            let frag_id = (self.next_search + offset) % NUM_CONTEXTS as u8;
            if self.free.contains(FreeMask::bit(frag_id)) {
                self.free.remove(FreeMask::bit(frag_id));
                self.next_search = (frag_id + 1) % NUM_CONTEXTS as u8;
                return Ok((frag_id, &mut self.contexts[usize::from(frag_id)]));
            }
        }
        Err(Exhausted)
    }

    /// Returns `frag_id`'s context to the free pool, resetting it to its default state.
    ///
    /// Idempotent: releasing an already-free context is a no-op beyond resetting its contents.
    pub fn release(&mut self, frag_id: u8)
    where
        C: Default,
    {
        self.free.insert(FreeMask::bit(frag_id));
        self.contexts[usize::from(frag_id)] = C::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, PartialEq, Debug)]
    struct Dummy(u32);

    #[test]
    fn acquire_marks_busy() {
        let mut pool: ContextPool<Dummy> = ContextPool::new();
        assert!(pool.is_free(3));
        pool.acquire(3).unwrap();
        assert!(!pool.is_free(3));
        assert_eq!(pool.acquire(3), Err(Busy));
    }

    #[test]
    fn release_frees_and_resets() {
        let mut pool: ContextPool<Dummy> = ContextPool::new();
        pool.acquire(1).unwrap().0 = 42;
        pool.release(1);
        assert!(pool.is_free(1));
        assert_eq!(*pool.get(1), Dummy(0));
    }

    #[test]
    fn acquire_any_free_rotates_and_exhausts() {
        let mut pool: ContextPool<Dummy> = ContextPool::new();
        for i in 0..NUM_CONTEXTS as u8 {
            let (frag_id, _) = pool.acquire_any_free().unwrap();
            assert_eq!(frag_id, i);
        }
        assert_eq!(pool.acquire_any_free().err(), Some(Exhausted));
        pool.release(4);
        let (frag_id, _) = pool.acquire_any_free().unwrap();
        assert_eq!(frag_id, 4);
    }
}
