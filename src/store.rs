//! A bounded, per-thread freelist of recycled branch-node shells.
//!
//! Rust's global allocator already amortizes small, same-sized allocations
//! reasonably well, but the rope restructures `Branch` nodes constantly
//! during insert/delete/split/concat, so recycling the heap storage behind
//! them avoids a measurable amount of allocator churn on an editing-heavy
//! workload. The freelist holds boxed shells whose fields are always fully
//! overwritten before reuse; nothing reads a shell's stale contents.
//!
//! Leaf byte buffers are never pooled here — they vary too much in size for
//! a fixed-capacity freelist to help, and `Vec<u8>` already reuses its own
//! backing storage across a leaf's lifetime.

use std::cell::RefCell;

use crate::node::Branch;

/// Upper bound on the number of recycled branch shells kept alive per
/// thread (see SPEC_FULL §6, `FREELIST_CAPACITY`).
pub const FREELIST_CAPACITY: usize = 512;

thread_local! {
    static FREELIST: RefCell<Vec<Box<Branch>>> = const { RefCell::new(Vec::new()) };
}

/// Takes a recycled shell from the freelist, if one is available.
///
/// The returned shell's fields are not meaningful; the caller must
/// overwrite every field before use.
pub fn take_shell() -> Option<Box<Branch>> {
    FREELIST.with(|list| list.borrow_mut().pop())
}

/// Returns a retired branch to the freelist for reuse, unless it is
/// already at capacity, in which case the shell is dropped normally.
pub fn recycle(mut shell: Box<Branch>) {
    FREELIST.with(|list| {
        let mut list = list.borrow_mut();
        if list.len() < FREELIST_CAPACITY {
            shell.reset();
            list.push(shell);
        }
        // else: drop `shell` here, freeing it outright.
    });
}

/// Number of shells currently parked in this thread's freelist. Exposed
/// for tests; not part of the rope's public API.
#[cfg(test)]
pub fn len() -> usize {
    FREELIST.with(|list| list.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Color, Node};

    fn dummy_branch() -> Box<Branch> {
        Box::new(Branch {
            left: Node::empty_leaf(),
            right: Node::empty_leaf(),
            left_bytes: 0,
            left_chars: 0,
            left_newlines: 0,
            color: Color::Black,
        })
    }

    #[test]
    fn recycled_shells_are_reused() {
        let before = len();
        let shell = dummy_branch();
        recycle(shell);
        assert_eq!(len(), before + 1);
        let reused = take_shell();
        assert!(reused.is_some());
        assert_eq!(len(), before);
    }

    #[test]
    fn freelist_is_bounded() {
        // Drain whatever is currently parked so the count below is exact.
        while take_shell().is_some() {}
        for _ in 0..FREELIST_CAPACITY + 10 {
            recycle(dummy_branch());
        }
        assert_eq!(len(), FREELIST_CAPACITY);
    }
}
