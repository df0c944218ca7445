//! Region identities with parity bookkeeping.

pub(crate) mod allocator;
