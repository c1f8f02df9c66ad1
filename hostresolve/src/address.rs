//! Address-list builder (spec section 4.2).
//!
//! The original implementation links one heap node per address, each sized
//! to hold an `addrinfo`-shaped struct plus the socket-address bytes plus a
//! null-terminated canonical name, and merges multiple host-entry records by
//! prepending the newest entry's nodes onto the accumulated list. A `Vec` is
//! the idiomatic Rust counterpart: the original list is only ever walked
//! front-to-back or prepended to, both of which a `Vec` expresses directly
//! without per-node allocation.

use std::net::SocketAddr;

use smallvec::SmallVec;

/// Address family, mirroring the two families the engine understands.
/// Anything else is an `AddrFamilyUnsupported` error, never a value here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Ipv4,
    Ipv6,
}

impl Family {
    pub fn of(addr: &SocketAddr) -> Option<Family> {
        match addr {
            SocketAddr::V4(_) => Some(Family::Ipv4),
            SocketAddr::V6(_) => Some(Family::Ipv6),
        }
    }
}

/// One resolved address record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub family: Family,
    pub addr: SocketAddr,
    pub canonical_name: Option<String>,
}

/// Accumulates addresses from one or more resolver sub-queries (the A and
/// AAAA legs of a Happy-Eyeballs forward lookup), newest entries first, the
/// same order the original C accumulator produces. A lookup almost never
/// carries more than a handful of records, so the backing storage is inline
/// up to 4 entries before spilling to the heap, the same sizing the teacher
/// crate reaches for on its own small, per-lookup collections.
#[derive(Debug, Default, Clone)]
pub struct AddressList {
    addresses: SmallVec<[Address; 4]>,
}

impl AddressList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend every address carried by one resolver answer.
    pub fn prepend_entry(&mut self, canonical_name: Option<&str>, addrs: impl IntoIterator<Item = SocketAddr>) {
        let mut fresh: SmallVec<[Address; 4]> = addrs
            .into_iter()
            .filter_map(|addr| {
                Family::of(&addr).map(|family| Address {
                    family,
                    addr,
                    canonical_name: canonical_name.map(str::to_owned),
                })
            })
            .collect();
        fresh.extend(std::mem::take(&mut self.addresses));
        self.addresses = fresh;
    }

    pub fn into_vec(self) -> Vec<Address> {
        self.addresses.into_vec()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.addresses.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn prepend_puts_newest_entry_first() {
        let mut list = AddressList::new();
        list.prepend_entry(
            Some("a.test"),
            vec![SocketAddr::new(Ipv4Addr::new(1, 1, 1, 1).into(), 0)],
        );
        list.prepend_entry(
            Some("b.test"),
            vec![SocketAddr::new(Ipv6Addr::LOCALHOST.into(), 0)],
        );
        let addrs = list.into_vec();
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[0].canonical_name.as_deref(), Some("b.test"));
        assert_eq!(addrs[0].family, Family::Ipv6);
        assert_eq!(addrs[1].canonical_name.as_deref(), Some("a.test"));
    }

    #[test]
    fn unsupported_family_entries_are_silently_dropped() {
        // SocketAddr in std only ever produces V4/V6, so this documents the
        // invariant rather than exercising a third branch: nothing here can
        // construct an "unsupported family" SocketAddr to drop.
        let list = AddressList::new();
        assert!(list.is_empty());
    }
}
