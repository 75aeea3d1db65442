//! Supported (family, type, protocol) combinations.
//!
//! The matching rule follows the BSD `getaddrinfo(3)` explore table: a
//! wildcard socket type never selects raw sockets.

use crate::protocol::{Family, Protocol, SocketType};

/// One socket configuration the host supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Solution {
    pub family: Family,
    pub socket_type: SocketType,
    pub protocol: Protocol,
}

impl Solution {
    pub const fn new(family: Family, socket_type: SocketType, protocol: Protocol) -> Self {
        Self {
            family,
            socket_type,
            protocol,
        }
    }

    /// Whether this solution satisfies a request triple.
    pub fn accepts(&self, family: Family, socket_type: SocketType, protocol: Protocol) -> bool {
        (family == Family::Unspec || family == self.family)
            && ((socket_type == SocketType::Any && self.socket_type != SocketType::Raw)
                || socket_type == self.socket_type)
            && (protocol == Protocol::Any || protocol == self.protocol)
    }
}

/// The ordered solution table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionTable {
    solutions: Vec<Solution>,
    prefer_ipv4: bool,
}

impl SolutionTable {
    /// Build the table for the given family preference.
    pub fn new(prefer_ipv4: bool) -> Self {
        let solutions = Self::family_order(prefer_ipv4)
            .into_iter()
            .flat_map(|family| {
                [
                    Solution::new(family, SocketType::Dgram, Protocol::Udp),
                    Solution::new(family, SocketType::Stream, Protocol::Tcp),
                    Solution::new(family, SocketType::Raw, Protocol::Any),
                ]
            })
            .collect();

        Self {
            solutions,
            prefer_ipv4,
        }
    }

    /// IP families, most preferred first.
    pub fn family_order(prefer_ipv4: bool) -> [Family; 2] {
        if prefer_ipv4 {
            [Family::Inet, Family::Inet6]
        } else {
            [Family::Inet6, Family::Inet]
        }
    }

    pub fn prefers_ipv4(&self) -> bool {
        self.prefer_ipv4
    }

    /// Families in this table's preference order.
    pub fn families(&self) -> [Family; 2] {
        Self::family_order(self.prefer_ipv4)
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    /// Solutions accepting the request, in table order.
    pub fn find_all(
        &self,
        family: Family,
        socket_type: SocketType,
        protocol: Protocol,
    ) -> impl Iterator<Item = &Solution> + '_ {
        self.solutions
            .iter()
            .filter(move |s| s.accepts(family, socket_type, protocol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_follows_preference() {
        let table = SolutionTable::new(false);
        let families: Vec<_> = table.solutions().iter().map(|s| s.family).collect();
        assert_eq!(
            families,
            [Family::Inet6, Family::Inet6, Family::Inet6, Family::Inet, Family::Inet, Family::Inet]
        );

        let table = SolutionTable::new(true);
        assert_eq!(table.solutions()[0], Solution::new(Family::Inet, SocketType::Dgram, Protocol::Udp));
        assert_eq!(table.solutions()[1], Solution::new(Family::Inet, SocketType::Stream, Protocol::Tcp));
        assert_eq!(table.solutions()[2], Solution::new(Family::Inet, SocketType::Raw, Protocol::Any));
        assert_eq!(table.solutions().len(), 6);
    }

    #[test]
    fn every_solution_accepts_its_own_triple() {
        for prefer_ipv4 in [false, true] {
            for s in SolutionTable::new(prefer_ipv4).solutions() {
                assert!(s.accepts(s.family, s.socket_type, s.protocol), "{s:?}");
            }
        }
    }

    #[test]
    fn wildcard_type_skips_raw() {
        let table = SolutionTable::new(true);
        let found: Vec<_> = table
            .find_all(Family::Inet, SocketType::Any, Protocol::Any)
            .map(|s| s.socket_type)
            .collect();
        assert_eq!(found, [SocketType::Dgram, SocketType::Stream]);
    }

    #[test]
    fn raw_must_be_asked_for() {
        let table = SolutionTable::new(false);
        let found: Vec<_> = table
            .find_all(Family::Unspec, SocketType::Raw, Protocol::Any)
            .map(|s| s.family)
            .collect();
        assert_eq!(found, [Family::Inet6, Family::Inet]);
    }

    #[test]
    fn protocol_narrows() {
        let table = SolutionTable::new(false);
        let found: Vec<_> = table
            .find_all(Family::Unspec, SocketType::Any, Protocol::Tcp)
            .copied()
            .collect();
        assert_eq!(
            found,
            [
                Solution::new(Family::Inet6, SocketType::Stream, Protocol::Tcp),
                Solution::new(Family::Inet, SocketType::Stream, Protocol::Tcp),
            ]
        );
        assert_eq!(table.find_all(Family::Inet, SocketType::Dgram, Protocol::Tcp).count(), 0);
    }
}
