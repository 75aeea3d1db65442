//! Compatibility predicates between a requested and an actual tag.
//!
//! Each predicate takes raw codes as handed over by the runtime. The actual
//! value must be a member of its closed enumeration; the requested value
//! matches when it is the wildcard or the same member. Anything outside the
//! enumeration fails closed.

use super::{Family, Protocol, SocketType};

/// Whether a resource of family `actual` satisfies a request for `requested`.
pub fn check_family(actual: i32, requested: i32) -> bool {
    match Family::try_from(actual) {
        Ok(actual) => requested == Family::Unspec.code() || requested == actual.code(),
        Err(_) => false,
    }
}

/// Whether a resource of socket type `actual` satisfies a request for `requested`.
pub fn check_type(actual: i32, requested: i32) -> bool {
    match SocketType::try_from(actual) {
        Ok(actual) => requested == SocketType::Any.code() || requested == actual.code(),
        Err(_) => false,
    }
}

/// Whether a resource speaking `actual` satisfies a request for `requested`.
pub fn check_protocol(actual: i32, requested: i32) -> bool {
    match Protocol::try_from(actual) {
        Ok(actual) => requested == Protocol::Any.code() || requested == actual.code(),
        Err(_) => false,
    }
}
