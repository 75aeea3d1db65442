//! Local network interface tables.
//!
//! Thin wrappers over `if_nametoindex(3)`, `if_indextoname(3)` and
//! `getifaddrs(3)`.

use std::io;

/// Which IP families are configured on at least one local interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalFamilies {
    pub inet: bool,
    pub inet6: bool,
}

impl LocalFamilies {
    /// Both families assumed present.
    pub const ALL: LocalFamilies = LocalFamilies { inet: true, inet6: true };

    /// Neither family present.
    pub const NONE: LocalFamilies = LocalFamilies { inet: false, inet6: false };
}

/// Interface index for `name`, if such an interface exists.
#[cfg(unix)]
pub fn index_of(name: &str) -> Option<u32> {
    let name = std::ffi::CString::new(name).ok()?;
    // SAFETY: `name` is a valid NUL-terminated string for the duration of the call.
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    (index != 0).then_some(index)
}

/// Interface name for `index`, if the index still names an interface.
#[cfg(unix)]
pub fn name_of(index: u32) -> Option<String> {
    let mut buf = [0 as libc::c_char; libc::IF_NAMESIZE];
    // SAFETY: `buf` is IF_NAMESIZE bytes, the size if_indextoname requires.
    let ptr = unsafe { libc::if_indextoname(index, buf.as_mut_ptr()) };
    if ptr.is_null() {
        return None;
    }
    // SAFETY: on success the buffer holds a NUL-terminated name.
    let name = unsafe { std::ffi::CStr::from_ptr(buf.as_ptr()) };
    Some(name.to_string_lossy().into_owned())
}

/// Scan every local interface address once.
#[cfg(unix)]
pub fn local_families() -> io::Result<LocalFamilies> {
    let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
    // SAFETY: getifaddrs writes a list head we free below.
    if unsafe { libc::getifaddrs(&mut head) } != 0 {
        return Err(io::Error::last_os_error());
    }

    let mut found = LocalFamilies::NONE;
    let mut cursor = head;
    while !cursor.is_null() {
        // SAFETY: cursor walks the list returned by getifaddrs.
        let entry = unsafe { &*cursor };
        if !entry.ifa_addr.is_null() {
            // SAFETY: ifa_addr is non-null and points to at least a sockaddr header.
            let family = i32::from(unsafe { (*entry.ifa_addr).sa_family });
            match family {
                libc::AF_INET => found.inet = true,
                libc::AF_INET6 => found.inet6 = true,
                _ => {}
            }
        }
        cursor = entry.ifa_next;
    }

    // SAFETY: head came from a successful getifaddrs call.
    unsafe { libc::freeifaddrs(head) };
    Ok(found)
}

#[cfg(not(unix))]
pub fn index_of(name: &str) -> Option<u32> {
    name.parse().ok()
}

#[cfg(not(unix))]
pub fn name_of(_index: u32) -> Option<String> {
    None
}

#[cfg(not(unix))]
pub fn local_families() -> io::Result<LocalFamilies> {
    Ok(LocalFamilies::ALL)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn loopback_interface_round_trips() {
        // Linux calls it "lo", the BSDs "lo0".
        let Some((name, index)) = ["lo", "lo0"]
            .iter()
            .find_map(|name| index_of(name).map(|index| (*name, index)))
        else {
            return;
        };
        assert_eq!(name_of(index).as_deref(), Some(name));
    }

    #[test]
    fn unknown_names_have_no_index() {
        assert_eq!(index_of("definitely-not-an-interface0"), None);
        assert_eq!(index_of("bad\0name"), None);
    }

    #[test]
    fn some_family_is_configured() {
        let families = local_families().unwrap();
        assert!(families.inet || families.inet6);
    }
}
