//! Address and compatibility queries shared by sockets and listeners.

use super::ChannelError;
use crate::addr::Address;
use crate::protocol::{check_family, check_protocol, check_type, Family, Protocol, SocketType};

pub trait Endpoint {
    fn local_address(&self) -> Result<Address, ChannelError>;

    fn peer_address(&self) -> Result<Address, ChannelError>;

    /// Concrete (family, type, protocol) of the underlying socket.
    fn triple(&self) -> (Family, SocketType, Protocol);

    /// Whether this handle satisfies a requested triple of raw codes.
    fn accepts(&self, family: i32, socket_type: i32, protocol: i32) -> bool {
        let (f, t, p) = self.triple();
        check_family(f.code(), family)
            && check_type(t.code(), socket_type)
            && check_protocol(p.code(), protocol)
    }
}
