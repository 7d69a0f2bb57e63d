/// Multicast socket setup
use anyhow::{anyhow, Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6};
use tokio::net::UdpSocket;

/// Matches the 64 KiB read buffer a datagram of maximum size needs.
const RECV_BUFFER_SIZE: usize = 64 * 1024;

/// The two sockets a session runs on: `recv` is bound and joined to the
/// group, `send` is a plain socket aimed at `dest`.
pub struct ChatSockets {
    pub recv: UdpSocket,
    pub send: UdpSocket,
    pub dest: SocketAddr,
}

pub fn family_name(group: IpAddr) -> &'static str {
    if group.is_ipv4() {
        "udp4"
    } else {
        "udp6"
    }
}

/// A network interface resolved by name, with everything multicast setup
/// needs: the OS index (IPv6 joins and scope ids) and its addresses (IPv4
/// joins and send-socket pinning).
#[derive(Debug, Clone)]
pub struct Iface {
    pub name: String,
    pub index: u32,
    addrs: Vec<IpAddr>,
}

impl Iface {
    pub fn resolve(name: &str) -> Result<Self> {
        let entries: Vec<_> = if_addrs::get_if_addrs()
            .context("failed to enumerate network interfaces")?
            .into_iter()
            .filter(|entry| entry.name == name)
            .collect();
        if entries.is_empty() {
            return Err(anyhow!("no such interface"));
        }
        let index = entries.iter().find_map(|entry| entry.index).unwrap_or(0);
        let addrs = entries.iter().map(|entry| entry.ip()).collect();
        Ok(Self {
            name: name.to_string(),
            index,
            addrs,
        })
    }

    /// First non-loopback address of the requested family, used to pin the
    /// send socket to this interface.
    fn local_addr(&self, want_v4: bool) -> Option<IpAddr> {
        self.addrs
            .iter()
            .copied()
            .find(|ip| ip.is_ipv4() == want_v4 && !ip.is_loopback())
    }

    /// Address identifying this interface for an IPv4 group join.
    fn v4_addr(&self) -> Ipv4Addr {
        self.addrs
            .iter()
            .find_map(|ip| match ip {
                IpAddr::V4(v4) if !v4.is_loopback() => Some(*v4),
                _ => None,
            })
            .unwrap_or(Ipv4Addr::UNSPECIFIED)
    }
}

pub fn open(group: IpAddr, port: u16, iface: Option<&Iface>) -> Result<ChatSockets> {
    let recv = join_group(group, port, iface).context("failed to join multicast group")?;
    let (send, dest) =
        open_sender(group, port, iface).context("failed to set up sender socket")?;
    Ok(ChatSockets { recv, send, dest })
}

fn join_group(group: IpAddr, port: u16, iface: Option<&Iface>) -> Result<UdpSocket> {
    let domain = if group.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    // Several sessions on one host must be able to share the group port.
    socket.set_reuse_address(true)?;

    // Binding to the group address filters out unicast traffic aimed at the
    // same port. Windows only permits binding to local addresses.
    let bind_ip = if cfg!(unix) { group } else { unspecified(group) };
    socket.bind(&SocketAddr::new(bind_ip, port).into())?;

    match group {
        IpAddr::V4(group) => {
            let local = iface.map(Iface::v4_addr).unwrap_or(Ipv4Addr::UNSPECIFIED);
            socket.join_multicast_v4(&group, &local)?;
        }
        IpAddr::V6(group) => {
            socket.join_multicast_v6(&group, iface.map_or(0, |i| i.index))?;
        }
    }

    // Best effort; the OS may clamp it.
    let _ = socket.set_recv_buffer_size(RECV_BUFFER_SIZE);

    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into()).map_err(Into::into)
}

fn open_sender(group: IpAddr, port: u16, iface: Option<&Iface>) -> Result<(UdpSocket, SocketAddr)> {
    let local_ip = match iface {
        Some(iface) => iface.local_addr(group.is_ipv4()).unwrap_or_else(|| {
            tracing::warn!(
                iface = %iface.name,
                family = family_name(group),
                "no usable address on interface; relying on system default route"
            );
            unspecified(group)
        }),
        None => unspecified(group),
    };

    let socket = std::net::UdpSocket::bind(SocketAddr::new(local_ip, 0))?;
    // Make sure our own datagrams loop back; the session relies on hearing
    // its own messages to confirm the multicast path is live.
    match group {
        IpAddr::V4(_) => {
            let _ = socket.set_multicast_loop_v4(true);
        }
        IpAddr::V6(_) => {
            let _ = socket.set_multicast_loop_v6(true);
        }
    }

    let dest = match group {
        IpAddr::V4(v4) => SocketAddr::new(IpAddr::V4(v4), port),
        IpAddr::V6(v6) => {
            // IPv6 link-local groups need the interface scope on the address.
            SocketAddr::V6(SocketAddrV6::new(v6, port, 0, iface.map_or(0, |i| i.index)))
        }
    };

    socket.set_nonblocking(true)?;
    Ok((UdpSocket::from_std(socket)?, dest))
}

fn unspecified(group: IpAddr) -> IpAddr {
    if group.is_ipv4() {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    } else {
        IpAddr::V6(Ipv6Addr::UNSPECIFIED)
    }
}
