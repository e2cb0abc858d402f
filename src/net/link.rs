//! 数据报链路
//!
//! 驱动循环只需要两种操作：发出一个数据报、在超时内阻塞等待一个数据报。
//! [`UdpLink`] 是基于 `std::net::UdpSocket` 的真实实现，
//! [`super::memory::MemoryLink`] 是测试用的内存实现。

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{Error, Result};

/// 面向单个对端的不可靠数据报链路
pub trait DatagramLink {
    /// 发出一个数据报（一个报文）。
    fn send(&mut self, datagram: &[u8]) -> io::Result<()>;

    /// 阻塞等待一个数据报，最多等待 `timeout`。
    ///
    /// `Ok(None)` 表示超时且没有收到任何数据。
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>>;
}

#[derive(Debug)]
pub struct UdpLink {
    socket: UdpSocket,
    peer: SocketAddr,
    read_timeout: Option<Duration>,
}

impl UdpLink {
    /// 绑定一个临时端口，后续数据报都发往 `peer`。
    pub fn connect(peer: SocketAddr) -> Result<Self> {
        let local: SocketAddr = match peer {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).map_err(Error::Bind)?;
        debug!(local = ?socket.local_addr().ok(), peer = %peer, "UDP 链路已就绪");
        Ok(Self {
            socket,
            peer,
            read_timeout: None,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl DatagramLink for UdpLink {
    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        self.socket.send_to(datagram, self.peer)?;
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        // set_read_timeout 拒绝 0
        let timeout = timeout.max(Duration::from_millis(1));
        if self.read_timeout != Some(timeout) {
            self.socket.set_read_timeout(Some(timeout))?;
            self.read_timeout = Some(timeout);
        }
        match self.socket.recv_from(buf) {
            Ok((n, from)) => {
                trace!(bytes = n, from = %from, "收到数据报");
                Ok(Some(n))
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
