use std::net::UdpSocket;
use std::time::Duration;

use crate::net::{DatagramLink, UdpLink, decode_ack, encode};

#[test]
fn udp_link_exchanges_datagrams_with_its_peer() {
    let peer = UdpSocket::bind("127.0.0.1:0").expect("bind peer");
    peer.set_read_timeout(Some(Duration::from_secs(5)))
        .expect("set timeout");
    let mut link = UdpLink::connect(peer.local_addr().expect("peer addr")).expect("connect");
    assert_eq!(link.peer(), peer.local_addr().expect("peer addr"));

    link.send(&encode(1020, b"data")).expect("send");
    let mut buf = [0_u8; 64];
    let (n, from) = peer.recv_from(&mut buf).expect("peer recv");
    assert_eq!(&buf[..n], &encode(1020, b"data")[..]);

    peer.send_to(&encode(1024, b"ack"), from).expect("reply");
    let n = link
        .recv(&mut buf, Duration::from_secs(5))
        .expect("recv")
        .expect("a datagram");
    let ack = decode_ack(&buf[..n]);
    assert_eq!(ack.ack_id, 1024);
    assert_eq!(ack.message, "ack");
}

#[test]
fn udp_link_reports_timeout_as_none() {
    let peer = UdpSocket::bind("127.0.0.1:0").expect("bind peer");
    let mut link = UdpLink::connect(peer.local_addr().expect("peer addr")).expect("connect");
    let mut buf = [0_u8; 16];
    let got = link.recv(&mut buf, Duration::from_millis(20)).expect("recv");
    assert_eq!(got, None);
    // zero is clamped instead of rejected
    let got = link.recv(&mut buf, Duration::ZERO).expect("recv");
    assert_eq!(got, None);
}
