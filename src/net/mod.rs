//! 网络层：分段、报文编解码与数据报链路

mod link;
pub mod memory;
mod packet;
mod segment;

pub use link::{DatagramLink, UdpLink};
pub use memory::MemoryLink;
pub use packet::{
    AckKind, AckPacket, FIN_ACK, MAX_SEGMENT_SIZE, PACKET_SIZE, SEQ_ID_SIZE, decode, decode_ack,
    encode, encode_fin_ack,
};
pub use segment::{Segment, segment_payload};
