// PDU message types, including the tagged-union transport metadata tree.
//
// Each tag (transport, ip_addr, socket adapter) is modeled as a Rust enum
// rather than a flag plus independent optional fields, so an invalid
// combination (e.g. a v6 address paired with a SomeIP adapter claiming to
// be DoIP) is unrepresentable rather than merely unchecked.

use crate::can::message::CanFrameType;

/// Semi-open enumeration: unrecognized wire values round-trip through
/// `Unknown` rather than being rejected, matching the reader's soft
/// degrade-on-unknown-tag behavior for other variants in this schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CanMessageFormat {
    Base,
    Extended,
    FdBase,
    FdExtended,
    Unknown(u8),
}

impl CanMessageFormat {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => CanMessageFormat::Base,
            1 => CanMessageFormat::Extended,
            2 => CanMessageFormat::FdBase,
            3 => CanMessageFormat::FdExtended,
            other => CanMessageFormat::Unknown(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            CanMessageFormat::Base => 0,
            CanMessageFormat::Extended => 1,
            CanMessageFormat::FdBase => 2,
            CanMessageFormat::FdExtended => 3,
            CanMessageFormat::Unknown(v) => v,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IpProtocol {
    Udp,
    Tcp,
    Unknown(u8),
}

impl IpProtocol {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => IpProtocol::Udp,
            1 => IpProtocol::Tcp,
            other => IpProtocol::Unknown(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            IpProtocol::Udp => 0,
            IpProtocol::Tcp => 1,
            IpProtocol::Unknown(v) => v,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanTransportMetadata {
    pub message_format: CanMessageFormat,
    pub frame_type: CanFrameType,
    pub interface_id: u32,
    pub network_id: u32,
}

/// Tagged union for the two IP address families. `None` means the PDU
/// carries no address (`ip_addr_type` absent/unknown on the wire).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IpAddrValue {
    None,
    V4 { src: u32, dst: u32 },
    V6 { src: [u16; 8], dst: [u16; 8] },
}

/// Tagged union for the socket adapter attached to an IP transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SocketAdapterValue {
    None,
    DoIp { protocol_version: u8, payload_type: u16 },
    SomeIp {
        message_id: u32,
        length: u32,
        request_id: u32,
        protocol_version: u8,
        interface_version: u8,
        message_type: u8,
        return_code: u8,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IpTransportMetadata {
    pub eth_dst_mac: u64,
    pub eth_src_mac: u64,
    pub eth_ethertype: u16,
    pub eth_tci_pcp: u8,
    pub eth_tci_dei: u8,
    pub eth_tci_vid: u16,
    pub ip_protocol: IpProtocol,
    pub ip_addr: IpAddrValue,
    pub ip_src_port: u16,
    pub ip_dst_port: u16,
    pub socket_adapter: SocketAdapterValue,
}

/// The transport-type tag and its exactly-one matching metadata subtree,
/// collapsed into a single enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PduTransport {
    None,
    Can(CanTransportMetadata),
    Ip(IpTransportMetadata),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PduMessage {
    pub id: u32,
    pub payload: Vec<u8>,
    pub swc_id: u32,
    pub ecu_id: u32,
    pub transport: PduTransport,
}
