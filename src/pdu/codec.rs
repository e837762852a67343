// PDU codec: encodes/decodes a `pdus` vector into the size-prefixed
// offset-table container. Carries the `SPDU` file identifier, unlike the
// CAN codec.

use crate::can::message::CanFrameType;
use crate::codec::NCodec;
use crate::error::Result;
use crate::mime::{decode_mime_type, MimeMap};
use crate::schema::reader::Table;
use crate::schema::{Builder, Offset};

use super::message::{
    CanMessageFormat, CanTransportMetadata, IpAddrValue, IpProtocol, IpTransportMetadata,
    PduMessage, PduTransport, SocketAdapterValue,
};

const FIELD_ID: u16 = 0;
const FIELD_PAYLOAD: u16 = 1;
const FIELD_SWC_ID: u16 = 2;
const FIELD_ECU_ID: u16 = 3;
const FIELD_TRANSPORT_TYPE: u16 = 4;
const FIELD_TRANSPORT: u16 = 5;

const TRANSPORT_NONE: u8 = 0;
const TRANSPORT_CAN: u8 = 1;
const TRANSPORT_IP: u8 = 2;

const CAN_MESSAGE_FORMAT: u16 = 0;
const CAN_FRAME_TYPE: u16 = 1;
const CAN_INTERFACE_ID: u16 = 2;
const CAN_NETWORK_ID: u16 = 3;

const IP_ETH_DST_MAC: u16 = 0;
const IP_ETH_SRC_MAC: u16 = 1;
const IP_ETH_ETHERTYPE: u16 = 2;
const IP_ETH_TCI_PCP: u16 = 3;
const IP_ETH_TCI_DEI: u16 = 4;
const IP_ETH_TCI_VID: u16 = 5;
const IP_PROTOCOL: u16 = 6;
const IP_ADDR_TYPE: u16 = 7;
const IP_ADDR: u16 = 8;
const IP_SRC_PORT: u16 = 9;
const IP_DST_PORT: u16 = 10;
const SO_AD_TYPE: u16 = 11;
const SO_AD: u16 = 12;

const IP_ADDR_NONE: u8 = 0;
const IP_ADDR_V4: u8 = 1;
const IP_ADDR_V6: u8 = 2;

const SO_AD_NONE: u8 = 0;
const SO_AD_DOIP: u8 = 1;
const SO_AD_SOMEIP: u8 = 2;

const V4_SRC_IP: u16 = 0;
const V4_DST_IP: u16 = 1;
const V6_SRC_IP: u16 = 0;
const V6_DST_IP: u16 = 1;

const DOIP_PROTOCOL_VERSION: u16 = 0;
const DOIP_PAYLOAD_TYPE: u16 = 1;

const SOMEIP_MESSAGE_ID: u16 = 0;
const SOMEIP_LENGTH: u16 = 1;
const SOMEIP_REQUEST_ID: u16 = 2;
const SOMEIP_PROTOCOL_VERSION: u16 = 3;
const SOMEIP_INTERFACE_VERSION: u16 = 4;
const SOMEIP_MESSAGE_TYPE: u16 = 5;
const SOMEIP_RETURN_CODE: u16 = 6;

const STREAM_PDUS: u16 = 0;

const FILE_IDENTIFIER: &[u8; 4] = b"SPDU";

fn pack_u16x8(words: &[u16; 8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (i, word) in words.iter().enumerate() {
        out[i * 2..i * 2 + 2].copy_from_slice(&word.to_le_bytes());
    }
    out
}

fn unpack_u16x8(bytes: &[u8]) -> [u16; 8] {
    let mut out = [0u16; 8];
    for i in 0..8 {
        out[i] = u16::from_le_bytes([bytes[i * 2], bytes[i * 2 + 1]]);
    }
    out
}

fn emit_ip_addr(builder: &mut Builder, value: &IpAddrValue) -> Option<(Offset, u8)> {
    match value {
        IpAddrValue::None => None,
        IpAddrValue::V4 { src, dst } => {
            builder.start_table();
            builder.add_u32(V4_SRC_IP, *src);
            builder.add_u32(V4_DST_IP, *dst);
            Some((builder.end_table(), IP_ADDR_V4))
        }
        IpAddrValue::V6 { src, dst } => {
            builder.start_table();
            builder.add_inline_bytes(V6_SRC_IP, &pack_u16x8(src));
            builder.add_inline_bytes(V6_DST_IP, &pack_u16x8(dst));
            Some((builder.end_table(), IP_ADDR_V6))
        }
    }
}

fn emit_socket_adapter(builder: &mut Builder, value: &SocketAdapterValue) -> Option<(Offset, u8)> {
    match value {
        SocketAdapterValue::None => None,
        SocketAdapterValue::DoIp { protocol_version, payload_type } => {
            builder.start_table();
            builder.add_u8(DOIP_PROTOCOL_VERSION, *protocol_version);
            builder.add_u16(DOIP_PAYLOAD_TYPE, *payload_type);
            Some((builder.end_table(), SO_AD_DOIP))
        }
        SocketAdapterValue::SomeIp {
            message_id,
            length,
            request_id,
            protocol_version,
            interface_version,
            message_type,
            return_code,
        } => {
            builder.start_table();
            builder.add_u32(SOMEIP_MESSAGE_ID, *message_id);
            builder.add_u32(SOMEIP_LENGTH, *length);
            builder.add_u32(SOMEIP_REQUEST_ID, *request_id);
            builder.add_u8(SOMEIP_PROTOCOL_VERSION, *protocol_version);
            builder.add_u8(SOMEIP_INTERFACE_VERSION, *interface_version);
            builder.add_u8(SOMEIP_MESSAGE_TYPE, *message_type);
            builder.add_u8(SOMEIP_RETURN_CODE, *return_code);
            Some((builder.end_table(), SO_AD_SOMEIP))
        }
    }
}

fn emit_can_transport(builder: &mut Builder, metadata: &CanTransportMetadata) -> Offset {
    builder.start_table();
    builder.add_u8(CAN_MESSAGE_FORMAT, metadata.message_format.to_u8());
    builder.add_u8(CAN_FRAME_TYPE, metadata.frame_type.to_u8());
    builder.add_u32(CAN_INTERFACE_ID, metadata.interface_id);
    builder.add_u32(CAN_NETWORK_ID, metadata.network_id);
    builder.end_table()
}

fn emit_ip_transport(builder: &mut Builder, metadata: &IpTransportMetadata) -> Offset {
    let addr = emit_ip_addr(builder, &metadata.ip_addr);
    let adapter = emit_socket_adapter(builder, &metadata.socket_adapter);

    builder.start_table();
    builder.add_u64(IP_ETH_DST_MAC, metadata.eth_dst_mac);
    builder.add_u64(IP_ETH_SRC_MAC, metadata.eth_src_mac);
    builder.add_u16(IP_ETH_ETHERTYPE, metadata.eth_ethertype);
    builder.add_u8(IP_ETH_TCI_PCP, metadata.eth_tci_pcp);
    builder.add_u8(IP_ETH_TCI_DEI, metadata.eth_tci_dei);
    builder.add_u16(IP_ETH_TCI_VID, metadata.eth_tci_vid);
    builder.add_u8(IP_PROTOCOL, metadata.ip_protocol.to_u8());
    if let Some((offset, tag)) = addr {
        builder.add_u8(IP_ADDR_TYPE, tag);
        builder.add_offset(IP_ADDR, offset);
    }
    builder.add_u16(IP_SRC_PORT, metadata.ip_src_port);
    builder.add_u16(IP_DST_PORT, metadata.ip_dst_port);
    if let Some((offset, tag)) = adapter {
        builder.add_u8(SO_AD_TYPE, tag);
        builder.add_offset(SO_AD, offset);
    }
    builder.end_table()
}

fn decode_can_transport(table: &Table<'_>) -> Result<CanTransportMetadata> {
    Ok(CanTransportMetadata {
        message_format: CanMessageFormat::from_u8(table.get_u8(CAN_MESSAGE_FORMAT)?.unwrap_or(0)),
        frame_type: CanFrameType::from_u8(table.get_u8(CAN_FRAME_TYPE)?.unwrap_or(0)),
        interface_id: table.get_u32(CAN_INTERFACE_ID)?.unwrap_or(0),
        network_id: table.get_u32(CAN_NETWORK_ID)?.unwrap_or(0),
    })
}

fn decode_ip_addr(table: &Table<'_>, tag: u8) -> Result<IpAddrValue> {
    match tag {
        IP_ADDR_V4 => match table.get_offset_table(IP_ADDR)? {
            Some(addr) => Ok(IpAddrValue::V4 {
                src: addr.get_u32(V4_SRC_IP)?.unwrap_or(0),
                dst: addr.get_u32(V4_DST_IP)?.unwrap_or(0),
            }),
            None => Ok(IpAddrValue::None),
        },
        IP_ADDR_V6 => match table.get_offset_table(IP_ADDR)? {
            Some(addr) => {
                let src = addr.get_inline_bytes(V6_SRC_IP, 16)?.map(unpack_u16x8).unwrap_or([0; 8]);
                let dst = addr.get_inline_bytes(V6_DST_IP, 16)?.map(unpack_u16x8).unwrap_or([0; 8]);
                Ok(IpAddrValue::V6 { src, dst })
            }
            None => Ok(IpAddrValue::None),
        },
        IP_ADDR_NONE => Ok(IpAddrValue::None),
        other => {
            log::warn!("unsupported ip_addr_type tag {other}, decoding as None");
            Ok(IpAddrValue::None)
        }
    }
}

fn decode_socket_adapter(table: &Table<'_>, tag: u8) -> Result<SocketAdapterValue> {
    match tag {
        SO_AD_DOIP => match table.get_offset_table(SO_AD)? {
            Some(adapter) => Ok(SocketAdapterValue::DoIp {
                protocol_version: adapter.get_u8(DOIP_PROTOCOL_VERSION)?.unwrap_or(0),
                payload_type: adapter.get_u16(DOIP_PAYLOAD_TYPE)?.unwrap_or(0),
            }),
            None => Ok(SocketAdapterValue::None),
        },
        SO_AD_SOMEIP => match table.get_offset_table(SO_AD)? {
            Some(adapter) => Ok(SocketAdapterValue::SomeIp {
                message_id: adapter.get_u32(SOMEIP_MESSAGE_ID)?.unwrap_or(0),
                length: adapter.get_u32(SOMEIP_LENGTH)?.unwrap_or(0),
                request_id: adapter.get_u32(SOMEIP_REQUEST_ID)?.unwrap_or(0),
                protocol_version: adapter.get_u8(SOMEIP_PROTOCOL_VERSION)?.unwrap_or(0),
                interface_version: adapter.get_u8(SOMEIP_INTERFACE_VERSION)?.unwrap_or(0),
                message_type: adapter.get_u8(SOMEIP_MESSAGE_TYPE)?.unwrap_or(0),
                return_code: adapter.get_u8(SOMEIP_RETURN_CODE)?.unwrap_or(0),
            }),
            None => Ok(SocketAdapterValue::None),
        },
        SO_AD_NONE => Ok(SocketAdapterValue::None),
        other => {
            log::warn!("unsupported so_ad_type tag {other}, decoding as None");
            Ok(SocketAdapterValue::None)
        }
    }
}

fn decode_ip_transport(table: &Table<'_>) -> Result<IpTransportMetadata> {
    let ip_addr_type = table.get_u8(IP_ADDR_TYPE)?.unwrap_or(0);
    let so_ad_type = table.get_u8(SO_AD_TYPE)?.unwrap_or(0);

    Ok(IpTransportMetadata {
        eth_dst_mac: table.get_u64(IP_ETH_DST_MAC)?.unwrap_or(0),
        eth_src_mac: table.get_u64(IP_ETH_SRC_MAC)?.unwrap_or(0),
        eth_ethertype: table.get_u16(IP_ETH_ETHERTYPE)?.unwrap_or(0),
        eth_tci_pcp: table.get_u8(IP_ETH_TCI_PCP)?.unwrap_or(0),
        eth_tci_dei: table.get_u8(IP_ETH_TCI_DEI)?.unwrap_or(0),
        eth_tci_vid: table.get_u16(IP_ETH_TCI_VID)?.unwrap_or(0),
        ip_protocol: IpProtocol::from_u8(table.get_u8(IP_PROTOCOL)?.unwrap_or(0)),
        ip_addr: decode_ip_addr(table, ip_addr_type)?,
        ip_src_port: table.get_u16(IP_SRC_PORT)?.unwrap_or(0),
        ip_dst_port: table.get_u16(IP_DST_PORT)?.unwrap_or(0),
        socket_adapter: decode_socket_adapter(table, so_ad_type)?,
    })
}

pub struct PduCodec {
    mime: MimeMap,
    stream: Vec<u8>,
    model_name: String,
    simulation_time: f64,
    builder: Builder,
    pending: Vec<Offset>,
}

impl PduCodec {
    pub fn new(mime: MimeMap, stream: Vec<u8>, model_name: impl Into<String>, simulation_time: f64) -> Self {
        let model_name = model_name.into();
        log::debug!("constructed PDU codec for model '{model_name}'");
        PduCodec {
            mime,
            stream,
            model_name,
            simulation_time,
            builder: Builder::new(),
            pending: Vec::new(),
        }
    }

    pub fn from_mime_str(
        mime_type: &str,
        stream: Vec<u8>,
        model_name: impl Into<String>,
        simulation_time: f64,
    ) -> Result<Self> {
        let mime = decode_mime_type(mime_type)?;
        Ok(PduCodec::new(mime, stream, model_name, simulation_time))
    }

    fn mime_u32(&self, key: &str) -> u32 {
        self.mime.get(key).and_then(|s| s.parse().ok()).unwrap_or(0)
    }

    fn swc_id_filter(&self) -> u32 {
        self.mime_u32("swc_id")
    }
}

impl NCodec for PduCodec {
    type Message = PduMessage;

    fn write(&mut self, messages: &[PduMessage]) {
        for msg in messages {
            let payload_offset = self.builder.create_byte_vector(&msg.payload);
            let (transport_type, transport_offset) = match &msg.transport {
                PduTransport::None => (TRANSPORT_NONE, None),
                PduTransport::Can(metadata) => {
                    (TRANSPORT_CAN, Some(emit_can_transport(&mut self.builder, metadata)))
                }
                PduTransport::Ip(metadata) => {
                    (TRANSPORT_IP, Some(emit_ip_transport(&mut self.builder, metadata)))
                }
            };

            let swc_id = if msg.swc_id != 0 { msg.swc_id } else { self.mime_u32("swc_id") };
            let ecu_id = if msg.ecu_id != 0 { msg.ecu_id } else { self.mime_u32("ecu_id") };

            self.builder.start_table();
            self.builder.add_u32(FIELD_ID, msg.id);
            self.builder.add_offset(FIELD_PAYLOAD, payload_offset);
            self.builder.add_u32(FIELD_SWC_ID, swc_id);
            self.builder.add_u32(FIELD_ECU_ID, ecu_id);
            self.builder.add_u8(FIELD_TRANSPORT_TYPE, transport_type);
            if let Some(offset) = transport_offset {
                self.builder.add_offset(FIELD_TRANSPORT, offset);
            }
            let pdu_offset = self.builder.end_table();
            self.pending.push(pdu_offset);
        }
    }

    fn read(&self) -> Result<Vec<PduMessage>> {
        if self.stream.is_empty() {
            return Ok(Vec::new());
        }

        let root = Table::at_root(&self.stream, 8)?;
        let pdus = root.get_offset_vector_tables(STREAM_PDUS)?.unwrap_or_default();
        let swc_filter = self.swc_id_filter();

        let mut out = Vec::with_capacity(pdus.len());
        for pdu in pdus {
            let swc_id = pdu.get_u32(FIELD_SWC_ID)?.unwrap_or(0);
            if swc_filter != 0 && swc_id == swc_filter {
                log::debug!("dropping self-received pdu with swc_id {swc_id}");
                continue;
            }

            let id = pdu.get_u32(FIELD_ID)?.unwrap_or(0);
            let payload = pdu.get_byte_vector(FIELD_PAYLOAD)?.unwrap_or_default();
            let ecu_id = pdu.get_u32(FIELD_ECU_ID)?.unwrap_or(0);
            let transport_type = pdu.get_u8(FIELD_TRANSPORT_TYPE)?.unwrap_or(0);

            let transport = match transport_type {
                TRANSPORT_CAN => match pdu.get_offset_table(FIELD_TRANSPORT)? {
                    Some(t) => PduTransport::Can(decode_can_transport(&t)?),
                    None => PduTransport::None,
                },
                TRANSPORT_IP => match pdu.get_offset_table(FIELD_TRANSPORT)? {
                    Some(t) => PduTransport::Ip(decode_ip_transport(&t)?),
                    None => PduTransport::None,
                },
                TRANSPORT_NONE => PduTransport::None,
                other => {
                    log::warn!("unsupported transport_type tag {other}, decoding as None");
                    PduTransport::None
                }
            };

            out.push(PduMessage { id, payload, swc_id, ecu_id, transport });
        }
        Ok(out)
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pdus_vec = self.builder.create_offset_vector(&self.pending);
        self.builder.start_table();
        self.builder.add_offset(STREAM_PDUS, pdus_vec);
        let root = self.builder.end_table();
        let bytes = self.builder.finish(root, Some(FILE_IDENTIFIER));

        if !bytes.is_empty() {
            self.stream = bytes;
        }
        self.builder = Builder::new();
        self.pending.clear();
    }

    fn truncate(&mut self) {
        self.builder = Builder::new();
        self.stream.clear();
        self.pending.clear();
    }

    fn stat(&mut self, param: &str, new_value: Option<&str>) -> String {
        if let Some(value) = new_value {
            self.mime.insert(param.to_string(), value.to_string());
            return value.to_string();
        }
        self.mime.get(param).cloned().unwrap_or_default()
    }

    fn stream(&self) -> &[u8] {
        &self.stream
    }

    fn set_stream(&mut self, bytes: Vec<u8>) {
        self.stream = bytes;
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    fn mime_map(&self) -> &MimeMap {
        &self.mime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(mime: &str) -> PduCodec {
        PduCodec::from_mime_str(mime, Vec::new(), "MyModel", 0.0).unwrap()
    }

    fn ipv6_someip_message() -> PduMessage {
        PduMessage {
            id: 123,
            payload: b"Hello World This is a test message for the test case".to_vec(),
            swc_id: 42,
            ecu_id: 99,
            transport: PduTransport::Ip(IpTransportMetadata {
                eth_dst_mac: 0x0000123456789ABC,
                eth_src_mac: 0x0000CBA987654321,
                eth_ethertype: 1,
                eth_tci_pcp: 2,
                eth_tci_dei: 3,
                eth_tci_vid: 4,
                ip_protocol: IpProtocol::Tcp,
                ip_addr: IpAddrValue::V6 {
                    src: [0x2001, 0x0db8, 0xaaaa, 0x0001, 0x0000, 0x0000, 0x0000, 0x0001],
                    dst: [0x2001, 0x0db8, 0xaaaa, 0x0001, 0x0000, 0x0000, 0x0000, 0x00ff],
                },
                ip_src_port: 0,
                ip_dst_port: 0,
                socket_adapter: SocketAdapterValue::SomeIp {
                    message_id: 0x1234,
                    length: 16,
                    request_id: 0x5678,
                    protocol_version: 1,
                    interface_version: 1,
                    message_type: 0x00,
                    return_code: 0x00,
                },
            }),
        }
    }

    fn ipv4_doip_message() -> PduMessage {
        PduMessage {
            id: 124,
            payload: b"Hello World This is a test message for the test case".to_vec(),
            swc_id: 42,
            ecu_id: 99,
            transport: PduTransport::Ip(IpTransportMetadata {
                eth_dst_mac: 0x0000123456789ABC,
                eth_src_mac: 0x0000CBA987654321,
                eth_ethertype: 1,
                eth_tci_pcp: 2,
                eth_tci_dei: 3,
                eth_tci_vid: 4,
                ip_protocol: IpProtocol::Tcp,
                ip_addr: IpAddrValue::V4 { src: 0xC0A80101, dst: 0xC0A80102 },
                ip_src_port: 0,
                ip_dst_port: 0,
                socket_adapter: SocketAdapterValue::DoIp { protocol_version: 1, payload_type: 2 },
            }),
        }
    }

    #[test]
    fn roundtrip_ipv6_someip_and_ipv4_doip() {
        let mut c = codec("interface=stream;type=pdu;schema=fbs;swc_id=1;ecu_id=2");
        let msgs = vec![ipv6_someip_message(), ipv4_doip_message()];
        c.write(&msgs);
        c.flush();
        assert!(!c.stream().is_empty());

        let saved = c.stream().to_vec();
        c.truncate();
        assert!(c.stream().is_empty());

        c.set_stream(saved);
        let read = c.read().unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0], msgs[0]);
        assert_eq!(read[1], msgs[1]);
    }

    #[test]
    fn default_inheritance_from_mime_map() {
        let mut c = codec("interface=stream;type=pdu;schema=fbs;swc_id=42;ecu_id=99");
        let msg = PduMessage { id: 1, payload: vec![], swc_id: 0, ecu_id: 0, transport: PduTransport::None };
        c.write(&[msg]);
        c.flush();

        let mut reader = codec("interface=stream;type=pdu;schema=fbs");
        reader.set_stream(c.stream().to_vec());
        let read = reader.read().unwrap();
        assert_eq!(read[0].swc_id, 42);
        assert_eq!(read[0].ecu_id, 99);
    }

    #[test]
    fn self_reception_guard_via_stat() {
        let mut c = codec("interface=stream;type=pdu;schema=fbs;swc_id=1");
        c.write(&[
            PduMessage { id: 1, payload: vec![], swc_id: 1, ecu_id: 0, transport: PduTransport::None },
            PduMessage { id: 2, payload: vec![], swc_id: 2, ecu_id: 0, transport: PduTransport::None },
        ]);
        c.flush();

        let read = c.read().unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].swc_id, 2);

        c.stat("swc_id", Some("2"));
        let read = c.read().unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].swc_id, 1);
    }

    #[test]
    fn empty_stream_reads_as_empty() {
        let c = codec("interface=stream;type=pdu;schema=fbs");
        assert_eq!(c.read().unwrap(), Vec::new());
    }

    #[test]
    fn flush_with_no_pending_leaves_stream_untouched() {
        let mut c = codec("interface=stream;type=pdu;schema=fbs");
        c.flush();
        assert!(c.stream().is_empty());
    }

    #[test]
    fn stream_carries_spdu_file_identifier() {
        let mut c = codec("interface=stream;type=pdu;schema=fbs");
        c.write(&[PduMessage { id: 1, payload: vec![], swc_id: 0, ecu_id: 0, transport: PduTransport::None }]);
        c.flush();
        assert_eq!(&c.stream()[4..8], b"SPDU");
    }

    #[test]
    fn unknown_transport_type_decodes_as_none() {
        // Hand-craft a buffer whose single pdu has transport_type = 9 (unknown).
        let mut builder = Builder::new();
        let payload = builder.create_byte_vector(&[]);
        builder.start_table();
        builder.add_u32(FIELD_ID, 7);
        builder.add_offset(FIELD_PAYLOAD, payload);
        builder.add_u32(FIELD_SWC_ID, 0);
        builder.add_u32(FIELD_ECU_ID, 0);
        builder.add_u8(FIELD_TRANSPORT_TYPE, 9);
        let pdu = builder.end_table();

        let vec_off = builder.create_offset_vector(&[pdu]);
        builder.start_table();
        builder.add_offset(STREAM_PDUS, vec_off);
        let root = builder.end_table();
        let bytes = builder.finish(root, Some(FILE_IDENTIFIER));

        let mut c = codec("interface=stream;type=pdu;schema=fbs");
        c.set_stream(bytes);
        let read = c.read().unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].transport, PduTransport::None);
    }
}
