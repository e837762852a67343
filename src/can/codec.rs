// CAN frame codec: encodes/decodes a `frames` vector into the size-prefixed
// offset-table container. Carries no file identifier.

use crate::codec::NCodec;
use crate::error::Result;
use crate::mime::{decode_mime_type, MimeMap};
use crate::schema::reader::Table;
use crate::schema::{Builder, Offset};

use super::message::{CanFrameType, CanMessage, CanSender, CanTiming};

const FIELD_FRAME_ID: u16 = 0;
const FIELD_FRAME_TYPE: u16 = 1;
const FIELD_PAYLOAD: u16 = 2;
const FIELD_BUS_ID: u16 = 3;
const FIELD_NODE_ID: u16 = 4;
const FIELD_INTERFACE_ID: u16 = 5;
const FIELD_TIMING: u16 = 6;

const TIMING_SEND: u16 = 0;
const TIMING_ARB: u16 = 1;
const TIMING_RECV: u16 = 2;

const STREAM_FRAMES: u16 = 0;

/// Self-reception filter key. Case-sensitive, unlike every other mime
/// parameter in this crate — this asymmetry is deliberate, not an
/// oversight: keep it.
const NODE_ID_FILTER_KEY: &str = "Node_id";

pub struct CanCodec {
    mime: MimeMap,
    stream: Vec<u8>,
    model_name: String,
    simulation_time: f64,
    builder: Builder,
    pending: Vec<Offset>,
}

impl CanCodec {
    pub fn new(mime: MimeMap, stream: Vec<u8>, model_name: impl Into<String>, simulation_time: f64) -> Self {
        let model_name = model_name.into();
        log::debug!("constructed CAN codec for model '{model_name}'");
        CanCodec {
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
        Ok(CanCodec::new(mime, stream, model_name, simulation_time))
    }

    fn node_id_filter(&self) -> Option<u32> {
        self.mime.get(NODE_ID_FILTER_KEY).and_then(|s| s.parse().ok())
    }
}

impl NCodec for CanCodec {
    type Message = CanMessage;

    fn write(&mut self, messages: &[CanMessage]) {
        for msg in messages {
            let payload_offset = self.builder.create_byte_vector(&msg.payload);
            let timing_offset = msg.timing.map(|timing| {
                self.builder.start_table();
                self.builder.add_u64(TIMING_SEND, timing.send);
                self.builder.add_u64(TIMING_ARB, timing.arb);
                self.builder.add_u64(TIMING_RECV, timing.recv);
                self.builder.end_table()
            });

            self.builder.start_table();
            self.builder.add_u32(FIELD_FRAME_ID, msg.frame_id);
            self.builder.add_u8(FIELD_FRAME_TYPE, msg.frame_type.to_u8());
            self.builder.add_offset(FIELD_PAYLOAD, payload_offset);
            self.builder.add_u8(FIELD_BUS_ID, msg.sender.bus_id);
            self.builder.add_u8(FIELD_NODE_ID, msg.sender.node_id);
            self.builder.add_u8(FIELD_INTERFACE_ID, msg.sender.interface_id);
            if let Some(offset) = timing_offset {
                self.builder.add_offset(FIELD_TIMING, offset);
            }
            let frame_offset = self.builder.end_table();
            self.pending.push(frame_offset);
        }
    }

    fn read(&self) -> Result<Vec<CanMessage>> {
        if self.stream.is_empty() {
            return Ok(Vec::new());
        }

        let root = Table::at_root(&self.stream, 4)?;
        let frames = root.get_offset_vector_tables(STREAM_FRAMES)?.unwrap_or_default();
        let node_filter = self.node_id_filter();

        let mut out = Vec::with_capacity(frames.len());
        for frame in frames {
            let frame_id = frame.get_u32(FIELD_FRAME_ID)?.unwrap_or(0);
            if let Some(node_id) = node_filter {
                if node_id != 0 && frame_id == node_id {
                    log::debug!("dropping self-received frame {frame_id:#x}");
                    continue;
                }
            }

            let frame_type = CanFrameType::from_u8(frame.get_u8(FIELD_FRAME_TYPE)?.unwrap_or(0));
            let payload = frame.get_byte_vector(FIELD_PAYLOAD)?.unwrap_or_default();
            let sender = CanSender {
                bus_id: frame.get_u8(FIELD_BUS_ID)?.unwrap_or(0),
                node_id: frame.get_u8(FIELD_NODE_ID)?.unwrap_or(0),
                interface_id: frame.get_u8(FIELD_INTERFACE_ID)?.unwrap_or(0),
            };
            let timing = match frame.get_offset_table(FIELD_TIMING)? {
                Some(t) => Some(CanTiming {
                    send: t.get_u64(TIMING_SEND)?.unwrap_or(0),
                    arb: t.get_u64(TIMING_ARB)?.unwrap_or(0),
                    recv: t.get_u64(TIMING_RECV)?.unwrap_or(0),
                }),
                None => None,
            };

            out.push(CanMessage { frame_id, frame_type, sender, timing, payload });
        }
        Ok(out)
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let frames_vec = self.builder.create_offset_vector(&self.pending);
        self.builder.start_table();
        self.builder.add_offset(STREAM_FRAMES, frames_vec);
        let root = self.builder.end_table();
        let bytes = self.builder.finish(root, None);

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

    fn codec(mime: &str) -> CanCodec {
        CanCodec::from_mime_str(mime, Vec::new(), "MyModel", 0.0).unwrap()
    }

    #[test]
    fn roundtrip_single_frame() {
        let mut c = codec("interface=stream;type=can;schema=fbs;swc_id=1;ecu_id=2");
        let msg = CanMessage {
            frame_id: 1,
            frame_type: CanFrameType::Base,
            sender: CanSender { bus_id: 1, node_id: 2, interface_id: 3 },
            timing: None,
            payload: b"Hello".to_vec(),
        };
        c.write(&[msg.clone()]);
        c.flush();
        assert!(!c.stream().is_empty());

        let saved = c.stream().to_vec();
        c.truncate();
        assert!(c.stream().is_empty());

        c.set_stream(saved);
        let read = c.read().unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0], msg);
    }

    #[test]
    fn roundtrip_with_timing() {
        let mut c = codec("interface=stream;type=can;schema=fbs");
        let msg = CanMessage {
            frame_id: 0x123,
            frame_type: CanFrameType::Extended,
            sender: CanSender { bus_id: 0, node_id: 0, interface_id: 0 },
            timing: Some(CanTiming { send: 10, arb: 20, recv: 30 }),
            payload: vec![0xDE, 0xAD, 0xBE, 0xEF],
        };
        c.write(&[msg.clone()]);
        c.flush();
        let read = c.read().unwrap();
        assert_eq!(read[0].timing, msg.timing);
    }

    #[test]
    fn node_id_filter_drops_matching_frame_id() {
        let mut c = codec("interface=stream;type=can;schema=fbs");
        let frames: Vec<CanMessage> = [5u32, 7, 9]
            .iter()
            .map(|&id| CanMessage {
                frame_id: id,
                frame_type: CanFrameType::Base,
                sender: CanSender::default(),
                timing: None,
                payload: Vec::new(),
            })
            .collect();
        c.write(&frames);
        c.flush();

        c.stat("Node_id", Some("5"));
        let read = c.read().unwrap();
        let ids: Vec<u32> = read.iter().map(|m| m.frame_id).collect();
        assert_eq!(ids, vec![7, 9]);
    }

    #[test]
    fn empty_stream_reads_as_empty() {
        let c = codec("interface=stream;type=can;schema=fbs");
        assert_eq!(c.read().unwrap(), Vec::new());
    }

    #[test]
    fn flush_with_no_pending_leaves_stream_untouched() {
        let mut c = codec("interface=stream;type=can;schema=fbs");
        c.flush();
        assert!(c.stream().is_empty());
    }

    #[test]
    fn stat_roundtrips_any_key() {
        let mut c = codec("interface=stream;type=can;schema=fbs");
        assert_eq!(c.stat("bus_id", Some("7")), "7");
        assert_eq!(c.stat("bus_id", None), "7");
        assert_eq!(c.stat("unset_key", None), "");
    }
}
