// Dispatches a MIME configuration string to the correct concrete codec.

use crate::can::codec::CanCodec;
use crate::codec::NCodec;
use crate::error::{NCodecError, Result};
use crate::mime::{decode_mime_type, MimeMap};
use crate::pdu::codec::PduCodec;

/// Either concrete codec, for call sites that only know which one they need
/// at runtime (from a parsed MIME `type`).
pub enum Codec {
    Can(CanCodec),
    Pdu(PduCodec),
}

impl Codec {
    pub fn as_can(&mut self) -> Option<&mut CanCodec> {
        match self {
            Codec::Can(c) => Some(c),
            Codec::Pdu(_) => None,
        }
    }

    pub fn as_pdu(&mut self) -> Option<&mut PduCodec> {
        match self {
            Codec::Pdu(c) => Some(c),
            Codec::Can(_) => None,
        }
    }
}

pub struct CodecFactory;

impl CodecFactory {
    pub fn create_pdu_codec(
        mime: MimeMap,
        stream: Vec<u8>,
        model_name: impl Into<String>,
        simulation_time: f64,
    ) -> PduCodec {
        PduCodec::new(mime, stream, model_name, simulation_time)
    }

    pub fn create_can_codec(
        mime: MimeMap,
        stream: Vec<u8>,
        model_name: impl Into<String>,
        simulation_time: f64,
    ) -> CanCodec {
        CanCodec::new(mime, stream, model_name, simulation_time)
    }

    pub fn create_codec(
        mime_type: &str,
        stream: Vec<u8>,
        model_name: impl Into<String>,
        simulation_time: f64,
    ) -> Result<Codec> {
        let mime = decode_mime_type(mime_type)?;
        let model_name = model_name.into();
        match mime.get("type").map(String::as_str) {
            Some("pdu") => Ok(Codec::Pdu(Self::create_pdu_codec(mime, stream, model_name, simulation_time))),
            Some("can") => Ok(Codec::Can(Self::create_can_codec(mime, stream, model_name, simulation_time))),
            other => Err(NCodecError::config(format!(
                "unsupported type: {}",
                other.unwrap_or("")
            ))),
        }
    }
}
