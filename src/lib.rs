// Automotive bus network codec.
//
// Encodes and decodes CAN frames and PDUs (including IP-carried DoIP and
// SOME/IP payloads) into a size-prefixed offset-table binary stream, for
// co-simulation models that exchange bus traffic as an opaque byte buffer.

pub mod can;
pub mod codec;
pub mod error;
pub mod factory;
pub mod mime;
pub mod pdu;
pub mod schema;

pub use can::codec::CanCodec;
pub use can::message::{CanFrameType, CanMessage, CanSender, CanTiming};
pub use codec::NCodec;
pub use error::{NCodecError, Result};
pub use factory::{Codec, CodecFactory};
pub use mime::{decode_mime_type, MimeMap};
pub use pdu::codec::PduCodec;
pub use pdu::message::{
    CanMessageFormat, CanTransportMetadata, IpAddrValue, IpProtocol, IpTransportMetadata,
    PduMessage, PduTransport, SocketAdapterValue,
};
