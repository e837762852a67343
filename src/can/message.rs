// CAN frame message types.

/// Frame format, mirroring the schema's `CanFrameType` enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CanFrameType {
    Base,
    Extended,
    FdBase,
    FdExtended,
}

impl CanFrameType {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => CanFrameType::Base,
            1 => CanFrameType::Extended,
            2 => CanFrameType::FdBase,
            _ => CanFrameType::FdExtended,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            CanFrameType::Base => 0,
            CanFrameType::Extended => 1,
            CanFrameType::FdBase => 2,
            CanFrameType::FdExtended => 3,
        }
    }
}

/// Identity of the sender of a frame on a shared bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanSender {
    pub bus_id: u8,
    pub node_id: u8,
    pub interface_id: u8,
}

/// Optional timing triple attached to a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanTiming {
    pub send: u64,
    pub arb: u64,
    pub recv: u64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CanMessage {
    pub frame_id: u32,
    pub frame_type: CanFrameType,
    pub sender: CanSender,
    pub timing: Option<CanTiming>,
    pub payload: Vec<u8>,
}
