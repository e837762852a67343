// Common codec abstraction shared by the CAN and PDU codecs.

use crate::error::Result;
use crate::mime::MimeMap;

/// Operations common to every automotive-bus codec.
///
/// A codec owns a stream buffer, a parameter map, a model name and a
/// simulation time, and is mutated exclusively through these operations
/// plus direct assignment to its stream via [`NCodec::set_stream`].
pub trait NCodec {
    type Message;

    /// Append messages to the pending (not yet finalized) batch. A no-op
    /// for an empty slice.
    fn write(&mut self, messages: &[Self::Message]);

    /// Decode the current stream into typed messages, applying the
    /// self-reception filter. Returns an empty vector for an empty stream.
    fn read(&self) -> Result<Vec<Self::Message>>;

    /// Finalize the pending batch. If the result is non-empty, replace the
    /// stream and reset the pending batch and builder; otherwise leave the
    /// stream untouched.
    fn flush(&mut self);

    /// Reset the builder, clear the stream and clear the pending batch.
    fn truncate(&mut self);

    /// Get (and optionally set) a mime parameter. Returns the empty string
    /// when the parameter is absent and no new value is given.
    fn stat(&mut self, param: &str, new_value: Option<&str>) -> String;

    fn stream(&self) -> &[u8];
    fn set_stream(&mut self, bytes: Vec<u8>);
    fn model_name(&self) -> &str;
    fn simulation_time(&self) -> f64;
    fn mime_map(&self) -> &MimeMap;
}
