// Offset-table binary container: builder (encode) and reader (decode).
//
// The wire format is an offset-table layout in the spirit of the Google
// FlatBuffers encoding used by the upstream schema (`schema=fbs`): tables are
// reached through offsets rather than parsed sequentially, fields are
// optional via a small per-table vtable, and vectors are length-prefixed.
//
// This is a from-scratch, forward-building encoder/decoder rather than a
// port of the upstream backward-building FlatBuffers allocator: every
// pointer field (root offset, table-to-subtable, vector element) stores a
// *signed* delta from the field's own absolute position to its target's
// absolute position, computed once the target is fully written. Because the
// delta is relative, prepending the outer header (size prefix, optional
// file identifier, root offset) after the body is complete never
// invalidates an offset already written inside the body.

pub mod builder;
pub mod reader;

pub use builder::Builder;
pub use reader::Table;

/// Position of an already-written object, local to a [`Builder`]'s body
/// buffer (i.e. *before* the size-prefix/identifier/root-offset header is
/// prepended by [`Builder::finish`]).
pub type Offset = u32;
