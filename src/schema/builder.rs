// Forward-building offset-table encoder.

use super::Offset;

/// One field recorded while a table is open, used to emit the table's
/// vtable once all fields have been written.
struct PendingField {
    id: u16,
    /// Position of the field's bytes, relative to the table's start.
    table_local_pos: u32,
}

/// Accumulates an offset-table container body in a contiguous byte buffer.
///
/// All positions handed out and accepted by this type ([`Offset`]) are
/// local to the body buffer, i.e. they do not yet account for the header
/// that [`Builder::finish`] prepends.
#[derive(Default)]
pub struct Builder {
    buf: Vec<u8>,
    /// Start position of the table currently under construction, if any.
    table_start: Option<u32>,
    fields: Vec<PendingField>,
}

impl Builder {
    pub fn new() -> Self {
        Builder::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Begin a new table. Must be matched by [`Builder::end_table`] before
    /// any other table can be started (tables are built depth-first: inner
    /// objects such as byte vectors and sub-tables are created first, then
    /// passed as [`Offset`]s into the enclosing table's fields).
    pub fn start_table(&mut self) {
        assert!(self.table_start.is_none(), "table already open");
        let start = self.buf.len() as u32;
        self.table_start = Some(start);
        self.fields.clear();
        // Placeholder for the vtable-offset header field, patched in
        // end_table once the vtable position is known.
        self.buf.extend_from_slice(&0i32.to_le_bytes());
    }

    fn table_start(&self) -> u32 {
        self.table_start.expect("no table open")
    }

    fn record_field(&mut self, id: u16) {
        let table_start = self.table_start();
        let table_local_pos = self.buf.len() as u32 - table_start;
        self.fields.push(PendingField { id, table_local_pos });
    }

    pub fn add_u8(&mut self, id: u16, value: u8) {
        self.record_field(id);
        self.buf.push(value);
    }

    pub fn add_u16(&mut self, id: u16, value: u16) {
        self.record_field(id);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn add_u32(&mut self, id: u16, value: u32) {
        self.record_field(id);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn add_u64(&mut self, id: u16, value: u64) {
        self.record_field(id);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Add a fixed-layout inline struct (no indirection), e.g. the 16-byte
    /// IPv6 address-pair struct.
    pub fn add_inline_bytes(&mut self, id: u16, bytes: &[u8]) {
        self.record_field(id);
        self.buf.extend_from_slice(bytes);
    }

    /// Add a reference to an already-built object (sub-table or vector).
    pub fn add_offset(&mut self, id: u16, target: Offset) {
        self.record_field(id);
        let field_abs = self.buf.len() as i64;
        let delta = target as i64 - field_abs;
        self.buf.extend_from_slice(&(delta as i32).to_le_bytes());
    }

    /// Finish the open table, writing its vtable and patching the header
    /// field. Returns the table's offset for use by an enclosing table.
    pub fn end_table(&mut self) -> Offset {
        let table_start = self.table_start();
        let vtable_start = self.buf.len() as u32;

        self.buf
            .extend_from_slice(&(self.fields.len() as u16).to_le_bytes());
        for field in &self.fields {
            self.buf.extend_from_slice(&field.id.to_le_bytes());
            self.buf.extend_from_slice(&field.table_local_pos.to_le_bytes());
        }

        let header_delta = vtable_start as i64 - table_start as i64;
        let header_bytes = (header_delta as i32).to_le_bytes();
        self.buf[table_start as usize..table_start as usize + 4].copy_from_slice(&header_bytes);

        self.table_start = None;
        self.fields.clear();
        table_start
    }

    /// Build a byte vector object (length-prefixed raw bytes). Returns its
    /// offset.
    pub fn create_byte_vector(&mut self, data: &[u8]) -> Offset {
        let start = self.buf.len() as u32;
        self.buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(data);
        start
    }

    /// Build a vector of offsets to other objects (e.g. frames or pdus).
    /// `offsets` is in the order the elements should appear on read.
    pub fn create_offset_vector(&mut self, offsets: &[Offset]) -> Offset {
        let start = self.buf.len() as u32;
        self.buf
            .extend_from_slice(&(offsets.len() as u32).to_le_bytes());
        // Reserve slots first so each delta can be computed against its own
        // final field position.
        let slots_start = self.buf.len();
        self.buf.resize(slots_start + offsets.len() * 4, 0);
        for (i, &target) in offsets.iter().enumerate() {
            let field_abs = (slots_start + i * 4) as i64;
            let delta = target as i64 - field_abs;
            let bytes = (delta as i32).to_le_bytes();
            self.buf[slots_start + i * 4..slots_start + i * 4 + 4].copy_from_slice(&bytes);
        }
        start
    }

    /// Finish the container: prepend the size prefix, optional 4-byte file
    /// identifier, and root offset, and return the complete buffer.
    pub fn finish(&self, root: Offset, file_identifier: Option<&[u8; 4]>) -> Vec<u8> {
        let id_len = if file_identifier.is_some() { 4 } else { 0 };
        let payload_len = id_len + 4 + self.buf.len();

        let mut out = Vec::with_capacity(4 + payload_len);
        out.extend_from_slice(&(payload_len as u32).to_le_bytes());
        if let Some(id) = file_identifier {
            out.extend_from_slice(id);
        }
        // header_len - 4 .. header_len is the root-offset field itself; the
        // delta from that field to the root table is always
        // `root_table_local_pos + 4` regardless of header length, since both
        // the field and the body shift by the same header length once
        // prepended. See module docs.
        let root_delta = root as i64 + 4;
        out.extend_from_slice(&(root_delta as i32).to_le_bytes());
        out.extend_from_slice(&self.buf);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_vector_roundtrip_via_reader() {
        use crate::schema::reader::read_byte_vector;

        let mut b = Builder::new();
        let vec_off = b.create_byte_vector(b"hello");
        b.start_table();
        b.add_offset(0, vec_off);
        let table_off = b.end_table();
        let bytes = b.finish(table_off, None);

        let table = crate::schema::Table::at_root(&bytes, 4).unwrap();
        let field_abs = table.field_offset(0).unwrap().unwrap();
        let data = read_byte_vector(&bytes, field_abs).unwrap();
        assert_eq!(data, b"hello");
    }
}
