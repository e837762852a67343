// Offset-table decoder: vtable-aware table view plus checked field access.

use crate::error::{NCodecError, Result};

fn check_bounds(buf: &[u8], pos: usize, len: usize) -> Result<()> {
    if pos.checked_add(len).map(|end| end > buf.len()).unwrap_or(true) {
        return Err(NCodecError::decode(format!(
            "buffer too short: need {len} bytes at {pos}, have {}",
            buf.len()
        )));
    }
    Ok(())
}

fn read_i32(buf: &[u8], pos: usize) -> Result<i32> {
    check_bounds(buf, pos, 4)?;
    Ok(i32::from_le_bytes(buf[pos..pos + 4].try_into().unwrap()))
}

fn read_u32(buf: &[u8], pos: usize) -> Result<u32> {
    check_bounds(buf, pos, 4)?;
    Ok(u32::from_le_bytes(buf[pos..pos + 4].try_into().unwrap()))
}

fn follow_offset(buf: &[u8], field_abs: usize) -> Result<usize> {
    let delta = read_i32(buf, field_abs)? as i64;
    let target = field_abs as i64 + delta;
    if target < 0 || target as usize > buf.len() {
        return Err(NCodecError::decode(format!(
            "invalid offset: field at {field_abs} points to {target}"
        )));
    }
    Ok(target as usize)
}

/// A view over one table in a decoded buffer: the buffer plus the table's
/// absolute start position.
#[derive(Clone, Copy)]
pub struct Table<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Table<'a> {
    /// Interpret `buf` as a size-prefixed container and locate its root
    /// table. `root_offset_field_pos` is the absolute position of the root
    /// offset field: 4 for a container with no file identifier, 8 for one
    /// that carries a 4-byte identifier after the size prefix.
    pub fn at_root(buf: &'a [u8], root_offset_field_pos: usize) -> Result<Table<'a>> {
        let size_prefix = read_u32(buf, 0)? as usize;
        if size_prefix > buf.len().saturating_sub(4) {
            return Err(NCodecError::decode(format!(
                "size prefix {size_prefix} exceeds backing buffer ({} bytes after prefix)",
                buf.len().saturating_sub(4)
            )));
        }
        let root_pos = follow_offset(buf, root_offset_field_pos)?;
        check_bounds(buf, root_pos, 4)?;
        Ok(Table { buf, pos: root_pos })
    }

    /// Look up a field's absolute position via the table's vtable, if the
    /// field is present.
    pub fn field_offset(&self, field_id: u16) -> Result<Option<usize>> {
        let vtable_pos = follow_offset(self.buf, self.pos)?;
        let count = {
            check_bounds(self.buf, vtable_pos, 2)?;
            u16::from_le_bytes(self.buf[vtable_pos..vtable_pos + 2].try_into().unwrap())
        } as usize;
        let entries_start = vtable_pos + 2;
        check_bounds(self.buf, entries_start, count * 6)?;
        for i in 0..count {
            let entry = entries_start + i * 6;
            let id = u16::from_le_bytes(self.buf[entry..entry + 2].try_into().unwrap());
            if id == field_id {
                let table_local_pos =
                    u32::from_le_bytes(self.buf[entry + 2..entry + 6].try_into().unwrap());
                return Ok(Some(self.pos + table_local_pos as usize));
            }
        }
        Ok(None)
    }

    pub fn get_u8(&self, field_id: u16) -> Result<Option<u8>> {
        match self.field_offset(field_id)? {
            Some(pos) => {
                check_bounds(self.buf, pos, 1)?;
                Ok(Some(self.buf[pos]))
            }
            None => Ok(None),
        }
    }

    pub fn get_u16(&self, field_id: u16) -> Result<Option<u16>> {
        match self.field_offset(field_id)? {
            Some(pos) => {
                check_bounds(self.buf, pos, 2)?;
                Ok(Some(u16::from_le_bytes(self.buf[pos..pos + 2].try_into().unwrap())))
            }
            None => Ok(None),
        }
    }

    pub fn get_u32(&self, field_id: u16) -> Result<Option<u32>> {
        match self.field_offset(field_id)? {
            Some(pos) => Ok(Some(read_u32(self.buf, pos)?)),
            None => Ok(None),
        }
    }

    pub fn get_u64(&self, field_id: u16) -> Result<Option<u64>> {
        match self.field_offset(field_id)? {
            Some(pos) => {
                check_bounds(self.buf, pos, 8)?;
                Ok(Some(u64::from_le_bytes(self.buf[pos..pos + 8].try_into().unwrap())))
            }
            None => Ok(None),
        }
    }

    /// Fixed-width inline struct bytes (e.g. the 16-byte IPv6 address pair).
    pub fn get_inline_bytes(&self, field_id: u16, width: usize) -> Result<Option<&'a [u8]>> {
        match self.field_offset(field_id)? {
            Some(pos) => {
                check_bounds(self.buf, pos, width)?;
                Ok(Some(&self.buf[pos..pos + width]))
            }
            None => Ok(None),
        }
    }

    pub fn get_offset_table(&self, field_id: u16) -> Result<Option<Table<'a>>> {
        match self.field_offset(field_id)? {
            Some(field_abs) => {
                let target = follow_offset(self.buf, field_abs)?;
                check_bounds(self.buf, target, 4)?;
                Ok(Some(Table { buf: self.buf, pos: target }))
            }
            None => Ok(None),
        }
    }

    pub fn get_byte_vector(&self, field_id: u16) -> Result<Option<Vec<u8>>> {
        match self.field_offset(field_id)? {
            Some(field_abs) => {
                let target = follow_offset(self.buf, field_abs)?;
                let len = read_u32(self.buf, target)? as usize;
                let data_start = target + 4;
                check_bounds(self.buf, data_start, len)?;
                Ok(Some(self.buf[data_start..data_start + len].to_vec()))
            }
            None => Ok(None),
        }
    }

    /// A vector field whose elements are themselves tables (e.g. `frames`
    /// or `pdus`).
    pub fn get_offset_vector_tables(&self, field_id: u16) -> Result<Option<Vec<Table<'a>>>> {
        match self.field_offset(field_id)? {
            Some(field_abs) => {
                let target = follow_offset(self.buf, field_abs)?;
                let len = read_u32(self.buf, target)? as usize;
                if len > self.buf.len() {
                    return Err(NCodecError::decode(format!(
                        "implausible vector length: {len}"
                    )));
                }
                let slots_start = target + 4;
                check_bounds(self.buf, slots_start, len * 4)?;
                let mut elements = Vec::with_capacity(len);
                for i in 0..len {
                    let slot = slots_start + i * 4;
                    let elem_pos = follow_offset(self.buf, slot)?;
                    check_bounds(self.buf, elem_pos, 4)?;
                    elements.push(Table { buf: self.buf, pos: elem_pos });
                }
                Ok(Some(elements))
            }
            None => Ok(None),
        }
    }
}

/// Free helper mirroring [`Table::get_byte_vector`] but starting from a
/// known field position rather than a vtable lookup; used by builder tests.
pub fn read_byte_vector(buf: &[u8], field_abs: usize) -> Result<Vec<u8>> {
    let target = follow_offset(buf, field_abs)?;
    let len = read_u32(buf, target)? as usize;
    let data_start = target + 4;
    check_bounds(buf, data_start, len)?;
    Ok(buf[data_start..data_start + len].to_vec())
}
