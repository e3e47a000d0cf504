use crate::contact::{Contact, ADDRESS_WIDTH, NAME_WIDTH, PHONE_WIDTH};
use crate::disk_manager::Slot;
use crate::errors::Error;
use anyhow::Result;
use std::io::{Read, Seek, SeekFrom, Write};

const ID_SIZE: usize = std::mem::size_of::<i32>();
const PREFIX_SIZE: usize = std::mem::size_of::<u16>();

/// Width of every slot in the agenda file.
///
/// Layout, all integers big-endian:
/// ```text
/// +--------+-----+------------+-----+--------------+-----+------------+
/// | id i32 | u16 | name (20)  | u16 | address (30) | u16 | phone (10) |
/// +--------+-----+------------+-----+--------------+-----+------------+
/// ```
/// Each `u16` is the byte length of the field that follows it.
pub const RECORD_SIZE: usize =
    ID_SIZE + 3 * PREFIX_SIZE + NAME_WIDTH + ADDRESS_WIDTH + PHONE_WIDTH;

/// Truncate or right-pad `field` with spaces so it is exactly `width` bytes.
///
/// At most `width` characters are kept and a multi-byte character that
/// would cross the width is dropped whole.
pub fn normalize(field: &str, width: usize) -> String {
    let mut text = String::with_capacity(width);
    for c in field.chars().take(width) {
        if text.len() + c.len_utf8() > width {
            break;
        }
        text.push(c);
    }

    while text.len() < width {
        text.push(' ');
    }
    text
}

pub fn to_bytes(contact: &Contact) -> [u8; RECORD_SIZE] {
    let mut bytes = [0u8; RECORD_SIZE];
    bytes[..ID_SIZE].copy_from_slice(&contact.id().to_be_bytes());

    let mut offset = ID_SIZE;
    for field in [contact.name(), contact.address(), contact.phone()] {
        let len = field.len();
        bytes[offset..offset + PREFIX_SIZE].copy_from_slice(&(len as u16).to_be_bytes());
        offset += PREFIX_SIZE;
        bytes[offset..offset + len].copy_from_slice(field.as_bytes());
        offset += len;
    }

    bytes
}

pub fn from_bytes(bytes: &[u8]) -> Result<Contact> {
    if bytes.len() != RECORD_SIZE {
        return Err(Error::Corrupt(format!(
            "expected {RECORD_SIZE} bytes, got {}",
            bytes.len()
        ))
        .into());
    }

    let mut id = [0u8; ID_SIZE];
    id.copy_from_slice(&bytes[..ID_SIZE]);

    let mut fields = FieldReader {
        bytes,
        offset: ID_SIZE,
    };
    let name = fields.next_field("name")?;
    let address = fields.next_field("address")?;
    let phone = fields.next_field("phone")?;

    Ok(Contact::new(i32::from_be_bytes(id), name, address, phone))
}

/// Walks the length-prefixed text fields of one slot
struct FieldReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> FieldReader<'a> {
    fn next_field(&mut self, field: &str) -> Result<&'a str> {
        let start = self.offset + PREFIX_SIZE;
        if start > self.bytes.len() {
            return Err(Error::Corrupt(format!("{field} length prefix past end of slot")).into());
        }

        let len = u16::from_be_bytes([self.bytes[self.offset], self.bytes[self.offset + 1]]);
        let end = start + len as usize;
        if end > self.bytes.len() {
            return Err(Error::Corrupt(format!("{field} length {len} overflows slot")).into());
        }

        let text = std::str::from_utf8(&self.bytes[start..end])
            .map_err(|_| Error::Corrupt(format!("{field} is not valid UTF-8")))?;
        self.offset = end;
        Ok(text)
    }
}

/// Number of whole slots in `file`. A partial trailing slot is not counted.
pub fn slot_count<F: Seek>(file: &mut F) -> Result<Slot> {
    let len = file.seek(SeekFrom::End(0))?;
    Ok(len / RECORD_SIZE as u64)
}

#[inline]
fn slot_offset(slot: Slot) -> u64 {
    slot * RECORD_SIZE as u64
}

fn check_range<F: Seek>(file: &mut F, slot: Slot) -> Result<()> {
    let slots = slot_count(file)?;
    if slot >= slots {
        return Err(Error::OutOfRange(slot, slots).into());
    }
    Ok(())
}

/// Overwrite an existing slot
pub fn encode_at<F: Write + Seek>(file: &mut F, contact: &Contact, slot: Slot) -> Result<()> {
    check_range(file, slot)?;

    file.seek(SeekFrom::Start(slot_offset(slot)))?;
    file.write_all(&to_bytes(contact))?;
    Ok(())
}

/// Write `contact` into a new slot past the last whole one and return its index.
///
/// A partial trailing slot is overwritten, which keeps the file length a
/// multiple of [`RECORD_SIZE`].
pub fn append<F: Write + Seek>(file: &mut F, contact: &Contact) -> Result<Slot> {
    let slot = slot_count(file)?;

    file.seek(SeekFrom::Start(slot_offset(slot)))?;
    file.write_all(&to_bytes(contact))?;
    Ok(slot)
}

pub fn decode_at<F: Read + Seek>(file: &mut F, slot: Slot) -> Result<Contact> {
    check_range(file, slot)?;

    let mut buffer = [0u8; RECORD_SIZE];
    file.seek(SeekFrom::Start(slot_offset(slot)))?;
    file.read_exact(&mut buffer)?;
    from_bytes(&buffer)
}
