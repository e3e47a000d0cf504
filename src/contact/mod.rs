pub mod fixed_text;

use std::cmp::Ordering;
use std::fmt;

pub use fixed_text::FixedText;
use serde::{Deserialize, Serialize};

pub const NAME_WIDTH: usize = 20;
pub const ADDRESS_WIDTH: usize = 30;
pub const PHONE_WIDTH: usize = 10;

/// Id carried by a deleted slot
pub const TOMBSTONE_ID: i32 = -1;

/// One entry of the agenda.
///
/// Text fields are normalized on assignment, so two contacts built from
/// inputs that differ only past the field width (or in trailing spaces)
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    id: i32,
    name: FixedText<NAME_WIDTH>,
    address: FixedText<ADDRESS_WIDTH>,
    phone: FixedText<PHONE_WIDTH>,
}

impl Contact {
    pub fn new(id: i32, name: &str, address: &str, phone: &str) -> Self {
        Self {
            id,
            name: FixedText::new(name),
            address: FixedText::new(address),
            phone: FixedText::new(phone),
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn address(&self) -> &str {
        self.address.as_str()
    }

    pub fn phone(&self) -> &str {
        self.phone.as_str()
    }

    pub fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = FixedText::new(name);
    }

    pub fn set_address(&mut self, address: &str) {
        self.address = FixedText::new(address);
    }

    pub fn set_phone(&mut self, phone: &str) {
        self.phone = FixedText::new(phone);
    }

    pub fn mark_deleted(&mut self) {
        self.id = TOMBSTONE_ID;
    }

    pub fn is_tombstone(&self) -> bool {
        self.id == TOMBSTONE_ID
    }

    /// Case-insensitive substring match on the name
    pub fn matches_name(&self, query: &str) -> bool {
        self.name
            .as_str()
            .to_lowercase()
            .contains(&query.to_lowercase())
    }

    /// Natural order of the agenda: trimmed names, ignoring case.
    /// Kept apart from `Ord` since equality covers every field.
    pub fn cmp_by_name(&self, other: &Contact) -> Ordering {
        self.name
            .trimmed()
            .to_lowercase()
            .cmp(&other.name.trimmed().to_lowercase())
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.id,
            self.name.as_str(),
            self.address.as_str(),
            self.phone.as_str()
        )
    }
}
