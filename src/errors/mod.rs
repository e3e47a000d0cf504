use crate::disk_manager::Slot;

#[derive(Debug)]
pub enum Error {
    OutOfRange(Slot, Slot),
    DuplicateContact(i32),
    NotFound(i32),
    InvalidContact(String),
    Corrupt(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::OutOfRange(slot, slots) => {
                write!(f, "Slot {slot} is out of range, file holds {slots} slots.")
            }
            Error::DuplicateContact(id) => write!(f, "Contact {id} already exists."),
            Error::NotFound(id) => write!(f, "Contact {id} not found."),
            Error::InvalidContact(context) => write!(f, "Invalid contact: {context}."),
            Error::Corrupt(context) => write!(f, "Corrupt record: {context}."),
        }
    }
}

impl std::error::Error for Error {}
