mod disk_manager;

pub mod codec;
pub mod config;
pub mod contact;
pub mod errors;
pub mod listing;
pub mod store;

pub use codec::RECORD_SIZE;
pub use contact::Contact;
pub use disk_manager::Slot;
pub use errors::Error;
pub use store::Agenda;
