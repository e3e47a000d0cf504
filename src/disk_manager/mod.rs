use crate::codec::{self, RECORD_SIZE};
use crate::contact::Contact;
use anyhow::{Context, Result};
use log::debug;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Index of a fixed-size record inside the agenda file
pub type Slot = u64;

/// Result of scanning the file front to back.
///
/// `error` holds the failure that stopped the scan, if any; `slots` is
/// everything decoded before it.
#[derive(Debug, Default)]
pub struct Scan {
    pub slots: Vec<(Slot, Contact)>,
    pub total: Slot,
    pub trailing_bytes: u64,
    pub error: Option<anyhow::Error>,
}

/// Owns the path of the agenda file, never the handle.
/// Every call opens the file and drops it before returning.
#[derive(Debug)]
pub struct DiskManager {
    path: PathBuf,
}

impl DiskManager {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }

        let disk = Self { path };
        disk.open()?;
        Ok(disk)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))
    }

    #[allow(unused)]
    pub fn file_len(&self) -> Result<u64> {
        Ok(self.open()?.metadata()?.len())
    }

    #[allow(unused)]
    pub fn slot_count(&self) -> Result<Slot> {
        codec::slot_count(&mut self.open()?)
    }

    pub fn read_all(&self) -> Result<Scan> {
        let mut file = self.open()?;
        let len = file.metadata()?.len();

        let mut scan = Scan {
            total: len / RECORD_SIZE as u64,
            trailing_bytes: len % RECORD_SIZE as u64,
            ..Default::default()
        };

        for slot in 0..scan.total {
            match codec::decode_at(&mut file, slot) {
                Ok(contact) => scan.slots.push((slot, contact)),
                Err(e) => {
                    scan.error = Some(e.context(format!(
                        "reading slot {slot} of {}",
                        self.path.display()
                    )));
                    break;
                }
            }
        }

        Ok(scan)
    }

    pub fn write_slot(&self, slot: Slot, contact: &Contact) -> Result<()> {
        let mut file = self.open()?;
        codec::encode_at(&mut file, contact, slot)
            .with_context(|| format!("writing slot {slot} of {}", self.path.display()))?;

        debug!("wrote contact {} to slot {slot}", contact.id());
        Ok(())
    }

    pub fn append(&self, contact: &Contact) -> Result<Slot> {
        let mut file = self.open()?;
        let slot = codec::append(&mut file, contact)
            .with_context(|| format!("appending to {}", self.path.display()))?;

        debug!("appended contact {} at slot {slot}", contact.id());
        Ok(slot)
    }

    /// Write `contacts` into slots `0..n` and cut the file down to `n` slots.
    /// Returns `n`.
    pub fn rewrite<'a>(&self, contacts: impl IntoIterator<Item = &'a Contact>) -> Result<Slot> {
        let mut file = self.open()?;

        let mut slots: Slot = 0;
        for contact in contacts {
            codec::encode_at(&mut file, contact, slots)
                .with_context(|| format!("rewriting slot {slots} of {}", self.path.display()))?;
            slots += 1;
        }

        let len = slots * RECORD_SIZE as u64;
        file.set_len(len)
            .with_context(|| format!("truncating {} to {len} bytes", self.path.display()))?;

        debug!("rewrote {} with {slots} slots", self.path.display());
        Ok(slots)
    }
}

#[cfg(test)]
pub(crate) fn test_path() -> PathBuf {
    PathBuf::from(format!("data/test/{}.dat", uuid::Uuid::new_v4()))
}
