use crate::contact::Contact;
use crate::disk_manager::{DiskManager, Slot};
use crate::errors::Error;
use anyhow::Result;
use log::{info, warn};
use std::path::Path;

pub const DEFAULT_FILE: &str = "agenda.dat";

/// A live contact together with the slot that backs it on disk
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    slot: Slot,
    contact: Contact,
}

/// In-memory view of the live contacts of an agenda file.
///
/// Every live contact remembers the slot it was read from (or appended to),
/// so deletes, which drop entries from memory but leave tombstones on disk,
/// never shift where later writes land. The file is only opened for the
/// duration of a single operation.
///
/// Modify, delete and sort update memory first and then write. If the write
/// fails the error is returned and memory is left ahead of the file.
#[derive(Debug)]
pub struct Agenda {
    disk: DiskManager,
    entries: Vec<Entry>,
    load_error: Option<anyhow::Error>,
}

impl Agenda {
    /// Opens the agenda at `path`, creating an empty file if there is none.
    ///
    /// A slot that fails to decode stops the load; the contacts read before
    /// it are kept and the failure is available from [`Agenda::load_error`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let disk = DiskManager::new(path)?;
        let scan = disk.read_all()?;

        if scan.trailing_bytes > 0 {
            warn!(
                "{} ends with {} bytes of a partial slot, ignoring them",
                disk.path().display(),
                scan.trailing_bytes
            );
        }

        if let Some(e) = &scan.error {
            warn!(
                "loading {} stopped early, keeping {} of {} slots: {e:#}",
                disk.path().display(),
                scan.slots.len(),
                scan.total
            );
        }

        let entries: Vec<Entry> = scan
            .slots
            .into_iter()
            .filter(|(_, contact)| !contact.is_tombstone())
            .map(|(slot, contact)| Entry { slot, contact })
            .collect();

        info!(
            "opened {} with {} slots, {} live",
            disk.path().display(),
            scan.total,
            entries.len()
        );

        Ok(Self {
            disk,
            entries,
            load_error: scan.error,
        })
    }

    pub fn path(&self) -> &Path {
        self.disk.path()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn load_error(&self) -> Option<&anyhow::Error> {
        self.load_error.as_ref()
    }

    fn position(&self, id: i32) -> Option<usize> {
        self.entries.iter().position(|e| e.contact.id() == id)
    }

    /// Appends `contact` to the end of the file and returns its slot.
    /// Slots of deleted contacts are never reused.
    pub fn create(&mut self, contact: Contact) -> Result<Slot> {
        if contact.is_tombstone() {
            return Err(Error::InvalidContact(format!(
                "id {} marks a deleted slot",
                contact.id()
            ))
            .into());
        }

        if self.entries.iter().any(|e| e.contact == contact) {
            warn!("contact {} already exists", contact.id());
            return Err(Error::DuplicateContact(contact.id()).into());
        }

        // the slot is only known once the file is open
        let slot = self.disk.append(&contact)?;
        self.entries.push(Entry { slot, contact });

        Ok(slot)
    }

    pub fn find_by_id(&self, id: i32) -> Option<&Contact> {
        self.entries
            .iter()
            .map(|e| &e.contact)
            .find(|c| c.id() == id)
    }

    /// Slot backing the live contact with `id`
    pub fn slot_of(&self, id: i32) -> Option<Slot> {
        self.entries.iter().find(|e| e.contact.id() == id).map(|e| e.slot)
    }

    /// Replaces every field of the live contact sharing `contact`'s id
    /// and rewrites its slot.
    pub fn modify(&mut self, contact: Contact) -> Result<()> {
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.contact.id() == contact.id())
        else {
            warn!("cannot modify contact {}, not found", contact.id());
            return Err(Error::NotFound(contact.id()).into());
        };

        entry.contact = contact;
        self.disk.write_slot(entry.slot, &entry.contact)
    }

    /// Removes the live contact sharing `contact`'s id and tombstones its slot.
    /// Returns the contact as written to disk, id set to -1.
    pub fn delete(&mut self, contact: &Contact) -> Result<Contact> {
        self.delete_by_id(contact.id())
    }

    pub fn delete_by_id(&mut self, id: i32) -> Result<Contact> {
        let Some(position) = self.position(id) else {
            warn!("cannot delete contact {id}, not found");
            return Err(Error::NotFound(id).into());
        };

        let Entry { slot, mut contact } = self.entries.remove(position);
        contact.mark_deleted();
        self.disk.write_slot(slot, &contact)?;

        Ok(contact)
    }

    /// Orders contacts by name and rewrites the file to hold exactly the
    /// live contacts in that order, dropping every tombstone.
    ///
    /// Refused when the load stopped early, since the slots past the
    /// failure were never read and the rewrite would cut them off.
    pub fn sort(&mut self) -> Result<()> {
        if let Some(e) = &self.load_error {
            warn!("not sorting {}, it was only partly loaded", self.disk.path().display());
            return Err(Error::Corrupt(format!("cannot sort a partly loaded file: {e:#}")).into());
        }

        self.entries
            .sort_by(|a, b| a.contact.cmp_by_name(&b.contact));

        for (slot, entry) in self.entries.iter_mut().enumerate() {
            entry.slot = slot as Slot;
        }

        let slots = self.disk.rewrite(self.entries.iter().map(|e| &e.contact))?;
        info!("sorted {} into {slots} slots", self.disk.path().display());

        Ok(())
    }

    pub fn list(&self) -> impl Iterator<Item = &Contact> + '_ {
        self.entries.iter().map(|e| &e.contact)
    }

    pub fn search_by_name_substring<'a>(
        &'a self,
        query: &'a str,
    ) -> impl Iterator<Item = &'a Contact> + 'a {
        self.list().filter(move |c| c.matches_name(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{RECORD_SIZE, decode_at};
    use crate::contact::{ADDRESS_WIDTH, NAME_WIDTH, PHONE_WIDTH};
    use crate::disk_manager::test_path;
    use rand::seq::SliceRandom;
    use rand::Rng;
    use std::fs::{self, File};
    use std::path::PathBuf;

    fn cleanup(agenda: Agenda) -> Result<()> {
        let path = agenda.path().to_path_buf();
        drop(agenda);
        fs::remove_file(path)?;
        Ok(())
    }

    fn file_len(path: &Path) -> Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn raw_slot(path: &Path, slot: Slot) -> Result<Contact> {
        decode_at(&mut File::open(path)?, slot)
    }

    fn names(agenda: &Agenda) -> Vec<String> {
        agenda.list().map(|c| c.name().trim().to_string()).collect()
    }

    /// Scenario: ids 1, 2, 3 named Bob, Ana, Cid
    fn trio() -> Result<(Agenda, PathBuf)> {
        let path = test_path();
        let mut agenda = Agenda::open(&path)?;
        agenda.create(Contact::new(1, "Bob", "Main St 1", "555000001"))?;
        agenda.create(Contact::new(2, "Ana", "Main St 2", "555000002"))?;
        agenda.create(Contact::new(3, "Cid", "Main St 3", "555000003"))?;
        Ok((agenda, path))
    }

    #[test]
    fn test_open_missing_file() -> Result<()> {
        let path = test_path();
        assert!(!path.exists());

        let agenda = Agenda::open(&path)?;

        assert!(agenda.is_empty());
        assert!(agenda.load_error().is_none());
        assert!(path.exists());
        assert_eq!(file_len(&path)?, 0);

        cleanup(agenda)
    }

    #[test]
    fn test_append_trio() -> Result<()> {
        let (agenda, path) = trio()?;

        assert_eq!(file_len(&path)?, 3 * RECORD_SIZE as u64);
        assert_eq!(names(&agenda), vec!["Bob", "Ana", "Cid"]);
        assert_eq!(agenda.slot_of(3), Some(2));

        let reopened = Agenda::open(&path)?;
        assert_eq!(names(&reopened), vec!["Bob", "Ana", "Cid"]);

        cleanup(agenda)
    }

    #[test]
    fn test_sort_rewrites_slots() -> Result<()> {
        let (mut agenda, path) = trio()?;

        agenda.sort()?;

        assert_eq!(names(&agenda), vec!["Ana", "Bob", "Cid"]);
        assert_eq!(raw_slot(&path, 0)?.name(), "Ana                 ");
        assert_eq!(raw_slot(&path, 1)?.name(), "Bob                 ");
        assert_eq!(raw_slot(&path, 2)?.name(), "Cid                 ");
        assert_eq!(agenda.slot_of(2), Some(0));

        cleanup(agenda)
    }

    #[test]
    fn test_delete_then_reopen() -> Result<()> {
        let (mut agenda, path) = trio()?;
        let bob = agenda.find_by_id(1).cloned().unwrap();

        let deleted = agenda.delete(&bob)?;
        assert!(deleted.is_tombstone());

        let reopened = Agenda::open(&path)?;
        assert_eq!(names(&reopened), vec!["Ana", "Cid"]);

        let raw = fs::read(&path)?;
        assert_eq!(raw[0..4], [0xFFu8; 4]);
        assert_eq!(raw.len(), 3 * RECORD_SIZE);

        cleanup(agenda)
    }

    #[test]
    fn test_duplicate_is_rejected() -> Result<()> {
        let (mut agenda, path) = trio()?;

        let err = agenda
            .create(Contact::new(1, "Bob", "Main St 1", "555000001"))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::DuplicateContact(1))
        ));
        assert_eq!(file_len(&path)?, 3 * RECORD_SIZE as u64);
        assert_eq!(agenda.len(), 3);

        cleanup(agenda)
    }

    #[test]
    fn test_create_twice_keeps_length() -> Result<()> {
        let path = test_path();
        let mut agenda = Agenda::open(&path)?;
        let contact = Contact::new(10, "Eva", "Pine 4", "600100200");

        agenda.create(contact.clone())?;
        let len = file_len(&path)?;
        assert!(agenda.create(contact).is_err());

        assert_eq!(file_len(&path)?, len);

        cleanup(agenda)
    }

    #[test]
    fn test_long_name_truncated() -> Result<()> {
        let path = test_path();
        let mut agenda = Agenda::open(&path)?;

        agenda.create(Contact::new(1, "abcdefghijklmnopqrstuvwxyz", "", ""))?;

        let raw = fs::read(&path)?;
        assert_eq!(raw[4..6], 20u16.to_be_bytes());
        assert_eq!(&raw[6..26], b"abcdefghijklmnopqrst");

        cleanup(agenda)
    }

    #[test]
    fn test_tombstone_cannot_be_created() -> Result<()> {
        let path = test_path();
        let mut agenda = Agenda::open(&path)?;

        let err = agenda.create(Contact::new(-1, "Ghost", "", "")).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidContact(_))
        ));
        assert_eq!(file_len(&path)?, 0);

        cleanup(agenda)
    }

    #[test]
    fn test_find_by_id() -> Result<()> {
        let (agenda, _) = trio()?;

        assert_eq!(agenda.find_by_id(2).map(|c| c.name().trim()), Some("Ana"));
        assert!(agenda.find_by_id(42).is_none());

        cleanup(agenda)
    }

    #[test]
    fn test_modify_keeps_slot() -> Result<()> {
        let (mut agenda, path) = trio()?;
        let slot = agenda.slot_of(2);

        agenda.modify(Contact::new(2, "Anabel", "New St 9", "999"))?;
        drop(agenda);

        let agenda = Agenda::open(&path)?;
        assert_eq!(agenda.slot_of(2), slot);
        assert_eq!(agenda.find_by_id(2).map(|c| c.name().trim()), Some("Anabel"));
        assert_eq!(raw_slot(&path, 1)?.address().trim(), "New St 9");
        assert_eq!(file_len(&path)?, 3 * RECORD_SIZE as u64);

        cleanup(agenda)
    }

    #[test]
    fn test_modify_after_delete_targets_own_slot() -> Result<()> {
        let (mut agenda, path) = trio()?;

        agenda.delete_by_id(1)?;
        agenda.modify(Contact::new(3, "Cidney", "", ""))?;

        // slot 1 still belongs to Ana, slot 2 to Cid
        assert_eq!(raw_slot(&path, 0)?.id(), -1);
        assert_eq!(raw_slot(&path, 1)?.name().trim(), "Ana");
        assert_eq!(raw_slot(&path, 2)?.name().trim(), "Cidney");

        let reopened = Agenda::open(&path)?;
        assert_eq!(names(&reopened), vec!["Ana", "Cidney"]);

        cleanup(agenda)
    }

    #[test]
    fn test_modify_and_delete_missing() -> Result<()> {
        let (mut agenda, path) = trio()?;

        let err = agenda.modify(Contact::new(9, "Nobody", "", "")).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound(9))));

        let err = agenda.delete_by_id(-1).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound(-1))));

        assert_eq!(agenda.len(), 3);
        assert_eq!(file_len(&path)?, 3 * RECORD_SIZE as u64);

        cleanup(agenda)
    }

    #[test]
    fn test_create_does_not_reuse_tombstones() -> Result<()> {
        let (mut agenda, path) = trio()?;

        agenda.delete_by_id(2)?;
        let slot = agenda.create(Contact::new(4, "Dan", "", ""))?;

        assert_eq!(slot, 3);
        assert_eq!(file_len(&path)?, 4 * RECORD_SIZE as u64);

        cleanup(agenda)
    }

    #[test]
    fn test_deleted_stays_hidden() -> Result<()> {
        let (mut agenda, path) = trio()?;

        agenda.delete_by_id(2)?;
        for id in 10..20 {
            agenda.create(Contact::new(id, &format!("Extra {id}"), "", ""))?;
        }
        drop(agenda);

        let agenda = Agenda::open(&path)?;
        assert!(agenda.find_by_id(2).is_none());
        assert_eq!(agenda.len(), 12);

        cleanup(agenda)
    }

    #[test]
    fn test_sort_truncates_tombstones() -> Result<()> {
        let (mut agenda, path) = trio()?;

        agenda.delete_by_id(3)?;
        agenda.delete_by_id(1)?;
        agenda.sort()?;

        assert_eq!(file_len(&path)?, RECORD_SIZE as u64);
        assert_eq!(raw_slot(&path, 0)?.id(), 2);

        // new contacts land right after the live range
        assert_eq!(agenda.create(Contact::new(5, "Eli", "", ""))?, 1);

        cleanup(agenda)
    }

    #[test]
    fn test_search_by_name_substring() -> Result<()> {
        let path = test_path();
        let mut agenda = Agenda::open(&path)?;
        agenda.create(Contact::new(1, "Maria Lopez", "", ""))?;
        agenda.create(Contact::new(2, "Mario Ruiz", "", ""))?;
        agenda.create(Contact::new(3, "Pedro Lopez", "", ""))?;

        let ids: Vec<i32> = agenda.search_by_name_substring("LOPEZ").map(|c| c.id()).collect();
        assert_eq!(ids, vec![1, 3]);

        let ids: Vec<i32> = agenda.search_by_name_substring("mari").map(|c| c.id()).collect();
        assert_eq!(ids, vec![1, 2]);

        assert_eq!(agenda.search_by_name_substring("zzz").count(), 0);

        cleanup(agenda)
    }

    #[test]
    fn test_partial_tail_is_ignored() -> Result<()> {
        let (agenda, path) = trio()?;
        drop(agenda);

        let mut raw = fs::read(&path)?;
        raw.extend([b'x'; 7]);
        fs::write(&path, raw)?;

        let mut agenda = Agenda::open(&path)?;
        assert_eq!(agenda.len(), 3);
        assert!(agenda.load_error().is_none());

        assert_eq!(agenda.create(Contact::new(4, "Dan", "", ""))?, 3);
        assert_eq!(file_len(&path)?, 4 * RECORD_SIZE as u64);

        cleanup(agenda)
    }

    #[test]
    fn test_corrupt_slot_keeps_prefix() -> Result<()> {
        let (agenda, path) = trio()?;
        drop(agenda);

        let mut raw = fs::read(&path)?;
        let phone_prefix = 2 * RECORD_SIZE + 58;
        raw[phone_prefix..phone_prefix + 2].copy_from_slice(&500u16.to_be_bytes());
        fs::write(&path, raw)?;

        let agenda = Agenda::open(&path)?;

        assert_eq!(names(&agenda), vec!["Bob", "Ana"]);
        assert!(agenda.load_error().is_some());

        cleanup(agenda)
    }

    #[test]
    fn test_sort_after_partial_load_keeps_unread_slots() -> Result<()> {
        let (agenda, path) = trio()?;
        drop(agenda);

        let mut raw = fs::read(&path)?;
        let name_prefix = RECORD_SIZE + 4;
        raw[name_prefix..name_prefix + 2].copy_from_slice(&500u16.to_be_bytes());
        fs::write(&path, raw)?;

        let mut agenda = Agenda::open(&path)?;
        assert_eq!(names(&agenda), vec!["Bob"]);

        let err = agenda.sort().unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Corrupt(_))));

        assert_eq!(file_len(&path)?, 3 * RECORD_SIZE as u64);
        assert_eq!(raw_slot(&path, 2)?, Contact::new(3, "Cid", "Main St 3", "555000003"));

        cleanup(agenda)
    }

    #[test]
    fn test_random_workload_invariants() -> Result<()> {
        let path = test_path();
        let mut agenda = Agenda::open(&path)?;
        let mut rng = rand::thread_rng();

        let mut ids: Vec<i32> = (0..40).collect();
        ids.shuffle(&mut rng);

        for id in &ids {
            let len = rng.gen_range(0..30);
            let name: String = (0..len)
                .map(|_| rng.gen_range(b'A'..=b'z') as char)
                .collect();
            agenda.create(Contact::new(*id, &name, "Somewhere", "123"))?;
        }

        for id in ids.iter().take(10) {
            agenda.delete_by_id(*id)?;
        }

        assert_eq!(file_len(&path)? % RECORD_SIZE as u64, 0);

        agenda.sort()?;
        drop(agenda);

        let agenda = Agenda::open(&path)?;
        assert_eq!(agenda.len(), 30);
        assert_eq!(file_len(&path)?, 30 * RECORD_SIZE as u64);

        let contacts: Vec<&Contact> = agenda.list().collect();
        for pair in contacts.windows(2) {
            assert!(
                pair[0].name().trim().to_lowercase() <= pair[1].name().trim().to_lowercase()
            );
        }

        for contact in contacts {
            assert_eq!(contact.name().len(), NAME_WIDTH);
            assert_eq!(contact.address().len(), ADDRESS_WIDTH);
            assert_eq!(contact.phone().len(), PHONE_WIDTH);
        }

        cleanup(agenda)
    }
}
