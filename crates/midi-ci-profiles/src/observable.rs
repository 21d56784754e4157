use midi_ci_types::{Address, ProfileId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One profile's state at a (group, address): spec §3, "Profile entry".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileEntry {
    pub profile_id: ProfileId,
    pub group: u8,
    pub addr: Address,
    pub enabled: bool,
    pub channels_requested: u16,
}

impl ProfileEntry {
    fn key(&self) -> (ProfileId, u8, u8) {
        (self.profile_id, self.group, self.addr.to_byte())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileEvent {
    Added(ProfileEntry),
    EnabledChanged(ProfileEntry),
    Removed(ProfileEntry),
}

/// A stable handle returned at callback registration; deregister by handle,
/// never by comparing closures (spec §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackHandle(u64);

type Callback = Arc<dyn Fn(ProfileEvent) + Send + Sync>;

/// `{items, callbacks}` guarded by a plain (non-reentrant) mutex; enforces
/// "no duplicate (profileId, group, addr)" (spec §4.3, P7) and snapshots the
/// callback set before firing so re-entrant mutation from inside a callback
/// is safe (spec §9).
#[derive(Default)]
pub struct ObservableProfileList {
    entries: Mutex<Vec<ProfileEntry>>,
    callbacks: Mutex<Vec<(u64, Callback)>>,
    next_handle: AtomicU64,
}

impl ObservableProfileList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, cb: Callback) -> CallbackHandle {
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.callbacks.lock().push((id, cb));
        CallbackHandle(id)
    }

    pub fn unregister(&self, handle: CallbackHandle) {
        self.callbacks.lock().retain(|(id, _)| *id != handle.0);
    }

    /// Snapshots the callback set before firing, so a callback that mutates
    /// the list (adding another callback) cannot invalidate this iteration
    /// (spec §9, "notifier must snapshot the callback set").
    fn notify(&self, event: ProfileEvent) {
        let snapshot: Vec<Callback> = self.callbacks.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for cb in snapshot {
            cb(event);
        }
    }

    /// Inserts the entry if its (profileId, group, addr) triple is new.
    /// Re-adding an existing triple is a no-op but still fires `Added` so
    /// observers can re-sync (spec §4.3, "silently collapsed").
    pub fn add(&self, entry: ProfileEntry) {
        let mut entries = self.entries.lock();
        if !entries.iter().any(|e| e.key() == entry.key()) {
            entries.push(entry);
        }
        drop(entries);
        self.notify(ProfileEvent::Added(entry));
    }

    pub fn remove(&self, profile_id: ProfileId, group: u8, addr: Address) -> Option<ProfileEntry> {
        let mut entries = self.entries.lock();
        let key = (profile_id, group, addr.to_byte());
        let pos = entries.iter().position(|e| e.key() == key)?;
        let removed = entries.remove(pos);
        drop(entries);
        self.notify(ProfileEvent::Removed(removed));
        Some(removed)
    }

    pub fn set_enabled(
        &self,
        profile_id: ProfileId,
        group: u8,
        addr: Address,
        enabled: bool,
        channels_requested: u16,
    ) -> Option<ProfileEntry> {
        let mut entries = self.entries.lock();
        let key = (profile_id, group, addr.to_byte());
        let entry = entries.iter_mut().find(|e| e.key() == key)?;
        entry.enabled = enabled;
        entry.channels_requested = channels_requested;
        let updated = *entry;
        drop(entries);
        self.notify(ProfileEvent::EnabledChanged(updated));
        Some(updated)
    }

    pub fn snapshot(&self) -> Vec<ProfileEntry> {
        self.entries.lock().clone()
    }

    pub fn enabled(&self) -> Vec<ProfileEntry> {
        self.entries.lock().iter().filter(|e| e.enabled).copied().collect()
    }

    pub fn disabled(&self) -> Vec<ProfileEntry> {
        self.entries.lock().iter().filter(|e| !e.enabled).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    fn entry(profile: u8, group: u8, addr: Address, enabled: bool) -> ProfileEntry {
        ProfileEntry {
            profile_id: ProfileId([profile, 0, 0, 0, 0]),
            group,
            addr,
            enabled,
            channels_requested: 0,
        }
    }

    #[test]
    fn rejects_duplicate_triples() {
        let list = ObservableProfileList::new();
        list.add(entry(1, 0, Address::Channel(0), false));
        list.add(entry(1, 0, Address::Channel(0), false));
        assert_eq!(list.snapshot().len(), 1);
    }

    #[test]
    fn callbacks_fire_in_order_and_tolerate_reentry() {
        let list = ObservableProfileList::new();
        let log: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));
        let log2 = log.clone();
        list.register(Arc::new(move |ev| {
            log2.lock().unwrap().push(format!("{ev:?}"));
        }));
        list.add(entry(1, 0, Address::Channel(0), false));
        list.set_enabled(ProfileId([1, 0, 0, 0, 0]), 0, Address::Channel(0), true, 1);
        list.remove(ProfileId([1, 0, 0, 0, 0]), 0, Address::Channel(0));
        let events = log.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(events[0].starts_with("Added"));
        assert!(events[1].starts_with("EnabledChanged"));
        assert!(events[2].starts_with("Removed"));
    }
}
