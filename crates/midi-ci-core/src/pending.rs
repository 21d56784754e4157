use midi_ci_codec::message::CiMessage;
use midi_ci_types::error::CiError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Instant;

/// `requestId -> (callback, deadline)` (spec §4.2). The callback fires once,
/// with either the matching reply or `Ack`/`Nak`.
pub struct PendingRequest {
    pub callback: Box<dyn FnOnce(CiMessage) + Send>,
    pub deadline: Option<Instant>,
}

/// The 7-bit `requestId` space for one connection, `1..=127` (spec §5:
/// "the only contended resource", scoped per connection per §4.2). `0` is
/// never assigned.
#[derive(Default)]
pub struct PendingTable {
    slots: Mutex<HashMap<u8, PendingRequest>>,
    next_hint: Mutex<u8>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next free ID starting after the last one handed out,
    /// wrapping `1..=127`, and registers `callback` for it. Returns
    /// `RequestIdTableFull` if all 127 slots are held (spec §7, class 6).
    pub fn allocate(
        &self,
        deadline: Option<Instant>,
        callback: impl FnOnce(CiMessage) + Send + 'static,
    ) -> Result<u8, CiError> {
        let mut slots = self.slots.lock();
        if slots.len() >= 127 {
            return Err(CiError::RequestIdTableFull);
        }
        let mut hint = self.next_hint.lock();
        for _ in 0..127 {
            *hint = if *hint >= 127 { 1 } else { *hint + 1 };
            if !slots.contains_key(&*hint) {
                slots.insert(*hint, PendingRequest { callback: Box::new(callback), deadline });
                return Ok(*hint);
            }
        }
        Err(CiError::RequestIdTableFull)
    }

    /// Removes the slot for `request_id` and invokes its callback with
    /// `reply`, if one is pending. No-op (logged by the caller) if the ID
    /// has no matching entry — a spurious reply (spec §7, class 4).
    pub fn complete(&self, request_id: u8, reply: CiMessage) -> bool {
        let pending = self.slots.lock().remove(&request_id);
        match pending {
            Some(p) => {
                (p.callback)(reply);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, request_id: u8) -> bool {
        self.slots.lock().contains_key(&request_id)
    }

    /// Abandons every pending request, e.g. on `InvalidateMUID` (spec §7
    /// "Recovery").
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    /// Drops every request past its deadline, returning the IDs abandoned.
    pub fn expire(&self, now: Instant) -> Vec<u8> {
        let mut slots = self.slots.lock();
        let expired: Vec<u8> =
            slots.iter().filter(|(_, req)| req.deadline.map(|d| now >= d).unwrap_or(false)).map(|(id, _)| *id).collect();
        for id in &expired {
            slots.remove(id);
        }
        expired
    }
}
