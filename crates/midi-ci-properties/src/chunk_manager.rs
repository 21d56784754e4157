use midi_ci_types::error::CiError;
use midi_ci_types::Muid;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Accumulated state for a multi-chunk property body in flight, keyed by
/// `(sourceMuid, requestId)` (spec §3, §4.6).
#[derive(Debug, Clone)]
pub struct PendingChunk {
    pub timestamp: Instant,
    pub header: Vec<u8>,
    pub accumulated_body: Vec<u8>,
    chunks_received: u16,
}

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// The single table mapping `(sourceMuid, requestId) -> PendingChunk` (spec
/// §4.6). Guarded by a plain mutex; it has no re-entrant callbacks.
#[derive(Default)]
pub struct ChunkManager {
    table: Mutex<HashMap<(u32, u8), PendingChunk>>,
}

impl ChunkManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `body` to the entry for `(src, rid)`, creating it if absent.
    /// A header mismatch against an existing entry is a protocol error: the
    /// entry is dropped and the caller should NAK `ChunksOutOfSequence`.
    pub fn add_pending_chunk(
        &self,
        now: Instant,
        src: Muid,
        rid: u8,
        header: &[u8],
        body: &[u8],
        chunk_index: u16,
    ) -> Result<(), CiError> {
        let key = (src.0, rid);
        let mut table = self.table.lock();
        match table.get_mut(&key) {
            Some(pending) => {
                if pending.header != header {
                    table.remove(&key);
                    return Err(CiError::ChunksOutOfSequence { request_id: rid });
                }
                if chunk_index != pending.chunks_received + 1 {
                    table.remove(&key);
                    return Err(CiError::ChunksOutOfSequence { request_id: rid });
                }
                pending.accumulated_body.extend_from_slice(body);
                pending.chunks_received += 1;
                pending.timestamp = now;
            }
            None => {
                if chunk_index != 1 {
                    return Err(CiError::ChunksOutOfSequence { request_id: rid });
                }
                table.insert(
                    key,
                    PendingChunk {
                        timestamp: now,
                        header: header.to_vec(),
                        accumulated_body: body.to_vec(),
                        chunks_received: 1,
                    },
                );
            }
        }
        Ok(())
    }

    /// Appends the final chunk, removes the entry and returns the
    /// reassembled `(header, body)`. If no entry exists, the message was
    /// single-chunk: treat `final_body` as the whole body (spec §4.6).
    pub fn finish_pending_chunk(
        &self,
        src: Muid,
        rid: u8,
        header: &[u8],
        final_body: &[u8],
    ) -> (Vec<u8>, Vec<u8>) {
        let key = (src.0, rid);
        let mut table = self.table.lock();
        match table.remove(&key) {
            Some(mut pending) => {
                pending.accumulated_body.extend_from_slice(final_body);
                (pending.header, pending.accumulated_body)
            }
            None => (header.to_vec(), final_body.to_vec()),
        }
    }

    pub fn has_pending_chunk(&self, src: Muid, rid: u8) -> bool {
        self.table.lock().contains_key(&(src.0, rid))
    }

    pub fn get_pending_header(&self, src: Muid, rid: u8) -> Option<Vec<u8>> {
        self.table.lock().get(&(src.0, rid)).map(|p| p.header.clone())
    }

    /// Drops any entry idle for longer than `idle`.
    pub fn cleanup_expired_chunks(&self, now: Instant, idle: Duration) {
        self.table.lock().retain(|_, pending| now.duration_since(pending.timestamp) <= idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_message_is_pass_through() {
        let mgr = ChunkManager::new();
        let (header, body) = mgr.finish_pending_chunk(Muid(1), 5, b"{}", b"hello");
        assert_eq!(header, b"{}");
        assert_eq!(body, b"hello");
    }

    #[test]
    fn reassembles_multi_chunk_body_scenario_c() {
        let mgr = ChunkManager::new();
        let now = Instant::now();
        mgr.add_pending_chunk(now, Muid(1), 1, b"{}", b"AAAA", 1).unwrap();
        mgr.add_pending_chunk(now, Muid(1), 1, b"{}", b"BBBB", 2).unwrap();
        let (header, body) = mgr.finish_pending_chunk(Muid(1), 1, b"{}", b"CC");
        assert_eq!(header, b"{}");
        assert_eq!(body, b"AAAABBBBCC");
    }

    #[test]
    fn mismatched_header_drops_entry_and_errors() {
        let mgr = ChunkManager::new();
        let now = Instant::now();
        mgr.add_pending_chunk(now, Muid(1), 1, b"{}", b"AAAA", 1).unwrap();
        let err = mgr.add_pending_chunk(now, Muid(1), 1, b"{\"x\":1}", b"BBBB", 2);
        assert_eq!(err, Err(CiError::ChunksOutOfSequence { request_id: 1 }));
        assert!(!mgr.has_pending_chunk(Muid(1), 1));
    }

    #[test]
    fn out_of_order_index_errors() {
        let mgr = ChunkManager::new();
        let now = Instant::now();
        mgr.add_pending_chunk(now, Muid(1), 1, b"{}", b"AAAA", 1).unwrap();
        let err = mgr.add_pending_chunk(now, Muid(1), 1, b"{}", b"CCCC", 3);
        assert!(err.is_err());
    }

    #[test]
    fn expired_entries_are_evicted() {
        let mgr = ChunkManager::new();
        let start = Instant::now();
        mgr.add_pending_chunk(start, Muid(1), 1, b"{}", b"AAAA", 1).unwrap();
        let later = start + Duration::from_secs(60);
        mgr.cleanup_expired_chunks(later, DEFAULT_IDLE_TIMEOUT);
        assert!(!mgr.has_pending_chunk(Muid(1), 1));
    }
}
