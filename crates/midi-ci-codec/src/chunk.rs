use crate::message::PropertyEnvelope;

/// Splits a serialized property body into one or more [`PropertyEnvelope`]s
/// per spec §4.1 "Chunking": chunks share `request_id` and `header`, differ
/// only in `chunk_index`/`chunk_body`. An empty body still yields exactly one
/// chunk with `total_chunks=1, chunk_index=1`.
pub fn split_property_body(
    request_id: u8,
    header: Vec<u8>,
    body: &[u8],
    mtu: usize,
    overhead: usize,
) -> Vec<PropertyEnvelope> {
    let chunk_size = mtu.saturating_sub(overhead).max(1);
    if body.is_empty() {
        return vec![PropertyEnvelope {
            request_id,
            header,
            total_chunks: 1,
            chunk_index: 1,
            chunk_body: Vec::new(),
        }];
    }
    let total_chunks = body.len().div_ceil(chunk_size);
    body.chunks(chunk_size)
        .enumerate()
        .map(|(i, chunk)| PropertyEnvelope {
            request_id,
            header: header.clone(),
            total_chunks: total_chunks as u16,
            chunk_index: (i + 1) as u16,
            chunk_body: chunk.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_one_chunk() {
        let chunks = split_property_body(1, b"{}".to_vec(), &[], 2048, 256);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].total_chunks, 1);
        assert_eq!(chunks[0].chunk_index, 1);
        assert!(chunks[0].chunk_body.is_empty());
    }

    #[test]
    fn splits_and_reassembles_scenario_c() {
        let body = vec![0xAAu8; 10_000];
        let chunks = split_property_body(1, b"{}".to_vec(), &body, 2048, 256);
        assert_eq!(chunks.len(), 6);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.total_chunks, 6);
            assert_eq!(c.chunk_index, (i + 1) as u16);
            assert!(c.chunk_body.len() <= 1792);
        }
        let reassembled: Vec<u8> = chunks.iter().flat_map(|c| c.chunk_body.clone()).collect();
        assert_eq!(reassembled, body);
    }

    #[test]
    fn every_chunk_is_at_most_mtu() {
        let body = vec![1u8; 5000];
        let mtu = 1024;
        for c in split_property_body(1, Vec::new(), &body, mtu, 256) {
            assert!(c.chunk_body.len() <= mtu);
        }
    }
}
