use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generates a 4-byte masking key from a CSPRNG seeded off the thread RNG
/// (spec §4.2), matching the teacher's `write_frame_client` key generation.
pub fn generate_mask() -> [u8; 4] {
    let mut rng = StdRng::from_rng(&mut rand::rng());
    rng.random::<[u8; 4]>()
}

/// XORs `data` in place with `mask`, starting at cumulative index `start`
/// (spec §4.2 — the mask index wraps per frame, not per write chunk, so
/// callers resuming a chunked write pass the running index back in).
pub fn apply_mask(data: &mut [u8], mask: [u8; 4], start: usize) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[(start + i) % 4];
    }
}
