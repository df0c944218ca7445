use xxhash_rust::xxh3::Xxh3;

const XXH3_SEED: u64 = 0x5f3c_1a9e_d2b4_7c61;

/// Seeded xxh3 hasher with explicit little-endian field encoding.
pub(crate) struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    pub(crate) fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    pub(crate) fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    pub(crate) fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_f64(&mut self, v: f64) {
        self.write_bytes(&v.to_bits().to_le_bytes());
    }

    pub(crate) fn write_opt_u32(&mut self, v: Option<u32>) {
        match v {
            Some(v) => {
                self.write_u8(1);
                self.write_u32(v);
            }
            None => self.write_u8(0),
        }
    }

    pub(crate) fn finish(self) -> u64 {
        self.inner.digest()
    }
}

/// Linear edge coverage for a signed distance `d` (negative inside) over a filter of width `aa`.
pub(crate) fn coverage(d: f64, aa: f64) -> f32 {
    if aa <= 0.0 || !aa.is_finite() {
        return if d <= 0.0 { 1.0 } else { 0.0 };
    }
    (0.5 - d / aa).clamp(0.0, 1.0) as f32
}

pub(crate) fn unit_to_u8(x: f32) -> u8 {
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
