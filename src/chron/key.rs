use rand::Rng;

/// Upper bound (exclusive) for a Chron entry key: keys are uniform in
/// `[1, 2^28)`. Key `0` is reserved for the immutable root entry.
const KEY_MAX: u32 = 1 << 28;

pub type Key = u32;

pub const ROOT_KEY: Key = 0;

/// Draw a uniform random key in `[1, 2^28)`, per spec section 4.2.
pub fn random_key<R: Rng + ?Sized>(rng: &mut R) -> Key {
    rng.gen_range(1..KEY_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn random_key_in_range() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let k = random_key(&mut rng);
            assert!(k >= 1 && k < KEY_MAX);
        }
    }
}
