//! Four-word KISS generator with validated seed.
//!
//! Combines a 32-bit linear congruential step, a three-shift xorshift,
//! and a multiply-with-carry step; the returned word is the sum of the
//! three sub-generators. Period is comfortably beyond 2^120, and the
//! whole state is four words, small enough to live in the parameter
//! block and be written back at pause.

use std::fmt;

/// Multiplier of the congruential sub-generator.
const CONG_MULT: u32 = 314_527_869;
/// Increment of the congruential sub-generator.
const CONG_INC: u32 = 1_234_567;
/// Multiplier of the multiply-with-carry sub-generator.
const MWC_MULT: u64 = 4_294_584_393;
/// The multiply-with-carry carry word must stay below this modulus.
const MWC_CARRY_MOD: u32 = 698_769_068;
/// Replacement for a zero xorshift word (which would stick at zero).
const XORSHIFT_FALLBACK: u32 = 13_031_301;

/// The four-word generator state as stored in the parameter block.
///
/// Raw seeds from the host are not all valid generator states:
/// [`normalised`](Seed::normalised) maps any four words onto a valid
/// state instead of rejecting them, so a seed is never a load error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Seed(pub [u32; 4]);

impl Seed {
    /// Map arbitrary seed words onto a valid generator state.
    ///
    /// The xorshift word must not be zero and the multiply-with-carry
    /// carry must lie in `[1, MWC_CARRY_MOD]`.
    pub fn normalised(self) -> Seed {
        let [x, mut y, z, mut c] = self.0;
        if y == 0 {
            y = XORSHIFT_FALLBACK;
        }
        c = c % MWC_CARRY_MOD + 1;
        Seed([x, y, z, c])
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z, c] = self.0;
        write!(f, "[{x:#010x}, {y:#010x}, {z:#010x}, {c:#010x}]")
    }
}

/// The seeded KISS stream.
#[derive(Clone, Debug)]
pub struct KissRng {
    x: u32,
    y: u32,
    z: u32,
    c: u32,
}

impl KissRng {
    /// Construct from a host-provided seed, normalising it first.
    pub fn from_seed(seed: Seed) -> Self {
        let Seed([x, y, z, c]) = seed.normalised();
        Self { x, y, z, c }
    }

    /// Reconstruct from a state previously returned by [`state`](Self::state).
    ///
    /// The carry word of a live state may legitimately exceed the seed
    /// modulus, so only the zero-xorshift guard is applied here; full
    /// normalisation would perturb the stream. The stream never produces
    /// a zero xorshift word itself, so the guard is a no-op for genuine
    /// read-backs.
    pub fn restore(seed: Seed) -> Self {
        let [x, mut y, z, c] = seed.0;
        if y == 0 {
            y = XORSHIFT_FALLBACK;
        }
        Self { x, y, z, c }
    }

    /// The current state, suitable for writing back to the parameter block.
    pub fn state(&self) -> Seed {
        Seed([self.x, self.y, self.z, self.c])
    }

    /// Draw the next 32-bit word.
    pub fn next_u32(&mut self) -> u32 {
        self.x = CONG_MULT.wrapping_mul(self.x).wrapping_add(CONG_INC);

        self.y ^= self.y << 5;
        self.y ^= self.y >> 7;
        self.y ^= self.y << 22;

        let t = MWC_MULT * u64::from(self.z) + u64::from(self.c);
        self.c = (t >> 32) as u32;
        self.z = t as u32;

        self.x.wrapping_add(self.y).wrapping_add(self.z)
    }

    /// Draw a uniform variate in the open interval `(0, 1)`.
    ///
    /// The half-offset keeps both endpoints out of range, so the result
    /// is always safe to pass through `ln`.
    pub fn next_unit(&mut self) -> f64 {
        (f64::from(self.next_u32()) + 0.5) / 4_294_967_296.0
    }
}
