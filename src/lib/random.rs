use rand_xoshiro::rand_core::{RngCore, SeedableRng};
use rand_xoshiro::{SplitMix64, Xoshiro256PlusPlus};

/// Independent purposes random numbers are drawn for.
///
/// Each purpose gets its own seed offset so that, e.g., entity 3 and the
/// parameter draw of cohort 3 never share a stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RngStream {
    Entity,
    Parameters,
}

impl RngStream {
    fn offset(&self) -> u64 {
        match self {
            RngStream::Entity => 0x454e_5449_5459_0001,
            RngStream::Parameters => 0x5041_5241_4d53_0002,
        }
    }
}

/// First output of SplitMix64 started at `state`.
fn mix(state: u64) -> u64 {
    SplitMix64::seed_from_u64(state).next_u64()
}

/// Seed for stream `index` of the given purpose under `base_seed`.
pub fn stream_seed(base_seed: u64, stream: RngStream, index: u64) -> u64 {
    mix(mix(base_seed ^ stream.offset()).wrapping_add(index))
}

pub fn stream_rng(base_seed: u64, stream: RngStream, index: u64) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(stream_seed(base_seed, stream, index))
}
