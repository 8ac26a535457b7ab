use rand::rngs::StdRng;
use rand::Rng;

/// Where the effective seed of a fit comes from.
#[derive(Debug, Clone, Default)]
pub enum RandomState {
    /// Fresh system entropy on every fit.
    #[default]
    Entropy,
    /// This exact seed.
    Seed(u64),
    /// A seed drawn from the generator; successive fits draw different seeds.
    Generator(StdRng),
}

impl RandomState {
    /// Resolves the seed for one fit, in `[0, i32::MAX)`.
    pub fn draw_seed(&mut self) -> u64 {
        match self {
            RandomState::Seed(seed) => *seed,
            RandomState::Generator(rng) => rng.gen_range(0..i32::MAX as u64),
            RandomState::Entropy => rand::thread_rng().gen_range(0..i32::MAX as u64),
        }
    }
}

impl From<Option<u64>> for RandomState {
    fn from(seed: Option<u64>) -> Self {
        seed.map_or(RandomState::Entropy, RandomState::Seed)
    }
}
