use rand::{
    distributions::{Distribution, Uniform},
    rngs::StdRng,
    SeedableRng,
};
use rayon::prelude::*;

const CHUNK_SIZE: usize = 1024;

/// Uniformly distributed dense embeddings for benchmarks and tests.
///
/// Generation is split into fixed-size chunks, each with its own RNG
/// seeded from `seed` and the chunk number, so the output does not depend
/// on how rayon schedules the chunks.
pub struct DenseDataGenerator {
    dim: usize,
    count: usize,
    range: (f32, f32),
    seed: u64,
}

impl DenseDataGenerator {
    pub fn new(dim: usize, count: usize, range: (f32, f32), seed: u64) -> Self {
        DenseDataGenerator {
            dim,
            count,
            range,
            seed,
        }
    }

    pub fn generate(&self) -> Vec<Vec<f32>> {
        let uniform_dist = Uniform::from(self.range.0..self.range.1);
        let chunks = self.count.div_ceil(CHUNK_SIZE);

        (0..chunks)
            .into_par_iter()
            .flat_map_iter(|chunk| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(chunk as u64));
                let len = CHUNK_SIZE.min(self.count - chunk * CHUNK_SIZE);
                (0..len)
                    .map(|_| {
                        (0..self.dim)
                            .map(|_| uniform_dist.sample(&mut rng))
                            .collect::<Vec<f32>>()
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}
