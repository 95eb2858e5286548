// src/clustering.rs
//
// Unsupervised vegetation density banding.
//
// Pixel intensities (0-255) are partitioned with 1-D k-means. Because the
// samples are u8 the iterations run over a 256-bin histogram instead of the
// raw pixels. Clusters are ordered by center so the lowest becomes barren,
// the highest dense and everything in between sparse. This makes the band
// mapping independent of how the centers were seeded; the partition itself
// can still depend on seeding.

use crate::raster::Raster;
use crate::types::{ClusteringConfig, SeedingStrategy};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, warn};

const LEVELS: usize = 256;

// ============================================================================
// SEEDING
// ============================================================================

/// Picks the starting centers (0-255 scale) for the partition.
pub trait CentroidSeeder: Send {
    fn seed(&mut self, samples: &[u8], k: usize) -> Vec<f64>;
}

/// Deterministic: `k` evenly spaced points between the sample min and max.
pub struct SpreadSeeder;

impl CentroidSeeder for SpreadSeeder {
    fn seed(&mut self, samples: &[u8], k: usize) -> Vec<f64> {
        let (min, max) = sample_range(samples);
        if k <= 1 {
            return vec![min; k];
        }
        let step = (max - min) / (k - 1) as f64;
        (0..k).map(|i| min + step * i as f64).collect()
    }
}

/// `k` distinct intensity levels drawn from the populated samples.
pub struct RandomSeeder {
    rng: StdRng,
}

impl RandomSeeder {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl CentroidSeeder for RandomSeeder {
    fn seed(&mut self, samples: &[u8], k: usize) -> Vec<f64> {
        let mut seen = [false; LEVELS];
        for &v in samples {
            seen[v as usize] = true;
        }
        let levels: Vec<f64> = (0..LEVELS)
            .filter(|&level| seen[level])
            .map(|level| level as f64)
            .collect();

        if levels.len() <= k {
            // Not enough distinct levels; repeat the top one to fill
            let top = levels.last().copied().unwrap_or(0.0);
            let mut centers = levels;
            centers.resize(k, top);
            return centers;
        }

        index::sample(&mut self.rng, levels.len(), k)
            .into_iter()
            .map(|i| levels[i])
            .collect()
    }
}

fn sample_range(samples: &[u8]) -> (f64, f64) {
    let min = samples.iter().copied().min().unwrap_or(0) as f64;
    let max = samples.iter().copied().max().unwrap_or(0) as f64;
    (min, max)
}

// ============================================================================
// COMPOSITION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DensityComposition {
    pub dense_pct: f64,
    pub sparse_pct: f64,
    pub barren_pct: f64,
    /// Mean intensity of non-barren pixels, rescaled to 0-100
    pub precision_score: f64,
}

impl DensityComposition {
    fn all_dense(precision_score: f64) -> Self {
        Self {
            dense_pct: 100.0,
            sparse_pct: 0.0,
            barren_pct: 0.0,
            precision_score,
        }
    }

    pub fn dense_fraction(&self) -> f64 {
        self.dense_pct / 100.0
    }

    pub fn sparse_fraction(&self) -> f64 {
        self.sparse_pct / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Barren,
    Sparse,
    Dense,
}

// ============================================================================
// CLUSTERER
// ============================================================================

pub struct DensityClusterer {
    k: usize,
    max_iterations: usize,
    epsilon: f64,
    seeder: Box<dyn CentroidSeeder>,
}

impl DensityClusterer {
    pub fn new(
        k: usize,
        max_iterations: usize,
        epsilon: f64,
        seeder: Box<dyn CentroidSeeder>,
    ) -> Self {
        Self {
            k,
            max_iterations,
            epsilon,
            seeder,
        }
    }

    pub fn from_config(config: &ClusteringConfig) -> Self {
        let seeder: Box<dyn CentroidSeeder> = match config.init {
            SeedingStrategy::Spread => Box::new(SpreadSeeder),
            SeedingStrategy::Random => Box::new(RandomSeeder::new(config.seed)),
        };
        Self::new(
            config.clusters,
            config.max_iterations,
            config.epsilon,
            seeder,
        )
    }

    pub fn classify(&mut self, raster: &Raster) -> DensityComposition {
        if raster.is_empty() {
            return DensityComposition::all_dense(0.0);
        }
        let samples = raster.pixels();
        let total = samples.len();

        let mut histogram = [0usize; LEVELS];
        for &v in samples {
            histogram[v as usize] += 1;
        }

        let centers = self.fit(samples, &histogram);
        let assignment = assign(&histogram, &centers);

        let mut counts = vec![0usize; centers.len()];
        for (level, &n) in histogram.iter().enumerate() {
            counts[assignment[level]] += n;
        }

        let populated = counts.iter().filter(|&&n| n > 0).count();
        if populated < self.k {
            warn!(
                "Only {} of {} density clusters populated, treating parcel as dense",
                populated, self.k
            );
            return DensityComposition::all_dense(scaled_mean(&histogram, |_| true));
        }

        // Rank clusters by center, lowest first
        let mut order: Vec<usize> = (0..centers.len()).collect();
        order.sort_by(|&a, &b| centers[a].total_cmp(&centers[b]));
        let mut bands = vec![Band::Sparse; centers.len()];
        bands[order[0]] = Band::Barren;
        bands[order[order.len() - 1]] = Band::Dense;

        let pct = |band: Band| {
            let n: usize = counts
                .iter()
                .zip(&bands)
                .filter(|(_, b)| **b == band)
                .map(|(&n, _)| n)
                .sum();
            n as f64 / total as f64 * 100.0
        };

        let composition = DensityComposition {
            dense_pct: pct(Band::Dense),
            sparse_pct: pct(Band::Sparse),
            barren_pct: pct(Band::Barren),
            precision_score: scaled_mean(&histogram, |level| {
                bands[assignment[level]] != Band::Barren
            }),
        };

        debug!(
            "Density bands: dense={:.1}% sparse={:.1}% barren={:.1}% precision={:.2}",
            composition.dense_pct,
            composition.sparse_pct,
            composition.barren_pct,
            composition.precision_score
        );

        composition
    }

    /// Lloyd iterations until no center moves by `epsilon` or the budget is spent.
    fn fit(&mut self, samples: &[u8], histogram: &[usize; LEVELS]) -> Vec<f64> {
        let mut centers = self.seeder.seed(samples, self.k);

        for iteration in 0..self.max_iterations {
            let assignment = assign(histogram, &centers);
            let mut sums = vec![0.0f64; centers.len()];
            let mut counts = vec![0usize; centers.len()];
            for (level, &n) in histogram.iter().enumerate() {
                sums[assignment[level]] += level as f64 * n as f64;
                counts[assignment[level]] += n;
            }

            let mut shift = 0.0f64;
            for (i, center) in centers.iter_mut().enumerate() {
                if counts[i] > 0 {
                    let updated = sums[i] / counts[i] as f64;
                    shift = shift.max((updated - *center).abs());
                    *center = updated;
                }
            }

            let relocated = relocate_empty(histogram, &assignment, &counts, &mut centers);
            if relocated > 0 {
                debug!(
                    "Moved {} empty cluster(s) on iteration {}",
                    relocated,
                    iteration + 1
                );
                continue;
            }

            if shift < self.epsilon {
                debug!("k-means converged after {} iterations", iteration + 1);
                break;
            }
        }

        centers
    }
}

/// Move each empty cluster onto the populated level farthest from its own
/// center. Levels already sitting on a center are never picked, so input with
/// fewer than `k` distinct levels keeps its empty clusters.
fn relocate_empty(
    histogram: &[usize; LEVELS],
    assignment: &[usize],
    counts: &[usize],
    centers: &mut [f64],
) -> usize {
    let mut relocated = 0;
    for i in 0..centers.len() {
        if counts[i] > 0 {
            continue;
        }
        let farthest = (0..LEVELS)
            .filter(|&level| histogram[level] > 0)
            .map(|level| {
                let v = level as f64;
                (v, (v - centers[assignment[level]]).abs())
            })
            .filter(|&(v, distance)| distance > 0.0 && !centers.contains(&v))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((level, _)) = farthest {
            centers[i] = level;
            relocated += 1;
        }
    }
    relocated
}

/// Nearest center per intensity level; ties go to the lower index.
fn assign(histogram: &[usize; LEVELS], centers: &[f64]) -> Vec<usize> {
    (0..histogram.len())
        .map(|level| {
            let v = level as f64;
            let mut best = 0;
            for (i, c) in centers.iter().enumerate() {
                if (v - c).abs() < (v - centers[best]).abs() {
                    best = i;
                }
            }
            best
        })
        .collect()
}

/// Mean intensity of the selected levels on a 0-100 scale, 0 when none.
fn scaled_mean(histogram: &[usize; LEVELS], include: impl Fn(usize) -> bool) -> f64 {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for (level, &n) in histogram.iter().enumerate() {
        if n > 0 && include(level) {
            sum += level as f64 * n as f64;
            count += n;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64 / 255.0 * 100.0
    }
}
