//! Sampler
//!
//! Strategies for choosing the bag of training rows before fitting each tree,
//! allowing for stochastic gradient boosting.
use rand::rngs::StdRng;
use rand::Rng;

// A sampler marks the training rows used to fit the next tree.
pub trait Sampler {
    /// Fill `bag` with the in-bag flag of every training row and return the
    /// number of rows chosen.
    fn sample(&mut self, rng: &mut StdRng, bag: &mut [bool]) -> usize;
}

/// Draws exactly `total_in_bag` rows without replacement in a single
/// sequential pass, each row chosen with probability
/// `(needed) / (remaining)`.
pub struct BagSampler {
    total_in_bag: usize,
}

impl BagSampler {
    pub fn new(total_in_bag: usize) -> Self {
        BagSampler { total_in_bag }
    }
}

impl Sampler for BagSampler {
    fn sample(&mut self, rng: &mut StdRng, bag: &mut [bool]) -> usize {
        let n = bag.len();
        let mut bagged = 0;
        for (i, flag) in bag.iter_mut().enumerate() {
            let u: f64 = rng.gen();
            if bagged < self.total_in_bag && u * ((n - i) as f64) < (self.total_in_bag - bagged) as f64 {
                *flag = true;
                bagged += 1;
            } else {
                *flag = false;
            }
        }
        bagged
    }
}
