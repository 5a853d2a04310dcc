/// Default ceiling on the number of levels of a categorical variable.
pub const MAX_CATEGORIES: usize = 1024;
/// Poisson and Gamma terminal predictions are kept within this distance of the extremes of F.
pub const LINK_CLAMP: f64 = 19.0;
/// Bernoulli terminal predictions are capped at this magnitude.
pub const BERNOULLI_PRED_CAP: f64 = 1.0;
/// Convergence tolerance for Newton and M-estimation loops.
pub const NEWTON_TOLERANCE: f64 = 0.0001;
/// Iteration limit for the location M-estimator.
pub const LOCATION_M_ITER_LIMIT: usize = 50;
/// Iteration limit for Newton updates of the initial prediction.
pub const NEWTON_ITER_LIMIT: usize = 100;
/// Normal consistency factor of the median absolute deviation.
pub const MAD_SCALE: f64 = 1.4826;
/// Smallest scale accepted by the location M-estimator.
pub const SCALE_EPS: f64 = 1e-8;
