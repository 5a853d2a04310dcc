// import modules
mod adaboost;
mod bernoulli;
mod gamma;
mod gaussian;
mod laplace;
mod poisson;
mod tdist;

// make loss families public
pub use adaboost::AdaBoost;
pub use bernoulli::Bernoulli;
pub use gamma::Gamma;
pub use gaussian::Gaussian;
pub use laplace::Laplace;
pub use poisson::Poisson;
pub use tdist::TDist;

pub mod loss;

pub use loss::Distribution;
pub use loss::LossFunction;
