//! The trainer side: a small tanh network fitted to Black-Scholes call prices.

mod activations;
mod black_scholes;
mod checkpoint;
mod dense;
mod loss;
mod model;
pub mod optimization;
mod trainer;

pub use activations::ActFn;
pub use black_scholes::BlackScholes;
pub use dense::Dense;
pub use loss::{LossFn, Mse};
pub use model::Pinn;
pub use trainer::{TrainSettings, Trainer};
