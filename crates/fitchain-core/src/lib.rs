pub mod dtype;
pub mod error;
pub mod matrix;
pub mod traits;

pub use dtype::Float;
pub use error::{MlError, MlResult};
pub use matrix::Matrix;
pub use traits::{Estimator, Transformer};
