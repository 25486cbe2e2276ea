pub mod scaler;
pub mod encoder;
pub mod split;
pub mod pca;

pub use scaler::*;
pub use encoder::*;
pub use split::*;
pub use pca::*;
