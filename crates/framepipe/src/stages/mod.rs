//! CPU-side stages that share the transform-stage contract with the GPU stage

mod crop;
mod delay;
mod passthrough;
mod random_drop;

pub use crop::{Crop, crop_region};
pub use delay::FixedDelay;
pub use passthrough::PassThrough;
pub use random_drop::RandomDrop;
