mod label;
mod transform;

pub use label::Label;
pub use transform::{ModelUniform, Transform};
