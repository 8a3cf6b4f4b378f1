pub mod cast;
pub mod scalar;
