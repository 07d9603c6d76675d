// Domain layer: console models and ports. No HTTP types in here.

pub mod model;
pub mod ports;
