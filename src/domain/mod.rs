// Domain layer: scan, ingredient and verdict models plus the ports the engine talks through.

pub mod model;
pub mod ports;
pub mod profile;
