// Domain layer: core models and ports (interfaces). No network or file I/O here.

pub mod model;
pub mod ports;
