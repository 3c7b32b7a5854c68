// Domain layer: core models and ports (interfaces) the relay is built around.

pub mod model;
pub mod ports;
