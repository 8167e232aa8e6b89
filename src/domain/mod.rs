// Domain layer: core models and the collaborator ports the cycle runner depends on.

pub mod model;
pub mod ports;
