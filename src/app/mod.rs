// Application layer: port traits and the resumable batch use case

pub mod batch_runner;
pub mod ports;
