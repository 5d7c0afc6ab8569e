pub mod orchestrator;
pub mod segment_runner;
pub mod train_runner;
