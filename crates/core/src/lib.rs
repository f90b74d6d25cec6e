pub mod cfg_ir;
pub mod chunking;
pub mod config;
pub mod consolidate;
pub mod decoder;
pub mod detection;
pub mod encoder;
pub mod interpreter;
pub mod leaf;
pub mod opcode;
pub mod witness;

pub use config::AnalysisConfig;
pub use witness::{WitnessReport, analyze};
