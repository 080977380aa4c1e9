pub mod data;
pub mod options;

pub use data::*;
pub use options::ScannerConfiguration;
