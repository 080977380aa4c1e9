pub mod models;
pub mod processing;
pub mod scan_optimizer;
pub mod scan_session;
pub mod utils;
pub mod validation;

pub use models::{CardDetails, FieldKind, RecognizedText, ScannerConfiguration, TextBlock};
pub use scan_optimizer::CardDetailsScanOptimizer;
pub use scan_session::{FrameOutcome, ScanSession};
pub use utils::{Result, ScanError};
