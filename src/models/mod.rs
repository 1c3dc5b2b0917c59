pub mod enums;
pub mod patient;
pub mod triage;

pub use enums::*;
pub use patient::*;
pub use triage::*;
