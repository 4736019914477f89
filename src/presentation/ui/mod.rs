pub mod display;

pub use display::{DisplayHelper, SpinnerReporter, StatusType};
