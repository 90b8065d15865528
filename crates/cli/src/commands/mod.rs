pub mod build;
pub mod inspect;
pub mod targets;
pub mod verify;

pub use build::*;
pub use inspect::*;
pub use targets::*;
pub use verify::*;
