//! Pack assembly and inspection.

mod builder;
pub mod layout;

pub use builder::{PackHeader, UpgradePack, UpgradePackBuilder};
pub use layout::{LayoutError, LayoutResult, PackSummary, PackView};
