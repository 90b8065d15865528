use rand_core::CryptoRngCore;

use super::{image_block, Input, InputResult, TargetName};
use crate::security::SecurityMethod;

/// Header-only block telling the device to run the named action.
#[derive(Debug, Clone)]
pub struct CommandInput {
    target: TargetName,
}

impl CommandInput {
    pub fn new(target: TargetName) -> Self {
        Self { target }
    }
}

impl Input for CommandInput {
    fn target_name(&self) -> &TargetName {
        &self.target
    }

    fn image(&self, _rng: &mut dyn CryptoRngCore) -> InputResult<Vec<u8>> {
        image_block(&self.target, SecurityMethod::None, &[])
    }
}
