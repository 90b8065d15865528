//! Registry of the targets a product accepts.
//!
//! Each target has a kind (command, HEX, ELF or raw binary), may be
//! mandatory, and may carry an order key. Targets with order keys must be
//! requested in non-decreasing key order; targets without one may appear
//! anywhere.

mod factory;

pub use factory::{FactoryError, InputFactory};

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use thiserror::Error;

use crate::input::{TargetName, TargetNameTooLong};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error(transparent)]
    TargetName(#[from] TargetNameTooLong),

    #[error("Target '{0}' is declared more than once")]
    DuplicateTarget(String),

    #[error("Unknown target '{0}'")]
    UnknownTarget(String),

    #[error("Mandatory target '{0}' was not supplied")]
    MissingTarget(String),

    #[error("Target '{target}' (order {order}) must not follow '{previous}' (order {previous_order})")]
    OrderViolation { target: String, order: u32, previous: String, previous_order: u32 },

    #[error("Target '{0}' is requested more than once")]
    DuplicateRequest(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TargetKind {
    Command,
    Hex,
    Elf { offset: u32 },
    Bin { offset: u32 },
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Command => "command",
            TargetKind::Hex => "hex",
            TargetKind::Elf { .. } => "elf",
            TargetKind::Bin { .. } => "bin",
        }
    }

    /// Base address for ELF and binary targets.
    pub fn offset(self) -> Option<u32> {
        match self {
            TargetKind::Elf { offset } | TargetKind::Bin { offset } => Some(offset),
            TargetKind::Command | TargetKind::Hex => None,
        }
    }
}

/// Per-target flags passed alongside each `add_*` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetOptions {
    pub mandatory: bool,
    pub order: Option<u32>,
}

impl TargetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn order(mut self, key: u32) -> Self {
        self.order = Some(key);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetInfo {
    pub name: TargetName,
    #[serde(flatten)]
    pub kind: TargetKind,
    pub mandatory: bool,
    pub order: Option<u32>,
}

#[derive(Debug, Default)]
pub struct SupportedTargetsBuilder {
    pending: Vec<(String, TargetKind, TargetOptions)>,
}

impl SupportedTargetsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, name: impl Into<String>, kind: TargetKind, options: TargetOptions) -> Self {
        self.pending.push((name.into(), kind, options));
        self
    }

    pub fn add_command(self, name: impl Into<String>, options: TargetOptions) -> Self {
        self.add(name, TargetKind::Command, options)
    }

    pub fn add_hex(self, name: impl Into<String>, options: TargetOptions) -> Self {
        self.add(name, TargetKind::Hex, options)
    }

    pub fn add_elf(self, name: impl Into<String>, offset: u32, options: TargetOptions) -> Self {
        self.add(name, TargetKind::Elf { offset }, options)
    }

    pub fn add_bin(self, name: impl Into<String>, offset: u32, options: TargetOptions) -> Self {
        self.add(name, TargetKind::Bin { offset }, options)
    }

    pub fn build(self) -> RegistryResult<SupportedTargets> {
        let mut targets = Vec::with_capacity(self.pending.len());
        let mut index = HashMap::with_capacity(self.pending.len());
        for (name, kind, options) in self.pending {
            if index.contains_key(&name) {
                return Err(RegistryError::DuplicateTarget(name));
            }
            let name = TargetName::new(name)?;
            index.insert(name.as_str().to_string(), targets.len());
            targets.push(TargetInfo {
                name,
                kind,
                mandatory: options.mandatory,
                order: options.order,
            });
        }
        Ok(SupportedTargets { targets, index })
    }
}

/// Immutable target registry; share it by reference across builds.
#[derive(Debug, Clone)]
pub struct SupportedTargets {
    targets: Vec<TargetInfo>,
    index: HashMap<String, usize>,
}

impl SupportedTargets {
    pub fn builder() -> SupportedTargetsBuilder {
        SupportedTargetsBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<&TargetInfo> {
        self.index.get(name).map(|&i| &self.targets[i])
    }

    pub fn kind_of(&self, name: &str) -> Option<TargetKind> {
        self.get(name).map(|t| t.kind)
    }

    pub fn order_of(&self, name: &str) -> Option<u32> {
        self.get(name).and_then(|t| t.order)
    }

    /// Targets in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &TargetInfo> + '_ {
        self.targets.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.targets.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn mandatory_targets(&self) -> BTreeSet<&str> {
        self.targets.iter().filter(|t| t.mandatory).map(|t| t.name.as_str()).collect()
    }

    /// Order key to the targets declared with that key.
    pub fn order_map(&self) -> BTreeMap<u32, BTreeSet<&str>> {
        let mut map: BTreeMap<u32, BTreeSet<&str>> = BTreeMap::new();
        for target in &self.targets {
            if let Some(order) = target.order {
                map.entry(order).or_default().insert(target.name.as_str());
            }
        }
        map
    }

    /// Check a build's requested target sequence: every name known and used
    /// once, every mandatory target present, ordered targets non-decreasing.
    pub fn check_selection<'n>(
        &self,
        requested: impl IntoIterator<Item = &'n str>,
    ) -> RegistryResult<()> {
        let mut seen = BTreeSet::new();
        let mut last_ordered: Option<(&str, u32)> = None;

        for name in requested {
            let target = self.get(name).ok_or_else(|| RegistryError::UnknownTarget(name.into()))?;
            if !seen.insert(name) {
                return Err(RegistryError::DuplicateRequest(name.into()));
            }
            if let Some(order) = target.order {
                if let Some((previous, previous_order)) = last_ordered {
                    if order < previous_order {
                        return Err(RegistryError::OrderViolation {
                            target: name.into(),
                            order,
                            previous: previous.into(),
                            previous_order,
                        });
                    }
                }
                last_ordered = Some((name, order));
            }
        }

        if let Some(missing) = self.mandatory_targets().into_iter().find(|m| !seen.contains(*m)) {
            return Err(RegistryError::MissingTarget(missing.into()));
        }
        Ok(())
    }
}
