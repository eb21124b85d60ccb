//! Where the topology and the booking feed come from.

use std::path::{Path, PathBuf};

use anyhow::Context;
use funk_core::Inventory;

/// A provider of topology and current bookings.
///
/// The planner only sees the loaded [`Inventory`]; live testbed clients
/// plug in here.
pub trait InventorySource {
    fn load(&self) -> anyhow::Result<Inventory>;
    fn describe(&self) -> String;
}

/// A JSON inventory file on disk.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl InventorySource for JsonFile {
    fn load(&self) -> anyhow::Result<Inventory> {
        let inventory = Inventory::from_file(&self.path)
            .with_context(|| format!("loading inventory {}", self.path.display()))?;
        tracing::debug!(
            path = %self.path.display(),
            sites = inventory.topology.sites.len(),
            bookings = inventory.bookings.len(),
            "inventory loaded"
        );
        Ok(inventory)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
