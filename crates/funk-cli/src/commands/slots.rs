use anyhow::Result;
use chrono::{Local, Utc};
use funk_planning::{Planner, SlotSet};

use crate::inventory::{InventorySource, JsonFile};
use crate::report::format_slots;
use crate::settings::{QueryArgs, Settings, load_config};

/// Print the compiled slot table for the requested resources.
pub fn slots(query: &QueryArgs, format: &str) -> Result<()> {
    let config = load_config(query.config.as_deref())?;
    let settings = Settings::resolve(query, &config, Utc::now().timestamp(), &Local)?;
    let inventory = JsonFile::new(&settings.inventory).load()?;
    let planner = Planner::from_inventory(&inventory)?;

    let timeline = planner.timeline(&settings.plan, &Local)?;
    let slots = SlotSet::compile(&timeline);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&slots)?),
        _ => print!(
            "{}",
            format_slots(&slots, &settings.plan.request, settings.plan.walltime, &Local)
        ),
    }
    Ok(())
}
