use anyhow::Result;
use chrono::{Local, TimeZone, Utc};
use funk_core::oar::format_oar_date;
use funk_planning::{JobSpec, PlanReport, Planner, SubmissionOptions, job_specs, parse_subnets, submission_command};
use serde::Serialize;

use crate::inventory::{InventorySource, JsonFile};
use crate::report::format_plan;
use crate::settings::{QueryArgs, Settings, Submission, SubmissionArgs, load_config};

const KAVLAN: &str = "kavlan";

/// A plan plus the reservation it leads to.
#[derive(Debug, Serialize)]
pub struct Planned {
    pub report: PlanReport,
    pub jobs: Vec<JobSpec>,
    pub command: Option<String>,
}

pub fn plan(query: &QueryArgs, submission: &SubmissionArgs, format: &str) -> Result<()> {
    let config = load_config(query.config.as_deref())?;
    let settings = Settings::resolve(query, &config, Utc::now().timestamp(), &Local)?;
    let sub = Submission::resolve(submission, &config);
    let source = JsonFile::new(&settings.inventory);

    let planned = build(settings, &sub, &source, &Local)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&planned)?),
        _ => print!("{}", format_plan(&planned.report, planned.command.as_deref(), &Local)),
    }

    planned.report.outcome.require()?;
    Ok(())
}

/// Run the planner and render the reservation command. Nothing is
/// submitted.
pub fn build<Tz>(settings: Settings, sub: &Submission, source: &dyn InventorySource, tz: &Tz) -> Result<Planned>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let inventory = source.load()?;
    let planner = Planner::from_inventory(&inventory)?;
    tracing::info!(
        inventory = %source.describe(),
        bookings = planner.bookings().len(),
        "planning"
    );

    let mut req = settings.plan;
    if sub.kavlan {
        if planner.topology().contains(KAVLAN) {
            req.request.insert(KAVLAN, 1);
        } else {
            tracing::warn!("the inventory declares no kavlan resource, ignoring --kavlan");
        }
    }

    let report = planner.plan(&req, tz)?;

    let (jobs, command) = match (&report.outcome.chosen, &report.distribution) {
        (Some(chosen), Some(distribution)) => {
            if distribution.is_empty() {
                tracing::warn!(from = chosen.from, "chosen slot has no free node to hand out");
            }
            let subnets = match &sub.subnet {
                Some(spec) => parse_subnets(spec, planner.topology())?,
                None => Default::default(),
            };
            let jobs = job_specs(distribution, planner.topology(), &sub.job_name, &subnets);
            let opts = SubmissionOptions {
                walltime: req.walltime,
                reservation_date: format_oar_date(chosen.from, tz),
                additional_options: sub.options.clone(),
                program: sub.program.clone(),
            };
            let command = submission_command(&jobs, &opts);
            (jobs, command)
        }
        _ => (Vec::new(), None),
    };

    Ok(Planned { report, jobs, command })
}

#[cfg(test)]
mod tests {
    use super::*;
    use funk_core::FunkConfig;
    use std::path::Path;

    const INVENTORY: &str = r#"{
  "topology": {
    "sites": {
      "lyon": { "taurus": 16, "sagittaire": 8 },
      "nancy": { "graphene": 40 }
    },
    "standalone": { "kavlan": 2 }
  },
  "bookings": [
    { "resource": "graphene", "start": 0, "end": 7200, "quantity": 40 },
    { "resource": "taurus", "start": 0, "end": 3600, "quantity": 10 }
  ]
}"#;

    fn make_settings(inventory: &Path, mode: &str, resources: &str) -> Settings {
        let args = QueryArgs {
            inventory: Some(inventory.to_path_buf()),
            mode: Some(mode.to_string()),
            resources: Some(resources.to_string()),
            walltime: Some("1:00:00".to_string()),
            startdate: Some("1970-01-01 00:00:00".to_string()),
            enddate: Some("1970-01-02 00:00:00".to_string()),
            ..Default::default()
        };
        Settings::resolve(&args, &FunkConfig::default(), 0, &Utc).unwrap()
    }

    fn make_submission() -> Submission {
        Submission::resolve(&SubmissionArgs::default(), &FunkConfig::default())
    }

    fn write_inventory(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("inventory.json");
        std::fs::write(&path, INVENTORY).unwrap();
        path
    }

    #[test]
    fn free_mode_renders_oargridsub() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_inventory(dir.path());
        let settings = make_settings(&path, "free", "lyon:10,nancy:20");

        let planned = build(settings, &make_submission(), &JsonFile::new(&path), &Utc).unwrap();
        let chosen = planned.report.outcome.require().unwrap();
        assert_eq!(chosen.from, 7200);
        assert_eq!(planned.jobs.len(), 2);
        let cmd = planned.command.unwrap();
        assert!(cmd.starts_with("oargridsub -w 1:00:00 -r \"1970-01-01 02:00:00\""));
        assert!(cmd.contains("nancy:rdef=\"{cluster='graphene'}/nodes=20\""));
    }

    #[test]
    fn kavlan_is_requested_and_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_inventory(dir.path());
        let settings = make_settings(&path, "date", "taurus");
        let mut sub = make_submission();
        sub.kavlan = true;
        sub.options = Some("-t deploy".to_string());

        let planned = build(settings, &sub, &JsonFile::new(&path), &Utc).unwrap();
        assert_eq!(planned.report.request.get(KAVLAN), Some(1));
        let cmd = planned.command.unwrap();
        assert!(cmd.starts_with("oarsub -l \"{type='kavlan'}/vlan=1+{cluster='taurus'}/nodes=6,walltime=1:00:00\""));
        assert!(cmd.ends_with("-n \"FUNK\" -t deploy"));
    }

    #[test]
    fn no_slot_gives_no_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_inventory(dir.path());
        let mut settings = make_settings(&path, "free", "graphene:1");
        settings.plan.window.end = 7200;

        let planned = build(settings, &make_submission(), &JsonFile::new(&path), &Utc).unwrap();
        assert!(planned.report.outcome.chosen.is_none());
        assert!(planned.jobs.is_empty());
        assert!(planned.command.is_none());
    }
}
