//! Merges command-line flags with funk.toml into one planning request.
//!
//! Flags win over the file; the file wins over built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use chrono::TimeZone;
use clap::Args;
use funk_core::oar::{parse_horizon, parse_oar_date, parse_walltime};
use funk_core::{FunkConfig, Request, ResourceId, TimeWindow};
use funk_planning::{Mode, PlanRequest};

const DEFAULT_CONFIG: &str = "funk.toml";
const DEFAULT_RESOURCES: &str = "grid5000";
const DEFAULT_WALLTIME: &str = "1:00:00";
const DEFAULT_HORIZON: &str = "3w";
const DEFAULT_JOB_NAME: &str = "FUNK";
/// Default start offset from now.
const START_DELAY_SECS: i64 = 60;

/// Options shared by every planning command.
#[derive(Debug, Clone, Default, Args)]
pub struct QueryArgs {
    /// Inventory file: topology and current bookings, as JSON
    #[arg(short, long)]
    pub inventory: Option<PathBuf>,
    /// Configuration file (default: ./funk.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Mode: date, free or max
    #[arg(short, long)]
    pub mode: Option<String>,
    /// Comma separated elements (federation, site or cluster), with
    /// element:n_nodes in free mode
    #[arg(short, long)]
    pub resources: Option<String>,
    /// Reservation walltime in OAR format
    #[arg(short, long)]
    pub walltime: Option<String>,
    /// Starting date in OAR format (default: now + 1 minute)
    #[arg(short, long)]
    pub startdate: Option<String>,
    /// End date in OAR format (default: start date + horizon)
    #[arg(short, long)]
    pub enddate: Option<String>,
    /// Avoid charter periods
    #[arg(short, long)]
    pub charter: bool,
    /// Clusters or sites that must not receive nodes
    #[arg(short, long, value_delimiter = ',')]
    pub blacklist: Vec<String>,
    /// Ratio applied to the resources found (date and max modes)
    #[arg(short = 'R', long)]
    pub ratio: Option<f64>,
}

/// Options that only shape the reservation command.
#[derive(Debug, Clone, Default, Args)]
pub struct SubmissionArgs {
    /// Ask for a KaVLAN
    #[arg(short, long)]
    pub kavlan: bool,
    /// Ask for subnets: slash_22=1 on every site, or site1:slash_22=2,site2:slash_19=1
    #[arg(short = 'n', long)]
    pub subnet: Option<String>,
    /// Job name passed to OAR
    #[arg(short, long)]
    pub job_name: Option<String>,
    /// Extra options for the oarsub/oargridsub command line
    #[arg(short = 'o', long, allow_hyphen_values = true)]
    pub submission_opts: Option<String>,
    /// Program run when the reservation starts
    #[arg(short, long)]
    pub prog: Option<String>,
}

/// A fully resolved planning run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub inventory: PathBuf,
    pub plan: PlanRequest,
}

/// Resolved reservation-command options.
#[derive(Debug, Clone)]
pub struct Submission {
    pub kavlan: bool,
    pub subnet: Option<String>,
    pub job_name: String,
    pub options: Option<String>,
    pub program: Option<String>,
}

/// Load the config named by `--config`, or `./funk.toml` if it exists.
pub fn load_config(explicit: Option<&Path>) -> Result<FunkConfig> {
    match explicit {
        Some(path) => FunkConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).exists() => FunkConfig::from_file(Path::new(DEFAULT_CONFIG)),
        None => Ok(FunkConfig::default()),
    }
}

impl Settings {
    pub fn resolve<Tz: TimeZone>(args: &QueryArgs, config: &FunkConfig, now: i64, tz: &Tz) -> Result<Self> {
        let query = config.query();

        let inventory = args
            .inventory
            .clone()
            .or_else(|| config.inventory_path().map(Path::to_path_buf))
            .ok_or_else(|| anyhow!("no inventory file given (use --inventory or [inventory].path)"))?;

        let mode: Mode = args
            .mode
            .as_deref()
            .or(query.mode.as_deref())
            .unwrap_or("date")
            .parse()
            .map_err(|e: String| anyhow!(e))?;

        let resources = args
            .resources
            .as_deref()
            .or(query.resources.as_deref())
            .unwrap_or(DEFAULT_RESOURCES);
        let mut request: Request = resources.parse()?;
        match mode {
            Mode::Free => {
                if request.iter().any(|(_, n)| n == 0) {
                    bail!("free mode needs a node count for every element (element:n_nodes)");
                }
            }
            Mode::Date | Mode::Max => {
                if request.has_minimums() {
                    tracing::warn!(%mode, "node counts only apply to free mode, ignoring them");
                    request = request.without_minimums();
                }
            }
        }

        let walltime = parse_walltime(
            args.walltime
                .as_deref()
                .or(query.walltime.as_deref())
                .unwrap_or(DEFAULT_WALLTIME),
        )?;

        let start = match &args.startdate {
            Some(date) => parse_oar_date(date, tz)?,
            None => now + START_DELAY_SECS,
        };
        let end = match &args.enddate {
            Some(date) => parse_oar_date(date, tz)?,
            None => {
                let horizon = parse_horizon(query.horizon.as_deref().unwrap_or(DEFAULT_HORIZON))?;
                match start.checked_add(horizon) {
                    Some(end) => end,
                    None => bail!("start date plus horizon is out of range"),
                }
            }
        };

        let blacklist: Vec<ResourceId> = if args.blacklist.is_empty() {
            query.blacklist.clone().unwrap_or_default()
        } else {
            args.blacklist.clone()
        }
        .into_iter()
        .map(ResourceId::from)
        .collect();

        let mut ratio = args.ratio.or(query.ratio);
        if ratio.is_some() && mode == Mode::Free {
            tracing::warn!("ratio only applies to date and max modes, ignoring it");
            ratio = None;
        }

        let plan = PlanRequest::new(TimeWindow::new(start, end), mode, request, walltime)
            .with_charter(args.charter || query.charter.unwrap_or(false))
            .with_blacklist(blacklist)
            .with_ratio(ratio);

        Ok(Self { inventory, plan })
    }
}

impl Submission {
    pub fn resolve(args: &SubmissionArgs, config: &FunkConfig) -> Self {
        let sub = config.submission();
        Self {
            kavlan: args.kavlan || sub.kavlan.unwrap_or(false),
            subnet: args.subnet.clone().or(sub.subnet),
            job_name: args
                .job_name
                .clone()
                .or(sub.job_name)
                .unwrap_or_else(|| DEFAULT_JOB_NAME.to_string()),
            options: args.submission_opts.clone().or(sub.options),
            program: args.prog.clone().or(sub.program),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const NOW: i64 = 1_704_067_200;

    fn make_config(toml_str: &str) -> FunkConfig {
        toml::from_str(toml_str).unwrap()
    }

    fn make_args() -> QueryArgs {
        QueryArgs {
            inventory: Some(PathBuf::from("inv.json")),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_apply_without_config() {
        let settings = Settings::resolve(&make_args(), &FunkConfig::default(), NOW, &Utc).unwrap();
        let plan = &settings.plan;
        assert_eq!(plan.mode, Mode::Date);
        assert_eq!(plan.request.get("grid5000"), Some(0));
        assert_eq!(plan.walltime, 3600);
        assert_eq!(plan.window.start, NOW + 60);
        assert_eq!(plan.window.end, NOW + 60 + 21 * 86_400);
        assert!(!plan.charter);
    }

    #[test]
    fn flags_override_config() {
        let config = make_config(
            r#"
[query]
mode = "max"
walltime = "4:00:00"
horizon = "2d"
blacklist = ["sagittaire"]
charter = true

[inventory]
path = "from-config.json"
"#,
        );
        let mut args = make_args();
        args.walltime = Some("2:00:00".to_string());
        args.startdate = Some("2024-01-02 10:00:00".to_string());

        let settings = Settings::resolve(&args, &config, NOW, &Utc).unwrap();
        assert_eq!(settings.inventory, PathBuf::from("inv.json"));
        assert_eq!(settings.plan.mode, Mode::Max);
        assert_eq!(settings.plan.walltime, 7200);
        assert_eq!(settings.plan.window.start, NOW + 86_400 + 10 * 3600);
        assert_eq!(settings.plan.window.duration(), 2 * 86_400);
        assert!(settings.plan.charter);
        assert!(settings.plan.blacklist.contains("sagittaire"));
    }

    #[test]
    fn free_mode_requires_counts() {
        let mut args = make_args();
        args.mode = Some("free".to_string());
        args.resources = Some("grid5000:10,taurus".to_string());
        assert!(Settings::resolve(&args, &FunkConfig::default(), NOW, &Utc).is_err());

        args.resources = Some("grid5000:10,taurus:2".to_string());
        args.ratio = Some(0.5);
        let settings = Settings::resolve(&args, &FunkConfig::default(), NOW, &Utc).unwrap();
        assert_eq!(settings.plan.request.get("taurus"), Some(2));
        assert!(settings.plan.ratio.is_none());
    }

    #[test]
    fn counts_dropped_outside_free_mode() {
        let mut args = make_args();
        args.resources = Some("lyon:10".to_string());
        let settings = Settings::resolve(&args, &FunkConfig::default(), NOW, &Utc).unwrap();
        assert_eq!(settings.plan.request.get("lyon"), Some(0));
    }

    #[test]
    fn out_of_range_end_date_is_an_error() {
        let mut args = make_args();
        args.startdate = Some(i64::MAX.to_string());
        let err = Settings::resolve(&args, &FunkConfig::default(), NOW, &Utc).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        args.startdate = None;
        let config = make_config("[query]\nhorizon = \"99999999999999999w\"\n");
        assert!(Settings::resolve(&args, &config, NOW, &Utc).is_err());
    }

    #[test]
    fn missing_inventory_is_an_error() {
        let args = QueryArgs::default();
        assert!(Settings::resolve(&args, &FunkConfig::default(), NOW, &Utc).is_err());
    }

    #[test]
    fn submission_defaults() {
        let config = make_config("[submission]\noptions = \"-t deploy\"\nkavlan = true\n");
        let sub = Submission::resolve(&SubmissionArgs::default(), &config);
        assert_eq!(sub.job_name, "FUNK");
        assert_eq!(sub.options.as_deref(), Some("-t deploy"));
        assert!(sub.kavlan);
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());

        let path = dir.path().join("funk.toml");
        std::fs::write(&path, "[query]\nmode = \"free\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.query().mode.as_deref(), Some("free"));
    }
}
