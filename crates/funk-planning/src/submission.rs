//! Reservation command rendering.
//!
//! Builds the per-site OAR resource strings for a distribution and the
//! `oarsub` / `oargridsub` command a user runs to make the reservation.
//! Nothing here executes the command.

use std::collections::BTreeMap;

use funk_core::oar::format_walltime;
use funk_core::{CoreError, ResourceId};
use serde::Serialize;

use crate::distribute::Distribution;
use crate::error::PlanningResult;
use crate::topology::{Level, Topology};

const KAVLAN: &str = "kavlan";

/// One site's part of a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSpec {
    pub site: ResourceId,
    pub resources: String,
    pub name: String,
}

/// Options shared by every job of a reservation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmissionOptions {
    pub walltime: u64,
    /// Start date, already rendered in OAR format.
    pub reservation_date: String,
    pub additional_options: Option<String>,
    pub program: Option<String>,
}

/// Per-site job specs for `distribution`, in site order.
///
/// A `kavlan` allocation is attached to the first site, and `subnets`
/// (site → `slash_NN=n`) prefix the matching site's resources.
pub fn job_specs(
    distribution: &Distribution,
    topology: &Topology,
    name: &str,
    subnets: &BTreeMap<ResourceId, String>,
) -> Vec<JobSpec> {
    let vlans = distribution.get(KAVLAN);
    let mut specs: Vec<JobSpec> = distribution
        .per_site(topology)
        .into_iter()
        .map(|(site, clusters)| {
            let mut parts: Vec<String> = Vec::new();
            if let Some(subnet) = subnets.get(&site) {
                parts.push(subnet.clone());
            }
            parts.extend(
                clusters
                    .iter()
                    .map(|(cluster, n)| format!("{{cluster='{cluster}'}}/nodes={n}")),
            );
            JobSpec {
                site,
                resources: parts.join("+"),
                name: name.to_string(),
            }
        })
        .collect();

    if vlans > 0 {
        if let Some(first) = specs.first_mut() {
            first.resources = format!("{{type='kavlan'}}/vlan={vlans}+{}", first.resources);
        }
    }
    specs
}

/// Parse a subnet request.
///
/// `slash_22=1` applies to every site; `lyon:slash_22=1,nancy:slash_19=2`
/// targets sites one by one.
pub fn parse_subnets(spec: &str, topology: &Topology) -> PlanningResult<BTreeMap<ResourceId, String>> {
    let bad = || CoreError::Request(format!("bad subnet request '{spec}'"));
    let elements: Vec<&str> = spec.split(',').map(str::trim).filter(|e| !e.is_empty()).collect();

    if let [single] = elements.as_slice() {
        if !single.contains(':') {
            return Ok(topology
                .sites()
                .map(|site| (site.clone(), single.to_string()))
                .collect());
        }
    }

    let mut out = BTreeMap::new();
    for element in &elements {
        let (site, param) = element.split_once(':').ok_or_else(bad)?;
        if topology.level_of(site)? != Level::Site || param.is_empty() {
            return Err(bad().into());
        }
        out.insert(ResourceId::from(site), param.to_string());
    }
    if out.is_empty() {
        return Err(bad().into());
    }
    Ok(out)
}

/// Render the reservation command: `oarsub` for a single site,
/// `oargridsub` for several. `None` when there is nothing to reserve.
pub fn submission_command(specs: &[JobSpec], opts: &SubmissionOptions) -> Option<String> {
    let walltime = format_walltime(opts.walltime);
    let mut cmd = match specs {
        [] => return None,
        [single] => format!(
            "oarsub -l \"{},walltime={walltime}\" -r \"{}\" -n \"{}\"",
            single.resources, opts.reservation_date, single.name
        ),
        _ => format!("oargridsub -w {walltime} -r \"{}\"", opts.reservation_date),
    };

    if let Some(extra) = opts.additional_options.as_deref().filter(|o| !o.trim().is_empty()) {
        cmd.push(' ');
        cmd.push_str(extra.trim());
    }

    if specs.len() == 1 {
        if let Some(program) = &opts.program {
            cmd.push_str(&format!(" \"{program}\""));
        }
    } else {
        if let Some(program) = &opts.program {
            cmd.push_str(&format!(" -p \"{program}\""));
        }
        let rdefs: Vec<String> = specs
            .iter()
            .map(|s| format!("{}:rdef=\"{}\"", s.site, s.resources))
            .collect();
        cmd.push(' ');
        cmd.push_str(&rdefs.join(","));
    }

    Some(cmd)
}
