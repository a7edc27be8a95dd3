//! Competitor branches co-located with the home owner's branches.

use std::collections::BTreeMap;

use tracing::debug;

use crate::analyzers::types::{OverlapRecord, OverlapSummary};
use crate::config::{AnalysisConfig, ConfigError, validate_radius};
use crate::geo::LinearScan;
use crate::model::Branch;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapAnalyzer {
    radius_meters: f64,
}

impl OverlapAnalyzer {
    pub fn new(radius_meters: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            radius_meters: validate_radius("overlapRadiusMeters", radius_meters)?,
        })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        Self::new(config.overlap_radius_meters)
    }

    /// One record per home branch, counting branches of any other owner in
    /// `all_branches` within the radius. Branches sharing the home branch's
    /// owner are never counted.
    #[tracing::instrument(skip_all, fields(home = home_branches.len(), all = all_branches.len()))]
    pub fn analyze(&self, home_branches: &[Branch], all_branches: &[Branch]) -> Vec<OverlapRecord> {
        let scan = LinearScan::new(all_branches);

        home_branches
            .iter()
            .map(|home| {
                let mut competitor_counts: BTreeMap<String, usize> = BTreeMap::new();
                for (other, _) in scan.within(home.location, self.radius_meters) {
                    if other.owner != home.owner {
                        *competitor_counts.entry(other.owner.clone()).or_default() += 1;
                    }
                }
                OverlapRecord {
                    branch: home.clone(),
                    competitor_counts,
                }
            })
            .collect()
    }
}

pub fn compute_overlap(
    home_branches: &[Branch],
    all_branches: &[Branch],
    radius_meters: f64,
) -> Result<Vec<OverlapRecord>, ConfigError> {
    Ok(OverlapAnalyzer::new(radius_meters)?.analyze(home_branches, all_branches))
}

/// Rolls overlap records up per competitor.
pub fn summarize_overlap(records: &[OverlapRecord]) -> OverlapSummary {
    let mut summary = OverlapSummary {
        home_branch_count: records.len(),
        ..Default::default()
    };

    for record in records {
        if record.competitor_counts.is_empty() {
            summary.home_branches_without_competitors += 1;
        }
        for (owner, count) in &record.competitor_counts {
            let entry = summary.competitors.entry(owner.clone()).or_default();
            entry.co_located_branches += count;
            entry.home_branches_affected += 1;
        }
    }

    debug!(
        competitors = summary.competitors.len(),
        isolated = summary.home_branches_without_competitors,
        "Overlap summarized"
    );
    summary
}
