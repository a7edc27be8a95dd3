use crate::analyzers::accessibility::AccessibilityAnalyzer;
use crate::analyzers::aggregate::{build_report, summarize_by_owner};
use crate::analyzers::gaps::GapFinder;
use crate::analyzers::overlap::{OverlapAnalyzer, summarize_overlap};
use crate::analyzers::types::{
    AccessibilityRecord, GapCandidate, MarketReport, OverlapRecord, OverlapSummary, OwnerSummary,
};
use crate::analyzers::zones::ZoneClassifier;
use crate::config::{AnalysisConfig, ConfigError};
use crate::model::partition_by_owner;
use crate::output::{write_csv, write_json};
use crate::parser::Dataset;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Outputs that only exist when a home owner is configured.
const COMPETITIVE_OUTPUTS: [&str; 3] = ["overlap.csv", "overlap_summary.json", "gaps.csv"];

/// Results that depend on a home owner.
#[derive(Debug, Clone)]
pub struct CompetitiveAnalysis {
    pub home_owner: String,
    pub overlap: Vec<OverlapRecord>,
    pub overlap_summary: OverlapSummary,
    pub gaps: Vec<GapCandidate>,
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub accessibility: Vec<AccessibilityRecord>,
    pub owners: BTreeMap<String, OwnerSummary>,
    pub report: MarketReport,
    /// Present when the config names a home owner.
    pub competitive: Option<CompetitiveAnalysis>,
}

/// The configured analyzers, all validated before any data is touched.
#[derive(Debug, Clone)]
pub struct Pipeline {
    accessibility: AccessibilityAnalyzer,
    zones: ZoneClassifier,
    overlap: OverlapAnalyzer,
    gaps: GapFinder,
    home_owner: Option<String>,
}

impl Pipeline {
    pub fn new(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            accessibility: AccessibilityAnalyzer::from_config(config)?,
            zones: ZoneClassifier::from_config(config)?,
            overlap: OverlapAnalyzer::from_config(config)?,
            gaps: GapFinder::from_config(config)?,
            home_owner: config.home_owner.clone(),
        })
    }

    #[tracing::instrument(skip_all, fields(branches = dataset.branches.len(), stops = dataset.stops.len()))]
    pub fn run(&self, dataset: &Dataset) -> AnalysisOutput {
        let accessibility = self.accessibility.analyze(&dataset.branches, &dataset.stops);
        let owners = summarize_by_owner(&accessibility);
        let report = build_report(&accessibility, &self.zones);

        let competitive = self
            .home_owner
            .as_deref()
            .map(|home| self.competitive(dataset, home));

        info!(
            branches = accessibility.len(),
            owners = owners.len(),
            competitive = competitive.is_some(),
            "Analysis complete"
        );

        AnalysisOutput {
            accessibility,
            owners,
            report,
            competitive,
        }
    }

    fn competitive(&self, dataset: &Dataset, home_owner: &str) -> CompetitiveAnalysis {
        let (home, competitors) = partition_by_owner(&dataset.branches, home_owner);
        if home.is_empty() {
            warn!(home_owner, "Home owner has no branches in the dataset");
        }

        let overlap = self.overlap.analyze(&home, &dataset.branches);
        let overlap_summary = summarize_overlap(&overlap);
        let gaps = self.gaps.find(&dataset.stops, &home, &competitors);

        info!(
            home_owner,
            home_branches = home.len(),
            gaps = gaps.len(),
            "Competitive analysis complete"
        );

        CompetitiveAnalysis {
            home_owner: home_owner.to_string(),
            overlap,
            overlap_summary,
            gaps,
        }
    }
}

/// Runs the whole pipeline and writes every projection into `output_dir`.
pub fn analyze(dataset: &Dataset, config: &AnalysisConfig, output_dir: &Path) -> Result<AnalysisOutput> {
    let pipeline = Pipeline::new(config)?;
    let output = pipeline.run(dataset);

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    write_outputs(&output, output_dir)?;

    info!(output_dir = %output_dir.display(), "Outputs written");
    Ok(output)
}

fn write_outputs(output: &AnalysisOutput, output_dir: &Path) -> Result<()> {
    use crate::output::{AccessibilityRow, GapRow, OverlapRow};

    write_csv(
        &output_dir.join("accessibility.csv"),
        output.accessibility.iter().map(AccessibilityRow::from),
    )?;
    write_json(&output_dir.join("owner_summary.json"), &output.owners)?;
    write_json(&output_dir.join("report.json"), &output.report)?;

    if let Some(competitive) = &output.competitive {
        write_csv(
            &output_dir.join("overlap.csv"),
            competitive.overlap.iter().flat_map(OverlapRow::expand),
        )?;
        write_json(&output_dir.join("overlap_summary.json"), &competitive.overlap_summary)?;
        write_csv(
            &output_dir.join("gaps.csv"),
            competitive
                .gaps
                .iter()
                .enumerate()
                .map(|(i, g)| GapRow::new(i + 1, g)),
        )?;
    } else {
        // a previous run with a home owner may have left these behind
        for name in COMPETITIVE_OUTPUTS {
            remove_stale(&output_dir.join(name))?;
        }
    }

    Ok(())
}

fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed stale output");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
    }
}
