//! Loading and validation of the branch, stop and route datasets.
//!
//! Raw records are deserialized as loosely as the upstream files require and
//! converted into [`Branch`] and [`Stop`] values here. Anything with a
//! missing, unparseable or out-of-range coordinate is dropped and counted;
//! nothing past this module ever sees an invalid point.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, info, warn};

use crate::geo::GeoPoint;
use crate::model::{Branch, Route, Stop, StopId};

/// Counts of records kept and discarded while loading one dataset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub accepted: usize,
    pub dropped: usize,
}

impl LoadReport {
    fn merge(&mut self, other: LoadReport) {
        self.accepted += other.accepted;
        self.dropped += other.dropped;
    }
}

/// Parses a coordinate as written by the scrapers and the stop API.
///
/// Commas are thousands separators in the stop feed and are stripped before
/// parsing. Empty or non-numeric input yields `None`.
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A coordinate that may arrive as a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCoordinate {
    Number(f64),
    Text(String),
}

impl RawCoordinate {
    pub fn value(&self) -> Option<f64> {
        match self {
            RawCoordinate::Number(n) => Some(*n).filter(|v| v.is_finite()),
            RawCoordinate::Text(s) => parse_coordinate(s),
        }
    }
}

/// An identifier that may arrive as a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(serde_json::Number),
    Text(String),
}

impl RawId {
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s.trim().to_string(),
        };
        (!text.is_empty()).then_some(text)
    }
}

fn point_from(latitude: Option<f64>, longitude: Option<f64>) -> Option<GeoPoint> {
    GeoPoint::new(latitude?, longitude?)
}

/// One row of a branch CSV. Extra columns (address, hours, ...) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBranch {
    #[serde(alias = "owner", alias = "chain")]
    pub bank: Option<String>,
    pub name: Option<String>,
    /// Branch format, e.g. a service point versus a full branch.
    #[serde(alias = "type")]
    pub category: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl RawBranch {
    /// Validates the row, returning `None` when it cannot become a [`Branch`].
    pub fn normalize(self) -> Option<Branch> {
        let owner = self.bank.map(|b| b.trim().to_string()).filter(|b| !b.is_empty())?;
        let location = point_from(
            self.latitude.as_deref().and_then(parse_coordinate),
            self.longitude.as_deref().and_then(parse_coordinate),
        )?;

        let mut branch = Branch::new(owner, location);
        if let Some(name) = non_blank(self.name) {
            branch = branch.with_name(name);
        }
        if let Some(category) = non_blank(self.category) {
            branch = branch.with_category(category);
        }
        Some(branch)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Anything that can hand over raw branch rows.
pub trait BranchSource {
    fn fetch_branches(&self) -> Result<Vec<RawBranch>>;
}

/// A single CSV file. Rows without a `bank` column fall back to
/// `default_owner` when one is set.
pub struct CsvFileSource {
    pub path: PathBuf,
    pub default_owner: Option<String>,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            default_owner: None,
        }
    }

    pub fn with_default_owner(mut self, owner: impl Into<String>) -> Self {
        self.default_owner = Some(owner.into());
        self
    }
}

impl BranchSource for CsvFileSource {
    fn fetch_branches(&self) -> Result<Vec<RawBranch>> {
        let file = File::open(&self.path)
            .with_context(|| format!("opening branch file {}", self.path.display()))?;
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);

        let mut rows = Vec::new();
        for result in rdr.deserialize::<RawBranch>() {
            let mut record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!(path = %self.path.display(), error = %e, "Skipping unreadable branch row");
                    rows.push(RawBranch::default());
                    continue;
                }
            };
            let has_owner = record.bank.as_deref().is_some_and(|b| !b.trim().is_empty());
            if !has_owner {
                record.bank = self.default_owner.clone();
            }
            rows.push(record);
        }

        Ok(rows)
    }
}

/// A directory of per-bank files named `<bank>_branches.csv`.
pub struct CsvDirectorySource {
    pub dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// CSV files in the directory, sorted by path so loads are repeatable.
    fn csv_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("reading branch directory {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("csv") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Owner implied by a per-bank file name, e.g. `kb_branches.csv` -> `kb`.
pub fn owner_from_file_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let owner = stem.strip_suffix("_branches").unwrap_or(stem);
    (!owner.is_empty()).then(|| owner.to_string())
}

impl BranchSource for CsvDirectorySource {
    fn fetch_branches(&self) -> Result<Vec<RawBranch>> {
        let mut rows = Vec::new();
        for path in self.csv_files()? {
            let mut source = CsvFileSource::new(&path);
            if let Some(owner) = owner_from_file_name(&path) {
                source = source.with_default_owner(owner);
            }
            let file_rows = source.fetch_branches()?;
            debug!(path = %path.display(), rows = file_rows.len(), "Read branch file");
            rows.extend(file_rows);
        }
        Ok(rows)
    }
}

/// Converts raw rows into branches, dropping the invalid ones.
pub fn normalize_branches(raw: Vec<RawBranch>) -> (Vec<Branch>, LoadReport) {
    let mut report = LoadReport::default();
    let mut branches = Vec::with_capacity(raw.len());

    for row in raw {
        match row.clone().normalize() {
            Some(branch) => {
                report.accepted += 1;
                branches.push(branch);
            }
            None => {
                report.dropped += 1;
                debug!(?row, "Dropping branch without owner or valid coordinates");
            }
        }
    }

    (branches, report)
}

/// Loads branches from a combined CSV file or a directory of per-bank files.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_branches(path: &Path) -> Result<(Vec<Branch>, LoadReport)> {
    let raw = if path.is_dir() {
        CsvDirectorySource::new(path).fetch_branches()?
    } else {
        CsvFileSource::new(path).fetch_branches()?
    };

    let (branches, report) = normalize_branches(raw);
    log_report("branches", report);
    Ok((branches, report))
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStop {
    pub id: Option<RawId>,
    pub latitude: Option<RawCoordinate>,
    pub longitude: Option<RawCoordinate>,
    #[serde(default, rename = "isTransportHub", alias = "isHub")]
    pub is_hub: Option<bool>,
}

/// A route's stop list entry: a bare id or an object carrying `stopId`.
/// Anything else is kept as `Unreadable` so one bad entry does not cost the
/// whole route.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRouteStop {
    Id(RawId),
    Entry {
        #[serde(rename = "stopId", alias = "id")]
        stop_id: RawId,
    },
    Unreadable(IgnoredAny),
}

impl RawRouteStop {
    fn stop_id(&self) -> Option<StopId> {
        match self {
            RawRouteStop::Id(id) | RawRouteStop::Entry { stop_id: id } => id.as_text().map(StopId),
            RawRouteStop::Unreadable(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRoute {
    pub id: RawId,
    #[serde(default)]
    pub stops: Vec<RawRouteStop>,
}

impl RawRoute {
    pub fn into_route(self) -> Option<Route> {
        Some(Route {
            id: self.id.as_text()?,
            stop_ids: self.stops.iter().filter_map(RawRouteStop::stop_id).collect(),
        })
    }
}

/// Decodes a JSON array one element at a time.
///
/// Only a file that is not a JSON array is an error. Elements that do not fit
/// `T` are skipped and counted in the returned report's `dropped`.
fn parse_records<T: DeserializeOwned>(json: &str, kind: &str) -> Result<(Vec<T>, LoadReport)> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut report = LoadReport::default();
    let mut records = Vec::with_capacity(values.len());

    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(record) => {
                report.accepted += 1;
                records.push(record);
            }
            Err(e) => {
                report.dropped += 1;
                debug!(kind, index, error = %e, "Skipping malformed record");
            }
        }
    }

    Ok((records, report))
}

/// Raw stops plus the number of array elements too malformed to read.
pub fn parse_stops(json: &str) -> Result<(Vec<RawStop>, usize)> {
    let (stops, report) = parse_records::<RawStop>(json, "stop")?;
    Ok((stops, report.dropped))
}

/// Routes plus the number of entries that were malformed or had no id.
pub fn parse_routes(json: &str) -> Result<(Vec<Route>, usize)> {
    let (raw, report) = parse_records::<RawRoute>(json, "route")?;
    let read = raw.len();
    let routes: Vec<Route> = raw.into_iter().filter_map(RawRoute::into_route).collect();
    let without_id = read - routes.len();
    Ok((routes, report.dropped + without_id))
}

/// Number of distinct routes serving each stop id.
///
/// A stop listed twice on one route, or a route id listed twice, counts once.
pub fn route_counts(routes: &[Route]) -> HashMap<StopId, u32> {
    let mut serving: HashMap<&StopId, HashSet<&str>> = HashMap::new();
    for route in routes {
        for stop_id in &route.stop_ids {
            serving.entry(stop_id).or_default().insert(route.id.as_str());
        }
    }

    serving
        .into_iter()
        .map(|(id, routes)| (id.clone(), routes.len() as u32))
        .collect()
}

/// Validates raw stops and attaches route counts.
///
/// Duplicate stop ids keep the first occurrence. Route references to unknown
/// stops are ignored.
pub fn build_stops(raw: Vec<RawStop>, routes: &[Route]) -> (Vec<Stop>, LoadReport) {
    let counts = route_counts(routes);
    let mut report = LoadReport::default();
    let mut seen: HashSet<StopId> = HashSet::new();
    let mut stops = Vec::with_capacity(raw.len());

    for row in raw {
        let id = row.id.as_ref().and_then(RawId::as_text).map(StopId);
        let location = point_from(
            row.latitude.as_ref().and_then(RawCoordinate::value),
            row.longitude.as_ref().and_then(RawCoordinate::value),
        );

        let (Some(id), Some(location)) = (id, location) else {
            report.dropped += 1;
            debug!(?row, "Dropping stop without id or valid coordinates");
            continue;
        };

        if !seen.insert(id.clone()) {
            report.dropped += 1;
            debug!(stop_id = %id, "Dropping duplicate stop id");
            continue;
        }

        let route_count = counts.get(&id).copied().unwrap_or(0);
        let mut stop = Stop::new(id, location).with_route_count(route_count);
        stop.is_hub = row.is_hub.unwrap_or(false);
        stops.push(stop);
        report.accepted += 1;
    }

    let dangling = counts.keys().filter(|id| !seen.contains(*id)).count();
    if dangling > 0 {
        debug!(dangling, "Route stop references with no matching stop were ignored");
    }

    (stops, report)
}

/// Reads the stop and route JSON files and joins them.
#[tracing::instrument(skip_all, fields(stops = %stops_path.display(), routes = %routes_path.display()))]
pub fn load_stops(stops_path: &Path, routes_path: &Path) -> Result<(Vec<Stop>, LoadReport)> {
    let stops_json = fs::read_to_string(stops_path)
        .with_context(|| format!("reading stops file {}", stops_path.display()))?;
    let routes_json = fs::read_to_string(routes_path)
        .with_context(|| format!("reading routes file {}", routes_path.display()))?;

    let (raw_stops, malformed_stops) = parse_stops(&stops_json)
        .with_context(|| format!("parsing stops file {}", stops_path.display()))?;
    let (routes, skipped_routes) = parse_routes(&routes_json)
        .with_context(|| format!("parsing routes file {}", routes_path.display()))?;
    if skipped_routes > 0 {
        warn!(routes = routes.len(), skipped = skipped_routes, "Routes loaded, some unreadable");
    } else {
        info!(routes = routes.len(), "Routes loaded");
    }

    let (stops, mut report) = build_stops(raw_stops, &routes);
    report.dropped += malformed_stops;
    log_report("stops", report);
    Ok((stops, report))
}

/// Everything the analyzers need, loaded once up front.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub branches: Vec<Branch>,
    pub stops: Vec<Stop>,
    pub report: LoadReport,
}

impl Dataset {
    pub fn load(branches_path: &Path, stops_path: &Path, routes_path: &Path) -> Result<Self> {
        let (branches, branch_report) = load_branches(branches_path)?;
        let (stops, stop_report) = load_stops(stops_path, routes_path)?;

        let mut report = branch_report;
        report.merge(stop_report);

        Ok(Self {
            branches,
            stops,
            report,
        })
    }
}

fn log_report(dataset: &str, report: LoadReport) {
    if report.dropped > 0 {
        warn!(
            dataset,
            accepted = report.accepted,
            dropped = report.dropped,
            "Dropped invalid records"
        );
    } else {
        info!(dataset, accepted = report.accepted, "Records loaded");
    }
}
