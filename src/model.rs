//! Validated entities shared by the loader and every analyzer.

use std::fmt;

use serde::Serialize;

use crate::geo::{GeoPoint, Located};

/// A physical branch belonging to `owner`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub owner: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub location: GeoPoint,
}

impl Branch {
    pub fn new(owner: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            owner: owner.into(),
            name: None,
            category: None,
            location,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

impl Located for Branch {
    fn location(&self) -> GeoPoint {
        self.location
    }
}

/// Stop identifier as published by the transit API.
///
/// Upstream ids show up both as JSON numbers and strings, so they are kept in
/// their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StopId(pub String);

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StopId {
    fn from(s: &str) -> Self {
        StopId(s.to_string())
    }
}

impl From<u64> for StopId {
    fn from(n: u64) -> Self {
        StopId(n.to_string())
    }
}

/// A transit stop with the number of distinct routes serving it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: StopId,
    pub location: GeoPoint,
    pub is_hub: bool,
    pub route_count: u32,
}

impl Stop {
    pub fn new(id: impl Into<StopId>, location: GeoPoint) -> Self {
        Self {
            id: id.into(),
            location,
            is_hub: false,
            route_count: 0,
        }
    }

    pub fn with_route_count(mut self, route_count: u32) -> Self {
        self.route_count = route_count;
        self
    }

    pub fn hub(mut self) -> Self {
        self.is_hub = true;
        self
    }
}

impl Located for Stop {
    fn location(&self) -> GeoPoint {
        self.location
    }
}

/// An ordered path of stops. Only used to derive [`Stop::route_count`].
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: String,
    pub stop_ids: Vec<StopId>,
}

/// Splits `branches` into the home owner's branches and everyone else's,
/// preserving input order on both sides.
pub fn partition_by_owner(branches: &[Branch], home_owner: &str) -> (Vec<Branch>, Vec<Branch>) {
    branches
        .iter()
        .cloned()
        .partition(|b| b.owner == home_owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_by_owner_keeps_order() {
        let p = GeoPoint::new(40.0, 49.0).unwrap();
        let branches = vec![
            Branch::new("A", p).with_name("a1"),
            Branch::new("B", p).with_name("b1"),
            Branch::new("A", p).with_name("a2"),
        ];

        let (home, others) = partition_by_owner(&branches, "A");

        assert_eq!(home.len(), 2);
        assert_eq!(home[0].name.as_deref(), Some("a1"));
        assert_eq!(home[1].name.as_deref(), Some("a2"));
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].owner, "B");
    }

    #[test]
    fn test_stop_id_from_number_and_str() {
        assert_eq!(StopId::from(42u64), StopId::from("42"));
        assert_eq!(StopId::from("7").to_string(), "7");
    }
}
