//! Curriculum content: subjects, clusters and their satellites.
//!
//! Records are read-only once loaded. Every field deserializes with a default
//! so a record missing its id or name still parses and can be reported as
//! malformed by the assembler instead of failing the whole catalog.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

const SAMPLE_CATALOG: &str = include_str!("../../data/catalog.json");

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("content record has no id")]
    MissingId,
    #[error("content record `{id}` has no name")]
    MissingName { id: String },
    #[error("duplicate content id `{0}`")]
    DuplicateId(String),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub area: String,
    pub semester: u32,
    pub credits: u32,
    pub hours: u32,
    pub prerequisites: Vec<String>,
    pub description: String,
    pub topics: Vec<String>,
    pub professor: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Satellite {
    pub id: String,
    pub name: String,
    pub description: String,
    pub area: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub area: String,
    pub position: [f64; 3],
    /// Specialization subjects grouped under this cluster.
    pub subjects: Vec<Subject>,
    pub satellites: Vec<Satellite>,
}

impl Cluster {
    #[must_use]
    pub fn info(&self) -> ClusterInfo {
        ClusterInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            area: self.area.clone(),
            satellite_count: self.satellites.len(),
        }
    }
}

/// The part of a cluster carried by its central scene node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterInfo {
    pub id: String,
    pub name: String,
    pub area: String,
    pub satellite_count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeArea {
    pub name: String,
    pub color: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CatalogStats {
    pub total_subjects: usize,
    pub total_credits: u32,
    pub total_hours: u32,
    pub by_area: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub areas: BTreeMap<String, KnowledgeArea>,
    pub roots: Vec<Subject>,
    pub trunk: Vec<Subject>,
    pub clusters: Vec<Cluster>,
}

/// Id and name must be present.
pub fn validate_subject(subject: &Subject) -> Result<(), ContentError> {
    validate_record(&subject.id, &subject.name)
}

pub fn validate_satellite(satellite: &Satellite) -> Result<(), ContentError> {
    validate_record(&satellite.id, &satellite.name)
}

pub fn validate_cluster(cluster: &Cluster) -> Result<(), ContentError> {
    validate_record(&cluster.id, &cluster.name)
}

fn validate_record(id: &str, name: &str) -> Result<(), ContentError> {
    if id.trim().is_empty() {
        return Err(ContentError::MissingId);
    }
    if name.trim().is_empty() {
        return Err(ContentError::MissingName { id: id.to_string() });
    }
    Ok(())
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Built-in curriculum: 3 roots, 5 trunk subjects and 5 specialization clusters.
    pub fn sample() -> Result<Self, ContentError> {
        Self::from_json(SAMPLE_CATALOG)
    }

    /// Roots, trunk and every cluster's subjects, in that order.
    pub fn all_subjects(&self) -> impl Iterator<Item = &Subject> {
        self.roots
            .iter()
            .chain(&self.trunk)
            .chain(self.clusters.iter().flat_map(|cluster| cluster.subjects.iter()))
    }

    #[must_use]
    pub fn subject_by_id(&self, id: &str) -> Option<&Subject> {
        self.all_subjects().find(|subject| subject.id == id)
    }

    #[must_use]
    pub fn satellite_by_id(&self, id: &str) -> Option<&Satellite> {
        self.clusters
            .iter()
            .flat_map(|cluster| cluster.satellites.iter())
            .find(|satellite| satellite.id == id)
    }

    #[must_use]
    pub fn cluster_by_id(&self, id: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|cluster| cluster.id == id)
    }

    #[must_use]
    pub fn subjects_by_area(&self, area: &str) -> Vec<&Subject> {
        self.all_subjects().filter(|subject| subject.area == area).collect()
    }

    #[must_use]
    pub fn subjects_by_semester(&self, semester: u32) -> Vec<&Subject> {
        self.all_subjects()
            .filter(|subject| subject.semester == semester)
            .collect()
    }

    /// True when every prerequisite of `id` is in `completed`; unknown ids are never takeable.
    #[must_use]
    pub fn can_take_subject(&self, id: &str, completed: &[&str]) -> bool {
        self.subject_by_id(id).is_some_and(|subject| {
            subject
                .prerequisites
                .iter()
                .all(|prereq| completed.contains(&prereq.as_str()))
        })
    }

    #[must_use]
    pub fn area(&self, area: &str) -> Option<&KnowledgeArea> {
        self.areas.get(area)
    }

    /// Totals over every subject. `by_area` lists each declared area, even when empty.
    #[must_use]
    pub fn stats(&self) -> CatalogStats {
        let mut by_area: BTreeMap<String, usize> =
            self.areas.keys().map(|area| (area.clone(), 0)).collect();
        let mut stats = CatalogStats::default();

        for subject in self.all_subjects() {
            stats.total_subjects += 1;
            stats.total_credits += subject.credits;
            stats.total_hours += subject.hours;
            if self.areas.is_empty() || self.areas.contains_key(&subject.area) {
                *by_area.entry(subject.area.clone()).or_insert(0) += 1;
            }
        }

        stats.by_area = by_area;
        stats
    }

    /// Ids used by more than one subject or satellite.
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        let ids = self.all_subjects().map(|subject| subject.id.as_str()).chain(
            self.clusters
                .iter()
                .flat_map(|cluster| cluster.satellites.iter().map(|sat| sat.id.as_str())),
        );
        for id in ids.filter(|id| !id.is_empty()) {
            if !seen.insert(id) && !duplicates.iter().any(|dup: &String| dup == id) {
                duplicates.push(id.to_string());
            }
        }
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_catalog_loads() {
        let catalog = Catalog::sample().expect("sample catalog parses");
        assert_eq!(catalog.roots.len(), 3);
        assert_eq!(catalog.trunk.len(), 5);
        assert_eq!(catalog.clusters.len(), 5);
        for cluster in &catalog.clusters {
            assert!((6..=10).contains(&cluster.satellites.len()), "{}", cluster.id);
            validate_cluster(cluster).unwrap();
        }
        assert!(catalog.duplicate_ids().is_empty());
    }

    #[test]
    fn lookups_by_id_area_and_semester() {
        let catalog = Catalog::sample().unwrap();
        assert_eq!(
            catalog.subject_by_id("INF-110").map(|s| s.name.as_str()),
            Some("Programación I")
        );
        assert!(catalog.subject_by_id("INF-999").is_none());
        assert_eq!(catalog.subjects_by_area("ia").len(), 3);
        assert_eq!(catalog.subjects_by_semester(1).len(), 2);
        assert_eq!(catalog.satellite_by_id("WEB-S1").map(|s| s.area.as_str()), Some("web"));
        assert_eq!(catalog.cluster_by_id("ia").map(|c| c.satellites.len()), Some(7));
        assert!(catalog.cluster_by_id("INF-510").is_none());
    }

    #[test]
    fn prerequisites_gate_subjects() {
        let catalog = Catalog::sample().unwrap();
        assert!(catalog.can_take_subject("INF-110", &[]));
        assert!(!catalog.can_take_subject("INF-510", &["INF-210"]));
        assert!(catalog.can_take_subject("INF-510", &["INF-210", "INF-111"]));
        assert!(!catalog.can_take_subject("INF-999", &[]));
    }

    #[test]
    fn stats_cover_every_declared_area() {
        let catalog = Catalog::sample().unwrap();
        let stats = catalog.stats();
        assert_eq!(stats.total_subjects, 20);
        assert_eq!(stats.by_area.get("gamedev"), Some(&0));
        assert_eq!(stats.by_area.get("fundamentos"), Some(&5));
        assert_eq!(stats.by_area.values().sum::<usize>(), 20);
    }

    #[test]
    fn records_missing_id_or_name_parse_but_fail_validation() {
        let catalog = Catalog::from_json(r#"{ "roots": [ { "name": "Sin código" }, { "id": "X-1" } ] }"#)
            .expect("partial records still parse");
        assert!(matches!(validate_subject(&catalog.roots[0]), Err(ContentError::MissingId)));
        assert!(matches!(
            validate_subject(&catalog.roots[1]),
            Err(ContentError::MissingName { ref id }) if id == "X-1"
        ));
    }
}
