//! Grouping artifacts by application

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::artifact::Artifact;

/// All artifacts of one application in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationGroup {
    /// Application ID shared by every artifact
    pub application_id: String,
    /// Artifacts in discovery order
    pub artifacts: Vec<Artifact>,
    /// Distinct version codes, ascending
    pub version_codes: BTreeSet<u32>,
}

impl ApplicationGroup {
    fn new(application_id: String) -> Self {
        Self {
            application_id,
            artifacts: Vec::new(),
            version_codes: BTreeSet::new(),
        }
    }

    fn push(&mut self, artifact: Artifact) {
        self.version_codes.insert(artifact.version_code);
        self.artifacts.push(artifact);
    }
}

/// Partition artifacts by exact application ID.
///
/// Groups iterate in the order their application ID was first seen.
pub fn group_artifacts(artifacts: Vec<Artifact>) -> IndexMap<String, ApplicationGroup> {
    let mut groups: IndexMap<String, ApplicationGroup> = IndexMap::new();
    for artifact in artifacts {
        groups
            .entry(artifact.application_id.clone())
            .or_insert_with_key(|id| ApplicationGroup::new(id.clone()))
            .push(artifact);
    }
    groups
}
