//! Feature capability gate.
//!
//! Each optional application feature depends on a column that may not
//! have been migrated in yet. The gate is refreshed once per boot from
//! the backend probes and handed to request handlers as an immutable
//! snapshot; a disabled capability means the dependent field is omitted
//! from queries, inputs, and outputs.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::backend::SchemaBackend;

/// Features gated on schema state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKey {
    ForumSpecialty,
    ResidentSpecialty,
    EmployerSpecialty,
    PostAttachments,
    CommentAttachments,
    ResidencySwapAdditionalInfo,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 6] = [
        FeatureKey::ForumSpecialty,
        FeatureKey::ResidentSpecialty,
        FeatureKey::EmployerSpecialty,
        FeatureKey::PostAttachments,
        FeatureKey::CommentAttachments,
        FeatureKey::ResidencySwapAdditionalInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKey::ForumSpecialty => "forum_specialty",
            FeatureKey::ResidentSpecialty => "resident_specialty",
            FeatureKey::EmployerSpecialty => "employer_specialty",
            FeatureKey::PostAttachments => "post_attachments",
            FeatureKey::CommentAttachments => "comment_attachments",
            FeatureKey::ResidencySwapAdditionalInfo => "residency_swap_additional_info",
        }
    }

    /// The column this feature depends on.
    pub fn probe(&self) -> (&'static str, &'static str) {
        match self {
            FeatureKey::ForumSpecialty => ("forum_post", "specialty"),
            FeatureKey::ResidentSpecialty => ("resident_profile", "medical_specialty"),
            FeatureKey::EmployerSpecialty => ("employer_profile", "medical_specialty"),
            FeatureKey::PostAttachments => ("forum_post", "photos"),
            FeatureKey::CommentAttachments => ("forum_comment", "photos"),
            FeatureKey::ResidencySwapAdditionalInfo => ("residency_swap", "additional_info"),
        }
    }
}

/// Immutable per-boot snapshot of feature availability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityMap {
    features: BTreeMap<&'static str, bool>,
}

impl CapabilityMap {
    /// Probe every feature's underlying column. A failed probe disables
    /// the feature; it never fails the boot.
    pub async fn refresh(backend: &dyn SchemaBackend) -> Self {
        let mut features = BTreeMap::new();
        for key in FeatureKey::ALL {
            let (table, column) = key.probe();
            let enabled = match backend.column_exists(table, column).await {
                Ok(present) => present,
                Err(err) => {
                    warn!(feature = key.as_str(), error = %err, "capability probe failed");
                    false
                }
            };
            features.insert(key.as_str(), enabled);
        }

        let disabled: Vec<&str> = features
            .iter()
            .filter(|(_, enabled)| !**enabled)
            .map(|(name, _)| *name)
            .collect();
        if disabled.is_empty() {
            info!("all gated features enabled");
        } else {
            warn!(?disabled, "features disabled pending migration");
        }

        Self { features }
    }

    /// Snapshot with every feature disabled, used when the database is
    /// unreachable.
    pub fn all_disabled() -> Self {
        Self {
            features: FeatureKey::ALL.iter().map(|k| (k.as_str(), false)).collect(),
        }
    }

    pub fn enabled(&self, key: FeatureKey) -> bool {
        self.features.get(key.as_str()).copied().unwrap_or(false)
    }

    pub fn all_enabled(&self) -> bool {
        self.features.values().all(|enabled| *enabled)
    }

    /// Feature-name -> enabled map for the health document.
    pub fn as_map(&self) -> &BTreeMap<&'static str, bool> {
        &self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;

    #[tokio::test]
    async fn gate_follows_column_presence() {
        let backend = MockBackend::postgres()
            .with_column("forum_post", "specialty", "varchar(100)")
            .with_column("forum_post", "photos", "text");
        let map = CapabilityMap::refresh(&backend).await;

        assert!(map.enabled(FeatureKey::ForumSpecialty));
        assert!(map.enabled(FeatureKey::PostAttachments));
        assert!(!map.enabled(FeatureKey::ResidentSpecialty));
        assert!(!map.enabled(FeatureKey::ResidencySwapAdditionalInfo));
        assert!(!map.all_enabled());
    }

    #[tokio::test]
    async fn all_disabled_covers_every_key() {
        let map = CapabilityMap::all_disabled();
        for key in FeatureKey::ALL {
            assert!(!map.enabled(key));
        }
        assert_eq!(map.as_map().len(), FeatureKey::ALL.len());
    }
}
