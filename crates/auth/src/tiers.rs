//! Tier access matrix: which subscription tier unlocks which features.
//!
//! Everything here is pure and table-driven: every `(tier, feature)` pair is a
//! deterministic fact, and adding a tier is a data change
//! ([`TierMatrix::with_tier`]) rather than a code change.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subscription tier tag.
///
/// Tiers are open-ended strings at this layer so new plans can be introduced
/// without touching the evaluator; their meaning comes from the [`TierMatrix`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tier(Cow<'static, str>);

impl Tier {
    pub const WINGMAN: Tier = Tier(Cow::Borrowed("wingman"));
    pub const GUARDIAN: Tier = Tier(Cow::Borrowed("guardian"));
    pub const APEX_COMMAND: Tier = Tier(Cow::Borrowed("apex_command"));
    /// Specialised plan for carriers preparing for a DOT compliance review.
    pub const AUDIT_SHIELD: Tier = Tier(Cow::Borrowed("audit_shield"));
    /// Specialised plan covering dispatch tooling only.
    pub const DISPATCH_DESK: Tier = Tier(Cow::Borrowed("dispatch_desk"));
    /// Full-access plan.
    pub const FLEET_UNLIMITED: Tier = Tier(Cow::Borrowed("fleet_unlimited"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Tier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A capability gated by tier membership.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    SupportTickets,
    EldReports,
    IftaReports,
    CsaScores,
    DataqDisputes,
    DriverFiles,
    DispatchBoard,
    LoadSchedules,
    BrokerPackets,
    RevenueReports,
    DotAudits,
}

impl Feature {
    /// The full feature universe.
    pub const ALL: [Feature; 11] = [
        Feature::SupportTickets,
        Feature::EldReports,
        Feature::IftaReports,
        Feature::CsaScores,
        Feature::DataqDisputes,
        Feature::DriverFiles,
        Feature::DispatchBoard,
        Feature::LoadSchedules,
        Feature::BrokerPackets,
        Feature::RevenueReports,
        Feature::DotAudits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::SupportTickets => "support_tickets",
            Feature::EldReports => "eld_reports",
            Feature::IftaReports => "ifta_reports",
            Feature::CsaScores => "csa_scores",
            Feature::DataqDisputes => "dataq_disputes",
            Feature::DriverFiles => "driver_files",
            Feature::DispatchBoard => "dispatch_board",
            Feature::LoadSchedules => "load_schedules",
            Feature::BrokerPackets => "broker_packets",
            Feature::RevenueReports => "revenue_reports",
            Feature::DotAudits => "dot_audits",
        }
    }
}

impl core::fmt::Display for Feature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown feature '{0}'")]
pub struct UnknownFeature(pub String);

impl FromStr for Feature {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownFeature(s.to_string()))
    }
}

/// The features a tier grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    /// Wildcard marker: every defined feature.
    All,
    Only(BTreeSet<Feature>),
}

impl FeatureSet {
    pub fn only(features: impl IntoIterator<Item = Feature>) -> Self {
        FeatureSet::Only(features.into_iter().collect())
    }

    pub fn contains(&self, feature: Feature) -> bool {
        match self {
            FeatureSet::All => true,
            FeatureSet::Only(set) => set.contains(&feature),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, FeatureSet::All)
    }

    /// Materialise the set (the wildcard expands to the full universe).
    pub fn to_set(&self) -> BTreeSet<Feature> {
        match self {
            FeatureSet::All => Feature::ALL.iter().copied().collect(),
            FeatureSet::Only(set) => set.clone(),
        }
    }
}

/// One row of the matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierEntry {
    /// Ordering used by minimum-tier checks only; never consulted for feature
    /// membership.
    pub rank: u8,
    pub features: FeatureSet,
}

/// Total mapping from every defined tier to its feature set and rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierMatrix {
    entries: BTreeMap<Tier, TierEntry>,
}

impl Default for TierMatrix {
    fn default() -> Self {
        Self::standard()
    }
}

impl TierMatrix {
    /// An empty matrix (no tier grants anything).
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The production plan table.
    pub fn standard() -> Self {
        use Feature::*;

        let wingman = [SupportTickets, EldReports, DriverFiles];
        let guardian = [IftaReports, CsaScores, DataqDisputes];
        let apex = [DispatchBoard, LoadSchedules, BrokerPackets, RevenueReports];

        Self::empty()
            .with_tier(Tier::WINGMAN, 1, FeatureSet::only(wingman))
            .with_tier(
                Tier::GUARDIAN,
                2,
                FeatureSet::only(wingman.into_iter().chain(guardian)),
            )
            // Shares rank 2 with guardian.
            .with_tier(
                Tier::AUDIT_SHIELD,
                2,
                FeatureSet::only([SupportTickets, DriverFiles, CsaScores, DotAudits]),
            )
            .with_tier(
                Tier::DISPATCH_DESK,
                2,
                FeatureSet::only([SupportTickets, DispatchBoard, LoadSchedules, BrokerPackets]),
            )
            .with_tier(
                Tier::APEX_COMMAND,
                3,
                FeatureSet::only(wingman.into_iter().chain(guardian).chain(apex)),
            )
            .with_tier(Tier::FLEET_UNLIMITED, 4, FeatureSet::All)
    }

    /// Add (or replace) a tier row.
    pub fn with_tier(mut self, tier: Tier, rank: u8, features: FeatureSet) -> Self {
        self.entries.insert(tier, TierEntry { rank, features });
        self
    }

    pub fn entry(&self, tier: &Tier) -> Option<&TierEntry> {
        self.entries.get(tier)
    }

    pub fn tiers(&self) -> impl Iterator<Item = &Tier> {
        self.entries.keys()
    }

    pub fn is_known(&self, tier: &Tier) -> bool {
        self.entries.contains_key(tier)
    }

    /// Whether `tier` unlocks `feature`. Unknown tiers unlock nothing.
    pub fn has_feature_access(&self, tier: &Tier, feature: Feature) -> bool {
        self.entries
            .get(tier)
            .is_some_and(|entry| entry.features.contains(feature))
    }

    /// Name-based lookup for untyped call sites.
    ///
    /// Empty or unknown tier or feature names yield `false`.
    pub fn has_feature_access_named(&self, tier: &str, feature: &str) -> bool {
        if tier.is_empty() || feature.is_empty() {
            return false;
        }
        match feature.parse::<Feature>() {
            Ok(feature) => self.has_feature_access(&Tier::new(tier.to_string()), feature),
            Err(_) => false,
        }
    }

    /// Features unlocked by `tier`; empty for unknown tiers.
    pub fn available_features(&self, tier: &Tier) -> BTreeSet<Feature> {
        self.entries
            .get(tier)
            .map(|entry| entry.features.to_set())
            .unwrap_or_default()
    }

    pub fn tier_rank(&self, tier: &Tier) -> Option<u8> {
        self.entries.get(tier).map(|entry| entry.rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wingman_lacks_ifta() {
        let m = TierMatrix::standard();
        assert!(!m.has_feature_access(&Tier::WINGMAN, Feature::IftaReports));
        assert!(m.has_feature_access(&Tier::WINGMAN, Feature::EldReports));
    }

    #[test]
    fn guardian_has_ifta() {
        let m = TierMatrix::standard();
        assert!(m.has_feature_access(&Tier::GUARDIAN, Feature::IftaReports));
    }

    #[test]
    fn wildcard_tier_unlocks_everything() {
        let m = TierMatrix::standard();
        for f in Feature::ALL {
            assert!(m.has_feature_access(&Tier::FLEET_UNLIMITED, f), "{f}");
        }
        assert_eq!(m.available_features(&Tier::FLEET_UNLIMITED).len(), Feature::ALL.len());
    }

    #[test]
    fn unknown_tier_unlocks_nothing() {
        let m = TierMatrix::standard();
        let bogus = Tier::new("platinum");
        assert!(m.available_features(&bogus).is_empty());
        assert!(!m.has_feature_access(&bogus, Feature::SupportTickets));
        assert_eq!(m.tier_rank(&bogus), None);
    }

    #[test]
    fn named_lookup_rejects_empty_and_unknown() {
        let m = TierMatrix::standard();
        assert!(m.has_feature_access_named("guardian", "ifta_reports"));
        assert!(!m.has_feature_access_named("", "ifta_reports"));
        assert!(!m.has_feature_access_named("guardian", ""));
        assert!(!m.has_feature_access_named("guardian", "time_travel"));
        assert!(!m.has_feature_access_named("platinum", "ifta_reports"));
    }

    #[test]
    fn feature_names_round_trip() {
        for f in Feature::ALL {
            assert_eq!(f.as_str().parse::<Feature>(), Ok(f));
            assert_eq!(serde_json::to_value(f).unwrap(), f.as_str());
        }
    }

    #[test]
    fn adding_a_tier_is_a_data_change() {
        let m = TierMatrix::standard().with_tier(
            Tier::new("ifta_lite"),
            1,
            FeatureSet::only([Feature::IftaReports]),
        );
        assert!(m.has_feature_access(&Tier::new("ifta_lite"), Feature::IftaReports));
        assert!(!m.has_feature_access(&Tier::new("ifta_lite"), Feature::EldReports));
    }

    #[test]
    fn ranks_order_general_tiers() {
        let m = TierMatrix::standard();
        let r = |t: &Tier| m.tier_rank(t).unwrap();
        assert!(r(&Tier::WINGMAN) < r(&Tier::GUARDIAN));
        assert!(r(&Tier::GUARDIAN) < r(&Tier::APEX_COMMAND));
        assert!(r(&Tier::APEX_COMMAND) < r(&Tier::FLEET_UNLIMITED));
        assert_eq!(r(&Tier::AUDIT_SHIELD), r(&Tier::GUARDIAN));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_feature() -> impl Strategy<Value = Feature> {
            (0..Feature::ALL.len()).prop_map(|i| Feature::ALL[i])
        }

        fn any_tier() -> impl Strategy<Value = Tier> {
            let known: Vec<Tier> = TierMatrix::standard().tiers().cloned().collect();
            prop_oneof![
                proptest::sample::select(known),
                "[a-z_]{0,12}".prop_map(Tier::new),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: access is exactly matrix membership (or wildcard).
            #[test]
            fn access_matches_matrix_membership(tier in any_tier(), feature in any_feature()) {
                let m = TierMatrix::standard();
                let expected = match m.entry(&tier) {
                    Some(TierEntry { features: FeatureSet::All, .. }) => true,
                    Some(TierEntry { features: FeatureSet::Only(set), .. }) => set.contains(&feature),
                    None => false,
                };
                prop_assert_eq!(m.has_feature_access(&tier, feature), expected);
            }

            /// Property: available features equal the entry, universe, or nothing.
            #[test]
            fn available_features_match_entry(tier in any_tier()) {
                let m = TierMatrix::standard();
                let expected: BTreeSet<Feature> = match m.entry(&tier) {
                    Some(TierEntry { features: FeatureSet::All, .. }) => Feature::ALL.iter().copied().collect(),
                    Some(TierEntry { features: FeatureSet::Only(set), .. }) => set.clone(),
                    None => BTreeSet::new(),
                };
                prop_assert_eq!(m.available_features(&tier), expected);
            }

            /// Property: lookups are deterministic.
            #[test]
            fn lookups_are_deterministic(tier in any_tier(), feature in any_feature()) {
                let m = TierMatrix::standard();
                prop_assert_eq!(m.has_feature_access(&tier, feature), m.has_feature_access(&tier, feature));
            }
        }
    }
}
