// Plan feature gates derived from the entitlement

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::EntitlementStatus;

/// Journeys a free account may keep at once
pub const FREE_MAX_JOURNEYS: u32 = 3;

pub const FEATURE_UNLIMITED_JOURNEYS: &str = "unlimited_journeys";
pub const FEATURE_PREMIUM_THEMES: &str = "premium_themes";
pub const FEATURE_NO_WATERMARK: &str = "no_watermark";

/// Feature set for a plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanFeatures {
    /// Plan name (free, lifetime_pro)
    pub plan: String,

    pub display_name: String,

    /// `None` means unlimited
    pub max_journeys: Option<u32>,

    /// Whether shared journeys carry the Loged.in watermark
    pub watermark: bool,

    pub premium_themes: bool,

    pub features: Vec<String>,
}

impl PlanFeatures {
    pub fn free() -> Self {
        Self {
            plan: "free".to_string(),
            display_name: "Free".to_string(),
            max_journeys: Some(FREE_MAX_JOURNEYS),
            watermark: true,
            premium_themes: false,
            features: vec![],
        }
    }

    pub fn lifetime_pro() -> Self {
        Self {
            plan: "lifetime_pro".to_string(),
            display_name: "Lifetime Pro".to_string(),
            max_journeys: None,
            watermark: false,
            premium_themes: true,
            features: vec![
                FEATURE_UNLIMITED_JOURNEYS.to_string(),
                FEATURE_PREMIUM_THEMES.to_string(),
                FEATURE_NO_WATERMARK.to_string(),
            ],
        }
    }

    pub fn for_entitlement(status: &EntitlementStatus) -> Self {
        if status.active {
            Self::lifetime_pro()
        } else {
            Self::free()
        }
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// Whether one more journey fits under the plan limit
    pub fn can_create_journey(&self, current_count: u32) -> bool {
        match self.max_journeys {
            Some(max) => current_count < max,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_plan_limits() {
        let free = PlanFeatures::for_entitlement(&EntitlementStatus::none());
        assert_eq!(free.plan, "free");
        assert!(free.watermark);
        assert!(free.can_create_journey(2));
        assert!(!free.can_create_journey(FREE_MAX_JOURNEYS));
        assert!(!free.has_feature(FEATURE_PREMIUM_THEMES));
    }

    #[test]
    fn test_lifetime_pro_unlocks_everything() {
        let pro = PlanFeatures::lifetime_pro();
        assert!(!pro.watermark);
        assert!(pro.premium_themes);
        assert!(pro.can_create_journey(10_000));
        assert!(pro.has_feature(FEATURE_UNLIMITED_JOURNEYS));
        assert!(pro.has_feature(FEATURE_NO_WATERMARK));
    }
}
