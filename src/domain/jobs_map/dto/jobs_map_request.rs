use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};
use validator::Validate;

use crate::core::config::app_config::DashboardConfig;

/// Dashboard inputs as they arrive on the query string. Missing or blank
/// values take the configured defaults.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct JobsMapRequest {
    #[serde(default)]
    #[serde_as(as = "NoneAsEmptyString")]
    pub server_id: Option<i64>,
    #[serde(default)]
    #[serde_as(as = "NoneAsEmptyString")]
    #[validate(range(min = 0))]
    pub lookback_days: Option<i64>,
}

/// Fully resolved inputs for one dashboard load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobsMapParams {
    pub server_id: i64,
    pub lookback_days: i64,
}

impl JobsMapRequest {
    pub fn resolve(&self, defaults: &DashboardConfig) -> JobsMapParams {
        JobsMapParams {
            server_id: self.server_id.unwrap_or(defaults.default_server_id),
            lookback_days: self.lookback_days.unwrap_or(defaults.default_lookback_days),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> DashboardConfig {
        DashboardConfig {
            default_server_id: 5041,
            default_lookback_days: 90,
            map_height: 1000,
            mapbox_token: None,
        }
    }

    #[test]
    fn missing_inputs_fall_back_to_defaults() {
        let params = JobsMapRequest::default().resolve(&defaults());
        assert_eq!(
            params,
            JobsMapParams {
                server_id: 5041,
                lookback_days: 90
            }
        );
    }

    #[test]
    fn negative_lookback_fails_validation() {
        let req = JobsMapRequest {
            server_id: Some(1),
            lookback_days: Some(-3),
        };
        let errs = req.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("lookback_days"));
    }

    #[test]
    fn zero_lookback_is_allowed() {
        let req = JobsMapRequest {
            server_id: Some(1),
            lookback_days: Some(0),
        };
        assert!(req.validate().is_ok());
        assert_eq!(req.resolve(&defaults()).lookback_days, 0);
    }

    #[test]
    fn blank_fields_read_as_missing() {
        let req: JobsMapRequest =
            serde_json::from_value(serde_json::json!({"server_id": "", "lookback_days": "30"}))
                .unwrap();
        assert_eq!(req.server_id, None);
        assert_eq!(req.lookback_days, Some(30));
        assert_eq!(req.resolve(&defaults()).server_id, 5041);

        let absent: JobsMapRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(absent.server_id, None);
        assert_eq!(absent.lookback_days, None);
    }
}
