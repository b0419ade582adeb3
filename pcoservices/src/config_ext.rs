//! Planning Center settings on top of pcoconfig
//!
//! This module provides the `PlanningCenterConfigExt` trait, which adds
//! Planning Center credentials and plan-selection settings to
//! `pcoconfig::Config`.
//!
//! # Example
//!
//! ```no_run
//! use pcoconfig::Config;
//! use pcoservices::{PlanningCenterClient, PlanningCenterConfigExt};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::load_config("")?;
//!
//! let client = PlanningCenterClient::from_config(&config)?;
//! println!("Talking to {}", client.api_base());
//!
//! let service_type = config.get_service_type_name()?;
//! println!("Looking for plans of {}", service_type);
//! # Ok(())
//! # }
//! ```

use crate::client::{PlanningCenterClient, DEFAULT_API_BASE, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::Result as ClientResult;
use crate::locator::SelectionMode;
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use pcoconfig::Config;
use serde_yaml::{Number, Value};
use std::time::Duration;

/// Default number of items requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Default service type name
pub const DEFAULT_SERVICE_TYPE: &str = "Celebration Service";

/// Extension trait for Planning Center settings in pcoconfig
///
/// Getters for optional values return `None` when the key is absent, null,
/// or an empty string. Required values fail with a message naming the key.
pub trait PlanningCenterConfigExt {
    // ========================================================================
    // Connection
    // ========================================================================

    /// Personal access token as `(app_id, secret)`
    fn get_planning_center_credentials(&self) -> Result<(String, String)>;

    /// Store a personal access token
    fn set_planning_center_credentials(&self, app_id: &str, secret: &str) -> Result<()>;

    /// API base URL (default: the public Services v2 endpoint)
    fn get_planning_center_api_base(&self) -> Result<String>;

    /// Items per page (default: 25)
    fn get_planning_center_page_size(&self) -> Result<u32>;

    /// Per-request timeout (default: 30 seconds)
    fn get_planning_center_timeout(&self) -> Result<Duration>;

    // ========================================================================
    // Plan Selection
    // ========================================================================

    /// Name of the service type whose plans are searched
    fn get_service_type_name(&self) -> Result<String>;

    fn set_service_type_name(&self, name: &str) -> Result<()>;

    /// Person whose roster drives `roster` selection
    fn get_roster_person_id(&self) -> Result<Option<String>>;

    fn set_roster_person_id(&self, person_id: &str) -> Result<()>;

    /// Selection policy name (default: `prompt`)
    fn get_selection_mode(&self) -> Result<SelectionMode>;

    fn set_selection_mode(&self, mode: SelectionMode) -> Result<()>;

    /// Date used by `date` selection
    fn get_target_date(&self) -> Result<Option<NaiveDate>>;

    /// Page limit for roster searches (default: none)
    fn get_roster_max_pages(&self) -> Result<Option<usize>>;

    fn set_roster_max_pages(&self, max_pages: Option<usize>) -> Result<()>;
}

fn non_empty_string(value: Result<Value>) -> Option<String> {
    match value {
        Ok(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Ok(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

impl PlanningCenterConfigExt for Config {
    fn get_planning_center_credentials(&self) -> Result<(String, String)> {
        let app_id = non_empty_string(self.get_value(&["planning_center", "app_id"]))
            .ok_or_else(|| anyhow!("planning_center.app_id is not configured"))?;
        let secret = non_empty_string(self.get_value(&["planning_center", "secret"]))
            .ok_or_else(|| anyhow!("planning_center.secret is not configured"))?;
        Ok((app_id, secret))
    }

    fn set_planning_center_credentials(&self, app_id: &str, secret: &str) -> Result<()> {
        self.set_value(&["planning_center", "app_id"], Value::String(app_id.to_string()))?;
        self.set_value(&["planning_center", "secret"], Value::String(secret.to_string()))
    }

    fn get_planning_center_api_base(&self) -> Result<String> {
        Ok(non_empty_string(self.get_value(&["planning_center", "api_base"]))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string()))
    }

    fn get_planning_center_page_size(&self) -> Result<u32> {
        match self.get_value(&["planning_center", "page_size"]) {
            Ok(Value::Number(n)) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0)
                .ok_or_else(|| anyhow!("planning_center.page_size must be a positive integer")),
            _ => Ok(DEFAULT_PAGE_SIZE),
        }
    }

    fn get_planning_center_timeout(&self) -> Result<Duration> {
        match self.get_value(&["planning_center", "timeout_secs"]) {
            Ok(Value::Number(n)) => n
                .as_u64()
                .map(Duration::from_secs)
                .ok_or_else(|| anyhow!("planning_center.timeout_secs must be a positive integer")),
            _ => Ok(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
        }
    }

    fn get_service_type_name(&self) -> Result<String> {
        Ok(non_empty_string(self.get_value(&["setlist", "service_type"]))
            .unwrap_or_else(|| DEFAULT_SERVICE_TYPE.to_string()))
    }

    fn set_service_type_name(&self, name: &str) -> Result<()> {
        self.set_value(&["setlist", "service_type"], Value::String(name.to_string()))
    }

    fn get_roster_person_id(&self) -> Result<Option<String>> {
        Ok(non_empty_string(self.get_value(&["setlist", "person_id"])))
    }

    fn set_roster_person_id(&self, person_id: &str) -> Result<()> {
        self.set_value(&["setlist", "person_id"], Value::String(person_id.to_string()))
    }

    fn get_selection_mode(&self) -> Result<SelectionMode> {
        match non_empty_string(self.get_value(&["setlist", "selection"])) {
            Some(raw) => Ok(raw.parse::<SelectionMode>()?),
            None => Ok(SelectionMode::Prompt),
        }
    }

    fn set_selection_mode(&self, mode: SelectionMode) -> Result<()> {
        self.set_value(&["setlist", "selection"], Value::String(mode.as_str().to_string()))
    }

    fn get_target_date(&self) -> Result<Option<NaiveDate>> {
        match non_empty_string(self.get_value(&["setlist", "target_date"])) {
            Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map(Some)
                .map_err(|e| anyhow!("setlist.target_date `{}` is not YYYY-MM-DD: {}", raw, e)),
            None => Ok(None),
        }
    }

    fn get_roster_max_pages(&self) -> Result<Option<usize>> {
        match self.get_value(&["setlist", "roster_max_pages"]) {
            Ok(Value::Number(n)) => Ok(n.as_u64().and_then(|v| usize::try_from(v).ok())),
            _ => Ok(None),
        }
    }

    fn set_roster_max_pages(&self, max_pages: Option<usize>) -> Result<()> {
        let value = match max_pages {
            Some(max) => Value::Number(Number::from(max as u64)),
            None => Value::Null,
        };
        self.set_value(&["setlist", "roster_max_pages"], value)
    }
}

impl PlanningCenterClient {
    /// Build a client from the `planning_center` configuration section
    pub fn from_config(config: &Config) -> ClientResult<Self> {
        let (app_id, secret) = config.get_planning_center_credentials()?;

        PlanningCenterClient::builder()
            .api_base(config.get_planning_center_api_base()?)
            .credentials(app_id, secret)
            .page_size(config.get_planning_center_page_size()?)
            .timeout(config.get_planning_center_timeout()?)
            .build()
    }
}
