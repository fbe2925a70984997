//! Which routes and stops the board shows.
//!
//! Stored as a JSON object on disk:
//! ```json
//! {
//!   "routes": [
//!     { "route_id": "4", "sign_code": "BERRYESSA", "equipment": "6-CAR, 2-DOOR" },
//!     { "route_id": "7", "sign_code": "MILLBRAE", "equipment": "6-CAR, 2-DOOR",
//!       "service_id": "2024_01_15-DX-MVS-Weekday-01" }
//!   ],
//!   "stops": ["NBRK"],
//!   "arrivals": 2
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ARRIVALS: usize = 2;

/// A route to display and the label riders see for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteQuery {
    pub route_id: String,
    pub sign_code: String,
    /// Second display line for this route, e.g. the train consist.
    pub equipment: String,
    /// Restricts trips to a single service calendar when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
}

impl RouteQuery {
    pub fn new(route_id: &str, sign_code: &str, equipment: &str) -> Self {
        Self {
            route_id: route_id.to_string(),
            sign_code: sign_code.to_string(),
            equipment: equipment.to_string(),
            service_id: None,
        }
    }

    pub fn with_service(mut self, service_id: &str) -> Self {
        self.service_id = Some(service_id.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub routes: Vec<RouteQuery>,
    pub stops: Vec<String>,
    /// Arrivals shown per route and stop.
    #[serde(default = "default_arrivals")]
    pub arrivals: usize,
}

fn default_arrivals() -> usize {
    DEFAULT_ARRIVALS
}

impl BoardConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read board config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("invalid board config {}", path.display()))?;
        Ok(config)
    }
}

impl Default for BoardConfig {
    /// Southbound Orange and Red lines at North Berkeley.
    fn default() -> Self {
        Self {
            routes: vec![
                RouteQuery::new("4", "BERRYESSA", "6-CAR, 2-DOOR"),
                RouteQuery::new("7", "MILLBRAE", "6-CAR, 2-DOOR"),
            ],
            stops: vec!["NBRK".to_string()],
            arrivals: DEFAULT_ARRIVALS,
        }
    }
}
