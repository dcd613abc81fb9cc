use serde::{Deserialize, Serialize};

use crate::app::errors::ApiError;

/// `?statSets=a,b`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatSetsQuery {
    pub stat_sets: Option<String>,
}

impl StatSetsQuery {
    pub fn stat_sets(&self) -> Result<Vec<String>, ApiError> {
        parse_stat_sets(self.stat_sets.as_deref())
    }
}

/// `?statSets=a,b&minPos=1&maxPos=10`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    pub stat_sets: Option<String>,
    pub min_pos: Option<i64>,
    pub max_pos: Option<i64>,
}

/// Validated leaderboard window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardWindow {
    pub stat_sets: Vec<String>,
    pub min_pos: u32,
    pub max_pos: u32,
}

impl LeaderboardQuery {
    pub fn validate(&self) -> Result<LeaderboardWindow, ApiError> {
        let stat_sets = parse_stat_sets(self.stat_sets.as_deref())?;

        let min_pos = self
            .min_pos
            .ok_or_else(|| ApiError::bad_request("minPos query param must be present"))?;
        let max_pos = self
            .max_pos
            .ok_or_else(|| ApiError::bad_request("maxPos query param must be present"))?;

        if min_pos < 1 {
            return Err(ApiError::bad_request("minPos must be at least 1"));
        }
        if max_pos < min_pos {
            return Err(ApiError::bad_request("maxPos must be greater than or equal to minPos"));
        }

        let to_u32 = |v: i64, name: &str| {
            u32::try_from(v).map_err(|_| ApiError::bad_request(format!("{name} is out of range")))
        };

        Ok(LeaderboardWindow {
            stat_sets,
            min_pos: to_u32(min_pos, "minPos")?,
            max_pos: to_u32(max_pos, "maxPos")?,
        })
    }
}

/// `?replaceAll=true` switches a PATCH from merge to replace.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuery {
    #[serde(default)]
    pub replace_all: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloResponse {
    pub motd: &'static str,
    pub version: &'static str,
    pub authenticated_user: Option<String>,
    pub authenticated_user_permissions: Vec<String>,
}

fn parse_stat_sets(raw: Option<&str>) -> Result<Vec<String>, ApiError> {
    let raw = raw.ok_or_else(|| ApiError::bad_request("statSets query param must be present"))?;

    let ids: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        return Err(ApiError::bad_request("statSets cannot be empty"));
    }
    Ok(ids)
}
