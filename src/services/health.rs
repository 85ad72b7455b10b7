//! Readiness checks.
//!
//! - `sqlite`: runs `SELECT 1` against the metadata database
//! - `storage_service`: the configured storage service answers HTTP at all
//!   (any status counts; only connection failures are reported)

use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct ReadyReport {
    pub status: String,
    pub checks: BTreeMap<&'static str, CheckStatus>,
}

impl ReadyReport {
    pub fn is_ready(&self) -> bool {
        self.checks.values().all(|check| check.ok)
    }
}

#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub ok: bool,
    pub error: Option<String>,
}

impl CheckStatus {
    fn from_result(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self {
                ok: true,
                error: None,
            },
            Err(error) => Self {
                ok: false,
                error: Some(error),
            },
        }
    }
}

pub async fn check_readiness(
    db: &SqlitePool,
    client: &reqwest::Client,
    api_url: &str,
) -> ReadyReport {
    let sqlite_check = match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(db).await {
        Ok(1) => Ok(()),
        Ok(v) => Err(format!("unexpected result: {}", v)),
        Err(e) => Err(format!("error: {}", e)),
    };

    let service_check = match client.get(api_url).send().await {
        Ok(_) => Ok(()),
        Err(e) => Err(format!("unreachable: {}", e)),
    };

    let mut checks = BTreeMap::new();
    checks.insert("sqlite", CheckStatus::from_result(sqlite_check));
    checks.insert("storage_service", CheckStatus::from_result(service_check));

    let status = if checks.values().all(|check| check.ok) {
        "ok"
    } else {
        "error"
    };
    ReadyReport {
        status: status.into(),
        checks,
    }
}
