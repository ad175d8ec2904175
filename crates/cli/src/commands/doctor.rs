use std::time::Duration;

use serde::Serialize;

use concierge_core::config::{AppConfig, LoadOptions};
use concierge_db::connect_with_settings;
use concierge_db::repositories::{
    RestaurantRepository, SqlFulfillmentQueue, SqlRestaurantRepository,
};

#[derive(Debug, Serialize)]
struct DoctorReport {
    status: &'static str,
    checks: Vec<DoctorCheck>,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: &'static str,
    detail: String,
}

impl DoctorCheck {
    fn ok(name: &'static str, detail: impl Into<String>) -> Self {
        Self { name, status: "ok", detail: detail.into() }
    }

    fn failed(name: &'static str, detail: impl Into<String>) -> Self {
        Self { name, status: "failed", detail: detail.into() }
    }
}

pub fn run(json: bool) -> String {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::ok("config", "configuration loaded and validated"));
            Some(config)
        }
        Err(error) => {
            checks.push(DoctorCheck::failed("config", error.to_string()));
            None
        }
    };

    if let Some(config) = config {
        match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime.block_on(async {
                match connect_with_settings(
                    &config.database.url,
                    config.database.max_connections,
                    config.database.timeout_secs,
                )
                .await
                {
                    Ok(pool) => {
                        checks.push(DoctorCheck::ok("database", "connection established"));

                        let restaurants = SqlRestaurantRepository::new(pool.clone());
                        match restaurants.count().await {
                            Ok(count) => checks.push(DoctorCheck::ok(
                                "store",
                                format!("{count} restaurants ingested"),
                            )),
                            Err(error) => checks.push(DoctorCheck::failed(
                                "store",
                                format!("{error}; run `concierge migrate` if the schema is missing"),
                            )),
                        }

                        let queue = SqlFulfillmentQueue::new(
                            pool.clone(),
                            Duration::from_secs(config.worker.visibility_timeout_secs),
                        );
                        match queue.depth().await {
                            Ok(depth) => checks.push(DoctorCheck::ok(
                                "queue",
                                format!("{depth} fulfillment messages queued"),
                            )),
                            Err(error) => {
                                checks.push(DoctorCheck::failed("queue", error.to_string()))
                            }
                        }

                        pool.close().await;
                    }
                    Err(error) => {
                        checks.push(DoctorCheck::failed("database", error.to_string()));
                    }
                }
            }),
            Err(error) => {
                checks.push(DoctorCheck::failed("runtime", error.to_string()));
            }
        }
    }

    let status =
        if checks.iter().all(|check| check.status == "ok") { "ready" } else { "degraded" };
    let report = DoctorReport { status, checks };

    if json {
        serde_json::to_string_pretty(&report)
            .unwrap_or_else(|error| format!("{{\"status\":\"error\",\"message\":\"{error}\"}}"))
    } else {
        let mut lines = vec![format!("status: {}", report.status)];
        for check in &report.checks {
            lines.push(format!("  {}: {} - {}", check.name, check.status, check.detail));
        }
        lines.join("\n")
    }
}
