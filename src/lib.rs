pub mod clock;
pub mod config;
pub mod error;
pub mod event_log;
pub mod monitor;
pub mod probe;
pub mod report;
pub mod website;

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeDelta};
    use tokio_util::sync::CancellationToken;

    use crate::clock::ManualClock;
    use crate::error::ProbeError;
    use crate::event_log::{read_events, EventLog};
    use crate::monitor::WebsiteMonitor;
    use crate::probe::Prober;
    use crate::report::{format_downtime, format_uptime, generate, write_csv};
    use crate::website::CheckStatus;

    /// Outcome per URL keyed by cycle number; anything unlisted is up.
    struct Outage {
        down_cycles: HashMap<&'static str, Vec<usize>>,
        seen: Mutex<HashMap<String, usize>>,
    }

    #[async_trait]
    impl Prober for Outage {
        async fn probe(&self, url: &str) -> CheckStatus {
            let mut seen = self.seen.lock().unwrap();
            let cycle = seen.entry(url.to_string()).or_insert(0);
            let current = *cycle;
            *cycle += 1;
            let down = self
                .down_cycles
                .get(url)
                .is_some_and(|cycles| cycles.contains(&current));
            if down {
                CheckStatus::Down(ProbeError::HttpStatus("502 Bad Gateway".to_string()))
            } else {
                CheckStatus::Up
            }
        }
    }

    #[tokio::test]
    async fn test_monitor_log_report_flow() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("site_monitoring.log");

        let sites = vec![
            "https://www.sberbank.ru".to_string(),
            "https://www.vtb.ru".to_string(),
        ];
        // vtb is down for cycles 10..40 of one-minute cycles starting at 00:00
        let prober = Outage {
            down_cycles: HashMap::from([("https://www.vtb.ru", (10..40).collect())]),
            seen: Mutex::new(HashMap::new()),
        };
        let clock = ManualClock::new(day.and_hms_opt(0, 0, 0).unwrap());
        let mut monitor = WebsiteMonitor::with_clock(prober, EventLog::new(&log_path), clock);
        for site in &sites {
            monitor.add_website(site.clone());
        }

        let summary = monitor
            .run(
                Duration::from_secs(60),
                Duration::from_secs(3_600),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(summary.cycles, 60);
        assert_eq!(summary.transitions, 2);

        let events = read_events(&log_path).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.endpoint == "https://www.vtb.ru"));

        let rows = generate(&log_path, day, &sites).await.unwrap();
        assert_eq!(rows[0].total_downtime, TimeDelta::zero());
        // probed 30 s into each cycle
        assert_eq!(
            rows[1].intervals[0].start,
            day.and_hms_opt(0, 10, 30).unwrap()
        );
        assert_eq!(rows[1].total_downtime, TimeDelta::minutes(30));
        assert_eq!(format_uptime(rows[1].uptime_percent), "97.92%");
        assert_eq!(format_downtime(rows[1].total_downtime), "0:30:00");

        let report = write_csv(&rows, dir.path(), day).unwrap();
        assert!(report.exists());
    }
}
