use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::MonitorError;
use crate::event_log::{Event, EventMessage, EventSink};
use crate::probe::Prober;
use crate::website::{CheckStatus, Website};

/// Totals for one pass over every endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub probes: usize,
    pub transitions: usize,
    pub cancelled: bool,
}

/// Totals for a whole monitoring run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: usize,
    pub probes: usize,
    pub transitions: usize,
    pub cancelled: bool,
}

/// Probes endpoints in a fixed order and records every up/down flip.
pub struct WebsiteMonitor<P, S, C = SystemClock> {
    websites: Vec<Website>,
    prober: P,
    sink: S,
    clock: C,
}

impl<P: Prober, S: EventSink> WebsiteMonitor<P, S, SystemClock> {
    pub fn new(prober: P, sink: S) -> Self {
        Self::with_clock(prober, sink, SystemClock)
    }
}

impl<P: Prober, S: EventSink, C: Clock> WebsiteMonitor<P, S, C> {
    pub fn with_clock(prober: P, sink: S, clock: C) -> Self {
        WebsiteMonitor {
            websites: Vec::new(),
            prober,
            sink,
            clock,
        }
    }

    pub fn websites(&self) -> &[Website] {
        &self.websites
    }

    /// Registers an endpoint. It starts out as up; duplicates are ignored.
    pub fn add_website(&mut self, url: impl Into<String>) {
        let url = url.into();
        if self.websites.iter().any(|w| w.url == url) {
            return;
        }
        self.websites.push(Website::new(url));
    }

    pub async fn check_website(&self, url: &str) -> CheckStatus {
        self.prober.probe(url).await
    }

    /// Applies one probe outcome to the endpoint at `index` and records the
    /// transition, if any.
    ///
    /// The new state is only kept once the event has been written, so a
    /// failed write leaves the endpoint ready to report the same flip again.
    pub async fn observe(
        &mut self,
        index: usize,
        status: &CheckStatus,
    ) -> Result<Option<Event>, MonitorError> {
        let Some(website) = self.websites.get(index) else {
            return Ok(None);
        };
        let mut next = website.clone();
        let Some(message) = next.observe(status) else {
            return Ok(None);
        };

        let event = Event {
            timestamp: self.clock.now(),
            endpoint: next.url.clone(),
            message,
        };
        self.sink.append(&event).await?;

        match &event.message {
            EventMessage::Down(reason) => warn!(url = %event.endpoint, %reason, "site unavailable"),
            EventMessage::Restored => info!(url = %event.endpoint, "site restored"),
        }
        self.websites[index] = next;
        Ok(Some(event))
    }

    /// Probes every endpoint once, pausing `period / n` after each probe so
    /// the whole cycle takes about `period`.
    pub async fn run_cycle(
        &mut self,
        period: Duration,
        cancel: &CancellationToken,
    ) -> Result<CycleSummary, MonitorError> {
        self.cycle(period, cancel, None).await
    }

    /// Runs cycles until `duration` has passed on the monitor's clock or the
    /// token is cancelled. A write failure ends the run with an error.
    pub async fn run(
        &mut self,
        period: Duration,
        duration: Duration,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, MonitorError> {
        if self.websites.is_empty() {
            return Err(MonitorError::NoEndpoints);
        }

        let started = self.clock.now();
        let deadline = TimeDelta::from_std(duration)
            .ok()
            .and_then(|d| started.checked_add_signed(d));
        info!(
            sites = self.websites.len(),
            period_secs = period.as_secs_f64(),
            duration_secs = duration.as_secs(),
            "monitoring started"
        );

        let mut summary = RunSummary::default();
        while !self.expired(deadline) {
            let cycle = self.cycle(period, cancel, deadline).await?;
            summary.cycles += 1;
            summary.probes += cycle.probes;
            summary.transitions += cycle.transitions;
            debug!(
                cycle = summary.cycles,
                probes = cycle.probes,
                transitions = cycle.transitions,
                "cycle finished"
            );
            if cycle.cancelled {
                summary.cancelled = true;
                break;
            }
        }

        info!(
            cycles = summary.cycles,
            probes = summary.probes,
            transitions = summary.transitions,
            cancelled = summary.cancelled,
            "monitoring stopped"
        );
        Ok(summary)
    }

    fn expired(&self, deadline: Option<NaiveDateTime>) -> bool {
        deadline.is_some_and(|deadline| self.clock.now() >= deadline)
    }

    async fn cycle(
        &mut self,
        period: Duration,
        cancel: &CancellationToken,
        deadline: Option<NaiveDateTime>,
    ) -> Result<CycleSummary, MonitorError> {
        if self.websites.is_empty() {
            return Err(MonitorError::NoEndpoints);
        }
        let pause = period / self.websites.len() as u32;
        let mut summary = CycleSummary::default();

        for index in 0..self.websites.len() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            if self.expired(deadline) {
                break;
            }

            let url = self.websites[index].url.clone();
            debug!(url = %url, "checking site");
            let status = self.check_website(&url).await;
            summary.probes += 1;
            if self.observe(index, &status).await?.is_some() {
                summary.transitions += 1;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    summary.cancelled = true;
                    break;
                }
                _ = self.clock.sleep(pause) => {}
            }
        }
        Ok(summary)
    }
}
