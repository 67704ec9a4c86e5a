// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use flota_app::{CoordinatorId, Document};
use flota_db::{PullOutcome, Store};
use flota_report::{html_digest, mail_subject, report_due};
use flota_sync::{Client, EmailMessage, SyncError};
use std::thread;
use std::time::{Duration, Instant};
use time::{Date, OffsetDateTime, PrimitiveDateTime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sending,
    Sent,
    Failed(String),
}

impl Delivery {
    pub fn label(&self) -> &str {
        match self {
            Self::Sending => "Enviando...",
            Self::Sent => "✓ Enviado",
            Self::Failed(_) => "✗ Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub coordinator_id: CoordinatorId,
    pub name: String,
    pub email: String,
    pub delivery: Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchIntervals {
    pub pull: Duration,
    pub check: Duration,
}

/// Owns the store and the sync client for commands that talk to the remote endpoint.
pub struct FleetRuntime {
    store: Store,
    client: Client,
}

impl FleetRuntime {
    pub fn new(store: Store, client: Client) -> Self {
        Self { store, client }
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn pull(&mut self) -> Result<PullOutcome> {
        self.store.pull_remote(&self.client)
    }

    /// Email every coordinator the digest for their system. Each recipient is tracked on
    /// its own; a failed send never stops the rest and nothing is retried.
    pub fn send_reports<F>(
        &self,
        document: &Document,
        today: Date,
        mut on_update: F,
    ) -> Result<Vec<Recipient>>
    where
        F: FnMut(&Recipient),
    {
        let Some(url) = document.report_settings.sync_url() else {
            return Err(SyncError::NotConfigured.into());
        };

        let subject = mail_subject(today);
        let mut recipients = Vec::with_capacity(document.coordinators.len());
        for coordinator in &document.coordinators {
            let mut recipient = Recipient {
                coordinator_id: coordinator.id.clone(),
                name: coordinator.name.clone(),
                email: coordinator.email.clone(),
                delivery: Delivery::Sending,
            };
            on_update(&recipient);

            let message = EmailMessage {
                to_email: coordinator.email.clone(),
                to_name: coordinator.name.clone(),
                subject: subject.clone(),
                html: html_digest(document, coordinator.system_id.as_ref(), today),
            };
            recipient.delivery = match self.client.send_email(url, &message) {
                Ok(()) => {
                    log::info!("sent report to {}", coordinator.email);
                    Delivery::Sent
                }
                Err(error) => {
                    log::warn!("report to {} failed: {error}", coordinator.email);
                    Delivery::Failed(error.to_string())
                }
            };
            on_update(&recipient);
            recipients.push(recipient);
        }
        Ok(recipients)
    }

    /// Record today as the last scheduled send.
    pub fn finish_scheduled_send(&mut self, today: Date) -> Result<Document> {
        let document = self.store.load()?.mark_report_sent(today);
        self.store.save(&document)?;
        Ok(document)
    }

    /// Send and mark the weekly report when the schedule says it is due. `None` when
    /// nothing was due.
    pub fn run_scheduled_check<F>(
        &mut self,
        now: PrimitiveDateTime,
        on_update: F,
    ) -> Result<Option<Vec<Recipient>>>
    where
        F: FnMut(&Recipient),
    {
        let document = self.store.load()?;
        if !report_due(&document.report_settings, now) {
            log::debug!("scheduled report not due at {now}");
            return Ok(None);
        }

        log::info!("scheduled report is due; sending");
        let recipients = self.send_reports(&document, now.date(), on_update)?;
        self.finish_scheduled_send(now.date())?;
        Ok(Some(recipients))
    }

    /// Pull once, then keep polling until `keep_running` says stop: a silent pull every
    /// `intervals.pull` and a schedule check every `intervals.check`.
    pub fn watch<K, F>(
        &mut self,
        intervals: WatchIntervals,
        keep_running: K,
        mut on_update: F,
    ) -> Result<()>
    where
        K: Fn() -> bool,
        F: FnMut(&Recipient),
    {
        self.log_pull();
        let mut last_pull = Instant::now();

        while keep_running() {
            if last_pull.elapsed() >= intervals.pull {
                self.log_pull();
                last_pull = Instant::now();
            }
            if let Err(error) = self.run_scheduled_check(now_local(), &mut on_update) {
                log::warn!("scheduled report failed: {error:#}");
            }
            if !keep_running() {
                break;
            }
            thread::sleep(intervals.check);
        }
        Ok(())
    }

    fn log_pull(&mut self) {
        match self.pull() {
            Ok(PullOutcome::Merged { changed, .. }) => {
                log::info!("background pull finished (changed: {changed})");
            }
            Ok(PullOutcome::Failed { error, .. }) => {
                log::warn!("background pull failed: {error}");
            }
            Err(error) => log::error!("background pull could not save: {error:#}"),
        }
    }
}

pub fn now_local() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    PrimitiveDateTime::new(now.date(), now.time())
}

#[cfg(test)]
mod tests {
    use super::{Delivery, FleetRuntime, WatchIntervals};
    use anyhow::{Result, anyhow};
    use flota_app::Document;
    use flota_db::{Seed, Store};
    use flota_sync::Client;
    use std::cell::Cell;
    use std::io::Read;
    use std::thread;
    use std::time::Duration;
    use time::macros::{date, datetime};
    use tiny_http::{Response, Server};

    fn runtime_with(document: &Document) -> Result<FleetRuntime> {
        let mut store = Store::open_memory(Seed::Demo);
        store.save(document)?;
        Ok(FleetRuntime::new(store, Client::new(Duration::from_secs(2))?))
    }

    fn scheduled(url: &str) -> Document {
        let mut document = Document::initial().with_sync_url(url);
        document.report_settings.enabled = true;
        document.report_settings.hour = "09:00".to_owned();
        document
    }

    /// Answers `count` relay posts, failing any whose body contains `fail_for`.
    fn relay(
        server: Server,
        count: usize,
        fail_for: Option<String>,
    ) -> thread::JoinHandle<Vec<String>> {
        thread::spawn(move || {
            let mut bodies = Vec::new();
            for _ in 0..count {
                let mut request = server.recv().expect("relay request expected");
                let mut body = String::new();
                request
                    .as_reader()
                    .read_to_string(&mut body)
                    .expect("read request body");
                let failing = fail_for
                    .as_deref()
                    .is_some_and(|needle| body.contains(needle));
                let status = if failing { 500 } else { 200 };
                request
                    .respond(Response::from_string("ok").with_status_code(status))
                    .expect("response should succeed");
                bodies.push(body);
            }
            bodies
        })
    }

    #[test]
    fn send_reports_tracks_each_recipient() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let url = format!("http://{}/exec", server.server_addr());
        let document = scheduled(&url);
        let handle = relay(server, document.coordinators.len(), None);

        let runtime = runtime_with(&document)?;
        let mut updates = Vec::new();
        let recipients = runtime.send_reports(&document, date!(2026 - 03 - 02), |recipient| {
            updates.push(recipient.delivery.clone())
        })?;
        handle.join().expect("relay thread should join");

        assert_eq!(recipients.len(), document.coordinators.len());
        assert!(recipients.iter().all(|r| r.delivery == Delivery::Sent));
        assert_eq!(updates.len(), recipients.len() * 2);
        assert_eq!(updates[0], Delivery::Sending);
        Ok(())
    }

    #[test]
    fn one_failed_recipient_does_not_block_others() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let url = format!("http://{}/exec", server.server_addr());
        let document = scheduled(&url);
        assert!(document.coordinators.len() >= 2);
        let failing = document.coordinators[0].email.replace('@', "%40");
        let handle = relay(server, document.coordinators.len(), Some(failing));

        let runtime = runtime_with(&document)?;
        let recipients = runtime.send_reports(&document, date!(2026 - 03 - 02), |_| {})?;
        handle.join().expect("relay thread should join");

        assert!(matches!(recipients[0].delivery, Delivery::Failed(_)));
        assert!(
            recipients[1..]
                .iter()
                .all(|recipient| recipient.delivery == Delivery::Sent)
        );
        Ok(())
    }

    #[test]
    fn send_reports_requires_url() -> Result<()> {
        let document = Document::initial();
        let runtime = runtime_with(&document)?;
        let error = runtime
            .send_reports(&document, date!(2026 - 03 - 02), |_| {})
            .expect_err("missing URL should fail");
        assert!(error.to_string().contains("flota link"));
        Ok(())
    }

    #[test]
    fn scheduled_check_fires_once_per_day() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let url = format!("http://{}/exec", server.server_addr());
        let document = scheduled(&url);
        let handle = relay(server, document.coordinators.len(), None);

        let mut runtime = runtime_with(&document)?;
        let monday_morning = datetime!(2026-03-02 09:30);
        let sent = runtime.run_scheduled_check(monday_morning, |_| {})?;
        handle.join().expect("relay thread should join");
        assert_eq!(
            sent.map(|recipients| recipients.len()),
            Some(document.coordinators.len())
        );
        assert_eq!(
            runtime.store_mut().load()?.report_settings.last_sent,
            Some(date!(2026 - 03 - 02))
        );

        let again = runtime.run_scheduled_check(datetime!(2026-03-02 10:00), |_| {})?;
        assert_eq!(again, None);
        Ok(())
    }

    #[test]
    fn scheduled_check_waits_for_the_hour() -> Result<()> {
        let mut runtime = runtime_with(&scheduled("http://127.0.0.1:1/exec"))?;
        let early = runtime.run_scheduled_check(datetime!(2026-03-02 08:59), |_| {})?;
        assert_eq!(early, None);
        let tuesday = runtime.run_scheduled_check(datetime!(2026-03-03 09:30), |_| {})?;
        assert_eq!(tuesday, None);
        Ok(())
    }

    #[test]
    fn watch_stops_when_asked() -> Result<()> {
        let mut document = Document::initial();
        document.report_settings.enabled = false;
        let mut runtime = runtime_with(&document)?;
        let calls = Cell::new(0);
        runtime.watch(
            WatchIntervals {
                pull: Duration::from_secs(60),
                check: Duration::from_millis(1),
            },
            || {
                calls.set(calls.get() + 1);
                calls.get() < 3
            },
            |_| {},
        )?;
        assert_eq!(calls.get(), 3);
        Ok(())
    }
}
