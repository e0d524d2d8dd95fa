use crate::collectors::services::{collect_pihole, collect_pivpn, ServiceProbe};
use crate::collectors::system::{collect_system, new_sampler};
use crate::collectors::CollectError;
use crate::config::Config;
use crate::runner::CommandRunner;
use crate::state::{ServiceStatus, Snapshot, SnapshotStore, SystemRecord};
use std::sync::Arc;
use sysinfo::System;
use tokio::sync::watch;
use tokio::task;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// The only writer of the [`SnapshotStore`].
pub struct Poller {
    cfg: Arc<Config>,
    runner: Arc<dyn CommandRunner>,
    store: Arc<SnapshotStore>,
    sampler: Option<System>,
}

struct CycleOutput {
    system: SystemRecord,
    pihole: ServiceStatus,
    pivpn: ServiceStatus,
}

impl Poller {
    pub fn new(cfg: Arc<Config>, runner: Arc<dyn CommandRunner>, store: Arc<SnapshotStore>) -> Self {
        Self {
            cfg,
            runner,
            store,
            sampler: None,
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.cfg.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("poll loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }
    }

    // A failed cycle republishes the previous data with `last_error` set.
    pub async fn poll_once(&mut self) {
        let previous = self.store.read();
        let next = match self.collect().await {
            Ok(out) => Snapshot {
                system: Some(out.system),
                pihole: Some(out.pihole),
                pivpn: Some(out.pivpn),
                last_error: previous.last_error.clone(),
            },
            Err(err) => {
                warn!(error = %err, "collection cycle failed");
                Snapshot {
                    last_error: Some(err.to_string()),
                    ..(*previous).clone()
                }
            }
        };
        self.store.publish(next);
        debug!("snapshot published");
    }

    async fn collect(&mut self) -> Result<CycleOutput, CollectError> {
        let probe = ServiceProbe {
            service_manager_command: self.cfg.service_manager_command.clone(),
            timeout: self.cfg.command_timeout(),
        };

        let mut sampler = self.sampler.take().unwrap_or_else(new_sampler);
        let system_cfg = self.cfg.system.clone();
        let system_task = task::spawn_blocking(move || {
            let record = collect_system(&mut sampler, &system_cfg);
            (sampler, record)
        });

        let pihole_task = {
            let runner = self.runner.clone();
            let cfg = self.cfg.clone();
            let probe = probe.clone();
            task::spawn(async move { collect_pihole(runner.as_ref(), &probe, &cfg.pihole).await })
        };

        let pivpn_task = {
            let runner = self.runner.clone();
            let cfg = self.cfg.clone();
            task::spawn(async move { collect_pivpn(runner.as_ref(), &probe, &cfg.pivpn).await })
        };

        let (system, pihole, pivpn) = tokio::join!(system_task, pihole_task, pivpn_task);

        // A sampler lost to a panic is rebuilt on the next cycle.
        let system = match system {
            Ok((sampler, record)) => {
                self.sampler = Some(sampler);
                record
            }
            Err(err) => return Err(CollectError::from_join("system", err)),
        };
        let pihole = pihole.map_err(|err| CollectError::from_join("pihole", err))?;
        let pivpn = pivpn.map_err(|err| CollectError::from_join("pivpn", err))?;

        Ok(CycleOutput {
            system,
            pihole,
            pivpn,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::scripted::ScriptedRunner;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn test_config() -> Arc<Config> {
        let mut cfg = Config::default();
        cfg.interval_secs = 1;
        cfg.system.temperature_paths = vec![PathBuf::from("/nonexistent/temp")];
        Arc::new(cfg)
    }

    /// Panics on the first pivpn client listing, then behaves.
    struct FlakyRunner {
        inner: ScriptedRunner,
        tripped: AtomicBool,
    }

    #[async_trait]
    impl CommandRunner for FlakyRunner {
        async fn run(&self, argv: &[String], timeout: Duration) -> String {
            if argv.first().map(String::as_str) == Some("pivpn")
                && !self.tripped.swap(true, Ordering::SeqCst)
            {
                panic!("pivpn listing blew up");
            }
            self.inner.run(argv, timeout).await
        }
    }

    #[tokio::test]
    async fn successful_cycle_publishes_all_parts() {
        let store = Arc::new(SnapshotStore::new());
        let runner = ScriptedRunner::new()
            .reply("systemctl is-active pihole-FTL.service", "active")
            .reply("pihole -c -j", r#"{"dns_queries_today": 42}"#)
            .reply("pivpn -c", "h1\nh2\nh3\nphone\nlaptop");
        let mut poller = Poller::new(test_config(), Arc::new(runner), store.clone());

        poller.poll_once().await;

        let snap = store.read();
        assert!(snap.system.is_some());
        let pihole = snap.pihole.as_ref().unwrap();
        assert!(pihole.service_ok);
        assert_eq!(pihole.stats["dns_queries_today"], Some(42.0));
        let pivpn = snap.pivpn.as_ref().unwrap();
        assert!(!pivpn.service_ok);
        assert_eq!(pivpn.connected_clients, Some(2));
        assert_eq!(snap.last_error, None);
    }

    #[tokio::test]
    async fn panicking_collector_is_recorded_and_loop_recovers() {
        let store = Arc::new(SnapshotStore::new());
        let runner = FlakyRunner {
            inner: ScriptedRunner::new().reply("pivpn -c", "h1\nh2\nh3\nphone"),
            tripped: AtomicBool::new(false),
        };
        let mut poller = Poller::new(test_config(), Arc::new(runner), store.clone());

        poller.poll_once().await;
        let failed = store.read();
        assert!(failed.system.is_none());
        assert!(failed.pivpn.is_none());
        let err = failed.last_error.as_deref().unwrap();
        assert!(err.contains("pivpn collector panicked"), "{err}");
        assert!(err.contains("pivpn listing blew up"), "{err}");

        poller.poll_once().await;
        let recovered = store.read();
        assert!(recovered.system.is_some());
        assert_eq!(recovered.pivpn.as_ref().unwrap().connected_clients, Some(1));
        assert_eq!(recovered.last_error, failed.last_error);
    }

    #[tokio::test]
    async fn run_publishes_immediately_and_stops_on_shutdown() {
        let store = Arc::new(SnapshotStore::new());
        let mut published = store.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller = Poller::new(test_config(), Arc::new(ScriptedRunner::new()), store.clone());
        let handle = tokio::spawn(poller.run(shutdown_rx));

        tokio::time::timeout(Duration::from_secs(10), published.changed())
            .await
            .expect("first cycle in time")
            .expect("store alive");
        assert!(store.read().system.is_some());

        shutdown_tx.send(true).expect("poller listening");
        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("poller stops")
            .expect("poller did not panic");
    }
}
