//! Live simulation loop: a seeded price/pattern feed drives the tracker
//! actor while a reader polls statistics, the way a dashboard would.

use anyhow::Result;
use serde_json::json;
use tokio::time::{interval, Duration};

use patterntrack::config::{SimConfig, TrackerConfig};
use patterntrack::feed::{FeedSource, SimulatedFeed};
use patterntrack::logging::{self, log, obj, v_num, v_str, Domain, Level};
use patterntrack::{Clock, PatternStore, SystemClock, TrackerError, TrackerHandle};

/// Push every record from `feed` into the tracker, one per `every`.
async fn drive<F>(feed: &mut F, handle: &TrackerHandle, every: Duration) -> Result<u64, TrackerError>
where
    F: FeedSource + ?Sized,
{
    let mut ticker = interval(every);
    let mut applied = 0u64;
    let mut records = 0u64;

    while let Some(record) = feed.next_record().await {
        ticker.tick().await;
        records += 1;
        for event in record.into_events(SystemClock.now_ms()) {
            match handle.apply(event).await {
                Ok(_) => applied += 1,
                Err(TrackerError::StoreClosed) => return Err(TrackerError::StoreClosed),
                // Already logged by the store; keep going with the next record
                Err(_) => {}
            }
        }
    }
    log(
        Level::Info,
        Domain::Feed,
        "exhausted",
        obj(&[("source", v_str(feed.name())), ("records", json!(records))]),
    );
    Ok(applied)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = TrackerConfig::from_env();
    let sim = SimConfig::from_env();

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("instrument", v_str(&cfg.instrument)),
            ("seed", json!(sim.seed)),
            ("ticks", json!(sim.ticks)),
            ("start_price", v_num(sim.start_price)),
            ("min_confidence", v_num(cfg.min_confidence)),
        ]),
    );

    let (handle, task) = TrackerHandle::spawn(PatternStore::new(cfg), sim.channel_capacity);

    let producer = {
        let handle = handle.clone();
        let mut feed = SimulatedFeed::new(sim.seed, sim.start_price, sim.ticks);
        let every = sim.tick_interval();
        tokio::spawn(async move { drive(&mut feed, &handle, every).await })
    };

    let reader = {
        let handle = handle.clone();
        let every = sim.stats_interval();
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Ok(stats) = handle.stats().await else { break };
                log(
                    Level::Info,
                    Domain::Stats,
                    "snapshot",
                    obj(&[
                        ("total", json!(stats.total)),
                        ("pending", json!(stats.pending)),
                        ("win_rate", v_num(stats.win_rate)),
                        ("avg_pnl", v_num(stats.avg_pnl)),
                    ]),
                );
            }
        })
    };

    let applied = producer.await??;
    reader.abort();
    let _ = reader.await;
    drop(handle);
    let store = task.await?;

    let stats = store.stats();
    logging::log_stats_summary(store.instrument(), &stats);
    log(
        Level::Info,
        Domain::System,
        "shutdown",
        obj(&[("events_applied", json!(applied))]),
    );

    let recent: Vec<_> = store.recent_resolved(5).into_iter().cloned().collect();
    let report = json!({
        "instrument": store.instrument(),
        "events_applied": applied,
        "state_hash": format!("{:016x}", store.state().hash()),
        "stats": stats,
        "recent_resolved": recent,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
