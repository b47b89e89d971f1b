//! Replay a JSONL feed from stdin through the tracker and print the final
//! statistics. Identical input always yields the same `state_hash`.

use std::io::{self, Cursor, Read};

use anyhow::Result;
use serde_json::json;
use sha2::{Digest, Sha256};

use patterntrack::clock::ManualClock;
use patterntrack::config::TrackerConfig;
use patterntrack::feed::{FeedSource, JsonlFeed};
use patterntrack::logging::{self, log, obj, v_str, Domain, Level};
use patterntrack::stats::ResultFilter;
use patterntrack::PatternStore;

fn main() -> Result<()> {
    let mut input = Vec::new();
    io::stdin().lock().read_to_end(&mut input)?;
    let input_sha256 = hex::encode(Sha256::digest(&input));

    let clock = ManualClock::new(0);
    let mut store = PatternStore::with_clock(TrackerConfig::from_env(), clock.clone());
    let mut feed = JsonlFeed::new("stdin", Cursor::new(input));
    log(
        Level::Info,
        Domain::Feed,
        "replay_start",
        obj(&[
            ("source", v_str(feed.name())),
            ("instrument", v_str(store.instrument())),
            ("input_sha256", v_str(&input_sha256)),
        ]),
    );

    let mut records = 0u64;
    let mut rejected = 0u64;
    // Records without their own ts inherit the last one seen
    let mut last_ts = 0u64;

    while let Some(record) = feed.next_blocking() {
        records += 1;
        if let Some(ts) = record.ts() {
            last_ts = last_ts.max(ts);
            clock.set(last_ts);
        }
        for event in record.into_events(last_ts) {
            if store.apply(event).is_err() {
                rejected += 1;
            }
        }
    }

    let stats = store.stats();
    logging::log_stats_summary(store.instrument(), &stats);

    let failed: Vec<&str> = store
        .filter(ResultFilter::Failure)
        .into_iter()
        .map(|e| e.id.as_str())
        .collect();
    let report = json!({
        "instrument": store.instrument(),
        "records": records,
        "rejected_events": rejected,
        "skipped_lines": feed.skipped(),
        "input_sha256": input_sha256,
        "state_hash": format!("{:016x}", store.state().hash()),
        "stats": stats,
        "failed": failed,
        "entries": store.entries(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
