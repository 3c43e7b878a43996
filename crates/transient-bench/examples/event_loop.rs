//! Event-loop scratch memory walkthrough.
//!
//! Runs the reference profile with logging enabled and prints arena usage
//! after each batch. Try `RUST_LOG=transient_arena=trace`.

use tracing_subscriber::EnvFilter;
use transient_arena::{ArenaConfig, TransientArena};
use transient_bench::{run_event_profile, EventProfile};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let profile = EventProfile::reference(42);
    let mut arena = TransientArena::new(
        ArenaConfig::new(profile.arena_size()).with_label("event-loop"),
    )?;

    for batch in 0..5 {
        let report = run_event_profile(&mut arena, &profile)?;
        println!(
            "batch {batch}: {} events, {} buffers, {} bytes, high water {} / {}",
            report.events,
            report.allocations,
            report.bytes,
            report.high_water,
            arena.capacity()
        );
    }
    println!("{}", arena.usage());
    Ok(())
}
