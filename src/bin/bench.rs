//! Benchmark for timetable generation on demo data.
//!
//! Run with: cargo run --release --bin bench -- [SMALL|LARGE] [MAX_BACKTRACKS]

use std::collections::BTreeMap;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use u_timetable::audit::audit_timetable;
use u_timetable::demo::{self, DemoSize};
use u_timetable::engine::TimetableKpi;
use u_timetable::worker::{TimetableWorker, WorkerEvent};
use u_timetable::EngineConfig;

const DEFAULT_MAX_BACKTRACKS: u64 = 200_000;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("u_timetable=info".parse().unwrap()))
        .init();

    let mut args = std::env::args().skip(1);
    let size = args
        .next()
        .and_then(|s| s.parse::<DemoSize>().ok())
        .unwrap_or(DemoSize::Large);
    let max_backtracks = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_MAX_BACKTRACKS);

    let request = demo::generate(size);
    println!("Benchmark: Timetable Generation ({})", size.as_str());
    println!("  Class groups: {}", request.class_groups.len());
    println!("  Teachers: {}", request.teachers.len());
    println!("  Allocations: {}", request.allocations.len());
    println!("  Locked lessons: {}", request.locked_lessons.len());
    println!();

    let config = EngineConfig::default()
        .with_progress_interval(10)
        .with_max_backtracks(max_backtracks);
    let mut worker = TimetableWorker::spawn(config).expect("worker starts");

    let start = Instant::now();
    let run = worker.start(request.clone()).expect("worker accepts run");
    let mut progress_events = 0u64;
    let mut furthest = (0, 0);
    let result = loop {
        match worker.recv().expect("worker alive") {
            WorkerEvent::Progress { progress, .. } => {
                progress_events += 1;
                if progress.placed() >= furthest.0 {
                    furthest = (progress.placed(), progress.total());
                }
            }
            WorkerEvent::Finished { run: r, result } if r == run => break result,
            WorkerEvent::Cancelled { .. } => {
                println!("Run cancelled");
                return;
            }
            WorkerEvent::Failed { message, .. } => {
                println!("Run failed: {message}");
                return;
            }
            WorkerEvent::Finished { .. } => {}
        }
    };
    let elapsed = start.elapsed();
    worker.shutdown().expect("worker shuts down");

    let kpi = TimetableKpi::calculate(&request, &result);
    let audit = audit_timetable(&request, &result.timetable);

    println!("Results:");
    println!("  Time: {:.2?}", elapsed);
    println!("  Lessons placed: {}/{}", result.lessons_placed, result.lessons_total);
    println!("  Backtracks: {}", result.backtracks);
    println!("  Progress events received: {}", progress_events);
    println!("  Deepest progress seen: {}/{}", furthest.0, furthest.1);
    println!("  Conflicts: {}", result.conflicts.len());
    let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
    for conflict in &result.conflicts {
        *by_kind.entry(conflict.kind.as_str()).or_insert(0) += 1;
    }
    for (kind, count) in &by_kind {
        println!("    {kind}: {count}");
    }
    println!("  Skipped inputs: {}", result.skipped.len());
    println!("  Scheduled periods: {}", kpi.scheduled_periods);
    println!("  Placement rate: {:.1}%", kpi.placement_rate * 100.0);
    println!("  Avg fill rate: {:.1}%", kpi.avg_fill_rate * 100.0);
    println!("  Peak teacher day: {} periods", kpi.max_daily_load());
    assert!(audit.is_empty(), "audit found {} conflicts", audit.len());
    println!("  Audit: clean (verified)");
}
