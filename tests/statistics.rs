// tests/statistics.rs
//
// Summaries, bucket boundaries, look-back windows and concurrent appends.

use std::sync::Arc;
use std::time::Duration;

use api_aggregator::clock::ManualClock;
use api_aggregator::StatisticsRecorder;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[test]
fn summary_per_source_matches_recorded_calls() {
    let stats = StatisticsRecorder::new();
    stats.record("GitHub", ms(80));
    stats.record("GitHub", ms(150));
    stats.record("GitHub", ms(250));
    stats.record("NewsAPI", ms(90));

    let all = stats.get_statistics();
    assert_eq!(all.len(), 2);

    let gh = all["GitHub"];
    assert_eq!(gh.total_requests, 3);
    assert!((gh.average_ms - 160.0).abs() < 1e-9);
    assert_eq!((gh.fast_count, gh.average_count, gh.slow_count), (1, 1, 1));

    let news = all["NewsAPI"];
    assert_eq!(news.total_requests, 1);
    assert_eq!((news.fast_count, news.average_count, news.slow_count), (1, 0, 0));
}

#[test]
fn empty_recorder_reports_nothing() {
    let stats = StatisticsRecorder::new();
    assert!(stats.get_statistics().is_empty());
    assert!(stats.get_recent_stats("GitHub", Duration::from_secs(300)).is_empty());
}

#[test]
fn recent_window_only_returns_calls_inside_the_period() {
    let clock = Arc::new(ManualClock::starting_now());
    let stats = StatisticsRecorder::with_clock(clock.clone());

    stats.record("NewsAPI", ms(40));
    clock.advance(Duration::from_secs(10 * 60));
    stats.record("NewsAPI", ms(60));
    clock.advance(Duration::from_secs(60));
    stats.record("NewsAPI", ms(70));
    stats.record("GitHub", ms(500));

    let recent = stats.get_recent_stats("NewsAPI", Duration::from_secs(5 * 60));
    let durations: Vec<_> = recent.iter().map(|r| r.duration).collect();
    assert_eq!(durations, [ms(60), ms(70)]);
    assert!(recent.iter().all(|r| r.source == "NewsAPI"));

    // all-time summary still sees every call
    assert_eq!(stats.get_statistics()["NewsAPI"].total_requests, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_records_are_all_kept() {
    let stats = Arc::new(StatisticsRecorder::new());
    let mut handles = Vec::new();
    for task in 0..8u64 {
        let stats = stats.clone();
        handles.push(tokio::spawn(async move {
            let source = if task % 2 == 0 { "GitHub" } else { "NewsAPI" };
            for i in 0..250u64 {
                stats.record(source, ms(i % 300));
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let all = stats.get_statistics();
    assert_eq!(all["GitHub"].total_requests, 1000);
    assert_eq!(all["NewsAPI"].total_requests, 1000);
    let gh = all["GitHub"];
    assert_eq!(gh.fast_count + gh.average_count + gh.slow_count, 1000);
}

#[test]
fn statistics_serialize_in_camel_case() {
    let stats = StatisticsRecorder::new();
    stats.record("GitHub", ms(120));
    let v = serde_json::to_value(stats.get_statistics()).unwrap();
    assert_eq!(v["GitHub"]["totalRequests"], 1);
    assert_eq!(v["GitHub"]["averageCount"], 1);
    assert!(v["GitHub"].get("total_requests").is_none());
}
