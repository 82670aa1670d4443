//! End-to-end tests for timer aggregation and per-rank log output.

use anyhow::Result;
use hipmark::{EventTimer, ProfilerConfig, TimerRegistry};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn finished_timer(name: &str, config: &ProfilerConfig) -> EventTimer {
    let mut timer = EventTimer::new(name, config).unwrap();
    timer.start().unwrap();
    timer.stop().unwrap();
    timer
}

/// Parse `<iteration> <name> <elapsed_ms>` lines, keeping the elapsed field
/// only as a validity check since its value varies run to run.
fn read_lines(path: &Path) -> Vec<(i64, String)> {
    let text = fs::read_to_string(path).unwrap();
    text.lines()
        .map(|line| {
            let fields: Vec<&str> = line.split(' ').collect();
            assert_eq!(fields.len(), 3, "malformed line: {:?}", line);
            let ms: f32 = fields[2].parse().unwrap();
            assert!(ms >= 0.0);
            (fields[0].parse().unwrap(), fields[1].to_string())
        })
        .collect()
}

#[test]
fn output_writes_one_line_per_timer_in_append_order() -> Result<()> {
    let dir = TempDir::new()?;
    let config = ProfilerConfig::default()
        .with_log_path(dir.path())
        .with_ranks(0, 1);

    let mut registry = TimerRegistry::new();
    registry.append(finished_timer("embed", &config));
    registry.append(finished_timer("matmul", &config));
    registry.set_iteration(1);
    registry.extend(vec![
        finished_timer("matmul", &config),
        finished_timer("softmax", &config),
    ]);

    registry.output(&config)?;

    let lines = read_lines(&dir.path().join("NVTE_TP_0_1.txt"));
    assert_eq!(
        lines,
        vec![
            (0, "embed".to_string()),
            (0, "matmul".to_string()),
            (1, "matmul".to_string()),
            (1, "softmax".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn output_file_is_namespaced_by_rank() -> Result<()> {
    let dir = TempDir::new()?;
    let config = ProfilerConfig::default()
        .with_log_path(dir.path())
        .with_ranks(3, 2);

    let mut registry = TimerRegistry::new();
    registry.append(finished_timer("matmul", &config));
    registry.output(&config)?;

    assert!(dir.path().join("NVTE_TP_3_2.txt").exists());
    Ok(())
}

#[test]
fn default_ranks_appear_in_file_name() -> Result<()> {
    let dir = TempDir::new()?;
    let config = ProfilerConfig::default().with_log_path(dir.path());

    let mut registry = TimerRegistry::new();
    registry.append(finished_timer("matmul", &config));
    registry.output(&config)?;

    assert!(dir.path().join("NVTE_TP_-1_-1.txt").exists());
    Ok(())
}

#[test]
fn repeated_output_re_emits_full_history() -> Result<()> {
    let dir = TempDir::new()?;
    let config = ProfilerConfig::default()
        .with_log_path(dir.path())
        .with_ranks(0, 0);

    let mut registry = TimerRegistry::new();
    registry.append(finished_timer("a", &config));
    registry.set_iteration(1);
    registry.append(finished_timer("b", &config));

    registry.output(&config)?;
    registry.output(&config)?;

    let lines = read_lines(&dir.path().join("NVTE_TP_0_0.txt"));
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[..2], lines[2..]);
    Ok(())
}

#[test]
fn output_appends_across_runs() -> Result<()> {
    let dir = TempDir::new()?;
    let config = ProfilerConfig::default()
        .with_log_path(dir.path())
        .with_ranks(0, 0);

    let mut first = TimerRegistry::new();
    first.append(finished_timer("warmup", &config));
    first.output(&config)?;

    let mut second = TimerRegistry::new();
    second.set_iteration(10);
    second.append(finished_timer("step", &config));
    second.output(&config)?;

    let lines = read_lines(&dir.path().join("NVTE_TP_0_0.txt"));
    assert_eq!(
        lines,
        vec![(0, "warmup".to_string()), (10, "step".to_string())]
    );
    Ok(())
}

#[test]
fn missing_log_path_fails_before_creating_files() -> Result<()> {
    let dir = TempDir::new()?;
    let config = ProfilerConfig::default().with_ranks(0, 0);

    let mut registry = TimerRegistry::new();
    registry.append(finished_timer("a", &config));

    assert!(registry.output(&config).is_err());
    assert_eq!(fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[test]
fn empty_log_path_is_treated_as_unset() -> Result<()> {
    let config = ProfilerConfig::default().with_log_path("");
    let registry = TimerRegistry::new();
    assert!(registry.output(&config).is_err());
    Ok(())
}

#[test]
fn empty_registry_output_creates_empty_file() -> Result<()> {
    let dir = TempDir::new()?;
    let config = ProfilerConfig::default()
        .with_log_path(dir.path())
        .with_ranks(0, 0);

    let registry = TimerRegistry::new();
    registry.output(&config)?;

    let path = dir.path().join("NVTE_TP_-1_-1.txt");
    assert!(!path.exists());
    let path = dir.path().join("NVTE_TP_0_0.txt");
    assert_eq!(fs::read_to_string(path)?, "");
    Ok(())
}

#[test]
fn idle_region_reads_near_zero() -> Result<()> {
    let config = ProfilerConfig::default();
    let mut timer = EventTimer::new("matmul", &config)?;
    timer.start()?;
    timer.stop()?;
    hipmark::event::synchronize()?;
    let ms = timer.elapsed_ms()?;
    assert!(ms >= 0.0);
    assert!(ms < 50.0, "idle region read {} ms", ms);
    Ok(())
}
