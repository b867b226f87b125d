//! Consistency checks over the artifacts of a finished run.
//!
//! Every problem is logged at `error` and counted; the caller decides whether a
//! non-zero count is fatal.

use crate::core::{Enclosure, EventKind};
use crate::error::Result;
use crate::input::{self, LogEntry, SnapshotRow};
use crate::output::{EVENTS_FILE, SETUP_FILE, STEPS_DIR};
use crate::stream::OrderedStream;
use std::fs;
use std::path::{Path, PathBuf};

/// Relative slack when checking snapshots for overlapping disks.
pub const OVERLAP_TOL: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub events: usize,
    pub snapshots: usize,
    pub problems: usize,
}

/// Check `setup.txt`, `events.txt` and `steps/` under `out`, loading snapshots on
/// `workers` threads. Snapshots without a radius column use `default_radius`.
pub fn verify_dir(out: &Path, workers: usize, default_radius: f64) -> Result<Report> {
    let setup = input::read_setup_file(&out.join(SETUP_FILE))?;
    let enclosure = Enclosure::from_segments(&setup.walls)?;
    let events = input::read_events_file(&out.join(EVENTS_FILE))?;

    let mut problems = check_log(&events, setup.count, &enclosure);

    let snapshots = snapshot_files(&out.join(STEPS_DIR))?;
    let n_snapshots = snapshots.len();
    let stream = OrderedStream::spawn(n_snapshots, workers, move |i| {
        let (index, path) = &snapshots[i];
        input::read_snapshot_file(path).map(|rows| (*index, rows))
    })?;
    for loaded in stream {
        let (index, rows) = loaded?;
        problems += check_snapshot(index, &rows, setup.count, &enclosure, default_radius);
    }

    let report = Report {
        events: events.len(),
        snapshots: n_snapshots,
        problems,
    };
    tracing::info!(
        events = report.events,
        snapshots = report.snapshots,
        problems = report.problems,
        "verification finished"
    );
    Ok(report)
}

/// Time must never decrease and every participant must exist.
pub fn check_log(events: &[LogEntry], particles: usize, enclosure: &Enclosure) -> usize {
    let mut problems = 0;
    let mut last = f64::NEG_INFINITY;
    for (i, e) in events.iter().enumerate() {
        if e.time < last {
            tracing::error!(line = i, time = e.time, previous = last, "collision log goes back in time");
            problems += 1;
        }
        last = last.max(e.time);
        let known = match e.kind {
            EventKind::Particle { a, b } => (a.max(b) as usize) < particles,
            EventKind::Wall { a, wall } => (a as usize) < particles && enclosure.wall(wall).is_some(),
            EventKind::Vertex { a, vertex } => {
                (a as usize) < particles && enclosure.vertex(vertex).is_some()
            }
        };
        if !known {
            tracing::error!(line = i, event = %e.kind, "collision names an unknown participant");
            problems += 1;
        }
    }
    problems
}

/// Row count, containment and non-overlap of one snapshot.
pub fn check_snapshot(
    index: u64,
    rows: &[SnapshotRow],
    particles: usize,
    enclosure: &Enclosure,
    default_radius: f64,
) -> usize {
    let mut problems = 0;
    if rows.len() != particles {
        tracing::error!(snapshot = index, rows = rows.len(), expected = particles, "wrong particle count");
        problems += 1;
    }
    let radius = |r: &SnapshotRow| r.radius.unwrap_or(default_radius);
    let closed = enclosure.is_closed();
    for (i, a) in rows.iter().enumerate() {
        if closed && !enclosure.contains(a.position) {
            tracing::error!(snapshot = index, particle = i, "particle outside the enclosure");
            problems += 1;
        }
        for (j, b) in rows.iter().enumerate().skip(i + 1) {
            let min = (radius(a) + radius(b)) * (1.0 - OVERLAP_TOL);
            if (a.position - b.position).norm() < min {
                tracing::error!(snapshot = index, a = i, b = j, "particles overlap");
                problems += 1;
            }
        }
    }
    problems
}

/// Snapshot files ordered by their log index. A missing directory has none.
pub fn snapshot_files(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let index = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u64>().ok());
        if let Some(index) = index {
            files.push((index, path));
        }
    }
    files.sort_by_key(|(index, _)| *index);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Vector;

    fn unit_square() -> Result<Enclosure> {
        Enclosure::from_segments(&[
            [0.0, 0.0, 1.0, 0.0],
            [1.0, 0.0, 1.0, 1.0],
            [1.0, 1.0, 0.0, 1.0],
            [0.0, 1.0, 0.0, 0.0],
        ])
    }

    fn row(x: f64, y: f64, radius: Option<f64>) -> SnapshotRow {
        SnapshotRow {
            position: Vector::new(x, y),
            velocity: Vector::ZERO,
            radius,
        }
    }

    fn entry(time: f64, kind: EventKind) -> LogEntry {
        LogEntry { time, kind }
    }

    #[test]
    fn clean_log_has_no_problems() -> Result<()> {
        let e = unit_square()?;
        let log = [
            entry(0.5, EventKind::Wall { a: 0, wall: 1 }),
            entry(0.5, EventKind::Particle { a: 0, b: 1 }),
            entry(0.7, EventKind::Vertex { a: 1, vertex: 3 }),
        ];
        assert_eq!(check_log(&log, 2, &e), 0);
        Ok(())
    }

    #[test]
    fn log_going_back_in_time_is_counted_once() -> Result<()> {
        let e = unit_square()?;
        let log = [
            entry(1.0, EventKind::Wall { a: 0, wall: 0 }),
            entry(0.5, EventKind::Wall { a: 0, wall: 2 }),
            entry(0.8, EventKind::Wall { a: 0, wall: 3 }),
        ];
        // 0.8 is still behind the 1.0 already seen.
        assert_eq!(check_log(&log, 1, &e), 2);
        Ok(())
    }

    #[test]
    fn unknown_participants_are_counted() -> Result<()> {
        let e = unit_square()?;
        let log = [
            entry(0.1, EventKind::Wall { a: 0, wall: 4 }),
            entry(0.2, EventKind::Vertex { a: 0, vertex: 9 }),
            entry(0.3, EventKind::Particle { a: 0, b: 2 }),
            entry(0.4, EventKind::Wall { a: 5, wall: 0 }),
        ];
        assert_eq!(check_log(&log, 2, &e), 4);
        Ok(())
    }

    #[test]
    fn overlapping_disks_are_counted() -> Result<()> {
        let e = unit_square()?;
        let rows = [row(0.3, 0.5, Some(0.1)), row(0.45, 0.5, Some(0.1)), row(0.8, 0.5, None)];
        assert_eq!(check_snapshot(0, &rows, 3, &e, 0.05), 1);
        // Touching is not overlapping.
        let rows = [row(0.3, 0.5, Some(0.1)), row(0.5, 0.5, Some(0.1))];
        assert_eq!(check_snapshot(0, &rows, 2, &e, 0.05), 0);
        Ok(())
    }

    #[test]
    fn row_outside_enclosure_and_wrong_count_are_counted() -> Result<()> {
        let e = unit_square()?;
        let rows = [row(0.5, 0.5, None), row(1.5, 0.5, None)];
        assert_eq!(check_snapshot(4, &rows, 2, &e, 0.05), 1);
        assert_eq!(check_snapshot(4, &rows, 3, &e, 0.05), 2);
        Ok(())
    }

    #[test]
    fn snapshot_files_are_sorted_numerically() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("diskgas-verify-steps-{}", std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        for name in ["10.txt", "2.txt", "0.txt", "notes.md"] {
            fs::write(dir.join(name), "")?;
        }
        let indices: Vec<u64> = snapshot_files(&dir)?.into_iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 2, 10]);
        assert!(snapshot_files(&dir.join("missing"))?.is_empty());
        fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
