//! Readers for the persisted artifacts.
//!
//! Some historical producers wrote a comma as decimal separator, so every real-valued
//! field accepts either `.` or `,`.

use crate::core::{EventKind, Particle, Vector};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One parsed collision-log line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogEntry {
    pub time: f64,
    pub kind: EventKind,
}

/// One parsed snapshot line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotRow {
    pub position: Vector,
    pub velocity: Vector,
    pub radius: Option<f64>,
}

impl From<&Particle> for SnapshotRow {
    fn from(p: &Particle) -> Self {
        Self {
            position: p.r,
            velocity: p.v,
            radius: Some(p.radius),
        }
    }
}

/// Parsed setup record.
#[derive(Debug, Clone, PartialEq)]
pub struct Setup {
    pub count: usize,
    /// Opening of the connecting chamber.
    pub gap: f64,
    pub walls: Vec<[f64; 4]>,
}

/// Parse a real number written with either `.` or `,` as decimal separator.
pub fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim();
    let v = if t.contains(',') {
        t.replace(',', ".").parse::<f64>().ok()?
    } else {
        t.parse::<f64>().ok()?
    };
    v.is_finite().then_some(v)
}

fn field_f64(field: &str, line: usize) -> Result<f64> {
    parse_number(field).ok_or_else(|| Error::Parse {
        line,
        message: format!("invalid number {field:?}"),
    })
}

fn field_u32(field: &str, line: usize) -> Result<u32> {
    field.parse::<u32>().map_err(|_| Error::Parse {
        line,
        message: format!("invalid id {field:?}"),
    })
}

/// Iterate over non-blank lines with their 1-based line numbers.
fn content_lines<R: BufRead>(reader: R) -> impl Iterator<Item = Result<(usize, String)>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Ok(l) if l.trim().is_empty() => None,
            Ok(l) => Some(Ok((i + 1, l))),
            Err(e) => Some(Err(Error::Io(e))),
        })
}

/// Read a collision log (`events.txt`).
pub fn read_events<R: BufRead>(reader: R) -> Result<Vec<LogEntry>> {
    content_lines(reader)
        .map(|item| {
            let (n, line) = item?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [time, token, a, b] = fields[..] else {
                return Err(Error::Parse {
                    line: n,
                    message: format!("expected 4 fields, found {}", fields.len()),
                });
            };
            let time = field_f64(time, n)?;
            let (a, b) = (field_u32(a, n)?, field_u32(b, n)?);
            let kind = match token {
                "PARTICLE" => EventKind::Particle { a, b },
                "WALL" => EventKind::Wall { a, wall: b },
                "VERTEX" => EventKind::Vertex { a, vertex: b },
                other => {
                    return Err(Error::Parse {
                        line: n,
                        message: format!("unknown event type {other:?}"),
                    })
                }
            };
            Ok(LogEntry { time, kind })
        })
        .collect()
}

/// Read a snapshot (`steps/<n>.txt`): four or five fields per line.
pub fn read_snapshot<R: BufRead>(reader: R) -> Result<Vec<SnapshotRow>> {
    content_lines(reader)
        .map(|item| {
            let (n, line) = item?;
            let values = line
                .split_whitespace()
                .map(|f| field_f64(f, n))
                .collect::<Result<Vec<f64>>>()?;
            match values[..] {
                [x, y, vx, vy] => Ok(SnapshotRow {
                    position: Vector::new(x, y),
                    velocity: Vector::new(vx, vy),
                    radius: None,
                }),
                [x, y, vx, vy, r] => Ok(SnapshotRow {
                    position: Vector::new(x, y),
                    velocity: Vector::new(vx, vy),
                    radius: Some(r),
                }),
                _ => Err(Error::Parse {
                    line: n,
                    message: format!("expected 4 or 5 fields, found {}", values.len()),
                }),
            }
        })
        .collect()
}

/// Read a setup record.
pub fn read_setup<R: BufRead>(reader: R) -> Result<Setup> {
    let mut lines = content_lines(reader);
    let (n, header) = lines
        .next()
        .ok_or_else(|| Error::Config("setup record is empty".into()))??;
    let fields: Vec<&str> = header.split_whitespace().collect();
    let [count, gap] = fields[..] else {
        return Err(Error::Parse {
            line: n,
            message: "header must be \"<particle_count> <L>\"".into(),
        });
    };
    // Some producers write the count as a real number.
    let count = field_f64(count, n)?;
    if count < 0.0 || count.fract() != 0.0 {
        return Err(Error::Parse {
            line: n,
            message: format!("particle count must be a non-negative integer, got {count}"),
        });
    }
    let gap = field_f64(gap, n)?;

    let walls = lines
        .map(|item| {
            let (n, line) = item?;
            let values = line
                .split_whitespace()
                .map(|f| field_f64(f, n))
                .collect::<Result<Vec<f64>>>()?;
            match values[..] {
                [x1, y1, x2, y2] => Ok([x1, y1, x2, y2]),
                _ => Err(Error::Parse {
                    line: n,
                    message: format!("wall needs 4 fields, found {}", values.len()),
                }),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Setup {
        count: count as usize,
        gap,
        walls,
    })
}

pub fn read_setup_file(path: &Path) -> Result<Setup> {
    read_setup(BufReader::new(File::open(path)?))
}

pub fn read_events_file(path: &Path) -> Result<Vec<LogEntry>> {
    read_events(BufReader::new(File::open(path)?))
}

pub fn read_snapshot_file(path: &Path) -> Result<Vec<SnapshotRow>> {
    read_snapshot(BufReader::new(File::open(path)?))
}

/// Turn snapshot rows into particles with ids in row order. Rows without a radius field
/// take `default_radius`.
pub fn particles_from_rows(rows: &[SnapshotRow], default_radius: f64, mass: f64) -> Result<Vec<Particle>> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            Particle::new(
                i as u32,
                row.position,
                row.velocity,
                row.radius.unwrap_or(default_radius),
                mass,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_accept_both_separators() {
        assert_eq!(parse_number("0.125"), Some(0.125));
        assert_eq!(parse_number("0,125"), Some(0.125));
        assert_eq!(parse_number("-3,5e-2"), Some(-0.035));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn reads_mixed_separator_log() -> Result<()> {
        let text = "0,123456789 WALL 42 3\n\n0.234567890 PARTICLE 15 87\n0.3 VERTEX 1 2\n";
        let entries = read_events(text.as_bytes())?;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].time, 0.123456789);
        assert_eq!(entries[0].kind, EventKind::Wall { a: 42, wall: 3 });
        assert_eq!(entries[1].kind, EventKind::Particle { a: 15, b: 87 });
        assert_eq!(entries[2].kind, EventKind::Vertex { a: 1, vertex: 2 });
        Ok(())
    }

    #[test]
    fn bad_log_line_reports_line_number() {
        let text = "0.1 WALL 1 2\n0.2 BOUNCE 1 2\n";
        match read_events(text.as_bytes()) {
            Err(Error::Parse { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("BOUNCE"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_with_and_without_radius() -> Result<()> {
        let rows = read_snapshot("0.1 0.2 1.0 -1.0\n0,3 0,4 0 0 0,0015\n".as_bytes())?;
        assert_eq!(rows[0].radius, None);
        assert_eq!(rows[1].position, Vector::new(0.3, 0.4));
        assert_eq!(rows[1].radius, Some(0.0015));
        assert!(read_snapshot("1 2 3\n".as_bytes()).is_err());
        Ok(())
    }

    #[test]
    fn setup_record() -> Result<()> {
        let text = "200 0,05\n0 0 0.09 0\n0.09 0 0.09 0.02\n";
        let setup = read_setup(text.as_bytes())?;
        assert_eq!(setup.count, 200);
        assert_eq!(setup.gap, 0.05);
        assert_eq!(setup.walls, vec![[0.0, 0.0, 0.09, 0.0], [0.09, 0.0, 0.09, 0.02]]);
        Ok(())
    }

    #[test]
    fn empty_setup_is_config_error() {
        assert!(matches!(read_setup("".as_bytes()), Err(Error::Config(_))));
    }

    #[test]
    fn rows_become_particles() -> Result<()> {
        let rows = read_snapshot("0.1 0.2 1.0 -1.0\n0.5 0.5 0 0 0.01\n".as_bytes())?;
        let ps = particles_from_rows(&rows, 0.002, 1.0)?;
        assert_eq!(ps[0].radius, 0.002);
        assert_eq!(ps[1].radius, 0.01);
        assert_eq!(ps[1].id, 1);
        Ok(())
    }
}
