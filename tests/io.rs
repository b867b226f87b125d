mod common;

use diskgas::config::SimConfig;
use diskgas::core::{Enclosure, EventKind, Particle, RunOptions, Simulation, Vector};
use diskgas::error::Result;
use diskgas::input;
use diskgas::output::{self, FileRecorder, SnapshotCadence, EVENTS_FILE, SETUP_FILE, STEPS_DIR};
use diskgas::verify;
use std::fs;
use std::path::PathBuf;

fn scratch_dir(name: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("diskgas-{name}-{}", std::process::id()));
    if dir.exists() {
        fs::remove_dir_all(&dir)?;
    }
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn square(size: f64) -> Result<Enclosure> {
    Enclosure::from_segments(&[
        [0.0, 0.0, size, 0.0],
        [size, 0.0, size, size],
        [size, size, 0.0, size],
        [0.0, size, 0.0, 0.0],
    ])
}

#[test]
fn file_recorder_artifacts_read_back() -> Result<()> {
    let dir = scratch_dir("artifacts")?;
    let ps = vec![Particle::new(0, Vector::new(5.0, 5.0), Vector::new(1.0, 0.0), 0.5, 1.0)?];
    let opts = RunOptions {
        max_events: Some(5),
        ..RunOptions::default()
    };
    let mut sim = Simulation::new(ps, square(10.0)?, opts)?;

    // A stale snapshot from an earlier run must not survive.
    fs::create_dir_all(dir.join(STEPS_DIR))?;
    fs::write(dir.join(STEPS_DIR).join("99.txt"), "stale")?;

    let mut rec = FileRecorder::create(&dir, true)?;
    sim.run(&mut rec, SnapshotCadence::Every(2))?;
    drop(rec);

    let events = input::read_events_file(&dir.join(EVENTS_FILE))?;
    assert_eq!(events.len(), 5);
    assert_eq!(events[0].kind, EventKind::Wall { a: 0, wall: 1 });
    assert_eq!(events[1].kind, EventKind::Wall { a: 0, wall: 3 });
    assert!((events[4].time - 40.5).abs() < 1e-9);

    let mut names: Vec<String> = fs::read_dir(dir.join(STEPS_DIR))?
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<_>>()?;
    names.sort();
    assert_eq!(names, vec!["0.txt", "2.txt", "4.txt"]);

    let rows = input::read_snapshot_file(&dir.join(STEPS_DIR).join("2.txt"))?;
    assert_eq!(rows.len(), 1);
    assert!((rows[0].position.x - 9.5).abs() < 1e-9);
    assert_eq!(rows[0].velocity, Vector::new(-1.0, 0.0));
    assert_eq!(rows[0].radius, Some(0.5));

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn setup_record_round_trip() -> Result<()> {
    let e = Enclosure::from_segments(&common::two_chamber(0.03))?;
    let mut buf = Vec::new();
    output::write_setup(&mut buf, 120, 0.03, e.walls())?;
    let setup = input::read_setup(buf.as_slice())?;
    assert_eq!(setup.count, 120);
    assert_eq!(setup.gap, 0.03);
    assert_eq!(setup.walls.len(), 8);
    let again = Enclosure::from_segments(&setup.walls)?;
    assert_eq!(again.vertices().len(), e.vertices().len());
    Ok(())
}

#[test]
fn config_file_with_setup_and_initial_snapshot() -> Result<()> {
    let dir = scratch_dir("config")?;
    fs::write(
        dir.join("setup.txt"),
        "2 0,05\n0 0 1 0\n1 0 1 1\n1 1 0 1\n0 1 0 0\n",
    )?;
    fs::write(
        dir.join("initial.txt"),
        "0,25 0,5 0,1 0 0,05\n0.75 0.5 -0.1 0\n",
    )?;
    fs::write(
        dir.join("config.json"),
        r#"{"setup": "setup.txt", "initial": "initial.txt", "radius": 0.02, "steps": 3}"#,
    )?;

    let cfg = SimConfig::load(&dir.join("config.json"))?;
    let (segments, gap) = cfg.segments()?;
    assert_eq!(segments.len(), 4);
    assert_eq!(gap, 0.05);

    let (mut sim, gap) = cfg.build_with_gap()?;
    assert_eq!(gap, 0.05);
    assert_eq!(sim.num_particles(), 2);
    assert_eq!(sim.particles[0].radius, 0.05);
    assert_eq!(sim.particles[1].radius, 0.02);

    // Closing speed 0.2, gap 0.5 - 0.07 = 0.43.
    let c = sim
        .step()?
        .ok_or_else(|| diskgas::Error::Config("expected a collision".into()))?;
    assert_eq!(c.kind, EventKind::Particle { a: 0, b: 1 });
    assert!((c.time - 2.15).abs() < 1e-9);

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn initial_snapshot_outside_enclosure_is_rejected() -> Result<()> {
    let dir = scratch_dir("outside")?;
    fs::write(dir.join("initial.txt"), "0.5 0.5 0 0\n1.5 0.5 0 0\n")?;
    fs::write(
        dir.join("config.json"),
        r#"{"walls": [[0, 0, 1, 0], [1, 0, 1, 1], [1, 1, 0, 1], [0, 1, 0, 0]],
            "initial": "initial.txt", "radius": 0.05}"#,
    )?;

    let cfg = SimConfig::load(&dir.join("config.json"))?;
    let err = cfg.build();
    assert!(matches!(err, Err(diskgas::Error::Config(ref m)) if m.contains("particle 1")));

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn verifier_accepts_a_real_run_and_flags_tampering() -> Result<()> {
    let dir = scratch_dir("verify")?;
    let cfg = common::two_chamber_config(30, 9, 200)?;
    let (mut sim, gap) = cfg.build_with_gap()?;
    let mut rec = FileRecorder::create(&dir, true)?;
    let mut setup = fs::File::create(dir.join(SETUP_FILE))?;
    output::write_setup(&mut setup, sim.num_particles(), gap, sim.enclosure().walls())?;
    drop(setup);
    sim.run(&mut rec, SnapshotCadence::Every(50))?;
    drop(rec);

    let report = verify::verify_dir(&dir, 3, cfg.radius)?;
    assert_eq!(report.events, 200);
    assert_eq!(report.snapshots, 4);
    assert_eq!(report.problems, 0);

    // Stack the first two disks on each other in one snapshot.
    let path = dir.join(STEPS_DIR).join("50.txt");
    let text = fs::read_to_string(&path)?;
    let mut lines: Vec<String> = text.lines().map(str::to_owned).collect();
    lines[1] = lines[0].clone();
    fs::write(&path, lines.join("\n") + "\n")?;
    assert_eq!(verify::verify_dir(&dir, 3, cfg.radius)?.problems, 1);

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn missing_config_file_is_io_error() {
    let err = SimConfig::load(std::path::Path::new("/nonexistent/diskgas/config.json"));
    assert!(matches!(err, Err(diskgas::Error::Io(_))));
}
