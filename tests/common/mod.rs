use diskgas::config::SimConfig;
use diskgas::error::Result;

/// Side of the square left chamber.
pub const CHAMBER: f64 = 0.09;

/// The two-chamber layout: a `CHAMBER` square joined on its right side, through an
/// opening of height `gap`, to a rectangular chamber of the same width.
pub fn two_chamber(gap: f64) -> Vec<[f64; 4]> {
    let s = CHAMBER;
    let corner = (s - gap) / 2.0;
    vec![
        [0.0, 0.0, s, 0.0],
        [s, 0.0, s, corner],
        [s, corner, 2.0 * s, corner],
        [2.0 * s, corner, 2.0 * s, corner + gap],
        [2.0 * s, corner + gap, s, corner + gap],
        [s, corner + gap, s, s],
        [s, s, 0.0, s],
        [0.0, s, 0.0, 0.0],
    ]
}

/// Two-chamber config with every particle starting in the left chamber.
#[allow(dead_code)]
pub fn two_chamber_config(particles: usize, seed: u64, steps: u64) -> Result<SimConfig> {
    let json = serde_json::json!({
        "particles": particles,
        "seed": seed,
        "steps": steps,
        "L": 0.05,
        "walls": two_chamber(0.05),
        "spawn": [0.0, 0.0, CHAMBER, CHAMBER],
    });
    SimConfig::from_json_str(&json.to_string())
}
