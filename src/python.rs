use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::SimConfig;
use crate::core::{Collision, Simulation, Vector};

fn py_err<E: ToString>(e: E) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Python-facing wrapper around [`Simulation`].
///
/// - __new__(config_json)
/// - step() -> (time, type, a, b) | None
/// - run(max_events=None) -> number of collisions resolved
/// - advance_to(time) -> number of collisions resolved
/// - get_positions() / get_velocities() -> np.ndarray, shape (N, 2)
/// - set_velocities(np.ndarray)
/// - time(), kinetic_energy(), log_lines()
#[pyclass]
pub struct GasSim {
    sim: Simulation,
    log: Vec<Collision>,
}

fn to_array(rows: impl ExactSizeIterator<Item = Vector>) -> Array2<f64> {
    let mut arr = Array2::<f64>::zeros((rows.len(), 2));
    for (i, v) in rows.enumerate() {
        arr[[i, 0]] = v.x;
        arr[[i, 1]] = v.y;
    }
    arr
}

#[pymethods]
impl GasSim {
    /// Build a simulation from a JSON configuration string (same keys as the config file).
    ///
    /// Errors: raises ValueError on invalid configuration.
    #[new]
    fn new(config_json: &str) -> PyResult<Self> {
        let cfg = SimConfig::from_json_str(config_json).map_err(py_err)?;
        let sim = cfg.build().map_err(py_err)?;
        Ok(Self {
            sim,
            log: Vec::new(),
        })
    }

    /// Resolve the next collision. Returns `None` once the run is done.
    fn step(&mut self) -> PyResult<Option<(f64, &'static str, u32, u32)>> {
        let Some(c) = self.sim.step().map_err(py_err)? else {
            return Ok(None);
        };
        self.log.push(c);
        let (a, b) = c.kind.participants();
        Ok(Some((c.time, c.kind.token(), a, b)))
    }

    /// Resolve up to `max_events` collisions, or until the run ends (releases the GIL).
    #[pyo3(signature = (max_events=None))]
    fn run(&mut self, py: Python<'_>, max_events: Option<u64>) -> PyResult<u64> {
        let Self { sim, log } = self;
        py.detach(|| {
            let mut n = 0u64;
            while max_events.map_or(true, |m| n < m) {
                match sim.step()? {
                    Some(c) => log.push(c),
                    None => break,
                }
                n += 1;
            }
            Ok::<_, crate::error::Error>(n)
        })
        .map_err(py_err)
    }

    /// Advance to the absolute time `target_time` (releases the GIL).
    fn advance_to(&mut self, py: Python<'_>, target_time: f64) -> PyResult<usize> {
        let Self { sim, log } = self;
        let resolved = py.detach(|| sim.advance_to(target_time)).map_err(py_err)?;
        let n = resolved.len();
        log.extend(resolved);
        Ok(n)
    }

    /// Positions as a NumPy array of shape (N, 2), dtype=float64.
    fn get_positions<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
        let arr = to_array(self.sim.particles.iter().map(|p| p.r));
        Ok(arr.into_pyarray(py).to_owned().into())
    }

    /// Velocities as a NumPy array of shape (N, 2), dtype=float64.
    fn get_velocities<'py>(&self, py: Python<'py>) -> PyResult<Py<PyArray2<f64>>> {
        let arr = to_array(self.sim.particles.iter().map(|p| p.v));
        Ok(arr.into_pyarray(py).to_owned().into())
    }

    /// Replace all velocities from an array of shape (N, 2) and re-seed the event queue.
    fn set_velocities<'py>(&mut self, velocities: PyReadonlyArray2<'py, f64>) -> PyResult<()> {
        let arr = velocities.as_array();
        let n = self.sim.num_particles();
        if arr.shape() != [n, 2] {
            return Err(py_err(format!(
                "velocities must have shape ({n}, 2), got {:?}",
                arr.shape()
            )));
        }
        for (i, p) in self.sim.particles.iter_mut().enumerate() {
            p.set_velocity(Vector::new(arr[[i, 0]], arr[[i, 1]]))
                .map_err(py_err)?;
        }
        self.sim.rebuild_event_queue().map_err(py_err)?;
        Ok(())
    }

    fn time(&self) -> f64 {
        self.sim.time()
    }

    fn kinetic_energy(&self) -> f64 {
        self.sim.kinetic_energy()
    }

    /// Every collision resolved through this object, formatted as collision-log lines.
    fn log_lines(&self) -> Vec<String> {
        self.log.iter().map(|c| c.to_string()).collect()
    }
}

/// The diskgas Python module entry point.
#[pymodule]
fn diskgas(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<GasSim>()?;
    Ok(())
}
