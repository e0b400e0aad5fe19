//! Reciprocal-space calculation session.
//!
//! A [`CalcSession`] binds one diffractometer geometry type (fixed at
//! construction), one detector, a registry of named samples and the active
//! calculation engine. Whenever the sample or the engine changes, the
//! session re-initializes: the live geometry, detector and sample are
//! rebound into the engine context and the pseudo-axis read-back is
//! refreshed. Re-initialization is silently skipped while no sample is
//! bound.

use crate::domain::{
    geometry_meta, Detector, DiffcalcError, DiffcalcResult, GeometryMeta, GeometryType, UnitSystem,
};
use crate::engine::{Engine, Solution, SolutionId};
use crate::lattice::Lattice;
use crate::parameter::Parameter;
use crate::path::PathSpec;
use crate::sample::{ReflectionId, Sample};
use crate::solver::{solver_for, GeometrySnapshot, SolverContext};
use crate::support::math::Mat3;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

const DEFAULT_WAVELENGTH: f64 = 1.54;

/// Construction-time options. `engine`/`sample` default to the geometry's
/// first registered engine and a sample named "main".
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub engine: Option<String>,
    pub sample: Option<String>,
    pub lattice: Option<Lattice>,
    pub units: UnitSystem,
    /// Once set, the active engine can never be switched for the lifetime
    /// of the session; dependent motor mappings may then rely on the
    /// pseudo-axis names staying stable.
    pub lock_engine: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            engine: None,
            sample: Some("main".to_string()),
            lattice: None,
            units: UnitSystem::User,
            lock_engine: false,
        }
    }
}

#[derive(Debug)]
pub struct CalcSession {
    geometry: GeometryType,
    meta: &'static GeometryMeta,
    detector: Detector,
    wavelength: f64,
    units: UnitSystem,
    physical: Vec<Parameter>,
    samples: BTreeMap<String, Sample>,
    active_sample: Option<String>,
    engines: Vec<Engine>,
    active_engine: usize,
    lock_engine: bool,
}

impl CalcSession {
    /// Create a session for the named geometry type. Unknown names fail
    /// with an error enumerating the valid types.
    pub fn new(geometry: &str, options: SessionOptions) -> DiffcalcResult<Self> {
        let geometry = GeometryType::from_name(geometry)?;
        let meta = geometry_meta(geometry);

        let physical = meta
            .physical_axes
            .iter()
            .map(|axis| Parameter::rotation(*axis, options.units))
            .collect();
        let engines: Vec<Engine> = meta
            .engines
            .iter()
            .map(|engine_meta| Engine::new(engine_meta, options.units))
            .collect();
        let active_engine = match &options.engine {
            Some(name) => engines
                .iter()
                .position(|engine| engine.name() == name)
                .ok_or_else(|| DiffcalcError::UnknownEngine {
                    requested: name.clone(),
                    geometry: geometry.to_string(),
                    available: engine_names_of(&engines),
                })?,
            None => 0,
        };

        let mut session = Self {
            geometry,
            meta,
            detector: Detector::point(),
            wavelength: DEFAULT_WAVELENGTH,
            units: options.units,
            physical,
            samples: BTreeMap::new(),
            active_sample: None,
            engines,
            active_engine,
            lock_engine: options.lock_engine,
        };

        if let Some(name) = options.sample {
            let sample = match options.lattice {
                Some(lattice) => Sample::with_lattice(&name, lattice, options.units),
                None => Sample::new(&name, options.units),
            };
            session.samples.insert(name.clone(), sample);
            session.active_sample = Some(name);
        }
        session.re_init();
        Ok(session)
    }

    pub fn geometry(&self) -> GeometryType {
        self.geometry
    }

    pub fn detector(&self) -> Detector {
        self.detector
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    /// Wavelength in angstroms.
    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    pub fn set_wavelength(&mut self, wavelength: f64) -> DiffcalcResult<()> {
        if wavelength <= 0.0 || !wavelength.is_finite() {
            return Err(DiffcalcError::InvalidWavelength { value: wavelength });
        }
        self.wavelength = wavelength;
        self.re_init();
        Ok(())
    }

    // --- engines -----------------------------------------------------------

    pub fn engine_locked(&self) -> bool {
        self.lock_engine
    }

    pub fn engine(&self) -> &Engine {
        &self.engines[self.active_engine]
    }

    /// Mutable access to the active engine, e.g. for mode switches.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engines[self.active_engine]
    }

    pub fn engine_names(&self) -> Vec<&'static str> {
        self.engines.iter().map(Engine::name).collect()
    }

    /// Switch the active engine by name. A no-op when the engine is
    /// already active; fails when the session is locked or the name is
    /// unknown; otherwise triggers re-initialization.
    pub fn set_engine(&mut self, name: &str) -> DiffcalcResult<()> {
        if self.engines[self.active_engine].name() == name {
            return Ok(());
        }
        if self.lock_engine {
            return Err(DiffcalcError::EngineLocked {
                active: self.engines[self.active_engine].name().to_string(),
            });
        }
        let index = self
            .engines
            .iter()
            .position(|engine| engine.name() == name)
            .ok_or_else(|| DiffcalcError::UnknownEngine {
                requested: name.to_string(),
                geometry: self.geometry.to_string(),
                available: engine_names_of(&self.engines),
            })?;
        tracing::debug!(from = self.engines[self.active_engine].name(), to = name, "engine switched");
        self.active_engine = index;
        self.re_init();
        Ok(())
    }

    /// Restore a previously recorded engine index. Used by guards and
    /// trajectories; the switch it undoes could only have succeeded on an
    /// unlocked session, so no lock check applies.
    fn restore_engine(&mut self, index: usize) {
        if self.active_engine != index {
            tracing::debug!(to = self.engines[index].name(), "engine restored");
            self.active_engine = index;
            self.re_init();
        }
    }

    /// Scoped engine override. The returned guard dereferences to the
    /// session and restores the previously active engine when dropped, on
    /// every exit path. Guards nest: an inner guard restores to the
    /// engine its enclosing scope had active.
    pub fn using_engine(&mut self, engine: Option<&str>) -> DiffcalcResult<EngineGuard<'_>> {
        let prior = self.active_engine;
        if let Some(name) = engine {
            self.set_engine(name)?;
        }
        Ok(EngineGuard {
            session: self,
            prior,
        })
    }

    // --- samples -----------------------------------------------------------

    pub fn sample_names(&self) -> Vec<&str> {
        self.samples.keys().map(String::as_str).collect()
    }

    pub fn sample_named(&self, name: &str) -> Option<&Sample> {
        self.samples.get(name)
    }

    pub fn sample_name(&self) -> Option<&str> {
        self.active_sample.as_deref()
    }

    pub fn sample(&self) -> Option<&Sample> {
        self.active_sample
            .as_ref()
            .and_then(|name| self.samples.get(name))
    }

    /// Mutable access to the active sample (lattice, orientation and
    /// reflection edits). Renaming goes through [`CalcSession::rename_sample`]
    /// so the registry stays keyed correctly.
    pub fn sample_mut(&mut self) -> Option<&mut Sample> {
        match &self.active_sample {
            Some(name) => self.samples.get_mut(name),
            None => None,
        }
    }

    /// Register a new sample. Fails when the name is taken; with `select`
    /// the new sample becomes active and the session re-initializes.
    pub fn add_sample(
        &mut self,
        name: &str,
        lattice: Option<Lattice>,
        select: bool,
    ) -> DiffcalcResult<()> {
        let sample = match lattice {
            Some(lattice) => Sample::with_lattice(name, lattice, self.units),
            None => Sample::new(name, self.units),
        };
        self.add_sample_instance(sample, select)
    }

    /// Register an externally built sample under its own name.
    pub fn add_sample_instance(&mut self, sample: Sample, select: bool) -> DiffcalcResult<()> {
        let name = sample.name().to_string();
        if self.samples.contains_key(&name) {
            return Err(DiffcalcError::DuplicateSample { name });
        }
        self.samples.insert(name.clone(), sample);
        if select {
            self.active_sample = Some(name);
            self.re_init();
        }
        Ok(())
    }

    /// Make a registered sample active. A no-op when already active.
    pub fn set_sample(&mut self, name: &str) -> DiffcalcResult<()> {
        if self.active_sample.as_deref() == Some(name) {
            return Ok(());
        }
        if !self.samples.contains_key(name) {
            return Err(DiffcalcError::UnknownSample {
                name: name.to_string(),
            });
        }
        self.active_sample = Some(name.to_string());
        self.re_init();
        Ok(())
    }

    /// Make a sample instance active, auto-registering it when its name is
    /// not yet in the registry. A registered name with different content
    /// is a duplicate-name error.
    pub fn set_sample_instance(&mut self, sample: Sample) -> DiffcalcResult<()> {
        let name = sample.name().to_string();
        match self.samples.get(&name) {
            None => {
                self.samples.insert(name.clone(), sample);
            }
            Some(registered) if *registered == sample => {}
            Some(_) => {
                return Err(DiffcalcError::DuplicateSample { name });
            }
        }
        self.set_sample(&name)
    }

    /// Re-key a sample in the registry. Fails without touching the
    /// registry when the new name collides.
    pub fn rename_sample(&mut self, current: &str, new_name: &str) -> DiffcalcResult<()> {
        if current == new_name {
            return Ok(());
        }
        if self.samples.contains_key(new_name) {
            return Err(DiffcalcError::DuplicateSample {
                name: new_name.to_string(),
            });
        }
        let mut sample = self
            .samples
            .remove(current)
            .ok_or_else(|| DiffcalcError::UnknownSample {
                name: current.to_string(),
            })?;
        sample.set_name(new_name);
        self.samples.insert(new_name.to_string(), sample);
        if self.active_sample.as_deref() == Some(current) {
            self.active_sample = Some(new_name.to_string());
        }
        Ok(())
    }

    /// Remove a sample from the registry. The active reference is dropped
    /// when it pointed at the removed sample.
    pub fn remove_sample(&mut self, name: &str) -> DiffcalcResult<Sample> {
        let sample = self
            .samples
            .remove(name)
            .ok_or_else(|| DiffcalcError::UnknownSample {
                name: name.to_string(),
            })?;
        if self.active_sample.as_deref() == Some(name) {
            self.active_sample = None;
        }
        Ok(sample)
    }

    /// Record a reflection on the active sample against the current
    /// geometry, using the session detector unless one is supplied.
    pub fn add_reflection(
        &mut self,
        h: f64,
        k: f64,
        l: f64,
        detector: Option<Detector>,
    ) -> DiffcalcResult<ReflectionId> {
        let snapshot = self.snapshot();
        let detector = detector.unwrap_or(self.detector);
        let sample = self.sample_mut().ok_or(DiffcalcError::SampleUnset)?;
        Ok(sample.add_reflection(h, k, l, snapshot, detector))
    }

    // --- axes --------------------------------------------------------------

    pub fn physical_axis_names(&self) -> &'static [&'static str] {
        self.meta.physical_axes
    }

    /// Physical axis values in each parameter's active unit system.
    pub fn physical_axis_values(&self) -> Vec<f64> {
        self.physical.iter().map(Parameter::value).collect()
    }

    pub fn pseudo_axis_names(&self) -> &'static [&'static str] {
        self.engines[self.active_engine].pseudo_axis_names()
    }

    pub fn pseudo_axis_values(&self) -> &[f64] {
        self.engines[self.active_engine].pseudo_axis_values()
    }

    pub fn parameter(&self, axis: &str) -> DiffcalcResult<&Parameter> {
        self.physical
            .iter()
            .find(|parameter| parameter.name() == axis)
            .ok_or_else(|| DiffcalcError::UnknownAxis {
                requested: axis.to_string(),
            })
    }

    /// Mutable parameter access, e.g. for limit configuration. Limits are
    /// never reset by re-initialization.
    pub fn parameter_mut(&mut self, axis: &str) -> DiffcalcResult<&mut Parameter> {
        self.physical
            .iter_mut()
            .find(|parameter| parameter.name() == axis)
            .ok_or_else(|| DiffcalcError::UnknownAxis {
                requested: axis.to_string(),
            })
    }

    /// Read an axis by name, dispatching to the physical parameter or the
    /// active engine's pseudo axis. Unknown names are an error.
    pub fn axis_value(&self, axis: &str) -> DiffcalcResult<f64> {
        if let Some(parameter) = self.physical.iter().find(|p| p.name() == axis) {
            return Ok(parameter.value());
        }
        self.engines[self.active_engine].pseudo_value(axis)
    }

    /// Write an axis by name. A physical write validates against the
    /// parameter limits and refreshes the pseudo read-back; a pseudo write
    /// performs a full solve with the named component replaced and
    /// silently commits the first solution.
    pub fn set_axis_value(&mut self, axis: &str, value: f64) -> DiffcalcResult<()> {
        if let Some(parameter) = self.physical.iter_mut().find(|p| p.name() == axis) {
            parameter.set_value(value)?;
            self.re_init();
            return Ok(());
        }
        self.set_pseudo_value(axis, value)
    }

    // --- solving -----------------------------------------------------------

    fn snapshot(&self) -> GeometrySnapshot {
        GeometrySnapshot {
            geometry: self.geometry,
            axis_names: self
                .meta
                .physical_axes
                .iter()
                .map(|axis| axis.to_string())
                .collect(),
            axis_values: self
                .physical
                .iter()
                .map(|parameter| parameter.value_in(UnitSystem::Default))
                .collect(),
            wavelength: self.wavelength,
        }
    }

    fn solve_pieces(&self) -> DiffcalcResult<(GeometrySnapshot, Vec<(f64, f64)>, Mat3)> {
        let sample = self.sample().ok_or(DiffcalcError::SampleUnset)?;
        Ok((
            self.snapshot(),
            self.physical.iter().map(Parameter::limits_default).collect(),
            sample.ub(),
        ))
    }

    fn forward_pseudo(&self) -> DiffcalcResult<Vec<f64>> {
        let (snapshot, limits, ub) = self.solve_pieces()?;
        let engine = &self.engines[self.active_engine];
        let ctx = SolverContext {
            meta: self.meta,
            engine: engine.meta(),
            mode: engine.mode(),
            detector: &self.detector,
            ub,
            current: &snapshot,
            limits: &limits,
        };
        solver_for(self.geometry, engine.name())?.forward(&ctx)
    }

    /// Rebind geometry, detector and sample into the engine context.
    /// Silently skipped while any of them is unset. Pending solution sets
    /// are discarded: their candidates were computed under the previous
    /// binding.
    fn re_init(&mut self) {
        if self.active_sample.is_none() {
            tracing::debug!("re-initialization skipped: no active sample");
            return;
        }
        self.engines[self.active_engine].clear_solutions();
        match self.forward_pseudo() {
            Ok(values) => {
                self.engines[self.active_engine].set_pseudo_values_readback(values);
            }
            Err(error) => {
                tracing::debug!(%error, "pseudo read-back unavailable after re-initialization");
            }
        }
        tracing::debug!(
            engine = self.engines[self.active_engine].name(),
            sample = self.active_sample.as_deref().unwrap_or_default(),
            "session re-initialized"
        );
    }

    /// Forward solve: hand the target to the active engine's backend and
    /// store the returned candidates as the engine's pending solution set.
    /// The candidates keep the backend's own ordering; the first is the
    /// natural default for automated use.
    pub fn set_pseudo_values(&mut self, target: &[f64]) -> DiffcalcResult<Vec<Solution>> {
        let engine_meta = self.engines[self.active_engine].meta();
        if target.len() != engine_meta.pseudo_axes.len() {
            return Err(DiffcalcError::invalid_shape(format!(
                "engine '{}' expects {} pseudo-axis values, got {}",
                engine_meta.name,
                engine_meta.pseudo_axes.len(),
                target.len()
            )));
        }

        let candidates = {
            let (snapshot, limits, ub) = self.solve_pieces()?;
            let engine = &self.engines[self.active_engine];
            tracing::debug!(
                engine = engine.name(),
                mode = engine.mode(),
                ?target,
                "forward solve"
            );
            let ctx = SolverContext {
                meta: self.meta,
                engine: engine.meta(),
                mode: engine.mode(),
                detector: &self.detector,
                ub,
                current: &snapshot,
                limits: &limits,
            };
            solver_for(self.geometry, engine.name())?.solve(&ctx, target)?
        };
        if candidates.is_empty() {
            return Err(DiffcalcError::calculation_failed(
                "solver returned no candidate geometries",
            ));
        }

        let wavelength = self.wavelength;
        let axis_names = self.meta.physical_axes;
        Ok(self.engines[self.active_engine].store_solutions(
            target,
            candidates,
            axis_names,
            wavelength,
        ))
    }

    /// Solve a target, optionally under a temporary engine override.
    pub fn calc(
        &mut self,
        target: &[f64],
        engine: Option<&str>,
    ) -> DiffcalcResult<Vec<Solution>> {
        let mut scope = self.using_engine(engine)?;
        scope.set_pseudo_values(target)
    }

    /// Commit a pending solution as the live geometry. The handle must
    /// belong to the engine's current solution set; committing clears that
    /// set, since only one solution may ever be current.
    pub fn select_solution(&mut self, id: SolutionId) -> DiffcalcResult<()> {
        let solution = self.engines[self.active_engine]
            .pending(id)
            .ok_or(DiffcalcError::StaleSolution {
                generation: id.generation(),
                index: id.index(),
            })?
            .clone();

        // stage the writes so a narrowed limit cannot leave the geometry
        // half-committed
        let mut staged = self.physical.clone();
        for (parameter, value) in staged.iter_mut().zip(solution.axis_values_default()) {
            parameter.set_value_in(UnitSystem::Default, *value)?;
        }
        self.physical = staged;

        let engine = &mut self.engines[self.active_engine];
        engine.set_pseudo_values_readback(solution.pseudo_target().to_vec());
        engine.clear_solutions();
        tracing::debug!(
            generation = id.generation(),
            index = id.index(),
            "solution committed as live geometry"
        );
        Ok(())
    }

    /// Single-axis pseudo write: a full solve with only the named
    /// component replaced, committing the first solution immediately.
    /// Callers needing solution choice use [`CalcSession::set_pseudo_values`]
    /// plus [`CalcSession::select_solution`] instead.
    pub fn set_pseudo_value(&mut self, axis: &str, value: f64) -> DiffcalcResult<()> {
        let engine = &self.engines[self.active_engine];
        let index = engine
            .pseudo_axis_names()
            .iter()
            .position(|name| *name == axis)
            .ok_or_else(|| DiffcalcError::UnknownAxis {
                requested: axis.to_string(),
            })?;
        let mut target = engine.pseudo_axis_values().to_vec();
        target[index] = value;
        let solutions = self.set_pseudo_values(&target)?;
        self.select_solution(solutions[0].id())
    }

    /// Expand a path and traverse it lazily: one solve per step, yielded
    /// as the consumer advances, optionally under a temporary engine
    /// override that is restored when the trajectory is dropped.
    pub fn traverse(
        &mut self,
        path: &PathSpec,
        engine: Option<&str>,
    ) -> DiffcalcResult<Trajectory<'_>> {
        let prior = self.active_engine;
        if let Some(name) = engine {
            self.set_engine(name)?;
        }
        let axis_count = self.engines[self.active_engine].pseudo_axis_names().len();
        let targets = match path.expand(axis_count) {
            Ok(targets) => targets,
            Err(error) => {
                self.restore_engine(prior);
                return Err(error);
            }
        };
        Ok(Trajectory {
            targets: targets.into_iter(),
            session: self,
            prior,
        })
    }
}

fn engine_names_of(engines: &[Engine]) -> String {
    engines
        .iter()
        .map(Engine::name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Guard for a scoped engine override; restores the previously active
/// engine on drop, whether or not the scope unwound with an error.
pub struct EngineGuard<'a> {
    session: &'a mut CalcSession,
    prior: usize,
}

impl Deref for EngineGuard<'_> {
    type Target = CalcSession;

    fn deref(&self) -> &CalcSession {
        self.session
    }
}

impl DerefMut for EngineGuard<'_> {
    fn deref_mut(&mut self) -> &mut CalcSession {
        self.session
    }
}

impl Drop for EngineGuard<'_> {
    fn drop(&mut self) {
        self.session.restore_engine(self.prior);
    }
}

/// Lazily evaluated trajectory: each `next` performs exactly one solve.
/// Stopping early skips the cost of the remaining steps; dropping the
/// trajectory restores the engine that was active before the traversal.
pub struct Trajectory<'a> {
    session: &'a mut CalcSession,
    targets: std::vec::IntoIter<Vec<f64>>,
    prior: usize,
}

impl Iterator for Trajectory<'_> {
    type Item = DiffcalcResult<Vec<Solution>>;

    fn next(&mut self) -> Option<Self::Item> {
        let target = self.targets.next()?;
        Some(self.session.set_pseudo_values(&target))
    }
}

impl Drop for Trajectory<'_> {
    fn drop(&mut self) {
        self.session.restore_engine(self.prior);
    }
}

#[cfg(test)]
mod tests {
    use super::{CalcSession, SessionOptions};
    use crate::domain::{DiffcalcError, GeometryType, UnitSystem};
    use crate::lattice::Lattice;

    fn session() -> CalcSession {
        CalcSession::new("E4CV", SessionOptions::default()).expect("valid geometry")
    }

    #[test]
    fn construction_rejects_unknown_geometry_with_the_valid_set() {
        let error = CalcSession::new("K9", SessionOptions::default()).expect_err("unregistered");
        match error {
            DiffcalcError::UnknownGeometry { available, .. } => {
                assert!(available.contains("E4CV"));
                assert!(available.contains("TwoC"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn construction_binds_default_engine_and_sample() {
        let session = session();
        assert_eq!(session.geometry(), GeometryType::E4cv);
        assert_eq!(session.engine().name(), "hkl");
        assert_eq!(session.sample_name(), Some("main"));
        assert_eq!(session.physical_axis_names(), &["omega", "chi", "phi", "tth"]);
    }

    #[test]
    fn explicit_engine_must_be_registered_for_the_geometry() {
        let options = SessionOptions {
            engine: Some("hkl".to_string()),
            ..SessionOptions::default()
        };
        let error = CalcSession::new("TwoC", options).expect_err("TwoC has no hkl engine");
        assert!(matches!(error, DiffcalcError::UnknownEngine { .. }));
    }

    #[test]
    fn engine_switch_is_a_noop_when_unchanged_and_rejected_when_locked() {
        let mut unlocked = session();
        unlocked.set_engine("hkl").expect("no-op");
        unlocked.set_engine("q").expect("registered");
        assert_eq!(unlocked.engine().name(), "q");

        let options = SessionOptions {
            lock_engine: true,
            ..SessionOptions::default()
        };
        let mut locked = CalcSession::new("E4CV", options).expect("valid geometry");
        locked.set_engine("hkl").expect("no-op switch is allowed even when locked");
        let error = locked.set_engine("q").expect_err("locked");
        assert!(matches!(error, DiffcalcError::EngineLocked { .. }));
        assert_eq!(locked.engine().name(), "hkl");
        assert_eq!(locked.pseudo_axis_names(), &["h", "k", "l"]);
    }

    #[test]
    fn duplicate_sample_names_are_rejected() {
        let mut session = session();
        session.add_sample("quartz", None, false).expect("fresh name");
        let error = session.add_sample("quartz", None, true).expect_err("taken");
        assert!(matches!(error, DiffcalcError::DuplicateSample { .. }));
        // the failed add did not steal the selection
        assert_eq!(session.sample_name(), Some("main"));
    }

    #[test]
    fn rename_collision_leaves_the_registry_unchanged() {
        let mut session = session();
        session.add_sample("quartz", None, false).expect("fresh name");

        let error = session.rename_sample("quartz", "main").expect_err("collision");
        assert!(matches!(error, DiffcalcError::DuplicateSample { .. }));
        assert!(session.sample_named("quartz").is_some());
        assert!(session.sample_named("main").is_some());

        session.rename_sample("main", "silicon").expect("fresh name");
        assert_eq!(session.sample_name(), Some("silicon"));
        assert!(session.sample_named("main").is_none());
    }

    #[test]
    fn selecting_samples_by_name_and_instance() {
        let mut session = session();
        session
            .add_sample("quartz", Lattice::cubic(4.9).ok(), true)
            .expect("fresh name");
        assert_eq!(session.sample_name(), Some("quartz"));

        session.set_sample("main").expect("registered");
        assert_eq!(session.sample_name(), Some("main"));

        let error = session.set_sample("unknown").expect_err("not registered");
        assert!(matches!(error, DiffcalcError::UnknownSample { .. }));
        assert_eq!(session.sample_name(), Some("main"));

        let external = crate::sample::Sample::new("external", UnitSystem::User);
        session.set_sample_instance(external).expect("auto-registered");
        assert_eq!(session.sample_name(), Some("external"));
    }

    #[test]
    fn removing_the_active_sample_unbinds_it() {
        let mut session = session();
        session.remove_sample("main").expect("registered");
        assert_eq!(session.sample_name(), None);
        assert!(matches!(
            session.set_pseudo_values(&[1.0, 1.0, 1.0]),
            Err(DiffcalcError::SampleUnset)
        ));
    }

    #[test]
    fn axis_dispatch_rejects_unknown_names_on_read_and_write() {
        let mut session = session();
        assert!(matches!(
            session.axis_value("psi"),
            Err(DiffcalcError::UnknownAxis { .. })
        ));
        assert!(matches!(
            session.set_axis_value("psi", 1.0),
            Err(DiffcalcError::UnknownAxis { .. })
        ));
        // physical and pseudo names both resolve
        assert_eq!(session.axis_value("omega").expect("physical"), 0.0);
        session.axis_value("h").expect("pseudo");
    }

    #[test]
    fn physical_writes_respect_limits_and_refresh_readback() {
        let mut session = session();
        session
            .parameter_mut("tth")
            .expect("registered")
            .set_limits(0.0, 20.0)
            .expect("ordered");
        let error = session.set_axis_value("tth", 25.0).expect_err("outside");
        assert!(matches!(error, DiffcalcError::ValueOutOfRange { .. }));

        session.set_axis_value("tth", 10.0).expect("within");
        assert!((session.axis_value("tth").expect("physical") - 10.0).abs() < 1.0e-9);
    }

    #[test]
    fn wavelength_must_be_positive() {
        let mut session = session();
        assert!(matches!(
            session.set_wavelength(0.0),
            Err(DiffcalcError::InvalidWavelength { .. })
        ));
        session.set_wavelength(0.709).expect("positive");
        assert!((session.wavelength() - 0.709).abs() < 1.0e-12);
    }
}
