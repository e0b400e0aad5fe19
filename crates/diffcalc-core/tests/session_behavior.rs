//! End-to-end session behavior: solve/select round trips, engine locking
//! and scoped overrides, sample registry edge cases and limit handling.

use diffcalc_core::{CalcSession, DiffcalcError, Lattice, SessionOptions};

const SILICON_A: f64 = 5.431;
const CU_KALPHA: f64 = 1.54;

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}

fn silicon_session(geometry: &str) -> CalcSession {
    let options = SessionOptions {
        lattice: Lattice::cubic(SILICON_A).ok(),
        ..SessionOptions::default()
    };
    let mut session = CalcSession::new(geometry, options).expect("valid geometry");
    session.set_wavelength(CU_KALPHA).expect("positive");
    session
}

/// Bragg angle in degrees for the (h00) family of a cubic cell.
fn bragg_tth_degrees(order: f64) -> f64 {
    2.0 * (order * CU_KALPHA / (2.0 * SILICON_A)).asin().to_degrees()
}

#[test]
fn solve_and_select_commit_the_live_geometry() {
    let mut session = silicon_session("E4CV");

    let solutions = session.set_pseudo_values(&[1.0, 0.0, 0.0]).expect("reachable");
    assert!(!solutions.is_empty());

    session.select_solution(solutions[0].id()).expect("fresh handle");
    assert_eq!(session.pseudo_axis_values(), &[1.0, 0.0, 0.0]);

    let tth = session.axis_value("tth").expect("physical axis");
    let omega = session.axis_value("omega").expect("physical axis");
    assert_close(tth, bragg_tth_degrees(1.0), 1.0e-9);
    // bissector: the sample bisects the scattering angle
    assert_close(omega, tth / 2.0, 1.0e-9);
}

#[test]
fn committed_geometry_reads_back_through_forward_kinematics() {
    let mut session = silicon_session("E4CV");

    let theta = (CU_KALPHA / (2.0 * SILICON_A)).asin().to_degrees();
    session.set_axis_value("phi", 90.0).expect("within limits");
    session.set_axis_value("chi", 0.0).expect("within limits");
    session.set_axis_value("omega", theta).expect("within limits");
    session.set_axis_value("tth", 2.0 * theta).expect("within limits");

    // every physical write refreshes the pseudo read-back
    assert_close(session.axis_value("h").expect("pseudo axis"), 1.0, 1.0e-9);
    assert_close(session.axis_value("k").expect("pseudo axis"), 0.0, 1.0e-9);
    assert_close(session.axis_value("l").expect("pseudo axis"), 0.0, 1.0e-9);
}

#[test]
fn superseded_solution_handles_cannot_commit() {
    let mut session = silicon_session("E4CV");

    let first = session.set_pseudo_values(&[1.0, 0.0, 0.0]).expect("reachable");
    let stale = first[0].id();
    session.set_pseudo_values(&[0.0, 1.0, 0.0]).expect("reachable");

    let error = session.select_solution(stale).expect_err("superseded");
    assert!(matches!(error, DiffcalcError::StaleSolution { .. }));
    // the failed selection did not disturb the pending set
    assert!(!session.engine().solutions().is_empty());
}

#[test]
fn re_initialization_discards_pending_solutions() {
    let mut session = silicon_session("E4CV");
    let solutions = session.set_pseudo_values(&[1.0, 0.0, 0.0]).expect("reachable");
    let stale = solutions[0].id();

    // selecting a sample rebinds the engine context; a handle minted under
    // the silicon UB must not commit against the new sample
    session
        .add_sample("lab6", Lattice::cubic(4.157).ok(), true)
        .expect("fresh name");
    assert!(session.engine().solutions().is_empty());
    assert!(matches!(
        session.select_solution(stale),
        Err(DiffcalcError::StaleSolution { .. })
    ));
    // the read-back reflects the live geometry, not the old target
    assert!((session.axis_value("h").expect("pseudo axis") - 1.0).abs() > 1.0e-3);

    // engine switches invalidate the same way
    let solutions = session.set_pseudo_values(&[1.0, 0.0, 0.0]).expect("reachable");
    let stale = solutions[0].id();
    session.set_engine("q").expect("registered");
    session.set_engine("hkl").expect("registered");
    assert!(matches!(
        session.select_solution(stale),
        Err(DiffcalcError::StaleSolution { .. })
    ));
}

#[test]
fn selecting_twice_requires_a_fresh_solve() {
    let mut session = silicon_session("E4CV");
    let solutions = session.set_pseudo_values(&[1.0, 0.0, 0.0]).expect("reachable");
    let id = solutions[0].id();
    session.select_solution(id).expect("fresh handle");
    assert!(session.engine().solutions().is_empty());
    assert!(matches!(
        session.select_solution(id),
        Err(DiffcalcError::StaleSolution { .. })
    ));
}

#[test]
fn unreachable_targets_fail_as_calculation_errors() {
    let mut session = silicon_session("E4CV");
    // |q| beyond the Ewald sphere for this wavelength
    let error = session.set_pseudo_values(&[8.0, 0.0, 0.0]).expect_err("unreachable");
    assert!(matches!(error, DiffcalcError::CalculationFailed { .. }));
}

#[test]
fn axis_limits_filter_solutions_and_widen_again() {
    let mut session = silicon_session("E4CV");
    session
        .parameter_mut("tth")
        .expect("registered")
        .set_limits(0.0, 10.0)
        .expect("ordered");

    // (100) needs tth of about 16 degrees, outside the window
    let error = session.set_pseudo_values(&[1.0, 0.0, 0.0]).expect_err("filtered out");
    assert!(matches!(error, DiffcalcError::CalculationFailed { .. }));

    session
        .parameter_mut("tth")
        .expect("registered")
        .set_limits(0.0, 180.0)
        .expect("ordered");
    let solutions = session.set_pseudo_values(&[1.0, 0.0, 0.0]).expect("reachable again");
    assert!(!solutions.is_empty());
}

#[test]
fn parameter_limits_survive_re_initialization() {
    let mut session = silicon_session("E4CV");
    session
        .parameter_mut("tth")
        .expect("registered")
        .set_limits(0.0, 10.0)
        .expect("ordered");

    // both switches trigger a re-initialization
    session.set_engine("q").expect("registered");
    session.set_engine("hkl").expect("registered");
    session.add_sample("second", None, true).expect("fresh name");

    let (low, high) = session.parameter("tth").expect("registered").limits();
    assert_close(low, 0.0, 1.0e-12);
    assert_close(high, 10.0, 1.0e-9);
}

#[test]
fn locked_sessions_refuse_engine_switches_everywhere() {
    let options = SessionOptions {
        lattice: Lattice::cubic(SILICON_A).ok(),
        lock_engine: true,
        ..SessionOptions::default()
    };
    let mut session = CalcSession::new("E4CV", options).expect("valid geometry");

    assert!(matches!(
        session.set_engine("q"),
        Err(DiffcalcError::EngineLocked { .. })
    ));
    assert!(matches!(
        session.calc(&[0.5], Some("q")),
        Err(DiffcalcError::EngineLocked { .. })
    ));
    assert!(matches!(
        session.using_engine(Some("q")).map(drop),
        Err(DiffcalcError::EngineLocked { .. })
    ));

    // no-override calls are unaffected by the lock
    session.calc(&[1.0, 0.0, 0.0], None).expect("active engine");
    assert_eq!(session.engine().name(), "hkl");
}

#[test]
fn scoped_engine_override_restores_on_drop() {
    let mut session = silicon_session("E4CV");

    {
        let mut scope = session.using_engine(Some("q")).expect("registered engine");
        assert_eq!(scope.engine().name(), "q");
        let solutions = scope.set_pseudo_values(&[0.5]).expect("reachable");
        let expected_tth = 2.0 * (0.5 * CU_KALPHA / 2.0).asin().to_degrees();
        assert_close(
            solutions[0].axis_value("tth").expect("registered axis"),
            expected_tth,
            1.0e-9,
        );
    }
    assert_eq!(session.engine().name(), "hkl");

    // nested overrides unwind innermost-first
    {
        let mut outer = session.using_engine(Some("q")).expect("registered engine");
        {
            let inner = outer.using_engine(Some("hkl")).expect("registered engine");
            assert_eq!(inner.engine().name(), "hkl");
        }
        assert_eq!(outer.engine().name(), "q");
    }
    assert_eq!(session.engine().name(), "hkl");
}

#[test]
fn calc_with_override_solves_under_the_named_engine() {
    let mut session = silicon_session("E4CV");
    let solutions = session.calc(&[0.5], Some("q")).expect("reachable");
    assert_eq!(solutions[0].pseudo_axis_names(), &["q".to_string()]);
    assert_eq!(session.engine().name(), "hkl");
}

#[test]
fn single_pseudo_axis_write_commits_immediately() {
    let mut session = silicon_session("E4CV");
    session.set_axis_value("h", 1.0).expect("reachable");

    assert_close(session.axis_value("h").expect("pseudo axis"), 1.0, 1.0e-9);
    assert_close(
        session.axis_value("tth").expect("physical axis"),
        bragg_tth_degrees(1.0),
        1.0e-9,
    );
    // the commit consumed the solution set
    assert!(session.engine().solutions().is_empty());
}

#[test]
fn switching_samples_changes_the_solve() {
    let mut session = silicon_session("E4CV");
    session
        .add_sample("lab6", Lattice::cubic(4.157).ok(), false)
        .expect("fresh name");

    let silicon = session.set_pseudo_values(&[1.0, 0.0, 0.0]).expect("reachable");
    session.set_sample("lab6").expect("registered");
    let lab6 = session.set_pseudo_values(&[1.0, 0.0, 0.0]).expect("reachable");

    let tth_si = silicon[0].axis_value("tth").expect("registered axis");
    let tth_lab6 = lab6[0].axis_value("tth").expect("registered axis");
    // smaller cell, wider scattering angle
    assert!(tth_lab6 > tth_si);
}

#[test]
fn six_circle_solutions_keep_the_extra_circles_parked() {
    let mut session = silicon_session("E6C");
    assert_eq!(
        session.physical_axis_names(),
        &["mu", "omega", "chi", "phi", "gamma", "delta"]
    );

    let solutions = session.set_pseudo_values(&[1.0, 1.0, 1.0]).expect("reachable");
    let solution = solutions[0].clone();
    assert_close(solution.axis_value("mu").expect("registered axis"), 0.0, 1.0e-12);
    assert_close(solution.axis_value("gamma").expect("registered axis"), 0.0, 1.0e-12);
    assert_close(
        solution.axis_value("delta").expect("registered axis"),
        bragg_tth_degrees(3.0f64.sqrt()),
        1.0e-9,
    );

    // committing copies the stored axis values exactly
    session.select_solution(solution.id()).expect("fresh handle");
    for axis in session.physical_axis_names() {
        assert_eq!(
            session.axis_value(axis).expect("physical axis"),
            solution.axis_value(axis).expect("registered axis"),
        );
    }
}

#[test]
fn constant_omega_mode_holds_the_named_axis() {
    let mut session = silicon_session("E4CV");
    session.set_axis_value("omega", 12.0).expect("within limits");
    session
        .engine_mut()
        .set_mode("constant_omega")
        .expect("registered mode");

    let solutions = session.set_pseudo_values(&[1.0, 0.0, 0.0]).expect("reachable");
    for solution in &solutions {
        assert_close(solution.axis_value("omega").expect("registered axis"), 12.0, 1.0e-9);
    }
}

#[test]
fn reflections_record_the_session_geometry() {
    let mut session = silicon_session("E4CV");
    let theta = (CU_KALPHA / (2.0 * SILICON_A)).asin().to_degrees();
    session.set_axis_value("tth", 2.0 * theta).expect("within limits");
    session.set_axis_value("omega", theta).expect("within limits");

    let id = session.add_reflection(1.0, 0.0, 0.0, None).expect("sample bound");
    let sample = session.sample().expect("sample bound");
    let reflection = &sample.reflections()[0];
    assert_eq!(reflection.id(), id);
    assert_close(
        reflection.geometry().axis_value("tth").expect("recorded"),
        (2.0 * theta).to_radians(),
        1.0e-12,
    );
    assert_close(reflection.geometry().wavelength, CU_KALPHA, 1.0e-12);
}
