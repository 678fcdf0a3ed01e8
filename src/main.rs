use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

use noise_trajectory::config::{load_scenario, Scenario};
use noise_trajectory::dynamics::state::{FOOT_PER_MINUTE, KNOT};
use noise_trajectory::sim::context::Milestones;
use noise_trajectory::sim::{LandingCalculator, LandingSetup, RunStatus, TakeOffCalculator, TakeOffSetup};
use noise_trajectory::sim::{CutbackSweep, LandingSummary, TakeOffSummary, TrajectoryResult};
use noise_trajectory::vehicle::aircraft::presets::twin_jet;
use noise_trajectory::vehicle::propulsion::presets::twin_turbofan;
use noise_trajectory::TrajectoryError;

const CUTBACK_SETTINGS: usize = 3;

const RULE: &str = "  ──────────────────────────────────────────────────────────────────";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let scenario = match std::env::args().nth(1) {
        Some(path) => load_scenario(&path).map_err(|e| e.to_string()),
        None => preset().map_err(|e| e.to_string()),
    };
    let scenario = match scenario {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "cannot set up scenario");
            return ExitCode::FAILURE;
        }
    };

    // -----------------------------------------------------------------------
    // Run both calculators
    // -----------------------------------------------------------------------
    let ac = &scenario.aircraft;
    let engine = &scenario.engine;

    let takeoff_setup = scenario.takeoff.clone().unwrap_or_default();
    let sweep_cutback = takeoff_setup.cutback.is_some();
    let takeoff = TakeOffCalculator::new(ac, engine, takeoff_setup).map(|c| {
        let sweep = sweep_cutback.then(|| c.run_cutback_sweep(CUTBACK_SETTINGS));
        (c.run(), sweep)
    });
    let landing = LandingCalculator::new(ac, engine, scenario.landing.clone().unwrap_or_default()).map(|c| c.run());

    println!();
    println!("====================================================================");
    println!("  NOISE CERTIFICATION TRAJECTORIES: {}", ac.name);
    println!("====================================================================");
    println!();
    println!("  Aircraft");
    println!("{RULE}");
    println!(
        "  MTOM:          {:>8.0} kg    MLM:          {:>8.0} kg",
        ac.max_takeoff_mass, ac.max_landing_mass
    );
    println!(
        "  Wing area:     {:>8.1} m^2   Span:         {:>8.1} m",
        ac.wing_area, ac.span
    );
    println!("  Engines:       {:>8} x {}", scenario.engine.engine_count, scenario.engine.name);
    println!();

    let mut ok = true;
    match takeoff {
        Ok((r, sweep)) => {
            ok &= print_takeoff(&r);
            if let Some(sweep) = &sweep {
                print_cutback_sweep(sweep);
            }
        }
        Err(e) => ok &= report_setup_error("take-off", &e),
    }
    match landing {
        Ok(r) => ok &= print_landing(&r),
        Err(e) => ok &= report_setup_error("landing", &e),
    }
    println!("====================================================================");
    println!();

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn preset() -> Result<Scenario, TrajectoryError> {
    Ok(Scenario {
        aircraft: twin_jet()?,
        engine: twin_turbofan(),
        takeoff: Some(TakeOffSetup::default()),
        landing: Some(LandingSetup::default()),
    })
}

fn report_setup_error(label: &str, e: &TrajectoryError) -> bool {
    error!(calculation = label, error = %e, "invalid setup");
    false
}

fn print_status<S>(r: &TrajectoryResult<S>) -> bool {
    match &r.status {
        RunStatus::Converged => println!("  Status:        converged"),
        RunStatus::Unconverged => println!("  Status:        best effort"),
        RunStatus::Stopped(e) => {
            println!("  Status:        stopped ({e})");
            return false;
        }
    }
    for w in &r.warnings {
        println!("  Warning:       {w}");
    }
    true
}

fn print_milestones(m: &Milestones) {
    for (label, milestone) in m.entries() {
        if let Some(t) = milestone.time() {
            println!("    {label:<24} {t:>8.2} s");
        }
    }
}

fn print_takeoff(r: &TrajectoryResult<TakeOffSummary>) -> bool {
    let s = &r.summary;
    println!("  Take-off");
    println!("{RULE}");
    if !print_status(r) {
        println!();
        return false;
    }
    println!(
        "  V_s:           {:>8.1} kt    V_rot:        {:>8.1} kt",
        s.stall_speed / KNOT,
        s.rotation_speed / KNOT
    );
    println!(
        "  V_LO:          {:>8.1} kt    V2:           {:>8.1} kt",
        s.lift_off_speed / KNOT,
        s.v2 / KNOT
    );
    if let (Some(v), Some(ratio)) = (s.climb_speed, s.climb_ratio) {
        println!("  V_climb:       {:>8.1} kt    V_climb/V_s:  {:>8.4}", v / KNOT, ratio);
    }
    println!("  Pitch reduction rate:  {:>8.2} deg/s ({} iterations)", s.alpha_reduction, s.iterations);
    if let Some(th) = s.cutback_throttle {
        println!("  Cutback throttle:      {:>8.3}", th);
    }
    println!(
        "  Final point:   {:>8.0} m at {:>6.0} m, t = {:.1} s, fuel {:.1} kg",
        s.final_distance, s.final_altitude, s.final_time, s.fuel_used
    );
    println!("  Milestones");
    print_milestones(&s.milestones);
    print_samples(r);
    true
}

fn print_cutback_sweep(sweep: &CutbackSweep) {
    println!("  Cutback sweep");
    println!("{RULE}");
    println!("  {:>9}  {:>10}  {:>10}  {:>9}", "throttle", "x (m)", "h (m)", "fuel (kg)");
    let cases = [("none", &sweep.full_thrust), ("required", &sweep.computed)]
        .into_iter()
        .map(|(label, r)| (label.to_string(), r))
        .chain(sweep.overrides.iter().map(|(th, r)| (format!("{th:.3}"), r)));
    for (label, r) in cases {
        if r.is_stopped() {
            println!("  {label:>9}  stopped");
            continue;
        }
        let s = &r.summary;
        println!("  {label:>9}  {:>10.0}  {:>10.1}  {:>9.1}", s.final_distance, s.final_altitude, s.fuel_used);
    }
    println!();
}

fn print_landing(r: &TrajectoryResult<LandingSummary>) -> bool {
    let s = &r.summary;
    println!("  Landing");
    println!("{RULE}");
    if !print_status(r) {
        println!();
        return false;
    }
    println!(
        "  V_s:           {:>8.1} kt    V_app:        {:>8.1} kt",
        s.stall_speed / KNOT,
        s.approach_speed / KNOT
    );
    println!(
        "  V_flare:       {:>8.1} kt    V_TD:         {:>8.1} kt",
        s.flare_speed / KNOT,
        s.touchdown_speed / KNOT
    );
    println!("  Flare pitch rate:      {:>8.3} deg/s ({} iterations)", s.alpha_dot_flare, s.iterations);
    if let Some(roc) = s.touchdown_rate_of_descent {
        println!("  Touchdown sink rate:   {:>8.1} ft/min", -roc / FOOT_PER_MINUTE);
    }
    if let Some(h) = s.flare_ending_altitude {
        println!("  Flare ended in a climb at {h:.2} m");
    }
    if let Some(p) = &s.certification_point {
        println!(
            "  Certification point:   {:>8.0} m, {:.1} m, EAS {:.1} kt, thrust {:.0} N",
            p.distance,
            p.altitude,
            p.equivalent_airspeed / KNOT,
            p.thrust
        );
    }
    if let Some(roll) = s.ground_roll {
        println!("  Ground roll:           {:>8.0} m", roll);
    }
    println!("  Landing distance:      {:>8.0} m", s.landing_distance);
    println!("  Milestones");
    print_milestones(&s.milestones);
    print_samples(r);
    true
}

fn print_samples<S>(r: &TrajectoryResult<S>) {
    println!();
    println!(
        "  {:>7}  {:>8}  {:>8}  {:>8}  {:>7}  {:>7}  {:>9}",
        "t (s)", "x (m)", "h (m)", "V (kt)", "alpha", "gamma", "T (kN)"
    );
    println!("  {}", "─".repeat(66));

    let every = (r.samples.len() / 30).max(1);
    let last = r.samples.len().saturating_sub(1);
    for (i, s) in r.samples.iter().enumerate() {
        if i % every != 0 && i != last && !r.breakpoints.contains(&s.time) {
            continue;
        }
        println!(
            "  {:>7.2}  {:>8.1}  {:>8.1}  {:>8.1}  {:>7.2}  {:>7.2}  {:>9.1}",
            s.time,
            s.distance,
            s.altitude,
            s.speed / KNOT,
            s.alpha,
            s.gamma,
            s.thrust / 1000.0
        );
    }
    println!();
}
