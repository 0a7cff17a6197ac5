//! Aimwatch CLI - replay harness
//!
//! Drives the detector with synthetic human and scripted aim so thresholds
//! can be tuned on a desktop without a game server.
//!
//! Usage: `aimwatch [settings.json]`

use std::fs;

use aimwatch::sim::{AimGenerator, HumanAim, RotationStream, ScriptedAim};
use aimwatch::{NoTargets, RotationAnomalyDetector, Settings, SubjectId, TargetId};

/// Updates replayed per subject (50ms apart)
const UPDATES: usize = 600;

/// One attack every this many updates
const ATTACK_EVERY: usize = 9;

fn load_settings() -> Result<Settings, String> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(Settings::default());
    };
    let json = fs::read_to_string(&path).map_err(|e| format!("cannot read {path}: {e}"))?;
    Settings::from_json(&json).map_err(|e| format!("invalid settings in {path}: {e}"))
}

fn replay<G: AimGenerator>(detector: &RotationAnomalyDetector, subject: SubjectId, generator: G) -> usize {
    let mut flags = 0;
    for (i, e) in RotationStream::new(generator, 0, 50).take(UPDATES).enumerate() {
        if let Some(flag) = detector.on_rotation(subject, e.timestamp, e.from_yaw, e.to_yaw, e.from_pitch, e.to_pitch) {
            println!("  FLAG {flag}");
            flags += 1;
        }
        if i % ATTACK_EVERY == 0 {
            detector.on_attack(subject, e.timestamp + 10, TargetId(1));
        }
    }
    flags
}

fn main() {
    println!("Aimwatch - rotation anomaly replay");
    println!("==================================");
    println!();

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let detector = match RotationAnomalyDetector::new(settings, NoTargets) {
        Ok(detector) => detector,
        Err(e) => {
            eprintln!("Settings rejected: {e}");
            std::process::exit(1);
        }
    };

    let scoring = &detector.settings().scoring;
    println!("Current Configuration:");
    println!("  - Flag threshold: {}", scoring.flag_threshold);
    println!("  - Decay per second: {}", scoring.decay_per_second);
    println!("  - Cooldown: {}ms", scoring.cooldown_ms);
    println!("  - Persist passes: {}", detector.settings().persistence.required_persist);
    for d in detector.descriptors() {
        println!("  - Enabled: {} [{}]", d.name, d.category);
    }
    println!();

    println!("Human aim (subject 1):");
    let human = replay(&detector, SubjectId(1), HumanAim::new());
    println!("  {human} flag(s)");
    println!();

    println!("Scripted aim, 2.0 degree steps (subject 2):");
    let scripted = replay(&detector, SubjectId(2), ScriptedAim::new(2.0));
    println!("  {scripted} flag(s)");
    println!();

    for id in [SubjectId(1), SubjectId(2)] {
        if let Some(snap) = detector.snapshot(id) {
            println!(
                "{}: score={:.2} passes={} persist={} baseline={}",
                id,
                snap.score,
                snap.analysis_passes,
                snap.persist_count,
                snap.baseline.is_some()
            );
        }
    }
}
