//! Scint Array demo entry point
//!
//! Builds the array from a settings file (or the defaults), prints the
//! construction report and scores a seeded batch of synthetic events.

use std::process::ExitCode;

use anyhow::{Context, Result};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use scint_array::consts::SHIELD_COPY_OFFSET;
use scint_array::geometry::{CRYSTAL_COLLECTION, SHIELD_COLLECTION};
use scint_array::report::ConstructionReport;
use scint_array::scoring::{
    Aggregate, Channel, CollectionRegistry, EventHits, EventProcessor, RecordingSink,
};
use scint_array::{Settings, build_array};

/// Cs-137 photopeak (MeV)
const PHOTOPEAK: f64 = 0.6617;

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => {
            Settings::load(&path).with_context(|| format!("loading settings from {path}"))?
        }
        None => Settings::default(),
    };
    log::info!("Scint Array starting...");

    let geometry = build_array(&settings.array).context("building the array")?;
    println!("{}", ConstructionReport::new(&geometry));

    let collections = CollectionRegistry::from_geometry(&geometry);
    let processor = EventProcessor::new(&geometry, &collections, &settings.scoring)
        .context("setting up event scoring")?;
    let crystal = collections.id(CRYSTAL_COLLECTION)?;
    let shield = geometry
        .shield_mode()
        .is_enabled()
        .then(|| collections.id(SHIELD_COLLECTION))
        .transpose()?;

    let mut rng = Pcg32::seed_from_u64(settings.scoring.seed);
    let mut sink = RecordingSink::new();
    let total = geometry.total_crystals();
    let shields = geometry.layout().segments;

    let mut fired = 0u64;
    for event_id in 0..settings.scoring.demo_events {
        let mut hits = EventHits::new(event_id);
        hits.open(crystal);

        // Full absorption in one crystal, or a Compton scatter shared with a neighbour
        let first = rng.random_range(1..=total);
        if rng.random_bool(0.6) {
            hits.deposit(crystal, first, PHOTOPEAK);
        } else {
            let share = rng.random_range(0.1..0.9);
            let second = rng.random_range(1..=total);
            hits.deposit(crystal, first, PHOTOPEAK * share);
            hits.deposit(crystal, second, PHOTOPEAK * (1.0 - share));
        }

        if let Some(shield) = shield {
            hits.open(shield);
            if rng.random_bool(0.2) {
                let copy = SHIELD_COPY_OFFSET + rng.random_range(0..shields);
                hits.deposit(shield, copy, PHOTOPEAK * rng.random_range(0.05..0.5));
            }
        }

        let summary = processor
            .process_event(&hits, &mut rng, &mut sink)
            .with_context(|| format!("scoring event {event_id}"))?;
        fired += summary.fired_crystals as u64;
    }

    let total_spectrum = sink.values(Channel::Aggregate(Aggregate::Total));
    let mean = if total_spectrum.is_empty() {
        0.0
    } else {
        total_spectrum.iter().sum::<f64>() / total_spectrum.len() as f64
    };
    log::info!(
        "Scored {} events: {} crystal hits, {} ntuple rows, mean hit energy {:.1} keV",
        settings.scoring.demo_events,
        fired,
        sink.rows().len(),
        mean
    );
    for aggregate in Aggregate::ALL {
        log::info!(
            "  {} (histogram {:?}): {} entries",
            aggregate.as_str(),
            Channel::Aggregate(aggregate).histogram_id(total),
            sink.count(Channel::Aggregate(aggregate))
        );
    }
    Ok(())
}
