//! Event hit processor
//!
//! Turns the deposit maps of one event into channel fills and ntuple rows.
//! Shield blocks are scored first so every crystal row can carry the event's
//! hottest shield. A whole event is validated before anything reaches the
//! sink, so a bad deposit never leaves a half-scored event behind.

use crate::consts::{KEV, SHIELD_COPY_OFFSET};
use crate::error::{Error, Result};
use crate::geometry::{ArrayGeometry, CRYSTAL_COLLECTION, Layout, SHIELD_COLLECTION};
use crate::settings::ScoringSettings;

use super::channel::{Aggregate, Channel, NtupleRow, ShieldColumns};
use super::collections::{CollectionId, CollectionRegistry, DepositMap, EventHits};
use super::resolution::{GaussianSource, ResolutionCurve, smear};
use super::selection::SelectionGroups;
use super::sink::AnalysisSink;

/// What one event produced
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EventSummary {
    pub event_id: u64,
    /// Crystals with a positive deposit
    pub fired_crystals: u32,
    pub fired_shields: u32,
    /// Crystals listed with a zero deposit
    pub dropped_crystals: u32,
    /// Smeared crystal energy summed over the event (keV)
    pub crystal_energy: f64,
    pub crystal_raw_energy: f64,
    /// Smeared shield energy summed over the event (keV)
    pub shield_energy: f64,
}

/// Scores events against one geometry
///
/// Holds no per-event state: share it across workers and give each worker
/// its own random source and sink.
#[derive(Debug, Clone)]
pub struct EventProcessor<'g> {
    geometry: &'g ArrayGeometry,
    layout: Layout,
    crystal_collection: CollectionId,
    shield_collection: Option<CollectionId>,
    curve: Option<ResolutionCurve>,
    selection: SelectionGroups,
    print_modulo: u64,
}

impl<'g> EventProcessor<'g> {
    /// Resolve the hits collections and check the selection groups against the layout
    pub fn new(
        geometry: &'g ArrayGeometry,
        collections: &CollectionRegistry,
        settings: &ScoringSettings,
    ) -> Result<Self> {
        let crystal_collection = collections.id(CRYSTAL_COLLECTION)?;
        let shield_collection = if geometry.shield_mode().is_enabled() {
            Some(collections.id(SHIELD_COLLECTION)?)
        } else {
            None
        };
        let layout = geometry.layout();
        settings.selection.validate(&layout)?;

        let curve = ResolutionCurve::for_material(geometry.crystal_material());
        if curve.is_none() {
            log::warn!(
                "No resolution curve for '{}', crystal energies are not smeared",
                geometry.crystal_material().as_str()
            );
        }

        Ok(Self {
            geometry,
            layout,
            crystal_collection,
            shield_collection,
            curve,
            selection: settings.selection.clone(),
            print_modulo: settings.print_modulo,
        })
    }

    pub fn with_print_modulo(mut self, print_modulo: u64) -> Self {
        self.print_modulo = print_modulo;
        self
    }

    pub fn geometry(&self) -> &'g ArrayGeometry {
        self.geometry
    }

    /// Score the collections of one event
    pub fn process_event<G, S>(
        &self,
        hits: &EventHits,
        rng: &mut G,
        sink: &mut S,
    ) -> Result<EventSummary>
    where
        G: GaussianSource + ?Sized,
        S: AnalysisSink + ?Sized,
    {
        let crystals = hits
            .get(self.crystal_collection)
            .ok_or_else(|| Error::MissingCollection(CRYSTAL_COLLECTION.to_string()))?;
        let shields = match self.shield_collection {
            Some(id) => Some(
                hits.get(id)
                    .ok_or_else(|| Error::MissingCollection(SHIELD_COLLECTION.to_string()))?,
            ),
            None => None,
        };
        self.process_deposits(hits.event_id, crystals, shields, rng, sink)
    }

    /// Score raw deposit maps (MeV) of one event
    pub fn process_deposits<G, S>(
        &self,
        event_id: u64,
        crystals: &DepositMap,
        shields: Option<&DepositMap>,
        rng: &mut G,
        sink: &mut S,
    ) -> Result<EventSummary>
    where
        G: GaussianSource + ?Sized,
        S: AnalysisSink + ?Sized,
    {
        if self.print_modulo != 0 && event_id % self.print_modulo == 0 {
            log::info!("---> Begin of event: {}", event_id);
        }

        let total = self.layout.total();
        check_deposits(CRYSTAL_COLLECTION, crystals, |copy| {
            (1..=total).contains(&copy)
        })?;
        if let Some(shields) = shields {
            let ring = self.geometry.shield_copy_numbers();
            check_deposits(SHIELD_COLLECTION, shields, |copy| {
                copy < SHIELD_COPY_OFFSET || ring.contains(&copy)
            })?;
        }

        let mut summary = EventSummary {
            event_id,
            ..Default::default()
        };

        let mut hottest: Option<ShieldColumns> = None;
        for (&copy, &edep) in shields.into_iter().flatten() {
            if copy < SHIELD_COPY_OFFSET {
                log::warn!("Event {}: shield deposit with copy number {} ignored", event_id, copy);
                continue;
            }
            if edep <= 0.0 {
                continue;
            }
            let s = smear(rng, Some(ResolutionCurve::BGO), edep / KEV);
            log::debug!(
                "ComptSupp Nb{}: E {} keV, Resolution Corrected E {} keV, FWHM {}",
                copy,
                s.raw,
                s.energy,
                s.fwhm
            );
            sink.fill(Channel::Shield(copy - SHIELD_COPY_OFFSET), s.energy);
            summary.fired_shields += 1;
            summary.shield_energy += s.energy;
            if hottest.is_none_or(|h| s.raw > h.raw_energy) {
                hottest = Some(ShieldColumns {
                    copy_number: copy,
                    energy: s.energy,
                    raw_energy: s.raw,
                });
            }
        }

        let material = self.geometry.crystal_material().as_str();
        for (&copy, &edep) in crystals {
            if edep <= 0.0 {
                summary.dropped_crystals += 1;
                continue;
            }
            let s = smear(rng, self.curve, edep / KEV);
            log::debug!(
                "{} Nb{}: E {} keV, Resolution Corrected E {} keV, FWHM {}",
                material,
                copy,
                s.raw,
                s.energy,
                s.fwhm
            );

            sink.fill(Channel::Crystal(copy), s.energy);
            sink.fill(Channel::CrystalRaw(copy), s.raw);
            sink.fill(Channel::Aggregate(Aggregate::Total), s.energy);
            sink.fill(Channel::Aggregate(Aggregate::TotalRaw), s.raw);

            let primary = self.selection.primary.contains(&self.layout, copy);
            if primary {
                sink.fill(Channel::Aggregate(Aggregate::Primary), s.energy);
                sink.fill(Channel::Aggregate(Aggregate::PrimaryRaw), s.raw);
            }
            let secondary = self.selection.secondary.contains(&self.layout, copy);
            if secondary {
                sink.fill(Channel::Aggregate(Aggregate::Secondary), s.energy);
                sink.fill(Channel::Aggregate(Aggregate::SecondaryRaw), s.raw);
            }

            sink.add_row(NtupleRow {
                event_id,
                copy_number: copy,
                energy: s.energy,
                raw_energy: s.raw,
                primary: primary.then_some((s.energy, s.raw)),
                secondary: secondary.then_some((s.energy, s.raw)),
                shield: hottest,
            });

            summary.fired_crystals += 1;
            summary.crystal_energy += s.energy;
            summary.crystal_raw_energy += s.raw;
        }
        if summary.dropped_crystals > 0 {
            log::debug!(
                "Event {}: {} crystals without deposit dropped",
                event_id,
                summary.dropped_crystals
            );
        }

        Ok(summary)
    }
}

/// Reject unknown copy numbers and energies that are negative or not finite
fn check_deposits(
    collection: &str,
    deposits: &DepositMap,
    known: impl Fn(u32) -> bool,
) -> Result<()> {
    for (&copy_number, &energy) in deposits {
        if !known(copy_number) {
            return Err(Error::UnknownCopyNumber {
                collection: collection.to_string(),
                copy_number,
            });
        }
        if !(energy.is_finite() && energy >= 0.0) {
            return Err(Error::InvalidDeposit {
                collection: collection.to_string(),
                copy_number,
                energy,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::sink::RecordingSink;
    use crate::settings::{ArraySpec, CrystalMaterial, ShieldMode};
    use crate::{build_array, consts};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    /// Returns the mean; lets tests check routing without noise
    struct NoNoise;

    impl GaussianSource for NoNoise {
        fn gaussian(&mut self, mean: f64, _sigma: f64) -> f64 {
            mean
        }
    }

    fn geometry(spec: ArraySpec) -> ArrayGeometry {
        build_array(&ArraySpec {
            check_overlaps: false,
            ..spec
        })
        .unwrap()
    }

    fn deposits(pairs: &[(u32, f64)]) -> DepositMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_canonical_exclusions() {
        let geometry = geometry(ArraySpec::default());
        let collections = CollectionRegistry::from_geometry(&geometry);
        let processor =
            EventProcessor::new(&geometry, &collections, &ScoringSettings::default()).unwrap();

        let mut sink = RecordingSink::new();
        let all: DepositMap = (1..=45).map(|c| (c, 0.5)).collect();
        let summary = processor
            .process_deposits(0, &all, None, &mut NoNoise, &mut sink)
            .unwrap();
        assert_eq!(summary.fired_crystals, 45);

        let primary = Channel::Aggregate(Aggregate::Primary);
        let secondary = Channel::Aggregate(Aggregate::Secondary);
        assert_eq!(sink.count(Channel::Aggregate(Aggregate::Total)), 45);
        assert_eq!(sink.count(primary), 30);
        assert_eq!(sink.count(secondary), 40);
        assert_eq!(sink.count(Channel::Aggregate(Aggregate::SecondaryRaw)), 40);

        for row in sink.rows() {
            let c = row.copy_number;
            assert_eq!(row.primary.is_some(), c % 3 != 0, "crystal {c}");
            assert_eq!(row.secondary.is_some(), !(c % 3 == 0 && c <= 15), "crystal {c}");
            assert_eq!(row.shield, None);
        }
    }

    #[test]
    fn test_energy_converted_to_kev() {
        let geometry = geometry(ArraySpec::default());
        let collections = CollectionRegistry::from_geometry(&geometry);
        let processor =
            EventProcessor::new(&geometry, &collections, &ScoringSettings::default()).unwrap();
        let mut sink = RecordingSink::new();
        processor
            .process_deposits(1, &deposits(&[(5, 0.6617)]), None, &mut NoNoise, &mut sink)
            .unwrap();
        let raw = sink.values(Channel::CrystalRaw(5))[0];
        assert!((raw - 0.6617 / consts::KEV).abs() < 1e-9);
        assert!((raw - 661.7).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_material_passes_through() {
        let geometry = geometry(ArraySpec {
            crystal_material: CrystalMaterial::Other("G4_Al".to_string()),
            ..Default::default()
        });
        let collections = CollectionRegistry::from_geometry(&geometry);
        let processor =
            EventProcessor::new(&geometry, &collections, &ScoringSettings::default()).unwrap();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut sink = RecordingSink::new();
        processor
            .process_deposits(0, &deposits(&[(1, 1.0), (2, 0.2)]), None, &mut rng, &mut sink)
            .unwrap();
        assert_eq!(sink.values(Channel::Crystal(1)), sink.values(Channel::CrystalRaw(1)));
        assert_eq!(sink.values(Channel::Crystal(2)), &[0.2 / consts::KEV]);
    }

    #[test]
    fn test_shield_routing() {
        let geometry = geometry(ArraySpec {
            shield: ShieldMode::Bgo,
            ..Default::default()
        });
        let collections = CollectionRegistry::from_geometry(&geometry);
        let processor =
            EventProcessor::new(&geometry, &collections, &ScoringSettings::default()).unwrap();

        let crystals = deposits(&[(4, 0.3)]);
        let shields = deposits(&[(42, 0.1), (100, 0.2), (114, 0.5)]);
        let mut sink = RecordingSink::new();
        let summary = processor
            .process_deposits(9, &crystals, Some(&shields), &mut NoNoise, &mut sink)
            .unwrap();

        assert_eq!(summary.fired_shields, 2);
        assert_eq!(sink.values(Channel::Shield(0)), &[0.2 / consts::KEV]);
        assert_eq!(sink.values(Channel::Shield(14)), &[0.5 / consts::KEV]);
        // Copy 42 is below the shield range and never becomes a shield channel
        assert_eq!(sink.channels().filter(|c| matches!(c, Channel::Shield(_))).count(), 2);

        let row = &sink.rows()[0];
        assert_eq!(row.shield.map(|s| s.copy_number), Some(114));
        assert_eq!(Channel::Shield(14).histogram_id(45), Some(61));
    }

    #[test]
    fn test_process_event_resolves_collections() {
        let geometry = geometry(ArraySpec {
            shield: ShieldMode::Bgo,
            ..Default::default()
        });
        let collections = CollectionRegistry::from_geometry(&geometry);
        let processor =
            EventProcessor::new(&geometry, &collections, &ScoringSettings::default()).unwrap();
        let crystal = collections.id(CRYSTAL_COLLECTION).unwrap();
        let shield = collections.id(SHIELD_COLLECTION).unwrap();

        let mut hits = EventHits::new(2);
        hits.deposit(crystal, 1, 1.0);
        let err = processor
            .process_event(&hits, &mut NoNoise, &mut RecordingSink::new())
            .unwrap_err();
        assert_eq!(err, Error::MissingCollection(SHIELD_COLLECTION.to_string()));

        hits.open(shield);
        let summary = processor
            .process_event(&hits, &mut NoNoise, &mut RecordingSink::new())
            .unwrap();
        assert_eq!(summary.fired_crystals, 1);
        assert_eq!(summary.fired_shields, 0);
    }

    #[test]
    fn test_missing_collection_is_fatal() {
        let geometry = geometry(ArraySpec {
            shield: ShieldMode::Bgo,
            ..Default::default()
        });
        let mut collections = CollectionRegistry::new();
        collections.register(CRYSTAL_COLLECTION);
        let err = EventProcessor::new(&geometry, &collections, &ScoringSettings::default())
            .unwrap_err();
        assert_eq!(err, Error::MissingCollection(SHIELD_COLLECTION.to_string()));
    }

    #[test]
    fn test_bad_deposits_leave_sink_untouched() {
        let geometry = geometry(ArraySpec::default());
        let collections = CollectionRegistry::from_geometry(&geometry);
        let processor =
            EventProcessor::new(&geometry, &collections, &ScoringSettings::default()).unwrap();
        let mut sink = RecordingSink::new();

        let err = processor
            .process_deposits(0, &deposits(&[(1, 1.0), (46, 1.0)]), None, &mut NoNoise, &mut sink)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownCopyNumber { copy_number: 46, .. }));

        let err = processor
            .process_deposits(0, &deposits(&[(1, 1.0), (2, -0.1)]), None, &mut NoNoise, &mut sink)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDeposit { copy_number: 2, .. }));

        let err = processor
            .process_deposits(0, &deposits(&[(3, f64::NAN)]), None, &mut NoNoise, &mut sink)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDeposit { copy_number: 3, .. }));

        assert_eq!(sink, RecordingSink::new());
    }

    #[test]
    fn test_zero_deposits_are_not_fired() {
        let geometry = geometry(ArraySpec::default());
        let collections = CollectionRegistry::from_geometry(&geometry);
        let processor =
            EventProcessor::new(&geometry, &collections, &ScoringSettings::default()).unwrap();
        let mut sink = RecordingSink::new();
        let summary = processor
            .process_deposits(
                0,
                &deposits(&[(1, 0.0), (2, 0.4), (3, 0.0), (4, 0.0)]),
                None,
                &mut NoNoise,
                &mut sink,
            )
            .unwrap();
        assert_eq!(summary.fired_crystals, 1);
        assert_eq!(summary.dropped_crystals, 3);
        assert_eq!(sink.count(Channel::Crystal(1)), 0);
        assert_eq!(sink.rows().len(), 1);
    }

    #[test]
    fn test_selection_must_fit_layout() {
        let geometry = geometry(ArraySpec {
            segments: 12,
            ..Default::default()
        });
        let collections = CollectionRegistry::from_geometry(&geometry);
        let err = EventProcessor::new(&geometry, &collections, &ScoringSettings::default())
            .unwrap_err();
        assert!(matches!(err, Error::SelectionMismatch { .. }));
    }

    #[test]
    fn test_smeared_spread_matches_resolution() {
        let geometry = geometry(ArraySpec::default());
        let collections = CollectionRegistry::from_geometry(&geometry);
        let processor =
            EventProcessor::new(&geometry, &collections, &ScoringSettings::default())
                .unwrap()
                .with_print_modulo(0);
        let mut rng = Pcg32::seed_from_u64(2024);
        let mut sink = RecordingSink::new();
        let one_mev = deposits(&[(1, 1.0)]);
        for event in 0..50_000 {
            processor
                .process_deposits(event, &one_mev, None, &mut rng, &mut sink)
                .unwrap();
        }
        let values = sink.values(Channel::Crystal(1));
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let sd = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
        let expected = ResolutionCurve::CEBR3.sigma(1000.0);
        assert!((sd - expected).abs() / expected < 0.02, "sd {sd}, expected {expected}");
    }

    #[test]
    fn test_parallel_workers_share_geometry() {
        let geometry = geometry(ArraySpec::default());
        let collections = CollectionRegistry::from_geometry(&geometry);
        let processor =
            EventProcessor::new(&geometry, &collections, &ScoringSettings::default())
                .unwrap()
                .with_print_modulo(0);

        let sinks: Vec<RecordingSink> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4u64)
                .map(|worker| {
                    let processor = &processor;
                    scope.spawn(move || {
                        let mut rng = Pcg32::seed_from_u64(worker);
                        let mut sink = RecordingSink::new();
                        for event in 0..100 {
                            let hits = deposits(&[((event % 45) as u32 + 1, 0.5)]);
                            processor
                                .process_deposits(event, &hits, None, &mut rng, &mut sink)
                                .unwrap();
                        }
                        sink
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut merged = RecordingSink::new();
        for sink in sinks {
            merged.merge(sink);
        }
        assert_eq!(merged.count(Channel::Aggregate(Aggregate::Total)), 400);
        assert_eq!(merged.rows().len(), 400);
    }
}
