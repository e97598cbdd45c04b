use super::eligibility::Candidate;
use super::slots::Slot;
use super::EngineOptions;
use crate::model::PersonnelId;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;

/// Palier de relâchement du repos, du plus au moins exigeant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Stage {
    FullRest,
    MinRest,
    Fallback,
}

/// Fin de la dernière garde de chaque personne, propre à une exécution.
///
/// Absence d'entrée = jamais affecté (repos infini).
#[derive(Debug, Default)]
pub(crate) struct FatigueState {
    last_end: HashMap<PersonnelId, NaiveDateTime>,
}

impl FatigueState {
    pub fn elapsed(&self, id: &PersonnelId, at: NaiveDateTime) -> Option<Duration> {
        self.last_end.get(id).map(|end| at - *end)
    }

    pub fn record(&mut self, id: &PersonnelId, end: NaiveDateTime) {
        self.last_end.insert(id.clone(), end);
    }

    /// Classe chaque personne éligible dans son palier, ordre du vivier conservé.
    /// Une personne dont la dernière garde n'est pas terminée au début du
    /// créneau n'apparaît dans aucun palier.
    pub fn stages(
        &self,
        pool: &[Candidate<'_>],
        eligible: &[usize],
        slot: &Slot,
        opts: &EngineOptions,
    ) -> Vec<(Stage, Vec<usize>)> {
        let duration = slot.duration();
        let full = scaled(duration, opts.full_rest_factor);
        let min = scaled(duration, opts.min_rest_factor);

        let mut full_rest = Vec::new();
        let mut min_rest = Vec::new();
        let mut fallback = Vec::new();
        for &idx in eligible {
            match self.elapsed(pool[idx].id(), slot.start) {
                None => full_rest.push(idx),
                Some(e) if e >= full => full_rest.push(idx),
                Some(e) if e >= min => min_rest.push(idx),
                Some(e) if e >= Duration::zero() => fallback.push(idx),
                Some(_) => {}
            }
        }
        vec![
            (Stage::FullRest, full_rest),
            (Stage::MinRest, min_rest),
            (Stage::Fallback, fallback),
        ]
    }
}

fn scaled(duration: Duration, factor: u32) -> Duration {
    Duration::seconds(duration.num_seconds().saturating_mul(i64::from(factor)))
}
