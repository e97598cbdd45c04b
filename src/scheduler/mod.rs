mod assignment;
mod conflicts;
mod eligibility;
mod rotation;
mod selector;
pub mod slots;
mod types;
mod util;

pub use types::{
    Conflict, ConflictKind, EngineOptions, QualificationPolicy, SchedError, Schedule, TeamPolicy,
    Warning, WarningKind,
};

use crate::catalog::Catalog;
use crate::model::TimeWindow;
use chrono::NaiveDate;
use rand::Rng;

/// Moteur d'affectation : lit un instantané du catalogue, ne le modifie jamais.
#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    catalog: &'a Catalog,
    opts: EngineOptions,
}

impl<'a> Engine<'a> {
    pub fn new(catalog: &'a Catalog, opts: EngineOptions) -> Self {
        Self { catalog, opts }
    }

    /// Génère les affectations pour `windows`, ancrés sur `day`.
    ///
    /// Créneaux traités dans l'ordre fourni, postes dans l'ordre du catalogue.
    /// `rng` ne sert qu'à mélanger le vivier une fois (si `shuffle_pool`).
    pub fn generate<R: Rng + ?Sized>(
        &self,
        windows: &[TimeWindow],
        day: NaiveDate,
        rng: &mut R,
    ) -> Result<Schedule, SchedError> {
        assignment::generate(self.catalog, windows, day, self.opts, rng)
    }

    pub fn detect_conflicts(&self) -> Vec<Conflict> {
        conflicts::detect_conflicts(self.catalog)
    }
}
