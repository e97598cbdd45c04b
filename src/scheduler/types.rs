use crate::model::{DutyAssignment, DutyId, GuardDuty, PersonnelId, PostId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Sort d'une équipe incomplète.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamPolicy {
    /// Une équipe incomplète n'est pas affectée (seul l'avertissement reste).
    Strict,
    /// Une équipe incomplète mais non vide est affectée, avec avertissement.
    #[default]
    AllowPartial,
}

/// Sort d'un poste exigeant une aptitude que personne de disponible ne détient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationPolicy {
    /// Le poste est pourvu sans titulaire de l'aptitude, avec avertissement.
    #[default]
    FillUnqualified,
    /// Le poste n'est pas pourvu pour ce créneau.
    Drop,
}

/// Options du moteur d'affectation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub team_policy: TeamPolicy,
    pub qualification_policy: QualificationPolicy,
    /// Repos complet : multiple de la durée du créneau.
    pub full_rest_factor: u32,
    /// Repos minimal : multiple de la durée du créneau.
    pub min_rest_factor: u32,
    /// Mélange le vivier une fois par exécution.
    pub shuffle_pool: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            team_policy: TeamPolicy::AllowPartial,
            qualification_policy: QualificationPolicy::FillUnqualified,
            full_rest_factor: 2,
            min_rest_factor: 1,
            shuffle_pool: true,
        }
    }
}

impl EngineOptions {
    pub(crate) fn validate(&self) -> Result<(), SchedError> {
        if self.min_rest_factor > self.full_rest_factor {
            return Err(SchedError::InvalidOptions(
                "min_rest_factor cannot exceed full_rest_factor",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// Le filtre d'éligibilité laisse moins de candidats que requis.
    NotEnoughEligible { eligible: usize, required: u32 },
    /// Pas d'équipe complète sans incompatibilité ni fatigue.
    Understaffed { assigned: usize, required: u32 },
    /// Aucun titulaire disponible de l'aptitude exigée.
    MissingFunctionality { functionality: String },
    /// Le repos minimal a été levé pour compléter l'équipe.
    RestRelaxed { personnel: Vec<PersonnelId> },
}

/// Avertissement non bloquant sur un couple poste/créneau.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub post_id: PostId,
    pub post: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = format!(
            "{} → {}",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        );
        match &self.kind {
            WarningKind::NotEnoughEligible { eligible, required } => write!(
                f,
                "Not enough eligible for '{}' ({eligible} of {required}) [{slot}]",
                self.post
            ),
            WarningKind::Understaffed { assigned, required } => write!(
                f,
                "Couldn't find conflict-free team for '{}' ({assigned} of {required}) [{slot}]",
                self.post
            ),
            WarningKind::MissingFunctionality { functionality } => write!(
                f,
                "No available holder of '{functionality}' for '{}' [{slot}]",
                self.post
            ),
            WarningKind::RestRelaxed { personnel } => write!(
                f,
                "Minimum rest relaxed for '{}' ({} person(s)) [{slot}]",
                self.post,
                personnel.len()
            ),
        }
    }
}

/// Résultat d'une exécution : affectations ordonnées et avertissements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub assignments: Vec<DutyAssignment>,
    pub warnings: Vec<Warning>,
}

impl Schedule {
    pub fn warnings_for<'a>(&'a self, post: &'a str) -> impl Iterator<Item = &'a Warning> + 'a {
        self.warnings.iter().filter(move |w| w.post == post)
    }

    pub fn assignments_for<'a>(&'a self, post: &'a str) -> impl Iterator<Item = &'a DutyAssignment> + 'a {
        self.assignments.iter().filter(move |a| a.post == post)
    }

    /// Une garde par personne affectée, prête à être enregistrée.
    pub fn to_duties(&self) -> Vec<GuardDuty> {
        self.assignments
            .iter()
            .flat_map(|a| {
                a.personnel.iter().filter_map(move |p| {
                    GuardDuty::new(p.id.clone(), a.post_id.clone(), a.start, a.end).ok()
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Overlap,
    Incompatible,
    Excluded,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::Overlap => "overlap",
            ConflictKind::Incompatible => "incompatible",
            ConflictKind::Excluded => "excluded",
        }
    }
}

/// Conflit relevé sur les gardes enregistrées.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub personnel: PersonnelId,
    /// Second membre concerné (incompatibilité).
    pub other: Option<PersonnelId>,
    pub duty_a: DutyId,
    pub duty_b: Option<DutyId>,
}

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("invalid engine options: {0}")]
    InvalidOptions(&'static str),
}
