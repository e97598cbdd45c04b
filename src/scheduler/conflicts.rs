use super::eligibility::{self, Candidate, PostView};
use super::{util, Conflict, ConflictKind};
use crate::catalog::Catalog;
use crate::model::GuardDuty;

/// Audite les gardes enregistrées : chevauchements par personne,
/// incompatibles de garde ensemble, restrictions violées.
pub(super) fn detect_conflicts(catalog: &Catalog) -> Vec<Conflict> {
    let mut out = Vec::new();

    for person in catalog.personnel.iter() {
        let mut duties: Vec<&GuardDuty> = catalog
            .duties
            .iter()
            .filter(|d| d.personnel == person.id)
            .collect();
        duties.sort_by_key(|d| d.start);

        for (idx, a) in duties.iter().enumerate() {
            for b in duties.iter().skip(idx + 1) {
                if util::overlaps(a.start, a.end, b.start, b.end) {
                    out.push(Conflict {
                        kind: ConflictKind::Overlap,
                        personnel: person.id.clone(),
                        other: None,
                        duty_a: a.id.clone(),
                        duty_b: Some(b.id.clone()),
                    });
                }
            }
        }

        let candidate = Candidate::resolve(catalog, person);
        for duty in &duties {
            let Some(post) = catalog.find_post(&duty.post) else {
                continue;
            };
            if eligibility::is_excluded(&candidate, &PostView::resolve(catalog, post)) {
                out.push(Conflict {
                    kind: ConflictKind::Excluded,
                    personnel: person.id.clone(),
                    other: None,
                    duty_a: duty.id.clone(),
                    duty_b: None,
                });
            }
        }
    }

    for (idx, a) in catalog.duties.iter().enumerate() {
        for b in catalog.duties.iter().skip(idx + 1) {
            if a.post == b.post
                && catalog.incompatibilities.contains(&a.personnel, &b.personnel)
                && util::overlaps(a.start, a.end, b.start, b.end)
            {
                out.push(Conflict {
                    kind: ConflictKind::Incompatible,
                    personnel: a.personnel.clone(),
                    other: Some(b.personnel.clone()),
                    duty_a: a.id.clone(),
                    duty_b: Some(b.id.clone()),
                });
            }
        }
    }

    out
}
