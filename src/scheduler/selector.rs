use super::eligibility::Candidate;
use super::rotation::Stage;
use super::QualificationPolicy;
use crate::model::{Incompatibilities, TagId};

/// Équipe retenue pour un poste et un créneau.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Selection {
    /// Indices du vivier, dans l'ordre d'admission, avec leur palier d'origine.
    pub members: Vec<(usize, Stage)>,
    /// Faux si une aptitude est exigée et qu'aucun membre ne la détient.
    pub qualified: bool,
}

struct Team<'p, 'a> {
    pool: &'p [Candidate<'a>],
    incompatibilities: &'p Incompatibilities,
    requirement: Option<&'p TagId>,
    members: Vec<(usize, Stage)>,
}

impl<'p, 'a> Team<'p, 'a> {
    fn len(&self) -> usize {
        self.members.len()
    }

    fn contains(&self, idx: usize) -> bool {
        self.members.iter().any(|(m, _)| *m == idx)
    }

    /// Ni déjà membre, ni incompatible (dans un sens ou l'autre) avec un membre.
    fn admits(&self, idx: usize) -> bool {
        let id = self.pool[idx].id();
        !self.contains(idx)
            && self
                .members
                .iter()
                .all(|(m, _)| !self.incompatibilities.contains(id, self.pool[*m].id()))
    }

    fn qualifies(&self, idx: usize) -> bool {
        self.requirement.is_some_and(|req| self.pool[idx].holds(req))
    }

    fn needs_qualified(&self) -> bool {
        self.requirement.is_some() && !self.members.iter().any(|(m, _)| self.qualifies(*m))
    }
}

/// Compose une équipe de `required` personnes au plus.
///
/// Les paliers sont parcourus dans l'ordre ; chacun complète l'équipe laissée
/// par le précédent. Tant que l'aptitude exigée manque, le premier titulaire
/// compatible du palier est admis en premier et la dernière place lui reste
/// réservée. Si aucun titulaire n'est trouvé, `FillUnqualified` lève la
/// réserve pour compléter l'équipe.
pub(crate) fn select(
    pool: &[Candidate<'_>],
    stages: &[(Stage, Vec<usize>)],
    required: usize,
    requirement: Option<&TagId>,
    incompatibilities: &Incompatibilities,
    policy: QualificationPolicy,
) -> Selection {
    let mut team = Team {
        pool,
        incompatibilities,
        requirement,
        members: Vec::with_capacity(required),
    };

    for (stage, candidates) in stages {
        if team.len() >= required {
            break;
        }
        if team.needs_qualified() {
            if let Some(&idx) = candidates
                .iter()
                .find(|&&idx| team.qualifies(idx) && team.admits(idx))
            {
                team.members.push((idx, *stage));
            }
        }
        for &idx in candidates {
            if team.len() >= required {
                break;
            }
            if !team.admits(idx) {
                continue;
            }
            if team.needs_qualified() && !team.qualifies(idx) && team.len() + 1 == required {
                continue;
            }
            team.members.push((idx, *stage));
        }
    }

    if team.len() < required
        && team.needs_qualified()
        && policy == QualificationPolicy::FillUnqualified
    {
        for (stage, candidates) in stages {
            for &idx in candidates {
                if team.len() >= required {
                    break;
                }
                if team.admits(idx) {
                    team.members.push((idx, *stage));
                }
            }
        }
    }

    let qualified = !team.needs_qualified();
    Selection {
        members: team.members,
        qualified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::model::{Personnel, PersonnelId, TagKind};

    struct Fixture {
        catalog: Catalog,
        marksman: TagId,
    }

    /// A (Marksman), B, C, D ; A — B incompatibles.
    fn fixture() -> Fixture {
        let mut catalog = Catalog::default();
        let marksman = catalog.add_tag(TagKind::Functionality, "Marksman").unwrap();
        let mut a = Personnel::new("A", "A").with_id(PersonnelId::new("a"));
        a.functionalities.insert(marksman.clone());
        let a = catalog.insert_personnel(a, &[]);
        catalog.insert_personnel(Personnel::new("B", "B").with_id(PersonnelId::new("b")), &[a]);
        catalog.insert_personnel(Personnel::new("C", "C").with_id(PersonnelId::new("c")), &[]);
        catalog.insert_personnel(Personnel::new("D", "D").with_id(PersonnelId::new("d")), &[]);
        Fixture { catalog, marksman }
    }

    fn indices(sel: &Selection) -> Vec<usize> {
        sel.members.iter().map(|(i, _)| *i).collect()
    }

    #[test]
    fn incompatible_pairs_are_never_admitted_together() {
        let f = fixture();
        let pool: Vec<_> = f.catalog.personnel.iter().map(|p| Candidate::resolve(&f.catalog, p)).collect();
        let stages = vec![(Stage::FullRest, vec![1, 0, 2])];
        let sel = select(&pool, &stages, 2, None, &f.catalog.incompatibilities, QualificationPolicy::Drop);
        assert_eq!(indices(&sel), vec![1, 2]);
        assert!(sel.qualified);
    }

    #[test]
    fn qualified_candidate_is_preferred() {
        let f = fixture();
        let pool: Vec<_> = f.catalog.personnel.iter().map(|p| Candidate::resolve(&f.catalog, p)).collect();
        let stages = vec![(Stage::FullRest, vec![2, 3, 0])];
        let sel = select(
            &pool,
            &stages,
            2,
            Some(&f.marksman),
            &f.catalog.incompatibilities,
            QualificationPolicy::Drop,
        );
        assert_eq!(indices(&sel), vec![0, 2]);
        assert!(sel.qualified);
    }

    #[test]
    fn last_seat_is_kept_for_a_qualified_member_of_a_later_stage() {
        let f = fixture();
        let pool: Vec<_> = f.catalog.personnel.iter().map(|p| Candidate::resolve(&f.catalog, p)).collect();
        let stages = vec![
            (Stage::FullRest, vec![2, 3]),
            (Stage::MinRest, vec![0]),
            (Stage::Fallback, vec![]),
        ];
        let sel = select(
            &pool,
            &stages,
            2,
            Some(&f.marksman),
            &f.catalog.incompatibilities,
            QualificationPolicy::Drop,
        );
        assert_eq!(sel.members, vec![(2, Stage::FullRest), (0, Stage::MinRest)]);
    }

    #[test]
    fn missing_qualification_follows_policy() {
        let f = fixture();
        let pool: Vec<_> = f.catalog.personnel.iter().map(|p| Candidate::resolve(&f.catalog, p)).collect();
        let stages = vec![(Stage::FullRest, vec![1, 2])];

        let dropped = select(
            &pool,
            &stages,
            2,
            Some(&f.marksman),
            &f.catalog.incompatibilities,
            QualificationPolicy::Drop,
        );
        assert_eq!(indices(&dropped), vec![1]);
        assert!(!dropped.qualified);

        let filled = select(
            &pool,
            &stages,
            2,
            Some(&f.marksman),
            &f.catalog.incompatibilities,
            QualificationPolicy::FillUnqualified,
        );
        assert_eq!(indices(&filled), vec![1, 2]);
        assert!(!filled.qualified);
    }
}
