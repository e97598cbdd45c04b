use super::eligibility::{self, Candidate, PostView};
use super::rotation::{FatigueState, Stage};
use super::slots::{self, Slot};
use super::{
    selector, EngineOptions, QualificationPolicy, SchedError, Schedule, TeamPolicy, Warning,
    WarningKind,
};
use crate::catalog::Catalog;
use crate::model::{AssignedPersonnel, DutyAssignment, TimeWindow};
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;

pub(super) fn generate<R: Rng + ?Sized>(
    catalog: &Catalog,
    windows: &[TimeWindow],
    day: NaiveDate,
    opts: EngineOptions,
    rng: &mut R,
) -> Result<Schedule, SchedError> {
    opts.validate()?;

    let slots = slots::normalize(windows, day);
    let mut pool: Vec<Candidate<'_>> = catalog
        .personnel
        .iter()
        .map(|p| Candidate::resolve(catalog, p))
        .collect();
    if opts.shuffle_pool {
        pool.shuffle(rng);
    }
    let posts: Vec<PostView<'_>> = catalog
        .posts
        .iter()
        .map(|p| PostView::resolve(catalog, p))
        .collect();

    let mut run = Run {
        catalog,
        opts,
        pool,
        fatigue: FatigueState::default(),
        schedule: Schedule::default(),
    };
    for slot in &slots {
        for post in &posts {
            run.staff(post, slot);
        }
    }

    tracing::info!(
        windows = windows.len(),
        slots = slots.len(),
        posts = posts.len(),
        assignments = run.schedule.assignments.len(),
        warnings = run.schedule.warnings.len(),
        "duty generation finished"
    );
    Ok(run.schedule)
}

/// État d'une exécution ; abandonné à la fin.
struct Run<'a> {
    catalog: &'a Catalog,
    opts: EngineOptions,
    pool: Vec<Candidate<'a>>,
    fatigue: FatigueState,
    schedule: Schedule,
}

impl<'a> Run<'a> {
    fn staff(&mut self, post: &PostView<'a>, slot: &Slot) {
        let required = post.required();
        let eligible = eligibility::eligible(&self.pool, post);

        let mut short_reported = false;
        if eligible.len() < required {
            self.warn(
                post,
                slot,
                WarningKind::NotEnoughEligible {
                    eligible: eligible.len(),
                    required: post.post.required_count,
                },
            );
            if self.opts.team_policy == TeamPolicy::Strict {
                return;
            }
            short_reported = true;
        }

        let stages = self.fatigue.stages(&self.pool, &eligible, slot, &self.opts);
        let selection = selector::select(
            &self.pool,
            &stages,
            required,
            post.requirement.map(|t| &t.id),
            &self.catalog.incompatibilities,
            self.opts.qualification_policy,
        );

        // Un seul avertissement de pénurie par poste/créneau : éligibilité,
        // puis aptitude manquante, puis équipe incomplète.
        let missing = post.requirement.filter(|_| !selection.qualified);
        let short = selection.members.len() < required;
        match (short_reported, missing) {
            (false, Some(tag)) => self.warn(
                post,
                slot,
                WarningKind::MissingFunctionality {
                    functionality: tag.name.clone(),
                },
            ),
            (false, None) if short => self.warn(
                post,
                slot,
                WarningKind::Understaffed {
                    assigned: selection.members.len(),
                    required: post.post.required_count,
                },
            ),
            (true, Some(tag)) => {
                tracing::debug!(post = %post.post.name, functionality = %tag.name, "no available holder");
            }
            _ => {}
        }
        if missing.is_some() && self.opts.qualification_policy == QualificationPolicy::Drop {
            return;
        }
        if short && (self.opts.team_policy == TeamPolicy::Strict || selection.members.is_empty()) {
            return;
        }

        let relaxed: Vec<_> = selection
            .members
            .iter()
            .filter(|(_, stage)| *stage == Stage::Fallback)
            .map(|(idx, _)| self.pool[*idx].id().clone())
            .collect();
        if !relaxed.is_empty() {
            tracing::debug!(post = %post.post.name, count = relaxed.len(), "fallback pass used");
            self.warn(post, slot, WarningKind::RestRelaxed { personnel: relaxed });
        }

        let mut personnel = Vec::with_capacity(selection.members.len());
        for (idx, _) in &selection.members {
            let person = self.pool[*idx].person;
            self.fatigue.record(&person.id, slot.end);
            personnel.push(AssignedPersonnel {
                id: person.id.clone(),
                name: person.display_name(),
            });
        }
        self.schedule.assignments.push(DutyAssignment {
            post_id: post.post.id.clone(),
            post: post.post.name.clone(),
            personnel,
            start: slot.start,
            end: slot.end,
        });
    }

    fn warn(&mut self, post: &PostView<'_>, slot: &Slot, kind: WarningKind) {
        let warning = Warning {
            post_id: post.post.id.clone(),
            post: post.post.name.clone(),
            start: slot.start,
            end: slot.end,
            kind,
        };
        tracing::warn!("{warning}");
        self.schedule.warnings.push(warning);
    }
}
