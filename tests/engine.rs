#![forbid(unsafe_code)]
use chrono::{Duration, NaiveDate};
use gardes::{
    Catalog, Engine, EngineOptions, Personnel, PersonnelId, Post, SchedError, Schedule, TagId,
    TagKind, TeamPolicy, TimeWindow, WarningKind,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
}

fn pinned() -> EngineOptions {
    EngineOptions {
        shuffle_pool: false,
        ..EngineOptions::default()
    }
}

fn run(catalog: &Catalog, opts: EngineOptions, windows: &[TimeWindow], seed: u64) -> Schedule {
    let mut rng = StdRng::seed_from_u64(seed);
    Engine::new(catalog, opts)
        .generate(windows, day(), &mut rng)
        .unwrap()
}

fn simple(names: &[&str], posts: &[(&str, u32)]) -> Catalog {
    let mut c = Catalog::default();
    for n in names {
        c.insert_personnel(Personnel::new(*n, "x").with_id(PersonnelId::new(n)), &[]);
    }
    for (name, count) in posts {
        c.insert_post(Post::new(*name, *count).unwrap()).unwrap();
    }
    c
}

/// Dix personnes, trois postes, aptitudes, restrictions et incompatibilités mêlées.
fn busy_catalog() -> Catalog {
    let mut c = Catalog::default();
    let medic = c.add_tag(TagKind::Functionality, "Medic").unwrap();
    let heights_r = c.add_tag(TagKind::Restriction, "Heights").unwrap();
    let heights_c = c.add_tag(TagKind::Condition, "Heights").unwrap();

    let mut ids = Vec::new();
    for i in 0..10 {
        let mut p = Personnel::new(format!("P{i}"), "x").with_id(PersonnelId::new(format!("p{i}")));
        if i % 3 == 0 {
            p.functionalities.insert(medic.clone());
        }
        if i % 4 == 1 {
            p.restrictions.insert(heights_r.clone());
        }
        let others: Vec<PersonnelId> = ids.iter().filter(|_| i % 5 == 2).take(2).cloned().collect();
        ids.push(c.insert_personnel(p, &others));
    }

    let mut tower = Post::new("Tower", 2).unwrap();
    tower.conditions.insert(heights_c);
    c.insert_post(tower).unwrap();
    let mut aid = Post::new("Aid", 2).unwrap();
    aid.requires_functionality = Some(medic);
    c.insert_post(aid).unwrap();
    c.insert_post(Post::new("Gate", 3).unwrap()).unwrap();
    c
}

fn busy_windows() -> Vec<TimeWindow> {
    vec![
        TimeWindow::new("06:00", "10:00"),
        TimeWindow::new("10:00", "14:00"),
        TimeWindow::new("14:00", "18:00"),
        TimeWindow::new("22:00", "06:00"),
    ]
}

#[test]
fn same_seed_same_schedule() {
    let catalog = busy_catalog();
    let opts = EngineOptions::default();
    let a = run(&catalog, opts, &busy_windows(), 42);
    let b = run(&catalog, opts, &busy_windows(), 42);
    assert_eq!(a, b);
    assert!(!a.assignments.is_empty());
}

#[test]
fn hard_constraints_hold_for_many_seeds() {
    let catalog = busy_catalog();
    for seed in 0..32 {
        let schedule = run(&catalog, EngineOptions::default(), &busy_windows(), seed);
        for a in &schedule.assignments {
            let post = catalog.find_post(&a.post_id).unwrap();
            assert!(!a.personnel.is_empty());
            assert!(a.personnel.len() <= post.required_count as usize);
            assert!(a.end > a.start);

            for (i, x) in a.personnel.iter().enumerate() {
                for y in a.personnel.iter().skip(i + 1) {
                    assert!(!catalog.incompatibilities.contains(&x.id, &y.id), "seed {seed}");
                    assert!(!catalog.incompatibilities.contains(&y.id, &x.id), "seed {seed}");
                }
            }

            if a.post == "Tower" {
                for p in &a.personnel {
                    let person = catalog.find_personnel(&p.id).unwrap();
                    let names: Vec<_> = person
                        .restrictions
                        .iter()
                        .filter_map(|id| catalog.find_tag(id))
                        .map(|t| t.name.as_str())
                        .collect();
                    assert!(!names.contains(&"Heights"), "seed {seed}");
                }
            }
        }
    }
}

#[test]
fn nobody_holds_two_posts_in_one_window() {
    let catalog = busy_catalog();
    let schedule = run(&catalog, EngineOptions::default(), &busy_windows(), 3);
    let mut seen: HashMap<(String, chrono::NaiveDateTime), usize> = HashMap::new();
    for a in &schedule.assignments {
        for p in &a.personnel {
            *seen.entry((p.id.as_str().to_string(), a.start)).or_default() += 1;
        }
    }
    assert!(seen.values().all(|n| *n == 1));
}

#[test]
fn overnight_window_ends_next_day() {
    let catalog = simple(&["x"], &[("Gate", 1)]);
    let schedule = run(&catalog, pinned(), &[TimeWindow::new("22:00", "06:00")], 0);
    let a = &schedule.assignments[0];
    assert_eq!(a.end - a.start, Duration::hours(8));
    assert_eq!(a.end.date(), day().succ_opt().unwrap());
}

#[test]
fn malformed_windows_do_not_abort_the_run() {
    let catalog = simple(&["x"], &[("Gate", 1)]);
    let windows = vec![
        TimeWindow::new("nope", "06:00"),
        TimeWindow::default(),
        TimeWindow::new("08:00", "12:00"),
    ];
    let schedule = run(&catalog, pinned(), &windows, 0);
    assert_eq!(schedule.assignments.len(), 1);
    assert!(schedule.warnings.is_empty());
}

#[test]
fn rotation_respects_minimum_rest() {
    let catalog = simple(&["x", "y"], &[("Gate", 1)]);
    let windows = vec![
        TimeWindow::new("08:00", "12:00"),
        TimeWindow::new("12:00", "16:00"),
        TimeWindow::new("16:00", "20:00"),
    ];
    let schedule = run(&catalog, pinned(), &windows, 0);

    let who: Vec<_> = schedule
        .assignments
        .iter()
        .map(|a| a.personnel[0].id.as_str())
        .collect();
    assert_eq!(who, vec!["x", "y", "x"]);
    assert!(schedule.warnings.is_empty());

    let x: Vec<_> = schedule
        .assignments
        .iter()
        .filter(|a| a.personnel[0].id.as_str() == "x")
        .collect();
    assert!(x[1].start - x[0].end >= x[1].end - x[1].start);
}

#[test]
fn fallback_pass_is_reported() {
    let catalog = simple(&["x"], &[("Gate", 1)]);
    let windows = vec![
        TimeWindow::new("08:00", "12:00"),
        TimeWindow::new("12:00", "16:00"),
    ];
    let schedule = run(&catalog, pinned(), &windows, 0);

    assert_eq!(schedule.assignments.len(), 2);
    assert_eq!(schedule.warnings.len(), 1);
    assert_eq!(
        schedule.warnings[0].kind,
        WarningKind::RestRelaxed {
            personnel: vec![PersonnelId::new("x")]
        }
    );
    assert_eq!(schedule.warnings[0].start, day().and_hms_opt(12, 0, 0).unwrap());
}

#[test]
fn overlapping_windows_never_double_book() {
    let catalog = simple(&["x"], &[("Gate", 1)]);
    let windows = vec![
        TimeWindow::new("08:00", "12:00"),
        TimeWindow::new("10:00", "14:00"),
    ];
    let schedule = run(&catalog, pinned(), &windows, 0);
    assert_eq!(schedule.assignments.len(), 1);
    assert!(matches!(
        schedule.warnings[0].kind,
        WarningKind::Understaffed { assigned: 0, required: 1 }
    ));
}

#[test]
fn scarcity_allows_partial_team() {
    let catalog = simple(&["x", "y"], &[("Gate", 3)]);
    let schedule = run(&catalog, pinned(), &[TimeWindow::new("09:00", "13:00")], 0);

    assert_eq!(schedule.warnings.len(), 1);
    insta::assert_snapshot!(
        schedule.warnings[0].to_string(),
        @"Not enough eligible for 'Gate' (2 of 3) [2025-10-01 09:00 → 2025-10-01 13:00]"
    );
    assert_eq!(schedule.assignments.len(), 1);
    assert_eq!(schedule.assignments[0].personnel.len(), 2);
}

#[test]
fn scarcity_strict_drops_post() {
    let catalog = simple(&["x", "y"], &[("Gate", 3)]);
    let opts = EngineOptions {
        team_policy: TeamPolicy::Strict,
        ..pinned()
    };
    let schedule = run(&catalog, opts, &[TimeWindow::new("09:00", "13:00")], 0);

    assert_eq!(schedule.warnings.len(), 1);
    assert_eq!(schedule.warnings[0].post, "Gate");
    assert!(schedule.assignments.is_empty());
}

#[test]
fn scarce_post_with_requirement_warns_once() {
    let mut catalog = simple(&["x", "y"], &[]);
    let marksman = catalog.add_tag(TagKind::Functionality, "Marksman").unwrap();
    let mut tower = Post::new("Tower", 3).unwrap();
    tower.requires_functionality = Some(marksman);
    catalog.insert_post(tower).unwrap();
    let windows = [TimeWindow::new("09:00", "13:00")];

    let partial = run(&catalog, pinned(), &windows, 0);
    assert_eq!(partial.warnings.len(), 1);
    assert!(matches!(
        partial.warnings[0].kind,
        WarningKind::NotEnoughEligible { eligible: 2, required: 3 }
    ));
    assert_eq!(partial.assignments.len(), 1);

    let strict = EngineOptions {
        team_policy: TeamPolicy::Strict,
        ..pinned()
    };
    let schedule = run(&catalog, strict, &windows, 0);
    assert_eq!(schedule.warnings.len(), 1);
    assert!(schedule.assignments.is_empty());
}

#[test]
fn unqualified_incompatible_team_warns_once() {
    let mut catalog = simple(&["x", "y", "z"], &[]);
    let marksman = catalog.add_tag(TagKind::Functionality, "Marksman").unwrap();
    let mut tower = Post::new("Tower", 2).unwrap();
    tower.requires_functionality = Some(marksman);
    catalog.insert_post(tower).unwrap();
    for (a, b) in [("x", "y"), ("x", "z"), ("y", "z")] {
        catalog
            .add_incompatibility(&PersonnelId::new(a), &PersonnelId::new(b))
            .unwrap();
    }
    let strict = EngineOptions {
        team_policy: TeamPolicy::Strict,
        ..pinned()
    };

    let schedule = run(&catalog, strict, &[TimeWindow::new("09:00", "13:00")], 0);
    assert!(schedule.assignments.is_empty());
    assert_eq!(schedule.warnings.len(), 1);
    assert_eq!(
        schedule.warnings[0].kind,
        WarningKind::MissingFunctionality {
            functionality: "Marksman".into()
        }
    );
}

#[test]
fn incompatibility_shortfall_is_understaffed() {
    let mut catalog = simple(&["x", "y"], &[("Gate", 2)]);
    catalog
        .add_incompatibility(&PersonnelId::new("x"), &PersonnelId::new("y"))
        .unwrap();

    let strict = EngineOptions {
        team_policy: TeamPolicy::Strict,
        ..pinned()
    };
    let schedule = run(&catalog, strict, &[TimeWindow::new("09:00", "13:00")], 0);
    assert!(schedule.assignments.is_empty());
    insta::assert_snapshot!(
        schedule.warnings[0].to_string(),
        @"Couldn't find conflict-free team for 'Gate' (1 of 2) [2025-10-01 09:00 → 2025-10-01 13:00]"
    );

    let partial = run(&catalog, pinned(), &[TimeWindow::new("09:00", "13:00")], 0);
    assert_eq!(partial.assignments[0].personnel.len(), 1);
    assert_eq!(partial.warnings.len(), 1);
}

#[test]
fn restricted_person_is_never_assigned() {
    let mut catalog = Catalog::default();
    let cond = catalog.add_tag(TagKind::Condition, "Night").unwrap();
    let restr = catalog.add_tag(TagKind::Restriction, "Night").unwrap();
    let mut p = Personnel::new("x", "x");
    p.restrictions.insert(restr);
    catalog.insert_personnel(p, &[]);
    let mut post = Post::new("Watch", 1).unwrap();
    post.conditions.insert(cond);
    catalog.insert_post(post).unwrap();

    let schedule = run(&catalog, pinned(), &[TimeWindow::new("22:00", "02:00")], 0);
    assert!(schedule.assignments.is_empty());
    assert_eq!(schedule.warnings.len(), 1);
    assert!(matches!(
        schedule.warnings[0].kind,
        WarningKind::NotEnoughEligible { eligible: 0, required: 1 }
    ));
}

#[test]
fn stale_references_are_ignored() {
    let mut catalog = simple(&["x"], &[]);
    let mut post = Post::new("Gate", 1).unwrap();
    post.requires_functionality = Some(TagId::new("ghost"));
    post.conditions.insert(TagId::new("ghost-condition"));
    catalog.posts.push(post);
    catalog
        .incompatibilities
        .insert(&PersonnelId::new("x"), &PersonnelId::new("ghost"));

    let schedule = run(&catalog, pinned(), &[TimeWindow::new("09:00", "13:00")], 0);
    assert_eq!(schedule.assignments.len(), 1);
    assert!(schedule.warnings.is_empty());
}

#[test]
fn invalid_rest_factors_fail_the_run() {
    let catalog = simple(&["x"], &[("Gate", 1)]);
    let opts = EngineOptions {
        full_rest_factor: 1,
        min_rest_factor: 2,
        ..pinned()
    };
    let mut rng = StdRng::seed_from_u64(0);
    let err = Engine::new(&catalog, opts)
        .generate(&[TimeWindow::new("09:00", "13:00")], day(), &mut rng)
        .unwrap_err();
    assert!(matches!(err, SchedError::InvalidOptions(_)));
}

#[test]
fn empty_catalog_yields_empty_schedule() {
    let catalog = Catalog::default();
    let schedule = run(&catalog, pinned(), &[TimeWindow::new("09:00", "13:00")], 0);
    assert_eq!(schedule, Schedule::default());
}
