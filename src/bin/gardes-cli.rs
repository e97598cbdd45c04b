#![forbid(unsafe_code)]
use anyhow::{anyhow, bail, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gardes::{
    io,
    model::{DutyId, GuardDuty, Personnel, PersonnelId, Post, PostId, TagId, TagKind},
    scheduler::{Engine, EngineOptions, QualificationPolicy, TeamPolicy},
    storage::{JsonStorage, Storage},
    Catalog,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de répartition des gardes
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON du catalogue
    #[arg(long, global = true, default_value = "catalog.json")]
    catalog: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Aptitudes, restrictions, conditions
    Tag {
        #[command(subcommand)]
        cmd: TagCmd,
    },
    /// Membres du personnel
    Personnel {
        #[command(subcommand)]
        cmd: PersonnelCmd,
    },
    /// Incompatibilités entre deux membres
    Incompatible {
        #[command(subcommand)]
        cmd: IncompatibleCmd,
    },
    /// Postes de garde
    Post {
        #[command(subcommand)]
        cmd: PostCmd,
    },
    /// Gardes enregistrées
    Duty {
        #[command(subcommand)]
        cmd: DutyCmd,
    },
    /// Générer les affectations pour des créneaux
    Generate(GenerateArgs),
    /// Vérifier les gardes enregistrées
    Check {
        /// Export CSV des conflits (optionnel)
        #[arg(long)]
        report: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Functionality,
    Restriction,
    Condition,
}

impl From<KindArg> for TagKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Functionality => TagKind::Functionality,
            KindArg::Restriction => TagKind::Restriction,
            KindArg::Condition => TagKind::Condition,
        }
    }
}

#[derive(Subcommand, Debug)]
enum TagCmd {
    Add {
        #[arg(value_enum)]
        kind: KindArg,
        name: String,
    },
    List {
        #[arg(value_enum)]
        kind: KindArg,
    },
    Remove {
        #[arg(value_enum)]
        kind: KindArg,
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum PersonnelCmd {
    Add {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        personal_id: Option<String>,
        /// Aptitudes (noms), répétable
        #[arg(long = "functionality")]
        functionalities: Vec<String>,
        /// Restrictions (noms), répétable
        #[arg(long = "restriction")]
        restrictions: Vec<String>,
        /// Membres incompatibles (id ou index), répétable
        #[arg(long = "incompatible-with")]
        incompatible_with: Vec<String>,
    },
    List,
    /// id ou index
    Remove { who: String },
    /// Import CSV `first_name,last_name[,personal_id][,functionalities][,restrictions]`
    Import {
        #[arg(long)]
        csv: String,
    },
}

#[derive(Subcommand, Debug)]
enum IncompatibleCmd {
    Add { a: String, b: String },
    Remove { a: String, b: String },
}

#[derive(Subcommand, Debug)]
enum PostCmd {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 1)]
        required_count: u32,
        /// Aptitude qu'au moins un membre doit détenir
        #[arg(long)]
        requires: Option<String>,
        #[arg(long = "condition")]
        conditions: Vec<String>,
        #[arg(long = "restriction")]
        restrictions: Vec<String>,
        #[arg(long = "functionality")]
        functionalities: Vec<String>,
    },
    List,
    Remove { name: String },
}

#[derive(Subcommand, Debug)]
enum DutyCmd {
    Add {
        /// id ou index
        #[arg(long)]
        personnel: String,
        /// nom du poste
        #[arg(long)]
        post: String,
        /// ISO, ex. 2025-10-01T08:00
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    List,
    Remove { id: String },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Créneau "HH:MM-HH:MM", répétable
    #[arg(long = "window")]
    windows: Vec<String>,
    /// Fichier JSON `{"shift_times": [{"start": "HH:MM", "end": "HH:MM"}]}`
    #[arg(long)]
    request: Option<String>,
    /// Date de référence (YYYY-MM-DD), aujourd'hui par défaut
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Graine du mélange du vivier
    #[arg(long)]
    seed: Option<u64>,
    /// N'affecte pas les équipes incomplètes
    #[arg(long)]
    strict: bool,
    /// Abandonne un poste sans titulaire de l'aptitude exigée
    #[arg(long)]
    drop_unqualified: bool,
    /// Garde l'ordre du catalogue (pas de mélange)
    #[arg(long)]
    no_shuffle: bool,
    #[arg(long, default_value_t = 2)]
    full_rest_factor: u32,
    #[arg(long, default_value_t = 1)]
    min_rest_factor: u32,
    #[arg(long)]
    out_json: Option<String>,
    #[arg(long)]
    out_csv: Option<String>,
    /// Enregistre les affectations comme gardes
    #[arg(long)]
    save: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let storage = JsonStorage::open(&cli.catalog)?;
    let mut catalog = storage.load_or_default()?;

    let code = match cli.cmd {
        Commands::Tag { cmd } => {
            run_tag(&mut catalog, cmd)?;
            storage.save(&catalog)?;
            0
        }
        Commands::Personnel { cmd } => {
            run_personnel(&mut catalog, cmd)?;
            storage.save(&catalog)?;
            0
        }
        Commands::Incompatible { cmd } => {
            match cmd {
                IncompatibleCmd::Add { a, b } => {
                    let a = resolve_personnel(&catalog, &a)?;
                    let b = resolve_personnel(&catalog, &b)?;
                    if a == b {
                        bail!("a person cannot be incompatible with themselves");
                    }
                    catalog.add_incompatibility(&a, &b)?;
                }
                IncompatibleCmd::Remove { a, b } => {
                    let a = resolve_personnel(&catalog, &a)?;
                    let b = resolve_personnel(&catalog, &b)?;
                    catalog.remove_incompatibility(&a, &b);
                }
            }
            storage.save(&catalog)?;
            0
        }
        Commands::Post { cmd } => {
            run_post(&mut catalog, cmd)?;
            storage.save(&catalog)?;
            0
        }
        Commands::Duty { cmd } => {
            run_duty(&mut catalog, cmd)?;
            storage.save(&catalog)?;
            0
        }
        Commands::Generate(args) => run_generate(&mut catalog, &storage, args)?,
        Commands::Check { report } => {
            let conflicts = Engine::new(&catalog, EngineOptions::default()).detect_conflicts();
            if conflicts.is_empty() {
                println!("OK: no conflicts");
                0
            } else {
                eprintln!("Found {} conflict(s)", conflicts.len());
                if let Some(path) = report {
                    let mut w = csv::Writer::from_path(path)?;
                    w.write_record(["kind", "personnel_id", "other_id", "duty_a", "duty_b"])?;
                    for c in &conflicts {
                        w.write_record([
                            c.kind.as_str(),
                            c.personnel.as_str(),
                            c.other.as_ref().map(|o| o.as_str()).unwrap_or(""),
                            c.duty_a.as_str(),
                            c.duty_b.as_ref().map(|d| d.as_str()).unwrap_or(""),
                        ])?;
                    }
                    w.flush()?;
                }
                // Code 2 = WARNING/INCOMPLETE
                2
            }
        }
    };

    std::process::exit(code);
}

fn run_tag(catalog: &mut Catalog, cmd: TagCmd) -> Result<()> {
    match cmd {
        TagCmd::Add { kind, name } => {
            let id = catalog.add_tag(kind.into(), name)?;
            println!("{}", id.as_str());
        }
        TagCmd::List { kind } => {
            for t in catalog.tags_of_kind(kind.into()) {
                println!("{} | {}", t.id.as_str(), t.name);
            }
        }
        TagCmd::Remove { kind, name } => {
            let id = tag_id(catalog, kind.into(), &name)?;
            catalog.remove_tag(&id)?;
        }
    }
    Ok(())
}

fn run_personnel(catalog: &mut Catalog, cmd: PersonnelCmd) -> Result<()> {
    match cmd {
        PersonnelCmd::Add {
            first_name,
            last_name,
            personal_id,
            functionalities,
            restrictions,
            incompatible_with,
        } => {
            let mut person = Personnel::new(first_name, last_name);
            person.personal_id = personal_id;
            for name in &functionalities {
                person
                    .functionalities
                    .insert(tag_id(catalog, TagKind::Functionality, name)?);
            }
            for name in &restrictions {
                person
                    .restrictions
                    .insert(tag_id(catalog, TagKind::Restriction, name)?);
            }
            let others = incompatible_with
                .iter()
                .map(|w| resolve_personnel(catalog, w))
                .collect::<Result<Vec<_>>>()?;
            let id = catalog.insert_personnel(person, &others);
            println!("{}", id.as_str());
        }
        PersonnelCmd::List => {
            for p in catalog.personnel_by_index() {
                let tags = |ids: &std::collections::BTreeSet<TagId>| {
                    ids.iter()
                        .filter_map(|id| catalog.find_tag(id))
                        .map(|t| t.name.as_str())
                        .collect::<Vec<_>>()
                        .join(",")
                };
                let incompatible = catalog
                    .incompatibilities
                    .partners_of(&p.id)
                    .filter_map(|id| catalog.find_personnel(id))
                    .map(|o| o.index.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                println!(
                    "{:>3} | {} | {} | functionalities: {} | restrictions: {} | incompatible: {}",
                    p.index,
                    p.id.as_str(),
                    p.display_name(),
                    tags(&p.functionalities),
                    tags(&p.restrictions),
                    incompatible
                );
            }
        }
        PersonnelCmd::Remove { who } => {
            let id = resolve_personnel(catalog, &who)?;
            catalog.remove_personnel(&id)?;
        }
        PersonnelCmd::Import { csv } => {
            let ids = io::import_personnel_csv(csv, catalog)?;
            println!("{} personnel imported", ids.len());
        }
    }
    Ok(())
}

fn run_post(catalog: &mut Catalog, cmd: PostCmd) -> Result<()> {
    match cmd {
        PostCmd::Add {
            name,
            required_count,
            requires,
            conditions,
            restrictions,
            functionalities,
        } => {
            if catalog.find_post_by_name(&name).is_some() {
                bail!("post '{name}' already exists");
            }
            let mut post = Post::new(name, required_count).map_err(anyhow::Error::msg)?;
            post.requires_functionality = requires
                .map(|n| tag_id(catalog, TagKind::Functionality, &n))
                .transpose()?;
            for n in &conditions {
                post.conditions.insert(tag_id(catalog, TagKind::Condition, n)?);
            }
            for n in &restrictions {
                post.restrictions.insert(tag_id(catalog, TagKind::Restriction, n)?);
            }
            for n in &functionalities {
                post.functionalities
                    .insert(tag_id(catalog, TagKind::Functionality, n)?);
            }
            let id = catalog.insert_post(post)?;
            println!("{}", id.as_str());
        }
        PostCmd::List => {
            for p in &catalog.posts {
                let requires = p
                    .requires_functionality
                    .as_ref()
                    .and_then(|id| catalog.find_tag(id))
                    .map(|t| t.name.as_str())
                    .unwrap_or("-");
                println!(
                    "{} | {} | required: {} | requires: {}",
                    p.id.as_str(),
                    p.name,
                    p.required_count,
                    requires
                );
            }
        }
        PostCmd::Remove { name } => {
            let id = post_id(catalog, &name)?;
            catalog.remove_post(&id)?;
        }
    }
    Ok(())
}

fn run_duty(catalog: &mut Catalog, cmd: DutyCmd) -> Result<()> {
    match cmd {
        DutyCmd::Add {
            personnel,
            post,
            start,
            end,
        } => {
            let person = resolve_personnel(catalog, &personnel)?;
            let post = post_id(catalog, &post)?;
            let start = io::parse_instant(&start)?;
            let end = io::parse_instant(&end)?;
            let duty = GuardDuty::new(person, post, start, end).map_err(anyhow::Error::msg)?;
            let id = catalog.add_duty(duty)?;
            println!("{}", id.as_str());
        }
        DutyCmd::List => {
            for d in &catalog.duties {
                let who = catalog
                    .find_personnel(&d.personnel)
                    .map(|p| p.display_name())
                    .unwrap_or_else(|| "-".to_string());
                let post = catalog
                    .find_post(&d.post)
                    .map(|p| p.name.as_str())
                    .unwrap_or("-");
                println!(
                    "{} | {} | {} | {} → {}",
                    d.id.as_str(),
                    who,
                    post,
                    d.start.format("%Y-%m-%dT%H:%M"),
                    d.end.format("%Y-%m-%dT%H:%M")
                );
            }
        }
        DutyCmd::Remove { id } => {
            catalog.remove_duty(&DutyId::new(id))?;
        }
    }
    Ok(())
}

fn run_generate(catalog: &mut Catalog, storage: &JsonStorage, args: GenerateArgs) -> Result<i32> {
    let mut windows = match &args.request {
        Some(path) => io::load_request(path)?,
        None => Vec::new(),
    };
    windows.extend(args.windows.iter().map(|w| io::parse_window_spec(w)));
    if windows.is_empty() {
        bail!("no shift_times provided");
    }

    let opts = EngineOptions {
        team_policy: if args.strict {
            TeamPolicy::Strict
        } else {
            TeamPolicy::AllowPartial
        },
        qualification_policy: if args.drop_unqualified {
            QualificationPolicy::Drop
        } else {
            QualificationPolicy::FillUnqualified
        },
        full_rest_factor: args.full_rest_factor,
        min_rest_factor: args.min_rest_factor,
        shuffle_pool: !args.no_shuffle,
    };
    let day = args.date.unwrap_or_else(|| Local::now().date_naive());
    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, %day, "generating duties");
    let mut rng = StdRng::seed_from_u64(seed);

    let schedule = Engine::new(catalog, opts).generate(&windows, day, &mut rng)?;

    if let Some(path) = &args.out_json {
        io::export_schedule_json(path, &schedule)?;
    }
    if let Some(path) = &args.out_csv {
        io::export_assignments_csv(path, &schedule)?;
    }
    for a in &schedule.assignments {
        let names: Vec<&str> = a.personnel.iter().map(|p| p.name.as_str()).collect();
        println!(
            "{} | {} → {} | {}",
            a.post,
            a.start.format("%Y-%m-%dT%H:%M"),
            a.end.format("%Y-%m-%dT%H:%M"),
            names.join(", ")
        );
    }
    for w in &schedule.warnings {
        eprintln!("warning: {w}");
    }

    if args.save {
        for duty in schedule.to_duties() {
            catalog.add_duty(duty)?;
        }
        storage.save(catalog)?;
    }

    Ok(if schedule.warnings.is_empty() { 0 } else { 2 })
}

fn tag_id(catalog: &Catalog, kind: TagKind, name: &str) -> Result<TagId> {
    catalog
        .find_tag_by_name(kind, name)
        .map(|t| t.id.clone())
        .ok_or_else(|| anyhow!("unknown {}: {}", kind.as_str(), name))
}

fn post_id(catalog: &Catalog, name: &str) -> Result<PostId> {
    catalog
        .find_post_by_name(name)
        .map(|p| p.id.clone())
        .ok_or_else(|| anyhow!("unknown post: {}", name))
}

/// Index numérique ou identifiant.
fn resolve_personnel(catalog: &Catalog, raw: &str) -> Result<PersonnelId> {
    let found = match raw.parse::<u32>() {
        Ok(index) => catalog.find_personnel_by_index(index),
        Err(_) => catalog.find_personnel(&PersonnelId::new(raw)),
    };
    found
        .map(|p| p.id.clone())
        .ok_or_else(|| anyhow!("unknown personnel: {}", raw))
}
