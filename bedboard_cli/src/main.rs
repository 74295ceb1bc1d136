use bedboard_core::*;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bedboard")]
#[command(about = "Capacity-aware patient placement board", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to $XDG_CONFIG_HOME/bedboard/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the patient table path; the journal is kept next to it
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    /// Log placement decisions to stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty patient table
    Init,

    /// Admit a new patient
    Admit {
        /// Facility to place the patient in
        #[arg(long)]
        facility: String,

        /// Severity status assigned by the clinician
        #[arg(long)]
        status: String,

        /// COVID status (positive, negative, unknown)
        #[arg(long, default_value = "unknown")]
        covid: String,

        /// Fail instead of asking for an alternate when the facility is full
        #[arg(long)]
        no_prompt: bool,
    },

    /// Transfer a patient to another facility
    Transfer {
        patient_id: String,
        facility: String,

        /// Fail instead of asking for an alternate when the facility is full
        #[arg(long)]
        no_prompt: bool,
    },

    /// Update a patient's severity status
    Status { patient_id: String, status: String },

    /// Discharge a patient
    Discharge { patient_id: String },

    /// List all patients
    List {
        /// Print the roster as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show occupancy per facility
    Occupancy {
        /// Print occupancy as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent placement journal entries
    History {
        /// Only show entries for this patient
        #[arg(long)]
        patient: Option<String>,

        /// Number of most recent entries to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// List configured facilities and their capacities
    Facilities,
}

fn main() {
    let cli = Cli::parse();
    bedboard_core::logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let policy = config.capacity_policy()?;

    // An explicit table path carries its own journal
    let (roster_path, journal_path) = match cli.roster {
        Some(roster) => {
            let journal = roster.with_file_name("placements.jsonl");
            (roster, journal)
        }
        None => (config.data.roster_path.clone(), config.journal.path.clone()),
    };
    let journal_path = config.journal.enabled.then_some(journal_path);
    tracing::debug!("Roster {:?}, journal {:?}", roster_path, journal_path);

    let store = CsvStore::open(&roster_path);
    let mut engine = PlacementEngine::new(&store, &policy)
        .with_max_id_attempts(config.placement.max_id_attempts);
    if let Some(path) = &journal_path {
        engine = engine.with_journal(JsonlJournal::new(path));
    }

    match cli.command {
        Commands::Init => cmd_init(&roster_path),
        Commands::Admit {
            facility,
            status,
            covid,
            no_prompt,
        } => cmd_admit(&mut engine, &store, &facility, &status, &covid, no_prompt),
        Commands::Transfer {
            patient_id,
            facility,
            no_prompt,
        } => cmd_transfer(&mut engine, &store, &patient_id, &facility, no_prompt),
        Commands::Status { patient_id, status } => {
            let previous = engine.update_status(&patient_id, &status)?;
            println!(
                "✓ Updated status of patient {}: {} → {}",
                patient_id, previous, status
            );
            Ok(())
        }
        Commands::Discharge { patient_id } => {
            let record = engine.discharge(&patient_id)?;
            println!(
                "✓ Discharged patient {} from {}",
                record.patient_id, record.facility
            );
            Ok(())
        }
        Commands::List { json } => cmd_list(&store, json),
        Commands::Occupancy { json } => cmd_occupancy(&store, &policy, json),
        Commands::History { patient, limit } => {
            cmd_history(journal_path.as_deref(), patient.as_deref(), limit)
        }
        Commands::Facilities => {
            for facility in policy.facilities() {
                println!("  {:<16} capacity {}", facility.name, facility.capacity);
            }
            Ok(())
        }
    }
}

fn cmd_init(roster_path: &Path) -> Result<()> {
    let (store, created) = CsvStore::create(roster_path)?;
    if created {
        println!("✓ Created empty roster at {}", store.path().display());
    } else {
        tracing::info!("Left existing roster {:?} untouched", store.path());
        println!("Roster already exists at {}", store.path().display());
    }
    Ok(())
}

fn cmd_admit(
    engine: &mut PlacementEngine<'_, CsvStore>,
    store: &CsvStore,
    facility: &str,
    status: &str,
    covid: &str,
    no_prompt: bool,
) -> Result<()> {
    let covid = CovidStatus::from(covid);
    let policy = engine.policy().clone();

    let placed = if no_prompt {
        Some(engine.admit(facility, status, covid)?)
    } else {
        place_with_alternates(
            facility,
            |f| engine.admit(f, status, covid),
            |err| prompt_alternate(err, store, &policy),
        )?
    };

    match placed {
        Some(record) => println!(
            "✓ Admitted patient {} to {}",
            record.patient_id, record.facility
        ),
        None => println!("Admission abandoned; no changes were written."),
    }
    Ok(())
}

fn cmd_transfer(
    engine: &mut PlacementEngine<'_, CsvStore>,
    store: &CsvStore,
    patient_id: &str,
    facility: &str,
    no_prompt: bool,
) -> Result<()> {
    let policy = engine.policy().clone();

    let transferred = if no_prompt {
        Some(engine.transfer(patient_id, facility)?)
    } else {
        place_with_alternates(
            facility,
            |f| engine.transfer(patient_id, f),
            |err| prompt_alternate(err, store, &policy),
        )?
    };

    match transferred {
        Some(transfer) if transfer.moved() => println!(
            "✓ Transferred patient {} from {} to {}",
            patient_id, transfer.from, transfer.record.facility
        ),
        Some(transfer) => println!(
            "Patient {} is already at {}",
            patient_id, transfer.record.facility
        ),
        None => println!("Transfer abandoned; no changes were written."),
    }
    Ok(())
}

fn cmd_list(store: &CsvStore, json: bool) -> Result<()> {
    let table = store.load()?;
    let roster = full_roster(&table);

    if json {
        println!("{}", serde_json::to_string_pretty(roster)?);
        return Ok(());
    }

    if roster.is_empty() {
        println!("No patients on the roster.");
        return Ok(());
    }

    println!("{:<10} {:<16} {:<9} {}", "PATIENT", "FACILITY", "COVID", "STATUS");
    for record in roster {
        println!(
            "{:<10} {:<16} {:<9} {}",
            record.patient_id, record.facility, record.covid_status, record.severity_status
        );
    }
    println!("\n{} patient(s)", roster.len());
    Ok(())
}

fn cmd_occupancy(store: &CsvStore, policy: &CapacityPolicy, json: bool) -> Result<()> {
    let table = store.load()?;
    let summary = capacity_summary(&table, policy);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_capacity(&summary);
    for (facility, count) in occupancy_report(&table) {
        if !policy.is_known(&facility) {
            println!("  {:<16} {:>3} (not configured)", facility, count);
        }
    }
    Ok(())
}

fn cmd_history(journal_path: Option<&Path>, patient_id: Option<&str>, limit: usize) -> Result<()> {
    let Some(path) = journal_path else {
        println!("Placement journal is disabled.");
        return Ok(());
    };

    let events = read_events(path, patient_id, Some(limit))?;
    if events.is_empty() {
        match patient_id {
            Some(id) => println!("No placement history for patient {}.", id),
            None => println!("No placement history yet."),
        }
        return Ok(());
    }

    for event in &events {
        let what = match &event.change {
            PlacementChange::Admitted { facility } => format!("admitted to {}", facility),
            PlacementChange::Transferred { from, to } => {
                format!("transferred {} → {}", from, to)
            }
            PlacementChange::StatusUpdated { from, to } => {
                format!("status {} → {}", from, to)
            }
            PlacementChange::Discharged { facility } => format!("discharged from {}", facility),
        };
        println!(
            "{}  {:<6} {}",
            event.at.format("%Y-%m-%d %H:%M:%S"),
            event.patient_id,
            what
        );
    }
    Ok(())
}

fn print_capacity(summary: &[FacilityOccupancy]) {
    println!("{:<18} {:>9} {:>6}", "FACILITY", "OCCUPIED", "FREE");
    for facility in summary {
        println!(
            "  {:<16} {:>4}/{:<4} {:>6}{}",
            facility.name,
            facility.occupancy,
            facility.capacity,
            facility.available(),
            if facility.is_full() { "  FULL" } else { "" }
        );
    }
}

/// Ask the operator for another facility after a rejected placement
fn prompt_alternate(err: &Error, store: &CsvStore, policy: &CapacityPolicy) -> Option<String> {
    println!("\n{}", err);
    if let Ok(table) = store.load() {
        print_capacity(&capacity_summary(&table, policy));
    }
    print!("Enter an alternate facility (blank to abandon): ");
    io::stdout().flush().ok()?;

    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) => {
            tracing::info!("Input closed while asking for an alternate facility");
            None
        }
        Err(e) => {
            tracing::warn!("Could not read an alternate facility: {}", e);
            None
        }
        Ok(_) => {
            let facility = input.trim();
            if facility.is_empty() {
                tracing::info!("Operator declined to pick an alternate facility");
                return None;
            }
            tracing::info!("Operator picked alternate facility {}", facility);
            Some(facility.to_string())
        }
    }
}
