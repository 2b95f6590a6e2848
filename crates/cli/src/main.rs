use clap::{Parser, Subcommand};
use clerk_core::{
    build_engine, Capability, CoreConfig, EncounterRecord, FileRepository, ListFilter, Payload,
    RecordId, RecordService, Role, WorkflowType,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "clerk")]
#[command(about = "Clerk hospital front-desk workflow CLI")]
struct Cli {
    /// Record storage directory
    #[arg(long, env = "CLERK_RECORD_DATA_DIR", default_value = clerk_core::DEFAULT_RECORD_DATA_DIR)]
    data_dir: PathBuf,
    /// Permission matrix YAML replacing the built-in one
    #[arg(long, env = "CLERK_PERMISSIONS_FILE")]
    permissions_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List workflow definitions and their transitions
    Workflows,
    /// Check whether a role holds a capability on a module
    Check {
        role: String,
        module: String,
        capability: String,
    },
    /// Create a record in its workflow's initial state
    Create {
        workflow: WorkflowType,
        #[arg(long)]
        role: Role,
        /// Initial payload as a JSON object
        #[arg(long)]
        payload: Option<String>,
    },
    /// Show one record with its history
    Show {
        id: RecordId,
        #[arg(long)]
        role: Role,
    },
    /// List readable records, finished first
    List {
        #[arg(long)]
        role: Role,
        #[arg(long)]
        workflow: Option<WorkflowType>,
        #[arg(long)]
        include_deleted: bool,
    },
    /// Apply a workflow action to a record
    Apply {
        id: RecordId,
        action: String,
        #[arg(long)]
        role: Role,
        /// Action payload as a JSON object
        #[arg(long)]
        payload: Option<String>,
    },
    /// Soft-delete a record
    Delete {
        id: RecordId,
        #[arg(long)]
        role: Role,
    },
}

fn parse_payload(raw: Option<&str>) -> Result<Payload, String> {
    let Some(raw) = raw else {
        return Ok(Payload::new());
    };
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err("payload must be a JSON object".into()),
        Err(e) => Err(format!("invalid payload JSON: {e}")),
    }
}

fn print_record(record: &EncounterRecord) {
    let deleted = match record.deleted_at() {
        Some(at) => format!(" (deleted {})", at.to_rfc3339()),
        None => String::new(),
    };
    println!(
        "ID: {}, Workflow: {}, State: {}, Created: {}{}",
        RecordId::from(record.id()),
        record.workflow_type(),
        record.current_state(),
        record.created_at().to_rfc3339(),
        deleted
    );
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Runs one command. Any refused or failed operation is returned as an error.
fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let cfg = CoreConfig::new(cli.data_dir, cli.permissions_file)?;
    let engine = Arc::new(build_engine(&cfg)?);
    let service = RecordService::new(engine, Arc::new(FileRepository::from_config(&cfg)));

    match cli.command {
        Some(Commands::Workflows) => {
            for definition in service.engine().catalog().iter() {
                println!(
                    "{} (module: {}, initial: {})",
                    definition.workflow_type(),
                    definition.module(),
                    definition.initial_state()
                );
                for t in definition.transitions() {
                    let marker = if t.is_exception { " [exception]" } else { "" };
                    println!(
                        "  {} -- {} --> {} ({}/{}){}",
                        t.from, t.action, t.to, t.module, t.capability, marker
                    );
                }
            }
        }
        Some(Commands::Check {
            role,
            module,
            capability,
        }) => {
            let gate = service.engine().gate();
            let allowed = gate.authorize_raw(Some(&role), &module, &capability);
            println!("{role} {capability} {module}: {}", if allowed { "allowed" } else { "denied" });
            if let Ok(role) = role.parse::<Role>() {
                let granted: Vec<&str> = gate
                    .permissions(role, &module)
                    .granted()
                    .iter()
                    .map(Capability::as_str)
                    .collect();
                println!("granted: [{}]", granted.join(", "));
            }
        }
        Some(Commands::Create {
            workflow,
            role,
            payload,
        }) => {
            let payload = parse_payload(payload.as_deref())?;
            let record = service
                .create(workflow, role, payload)
                .map_err(|e| format!("Error creating record: {e}"))?;
            println!("Created {} record with ID: {}", workflow, RecordId::from(record.id()));
        }
        Some(Commands::Show { id, role }) => {
            let record = service
                .get(&id, role)
                .map_err(|e| format!("Error reading record {id}: {e}"))?;
            print_record(&record);
            println!("Payload: {}", serde_json::to_string_pretty(record.payload())?);
            for entry in record.history() {
                println!(
                    "  {} {} -> {} by {} at {}",
                    entry.action,
                    entry.from_state,
                    entry.to_state,
                    entry.actor_role,
                    entry.timestamp.to_rfc3339()
                );
            }
        }
        Some(Commands::List {
            role,
            workflow,
            include_deleted,
        }) => {
            let filter = ListFilter {
                workflow_type: workflow,
                include_deleted,
            };
            let records = service
                .list(role, filter)
                .map_err(|e| format!("Error listing records: {e}"))?;
            if records.is_empty() {
                println!("No records found.");
            }
            records.iter().for_each(print_record);
        }
        Some(Commands::Apply {
            id,
            action,
            role,
            payload,
        }) => {
            let payload = parse_payload(payload.as_deref())?;
            let record = service
                .apply(&id, &action, role, &payload)
                .map_err(|e| format!("Error applying {action}: {e}"))?;
            println!("Applied {} to {}: now {}", action, id, record.current_state());
        }
        Some(Commands::Delete { id, role }) => {
            service
                .delete(&id, role)
                .map_err(|e| format!("Error deleting record: {e}"))?;
            println!("Deleted record {}", id);
        }
        None => {
            println!("Use 'clerk --help' for commands");
        }
    }

    Ok(())
}
