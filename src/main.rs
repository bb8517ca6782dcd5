use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use colored::Colorize;
use rewire::{backup, dataset, Config, Library, PickScope, Store};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rewire")]
#[command(author, version, about = "Personal library of nervous-system regulation protocols")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current selection, counts, and backup reminder
    Status,

    /// Print a micro mantra
    Mantra,

    /// Manage life-area domains
    Domain {
        #[command(subcommand)]
        action: DomainAction,
    },

    /// List protocols in the current filter
    List {
        /// Include archived protocols
        #[arg(long)]
        all: bool,
    },

    /// Show a protocol (the selected one when no id is given)
    Show { id: Option<String> },

    /// Select a protocol, switching domains if needed
    Select { id: String },

    /// Add a protocol under the selected domain
    Add {
        title: String,

        /// Free-text steps, newline-structured
        #[arg(long, default_value = "")]
        body: String,

        #[arg(long, default_value = "")]
        summary: String,

        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
    },

    /// Archive a protocol (hidden from browsing, restorable)
    Archive { id: String },

    /// Restore an archived protocol
    Restore { id: String },

    /// Delete a protocol permanently
    Delete { id: String },

    /// Mark a protocol complete (the selected one when no id is given)
    Complete { id: Option<String> },

    /// Pick a random protocol from the current filter
    Random {
        /// Pick from every live protocol regardless of the filter
        #[arg(long)]
        everywhere: bool,
    },

    /// Switch the category filter
    Filter { mode: FilterMode },

    /// Display preferences
    Prefs {
        #[arg(long)]
        wide: Option<Toggle>,

        #[arg(long)]
        collapse_body: Option<Toggle>,
    },

    /// Export a JSON backup of all rewire data
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a JSON backup, replacing all rewire data
    Import {
        /// Backup file to read (stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Generate shell completions
    Completion { shell: Shell },
}

#[derive(Subcommand, Debug)]
enum DomainAction {
    /// List domains
    List {
        /// Include archived domains
        #[arg(long)]
        all: bool,
    },
    /// Add a domain
    Add { name: String },
    /// Select the active domain
    Select { id: String },
    /// Archive a domain (its protocols stay live)
    Archive { id: String },
    /// Restore an archived domain
    Restore { id: String },
    /// Delete a domain and every protocol in it
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum FilterMode {
    /// Browse every domain at once
    All,
    /// Browse only the selected domain
    Here,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Toggle {
    On,
    Off,
}

impl Toggle {
    fn as_bool(self) -> bool {
        matches!(self, Toggle::On)
    }
}

fn main() {
    // Keep the handle alive for the life of the process; logging failures
    // must never block the CLI.
    let _logger = flexi_logger::Logger::try_with_env_or_str("warn")
        .and_then(|logger| logger.start())
        .ok();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "rewire", &mut std::io::stdout());
            Ok(())
        }
        Command::Mantra => {
            println!("{}", dataset::pick_mantra().italic());
            Ok(())
        }
        Command::Export { output } => {
            let store = Store::open()?;
            cmd_export(&store, output)
        }
        Command::Import { file } => {
            let store = Store::open()?;
            cmd_import(&store, file)
        }
        other => {
            let config = Config::load();
            let store = Store::open()?;
            let mut library = Library::load(&store, &config)?;
            run_library(other, &mut library, &store, &config)
        }
    }
}

fn cmd_export(store: &Store, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let blob = backup::export_blob(store);
    match output {
        Some(path) => {
            std::fs::write(&path, &blob)?;
            eprintln!("{} Backup written to {}", "✓".green(), path.display());
        }
        None => println!("{}", blob),
    }
    // Recorded after the snapshot so the blob itself stays a pure copy.
    backup::record_backup(store);
    Ok(())
}

fn cmd_import(store: &Store, file: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let written = backup::import_blob(store, &raw)?;
    // Reload so selections referencing imported ids are revalidated and the
    // corrected state is persisted right away.
    let config = Config::load();
    Library::load(store, &config)?;
    println!("{} Backup imported ({} keys)", "✓".green(), written);
    Ok(())
}

fn run_library(
    command: Command,
    library: &mut Library,
    store: &Store,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Status => cmd_status(library, store, config),
        Command::Domain { action } => cmd_domain(library, action)?,
        Command::List { all } => cmd_list(library, all),
        Command::Show { id } => cmd_show(library, id.as_deref())?,
        Command::Select { id } => {
            library.select_protocol(&id)?;
            println!("{} Selected {}", "✓".green(), protocol_title(library, &id));
        }
        Command::Add {
            title,
            body,
            summary,
            tags,
        } => {
            let id = library.add_protocol(&title, &summary, &body, &tags)?;
            println!("{} Added protocol: {} ({})", "✓".green(), title.trim(), id.dimmed());
        }
        Command::Archive { id } => {
            library.archive_protocol(&id)?;
            println!("Archived protocol: {}", protocol_title(library, &id));
        }
        Command::Restore { id } => {
            library.restore_protocol(&id)?;
            println!("Restored protocol: {}", protocol_title(library, &id));
        }
        Command::Delete { id } => {
            let title = protocol_title(library, &id);
            library.delete_protocol(&id)?;
            println!("Deleted protocol: {}", title);
        }
        Command::Complete { id } => {
            let (id, stat) = library.mark_complete(id.as_deref())?;
            let times = if stat.count == 1 { "time" } else { "times" };
            println!(
                "{} Completed {} ({} {})",
                "✓".green(),
                protocol_title(library, &id),
                stat.count,
                times
            );
        }
        Command::Random { everywhere } => {
            let scope = if everywhere {
                PickScope::Everywhere
            } else {
                PickScope::Filtered
            };
            let pick = library.random_pick(scope)?;
            let domain = domain_name(library, &pick.domain_id);
            println!("{} Random: {} [{}]", "✓".green(), pick.title.bold(), domain);
        }
        Command::Filter { mode } => {
            match mode {
                FilterMode::All => library.set_filter_all(),
                FilterMode::Here => library.set_filter_domain(),
            }
            println!("Filter: {}", library.state().category_filter);
        }
        Command::Prefs {
            wide,
            collapse_body,
        } => {
            library.set_prefs(wide.map(Toggle::as_bool), collapse_body.map(Toggle::as_bool));
            let state = library.state();
            println!(
                "wide_mode: {}  body_collapsed: {}",
                state.wide_mode, state.body_collapsed
            );
        }
        // Handled before the library is loaded.
        Command::Mantra
        | Command::Export { .. }
        | Command::Import { .. }
        | Command::Completion { .. } => {}
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    use std::io::Write;
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn protocol_title(library: &Library, id: &str) -> String {
    library
        .find_protocol(id)
        .map(|p| p.title.clone())
        .unwrap_or_else(|| id.to_string())
}

fn domain_name(library: &Library, id: &str) -> String {
    library
        .find_domain(id)
        .map(|d| d.name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn cmd_status(library: &Library, store: &Store, config: &Config) {
    let state = library.state();
    let active_domains = library.domains().iter().filter(|d| !d.archived).count();
    println!("{}", "Rewire".bold());
    println!(
        "  Domains:   {} active / {} total",
        active_domains,
        library.domains().len()
    );
    println!(
        "  Protocols: {} live / {} total",
        library.live().len(),
        library.working_set().len()
    );
    println!(
        "  Domain:    {}",
        state
            .selected_domain_id
            .as_deref()
            .map(|id| domain_name(library, id))
            .unwrap_or_else(|| "none".to_string())
    );
    println!(
        "  Protocol:  {}",
        state
            .selected_protocol_id
            .as_deref()
            .map(|id| protocol_title(library, id))
            .unwrap_or_else(|| "none".to_string())
    );
    println!("  Filter:    {}", state.category_filter);

    match backup::last_backup(store) {
        None => println!("  {}", "No backup yet. Run `rewire export`.".yellow()),
        Some(at) => {
            let formatted = at.format("%b %e %H:%M").to_string();
            let hours = backup::hours_since_backup(store).unwrap_or(0);
            if hours >= config.backup.remind_after_hours as i64 {
                println!(
                    "  {}",
                    format!(
                        "Last backup {}, more than {}h ago. Run `rewire export`.",
                        formatted, config.backup.remind_after_hours
                    )
                    .yellow()
                );
            } else {
                println!("  Backup:    {}", formatted.dimmed());
            }
        }
    }
}

fn cmd_domain(
    library: &mut Library,
    action: DomainAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DomainAction::List { all } => {
            let selected = library.state().selected_domain_id.clone();
            for domain in library.domains() {
                if domain.archived && !all {
                    continue;
                }
                let marker = if selected.as_deref() == Some(domain.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                let status = if domain.archived {
                    "archived".yellow().to_string()
                } else {
                    "active".green().to_string()
                };
                println!(
                    "{} {:<20} {} {}",
                    marker,
                    domain.name,
                    status,
                    domain.id.dimmed()
                );
            }
        }
        DomainAction::Add { name } => {
            let id = library.add_domain(&name)?;
            println!("{} Added domain: {} ({})", "✓".green(), name.trim(), id.dimmed());
        }
        DomainAction::Select { id } => {
            library.select_domain(&id)?;
            println!("{} Selected domain: {}", "✓".green(), domain_name(library, &id));
        }
        DomainAction::Archive { id } => {
            library.archive_domain(&id)?;
            println!("Archived domain: {}", domain_name(library, &id));
        }
        DomainAction::Restore { id } => {
            library.restore_domain(&id)?;
            println!("Restored domain: {}", domain_name(library, &id));
        }
        DomainAction::Delete { id, yes } => {
            let name = domain_name(library, &id);
            if !yes && !confirm(&format!("Delete domain {} and all its protocols?", name))? {
                println!("Aborted.");
                return Ok(());
            }
            library.delete_domain(&id)?;
            println!("Deleted domain: {} (and its protocols)", name);
        }
    }
    Ok(())
}

fn cmd_list(library: &Library, all: bool) {
    let state = library.state();
    let rows: Vec<_> = if all {
        library
            .working_set()
            .into_iter()
            .filter(|p| {
                state.filter_is_all()
                    || state.selected_domain_id.as_deref() == Some(p.domain_id.as_str())
            })
            .collect()
    } else {
        library.eligible()
    };

    if rows.is_empty() {
        println!("{}", "No protocols here yet. Try `rewire add`.".dimmed());
        return;
    }

    for protocol in rows {
        let marker = if state.selected_protocol_id.as_deref() == Some(protocol.id.as_str()) {
            "*"
        } else {
            " "
        };
        let flag = if library.is_archived(&protocol.id) {
            " [archived]".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "{} {:<32}{} {}",
            marker,
            protocol.title,
            flag,
            protocol.id.dimmed()
        );
    }
}

fn cmd_show(library: &Library, id: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let id = id
        .map(str::to_string)
        .or_else(|| library.state().selected_protocol_id.clone())
        .ok_or("No protocol selected")?;
    let protocol = library
        .find_protocol(&id)
        .ok_or_else(|| format!("No such protocol: {}", id))?
        .clone();

    println!("{}", protocol.title.bold());
    println!("{}", domain_name(library, &protocol.domain_id).dimmed());
    if !protocol.summary.is_empty() {
        println!("{}", protocol.summary.italic());
    }
    if !protocol.tags.is_empty() {
        println!("tags: {}", protocol.tags.join(", ").dimmed());
    }

    let stat = library.stat(&protocol.id);
    let times = if stat.count == 1 { "time" } else { "times" };
    let last = stat
        .last_completed
        .as_deref()
        .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&chrono::Local).format("%b %e %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string());
    println!("completed {} {} (last: {})", stat.count, times, last);

    if library.state().body_collapsed {
        println!("{}", "(body collapsed — `rewire prefs --collapse-body off`)".dimmed());
    } else {
        println!("\n{}", protocol.body);
    }
    Ok(())
}
