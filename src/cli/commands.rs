//! Command dispatch

use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::demo_records;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{BuildOrder, DuplicatePolicy, Record, TreeIndex};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `treeindex --help`".to_string(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => execute_config(cli, command),
        Commands::Demo => run_demo(&load_settings(cli)?),
        Commands::All => {
            let index = load_index(cli)?;
            print_records(index.get_all());
            Ok(())
        }
        Commands::Item { id } => {
            let index = load_index(cli)?;
            output::info(index.get_item(id.as_str())?);
            Ok(())
        }
        Commands::Children { id } => {
            let index = load_index(cli)?;
            print_records(index.get_children(id.as_str())?);
            Ok(())
        }
        Commands::Parents { id } => {
            let index = load_index(cli)?;
            print_records(index.get_all_parents(id.as_str())?);
            Ok(())
        }
        Commands::Depth { id } => {
            let index = load_index(cli)?;
            output::info(&index.depth(id.as_str())?);
            Ok(())
        }
        Commands::Tree => {
            output::info(&load_index(cli)?.to_tree_string());
            Ok(())
        }
        Commands::Leaves => {
            let index = load_index(cli)?;
            print_records(index.leaves());
            Ok(())
        }
    }
}

/// Settings with CLI flags applied on top.
fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if cli.two_pass {
        settings.build_order = BuildOrder::TwoPass;
    }
    if cli.reject_duplicates {
        settings.duplicate_ids = DuplicatePolicy::Reject;
    }
    if let Some(file) = &cli.file {
        settings.data_file = Some(file.clone());
    }
    Ok(settings)
}

#[instrument(level = "debug", skip(cli))]
fn load_index(cli: &Cli) -> CliResult<TreeIndex> {
    let settings = load_settings(cli)?;
    let data_file = settings.data_file.clone();
    let container = ServiceContainer::new(settings);
    let service = container.index_service();

    let index = match data_file {
        Some(path) => {
            debug!("indexing {}", path.display());
            service.load(&path)?
        }
        None => {
            debug!("no data file configured, indexing demo records");
            service.build(demo_records())?
        }
    };
    Ok(index)
}

fn print_records<'a>(records: impl IntoIterator<Item = &'a Record>) {
    for record in records {
        output::info(record);
    }
}

/// Sample queries against the built-in records.
fn run_demo(settings: &Settings) -> CliResult<()> {
    let index = settings.index_builder().build(demo_records())?;

    output::header("getAll()");
    print_records(index.get_all());

    output::header("getItem(7)");
    output::info(index.get_item(7)?);

    for id in [4, 5] {
        output::header(&format!("getChildren({id})"));
        let children = index.get_children(id)?;
        if children.is_empty() {
            output::detail("(no children)");
        }
        print_records(children);
    }

    output::header("getAllParents(7)");
    let chain = index.get_all_parents(7)?;
    output::detail(&chain.iter().map(|record| record.id()).join(" <- "));
    print_records(chain);

    output::header("getItem(9)");
    match index.get_item(9) {
        Ok(record) => output::info(record),
        Err(e) => output::warning(&format!("{}: {}", e.kind(), e)),
    }
    Ok(())
}

fn execute_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::warning("no global config directory on this platform"),
            }
            let local = match &cli.config {
                Some(path) => path.clone(),
                None => {
                    let cwd = std::env::current_dir()
                        .map_err(|e| InfraError::io("resolve current directory", e))?;
                    local_config_path(&cwd)
                }
            };
            output::action("local", &local.display());
        }
    }
    Ok(())
}
