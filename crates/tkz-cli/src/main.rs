use std::io::{self, Write};

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use tabwriter::TabWriter;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use tkz_catalog::{
    db_install, default_data_dir, table_by_name, Catalog, Engine, JoinedOps, TableOps,
};
use tkz_core::{parse_system, CalcSettings, ChainsSystem, Config, ConfigValue, TkzError};

mod cli;
use cli::{CatalogCommands, Cli, Commands, ConfigCommands};

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(err) = run(&cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::new(&cli.config);
    match &cli.command {
        Commands::DbInstall { clear, data_dir } => {
            let clear = *clear || config.tables_clear_install()?;
            let engine = Engine::from_config(&config)?;
            let data_dir = data_dir.clone().unwrap_or_else(default_data_dir);
            info!(
                "installing catalog from {} (clear: {clear})",
                data_dir.display()
            );
            db_install(&engine, &data_dir, clear)?;
            println!("Catalog installed.");
            Ok(())
        }
        Commands::Run { expression, table } => {
            let settings = CalcSettings::from_config(&config)?;
            let engine = Engine::from_config(&config)?;
            let catalog = Catalog::new(&engine);
            let system = parse_system(expression, settings.voltage)?;
            info!("evaluating {system}");
            if *table {
                print_fault_table(&system, &catalog, &settings)?;
            } else {
                let first = system
                    .get(0)
                    .ok_or_else(|| anyhow!("the expression contains no chains"))?;
                println!("{}", first.three_phase_current(&catalog, &settings)?);
            }
            Ok(())
        }
        Commands::Catalog {
            command: CatalogCommands::Show { table },
        } => {
            let def = table_by_name(table)
                .ok_or_else(|| anyhow!("unknown catalog table '{table}'"))?;
            let engine = Engine::from_config(&config)?;
            let frame = if def.is_joined() {
                JoinedOps::new(def, &engine).read_joined_table()?
            } else {
                TableOps::new(def, &engine).read_table(None, None)?
            };
            let mut writer = TabWriter::new(io::stdout());
            writer
                .write_all(frame.render().as_bytes())
                .and_then(|()| writer.flush())
                .context("rendering table")?;
            Ok(())
        }
        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => {
                match config.get(key)? {
                    Some(value) => println!("{value}"),
                    None => bail!("config key {key} is not set"),
                }
                Ok(())
            }
            ConfigCommands::Set { key, value } => {
                let value = ConfigValue::parse(value);
                if !config.set(key, &value)? {
                    bail!("config key {key} is not present in {}", cli.config.display());
                }
                Ok(())
            }
        },
    }
}

/// Currents at every intermediate fault point of every chain: the fault
/// walks down the chain, each row covering the sub-chain up to and
/// including that element.
fn print_fault_table(
    system: &ChainsSystem,
    catalog: &Catalog<'_>,
    settings: &CalcSettings,
) -> anyhow::Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    for (chain_index, chain) in system.iter().enumerate() {
        if chain_index > 0 {
            writeln!(writer)?;
        }
        writeln!(writer, "Chain {}: {chain}", chain_index + 1)?;
        writeln!(writer, "fault at\tIk(3), kA\tIk(2), kA\tIk(1), kA")?;
        for position in 1..=chain.len() {
            let head = chain.slice_to(position);
            let element = chain
                .element(position - 1)
                .ok_or_else(|| TkzError::BadInput("chain index out of range".into()))?;
            let label = match chain.label(position - 1) {
                Some(name) => format!("{name}: {element}"),
                None => element.to_string(),
            };
            writeln!(
                writer,
                "{label}\t{}\t{}\t{}",
                head.three_phase_current(catalog, settings)?,
                head.two_phase_current(catalog, settings)?,
                head.one_phase_current(catalog, settings)?
            )?;
        }
    }
    writer.flush()?;
    Ok(())
}
