use analytics_dashboard::dashboard::{CardRegistry, Dashboard, DashboardCommand};
use analytics_dashboard::logging;
use analytics_dashboard::settings::{Settings, SETTINGS_FILE};
use serde_json::Value;
use std::sync::Arc;

const USAGE: &str = "usage: analytics_dashboard [--settings PATH] <show | swap A B | set CARD FIELD VALUE | insert CARD POS | remove CARD | reset>";

fn parse_position(arg: Option<&String>) -> anyhow::Result<usize> {
    let arg = arg.ok_or_else(|| anyhow::anyhow!(USAGE))?;
    Ok(arg.parse()?)
}

fn parse_command(args: &[String]) -> anyhow::Result<Option<DashboardCommand>> {
    let missing = || anyhow::anyhow!(USAGE);
    let command = match args.first().map(String::as_str) {
        None | Some("show") => return Ok(None),
        Some("swap") => DashboardCommand::Swap {
            a: parse_position(args.get(1))?,
            b: parse_position(args.get(2))?,
        },
        Some("set") => {
            let card_id = args.get(1).ok_or_else(missing)?.clone();
            let field = args.get(2).ok_or_else(missing)?.clone();
            let raw = args.get(3).ok_or_else(missing)?;
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
            DashboardCommand::SetField {
                card_id,
                field,
                value,
            }
        }
        Some("insert") => DashboardCommand::Insert {
            card_id: args.get(1).ok_or_else(missing)?.clone(),
            position: parse_position(args.get(2))?,
        },
        Some("remove") => DashboardCommand::Remove {
            card_id: args.get(1).ok_or_else(missing)?.clone(),
        },
        Some("reset") => DashboardCommand::Reset,
        Some(other) => anyhow::bail!("unknown command '{other}'\n{USAGE}"),
    };
    Ok(Some(command))
}

fn main() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mut settings_path = SETTINGS_FILE.to_string();
    if args.first().map(String::as_str) == Some("--settings") {
        if args.len() < 2 {
            anyhow::bail!(USAGE);
        }
        settings_path = args.remove(1);
        args.remove(0);
    }

    let settings = Settings::load(&settings_path)?;
    logging::init(settings.debug_logging, settings.log_file());

    let registry = CardRegistry::with_defaults()?;
    let persistence = settings.persistence();
    tracing::debug!(path = %persistence.path().display(), "using card settings file");
    let mut dashboard = Dashboard::new(
        registry,
        Arc::new(persistence),
        settings.environment_context(),
        None,
    )?;
    for warning in &dashboard.warnings {
        eprintln!("warning: {warning}");
    }

    if let Some(command) = parse_command(&args)? {
        dashboard.apply(command)?;
        dashboard.flush();
    }

    println!("{}", serde_json::to_string_pretty(dashboard.cards())?);
    Ok(())
}
