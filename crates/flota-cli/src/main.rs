// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod output;
mod records;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use flota_app::dates::{parse_weekday, today_local};
use flota_app::import::{ImportKind, decode_csv_bytes, import_csv};
use flota_app::{Document, LookupId, LookupTable, ReportSettingsInput, User, require_admin};
use flota_db::{Seed, Store};
use flota_report::{
    GroupBy, ReportRow, build_dashboard, group_rows, html_digest, mailto_link, report_csv,
    report_rows, text_digest,
};
use flota_sync::{Client, PushQueue};
use records::{EditClock, Entity, RecordAction, apply_record, parse_record};
use runtime::{Delivery, FleetRuntime, WatchIntervals};
use std::env;
use std::fs;
use std::path::PathBuf;
use time::{OffsetDateTime, Weekday};

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `flota --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    init_logging(config.log_filter());

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let seed = if options.demo { Seed::Demo } else { config.seed() };
    let mut store = Store::open(&db_path, seed).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or FLOTA_DB_PATH",
            db_path.display()
        )
    })?;
    let client = Client::new(config.sync_timeout()).with_context(|| {
        format!(
            "invalid [sync] config in {}; fix the timeout value",
            options.config_path.display()
        )
    })?;
    store.attach_pusher(PushQueue::spawn(client.clone(), None));

    let command = options.command.clone().unwrap_or(Command::Dashboard {
        filter: String::new(),
    });
    let mut runtime = FleetRuntime::new(store, client);
    execute(&mut runtime, &config, &options, command)
}

fn execute(
    runtime: &mut FleetRuntime,
    config: &Config,
    options: &CliOptions,
    command: Command,
) -> Result<()> {
    let today = today_local();
    let document = runtime.store_mut().load()?;

    match command {
        Command::Dashboard { filter } => {
            print!(
                "{}",
                output::dashboard_text(&build_dashboard(&document, today), &filter)
            );
        }
        Command::Report {
            system,
            group_by,
            filter,
            csv,
        } => {
            let rows = rows_for_system(&document, report_rows(&document, today, &filter), system);
            if csv {
                print!("{}", report_csv(&rows, group_by));
            } else if let Some(group_by) = group_by {
                print!("{}", output::grouped_table(&group_rows(&rows, group_by)));
            } else {
                print!("{}", output::rows_table(&rows));
            }
        }
        Command::Digest { system, html } => {
            let system = system.map(LookupId::from);
            if html {
                println!("{}", html_digest(&document, system.as_ref(), today));
            } else {
                println!("{}", text_digest(&document, system.as_ref(), today));
            }
        }
        Command::Mailto => {
            for coordinator in &document.coordinators {
                println!(
                    "{} <{}>\n  {}",
                    coordinator.name,
                    coordinator.email,
                    mailto_link(&document, coordinator, today, config.app_url())
                );
            }
        }
        Command::Sync(SyncAction::Pull) => {
            println!("{}", output::pull_outcome_text(&runtime.pull()?));
        }
        Command::Sync(SyncAction::Push) => push(runtime)?,
        Command::Sync(SyncAction::Now) => {
            push(runtime)?;
            println!("{}", output::pull_outcome_text(&runtime.pull()?));
        }
        Command::Link { url } => {
            let client = runtime.client().clone();
            let outcome = runtime.store_mut().link_device(&url, &client)?;
            println!("linked {}", url.trim());
            println!("{}", output::pull_outcome_text(&outcome));
        }
        Command::SendReports => {
            let recipients = runtime.send_reports(&document, today, |recipient| {
                println!("{}", output::recipient_line(recipient));
            })?;
            runtime.finish_scheduled_send(today)?;
            let failed = recipients
                .iter()
                .filter(|recipient| matches!(recipient.delivery, Delivery::Failed(_)))
                .count();
            println!("{} sent, {failed} failed", recipients.len() - failed);
        }
        Command::Watch => {
            let intervals = WatchIntervals {
                pull: config.pull_interval(),
                check: config.check_interval(),
            };
            runtime.watch(intervals, || true, |recipient| {
                println!("{}", output::recipient_line(recipient));
            })?;
        }
        Command::Import { kind, file } => {
            authorize(&document, options, "import data")?;
            let bytes =
                fs::read(&file).with_context(|| format!("read import file {}", file.display()))?;
            let (next, report) = import_csv(&document, kind, &decode_csv_bytes(&bytes))?;
            runtime.store_mut().save(&next)?;
            println!("{}", report.summary());
            for error in &report.errors {
                println!("  {error}");
            }
        }
        Command::Lookup(action) => run_lookup(runtime, &document, options, action)?,
        Command::Record(action) => run_record(runtime, &document, options, action, today)?,
        Command::Settings(change) => match change {
            None => {
                let last_sync = runtime.store_mut().last_sync_success()?;
                print!("{}", output::settings_text(&document.report_settings, last_sync));
            }
            Some(change) => {
                let actor = authorize(&document, options, "change report settings")?;
                let next = document.update_report_settings(&actor, &change.apply(&document))?;
                runtime.store_mut().save(&next)?;
                print!("{}", output::settings_text(&next.report_settings, None));
            }
        },
        Command::Reset => {
            authorize(&document, options, "reset data")?;
            runtime.store_mut().reset()?;
            println!("restored the initial data");
        }
        Command::Clear => {
            authorize(&document, options, "clear data")?;
            runtime.store_mut().clear()?;
            println!("cleared all data");
        }
        Command::Check => {
            println!("config ok: {}", options.config_path.display());
            println!(
                "document ok: {} vehicles, {} plans, {} history entries",
                document.vehicles.len(),
                document.maintenance_plans.len(),
                document.history.len()
            );
        }
    }
    Ok(())
}

fn push(runtime: &mut FleetRuntime) -> Result<()> {
    let client = runtime.client().clone();
    match runtime.store_mut().push_remote(&client)? {
        Ok(()) => println!("pushed local data to the sync endpoint"),
        Err(error) => println!("push failed: {error}"),
    }
    Ok(())
}

fn run_lookup(
    runtime: &mut FleetRuntime,
    document: &Document,
    options: &CliOptions,
    action: LookupAction,
) -> Result<()> {
    let table = action.table();
    let next = match action {
        LookupAction::List { .. } => {
            print!("{}", output::lookup_table(document.lookup(table)));
            return Ok(());
        }
        LookupAction::Add { value, .. } => {
            authorize(document, options, "edit lookup tables")?;
            let (next, id) = document.add_lookup(table, &value)?;
            println!("added {} {id}", table.label());
            next
        }
        LookupAction::Rename { id, value, .. } => {
            authorize(document, options, "edit lookup tables")?;
            document.rename_lookup(table, &LookupId::from(id), &value)?
        }
        LookupAction::Delete { id, .. } => {
            authorize(document, options, "edit lookup tables")?;
            document.delete_lookup(table, &LookupId::from(id))?
        }
        LookupAction::Reset { .. } => {
            authorize(document, options, "edit lookup tables")?;
            document.reset_lookup_defaults(table)
        }
    };
    runtime.store_mut().save(&next)?;
    print!("{}", output::lookup_table(next.lookup(table)));
    Ok(())
}

fn run_record(
    runtime: &mut FleetRuntime,
    document: &Document,
    options: &CliOptions,
    action: RecordAction,
    today: time::Date,
) -> Result<()> {
    if let RecordAction::List { entity, scope } = &action {
        print!("{}", output::records_table(document, *entity, scope.as_deref()));
        return Ok(());
    }
    authorize(document, options, &action.permission())?;
    let clock = EditClock {
        today,
        now_millis: OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000,
    };
    let (next, summary) = apply_record(document, &action, clock)?;
    runtime.store_mut().save(&next)?;
    println!("{summary}");
    Ok(())
}

fn rows_for_system(
    document: &Document,
    rows: Vec<ReportRow>,
    system: Option<String>,
) -> Vec<ReportRow> {
    let Some(system) = system.map(LookupId::from) else {
        return rows;
    };
    rows.into_iter()
        .filter(|row| {
            document
                .vehicle(&row.vehicle_id)
                .is_some_and(|vehicle| vehicle.system_id.as_ref() == Some(&system))
        })
        .collect()
}

/// Resolve `--user`/`--password` (or `FLOTA_USER`/`FLOTA_PASSWORD`) to an admin account.
fn authorize(document: &Document, options: &CliOptions, action: &str) -> Result<User> {
    let username = options
        .user
        .clone()
        .or_else(|| env::var("FLOTA_USER").ok())
        .unwrap_or_default();
    let password = options
        .password
        .clone()
        .or_else(|| env::var("FLOTA_PASSWORD").ok())
        .unwrap_or_default();
    let Some(user) = document.authenticate(&username, &password) else {
        bail!(
            "cannot {action}: unknown user or wrong password -- pass --user and --password or set FLOTA_USER and FLOTA_PASSWORD"
        );
    };
    require_admin(user, action)?;
    Ok(user.clone())
}

fn init_logging(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("logger already initialised");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SyncAction {
    Pull,
    Push,
    Now,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LookupAction {
    List { table: LookupTable },
    Add { table: LookupTable, value: String },
    Rename { table: LookupTable, id: String, value: String },
    Delete { table: LookupTable, id: String },
    Reset { table: LookupTable },
}

impl LookupAction {
    fn table(&self) -> LookupTable {
        match self {
            Self::List { table }
            | Self::Add { table, .. }
            | Self::Rename { table, .. }
            | Self::Delete { table, .. }
            | Self::Reset { table } => *table,
        }
    }
}

/// Fields left `None` keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SettingsChange {
    day: Option<Weekday>,
    hour: Option<String>,
    enabled: Option<bool>,
    url: Option<String>,
}

impl SettingsChange {
    fn apply(&self, document: &Document) -> ReportSettingsInput {
        let current = &document.report_settings;
        ReportSettingsInput {
            day_of_week: self.day.unwrap_or(current.day_of_week),
            hour: self.hour.clone().unwrap_or_else(|| current.hour.clone()),
            enabled: self.enabled.unwrap_or(current.enabled),
            google_script_url: self
                .url
                .clone()
                .unwrap_or_else(|| current.google_script_url.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Dashboard {
        filter: String,
    },
    Report {
        system: Option<String>,
        group_by: Option<GroupBy>,
        filter: String,
        csv: bool,
    },
    Digest {
        system: Option<String>,
        html: bool,
    },
    Mailto,
    Sync(SyncAction),
    Link {
        url: String,
    },
    SendReports,
    Watch,
    Import {
        kind: ImportKind,
        file: PathBuf,
    },
    Lookup(LookupAction),
    Record(RecordAction),
    /// `None` prints the current settings.
    Settings(Option<SettingsChange>),
    Reset,
    Clear,
    Check,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    show_help: bool,
    user: Option<String>,
    password: Option<String>,
    command: Option<Command>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        show_help: false,
        user: None,
        password: None,
        command: None,
    };

    let mut iter = args.into_iter().map(|arg| arg.as_ref().to_owned());
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value);
            }
            "--user" => {
                options.user = Some(iter.next().ok_or_else(|| anyhow!("--user requires a name"))?);
            }
            "--password" => {
                options.password =
                    Some(iter.next().ok_or_else(|| anyhow!("--password requires a value"))?);
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown if unknown.starts_with('-') => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
            name => {
                let rest = iter.by_ref().collect::<Vec<_>>();
                options.command = Some(parse_command(name, rest)?);
            }
        }
    }

    Ok(options)
}

fn parse_command(name: &str, args: Vec<String>) -> Result<Command> {
    let mut args = CommandArgs::new(name, args);
    let command = match name {
        "dashboard" => Command::Dashboard {
            filter: args.flag_value("--filter")?.unwrap_or_default(),
        },
        "report" => Command::Report {
            system: args.flag_value("--system")?,
            group_by: args
                .flag_value("--group-by")?
                .map(|raw| {
                    GroupBy::parse(&raw).ok_or_else(|| {
                        anyhow!("report: unknown --group-by {raw:?}; use system, plate, or plan")
                    })
                })
                .transpose()?,
            filter: args.flag_value("--filter")?.unwrap_or_default(),
            csv: args.switch("--csv"),
        },
        "digest" => Command::Digest {
            system: args.flag_value("--system")?,
            html: args.switch("--html"),
        },
        "mailto" => Command::Mailto,
        "sync" => Command::Sync(match args.positional("pull|push|now")?.as_str() {
            "pull" => SyncAction::Pull,
            "push" => SyncAction::Push,
            "now" => SyncAction::Now,
            other => bail!("sync: unknown action {other:?}; use pull, push, or now"),
        }),
        "link" => Command::Link {
            url: args.positional("URL")?,
        },
        "send-reports" => Command::SendReports,
        "watch" => Command::Watch,
        "import" => {
            let raw = args.positional("vehicles|plans|history")?;
            let kind = ImportKind::parse(&raw).ok_or_else(|| {
                anyhow!("import: unknown kind {raw:?}; use vehicles, plans, or history")
            })?;
            Command::Import {
                kind,
                file: PathBuf::from(args.positional("FILE")?),
            }
        }
        "lookup" => Command::Lookup(parse_lookup(&mut args)?),
        "vehicle" | "plan" | "history" | "coordinator" | "user" => {
            let entity = Entity::parse(name)
                .ok_or_else(|| anyhow!("unknown command {name:?}; run with --help"))?;
            Command::Record(parse_record(entity, &mut args)?)
        }
        "settings" => Command::Settings(parse_settings(&mut args)?),
        "reset" => Command::Reset,
        "clear" => Command::Clear,
        "check" => Command::Check,
        unknown => bail!("unknown command {unknown:?}; run with --help to see supported commands"),
    };
    args.finish()?;
    Ok(command)
}

fn parse_lookup(args: &mut CommandArgs) -> Result<LookupAction> {
    let action = args.positional("list|add|rename|delete|reset")?;
    let raw_table = args.positional("TABLE")?;
    let table = LookupTable::parse(&raw_table).ok_or_else(|| {
        anyhow!(
            "lookup: unknown table {raw_table:?}; use one of {}",
            LookupTable::ALL.map(LookupTable::key).join(", ")
        )
    })?;
    Ok(match action.as_str() {
        "list" => LookupAction::List { table },
        "add" => LookupAction::Add {
            table,
            value: args.positional("VALUE")?,
        },
        "rename" => LookupAction::Rename {
            table,
            id: args.positional("ID")?,
            value: args.positional("VALUE")?,
        },
        "delete" => LookupAction::Delete {
            table,
            id: args.positional("ID")?,
        },
        "reset" => LookupAction::Reset { table },
        other => bail!("lookup: unknown action {other:?}; use list, add, rename, delete, or reset"),
    })
}

fn parse_settings(args: &mut CommandArgs) -> Result<Option<SettingsChange>> {
    if args.is_empty() {
        return Ok(None);
    }
    let day = args
        .flag_value("--day")?
        .map(|raw| {
            parse_weekday(&raw)
                .ok_or_else(|| anyhow!("settings: unknown --day {raw:?}; use a weekday name"))
        })
        .transpose()?;
    let enabled = args
        .flag_value("--enabled")?
        .map(|raw| match raw.as_str() {
            "true" | "yes" | "on" => Ok(true),
            "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow!("settings: --enabled expects true or false, got {raw:?}")),
        })
        .transpose()?;
    let change = SettingsChange {
        day,
        hour: args.flag_value("--hour")?,
        enabled,
        url: args.flag_value("--url")?,
    };

    let action = args.positional("set")?;
    if action != "set" {
        bail!("settings: unknown action {action:?}; use `settings` or `settings set`");
    }
    Ok(Some(change))
}

/// Remaining arguments of one subcommand. Flags are pulled out by name; whatever is
/// left must be consumed as positionals.
struct CommandArgs {
    command: String,
    args: Vec<String>,
}

impl CommandArgs {
    fn new(command: &str, args: Vec<String>) -> Self {
        Self {
            command: command.to_owned(),
            args,
        }
    }

    fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    fn switch(&mut self, flag: &str) -> bool {
        let before = self.args.len();
        self.args.retain(|arg| arg != flag);
        self.args.len() != before
    }

    fn flag_value(&mut self, flag: &str) -> Result<Option<String>> {
        let Some(index) = self.args.iter().position(|arg| arg == flag) else {
            return Ok(None);
        };
        if index + 1 >= self.args.len() {
            bail!("{}: {flag} requires a value", self.command);
        }
        let value = self.args.remove(index + 1);
        self.args.remove(index);
        Ok(Some(value))
    }

    fn positional(&mut self, what: &str) -> Result<String> {
        if let Some(index) = self.args.iter().position(|arg| !arg.starts_with("--")) {
            return Ok(self.args.remove(index));
        }
        bail!("{}: missing {what}; run with --help for usage", self.command)
    }

    fn finish(self) -> Result<()> {
        if let Some(extra) = self.args.first() {
            bail!(
                "{}: unexpected argument {extra:?}; run with --help for usage",
                self.command
            );
        }
        Ok(())
    }
}

fn print_help() {
    println!("flota: fleet maintenance tracker");
    println!();
    println!("usage: flota [options] [command]");
    println!();
    println!("commands:");
    println!("  dashboard [--filter Q]                 KPIs, overdue and upcoming plans (default)");
    println!("  report [--system ID] [--group-by system|plate|plan] [--filter Q] [--csv]");
    println!("  digest [--system ID] [--html]          Attention digest for one system or all");
    println!("  mailto                                 mailto: links for every coordinator");
    println!("  sync pull|push|now                     Exchange data with the sync endpoint");
    println!("  link URL                               Store the sync URL and pull from it");
    println!("  send-reports                           Email every coordinator their digest");
    println!("  watch                                  Poll the endpoint and send scheduled reports");
    println!("  import vehicles|plans|history FILE     Import a semicolon-separated CSV (admin)");
    println!("  lookup list|add|rename|delete|reset TABLE [ID] [VALUE]");
    println!("  vehicle list|add|edit|delete [ID] [--id N --plate P --brand ID --model ID");
    println!("      --type ID --system ID --status Activo|Baja|Alta --grease G --notes T]");
    println!("  plan list [--vehicle ID] | add|edit [ID] --vehicle ID --type ID --days N");
    println!("      [--km N --oil ID] | pause|resume|delete ID | clear");
    println!("  history list [--plan ID] | add --plan ID [--date D --operator ID --km N --notes T]");
    println!("      | edit ID [...] | delete ID");
    println!("  coordinator list|add|edit|delete [ID] [--name N --role R --email E --system ID]");
    println!("  user list|add|edit|delete [NAME] [--name N --password P --role admin|user]");
    println!("  settings [set --day D --hour HH:MM --enabled true|false --url URL]");
    println!("  reset                                  Restore the initial demo data (admin)");
    println!("  clear                                  Remove all data (admin)");
    println!("  check                                  Validate config, database, and document");
    println!();
    println!("options:");
    println!("  --config <path>          Use a specific config path");
    println!("  --user <name>            Account for admin commands (or FLOTA_USER)");
    println!("  --password <value>       Password for --user (or FLOTA_PASSWORD)");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Run against seeded demo data (in-memory)");
    println!("  --help                   Show this help");
}
