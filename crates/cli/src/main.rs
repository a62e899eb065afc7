mod config;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use ariadne::{Color, Fmt};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use callbook_core::{
    AliasEntry, AliasMetadata, AliasPatch, AliasRegistry, CoreError, EntityKind, JsonFileStore,
    Template, TemplateRegistry, detect_parameters, expand, is_address_literal, prepare_call,
};
use callbook_submit::{DryRunSubmitter, ExternalSigner, RetrySubmitter, Submitter};
use tracing_subscriber::EnvFilter;

use crate::config::{Settings, resolve_home};
use crate::render::{Expanded, Format, print_json, render_error, status};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "callbook",
    version,
    about = "Save parameterized contract-call templates and replay them with aliases resolved"
)]
struct Cli {
    /// Data directory holding commands.json, contracts.json and config.json.
    /// Defaults to ~/.callbook.
    #[arg(long, global = true, env = "CALLBOOK_HOME", value_name = "DIR")]
    home: Option<PathBuf>,

    /// Output mode: "pretty" for human-readable output, "json" for
    /// machine-readable JSON. Defaults to "pretty" when stdout is a TTY,
    /// "json" otherwise.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    output: Option<String>,

    /// Log more (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Manage command templates.
    #[command(subcommand)]
    Template(TemplateCmd),

    /// Manage contract aliases.
    #[command(subcommand)]
    Alias(AliasCmd),

    /// Expand a template with arguments and submit the resulting call.
    Run {
        /// Template name.
        name: String,
        /// Values for the template's parameters, in declaration order.
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,
        /// RPC endpoint, overriding the template and config.
        #[arg(long, value_name = "URL")]
        rpc_url: Option<String>,
        /// Print the signer command instead of running it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete all stored templates, aliases, or both.
    Reset {
        #[arg(value_enum)]
        target: ResetTarget,
    },
}

#[derive(Subcommand, Debug)]
enum TemplateCmd {
    /// Save a new template. Parameters are `$name` placeholders.
    Add {
        name: String,
        /// Template text, e.g. 'send $wallet usdc "transfer(address,uint256)" $to $amount'.
        template: String,
        /// Parameter binding order (comma-separated). Detected from the
        /// template when omitted.
        #[arg(long, value_delimiter = ',')]
        params: Option<Vec<String>>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List saved templates.
    List,
    /// Show one template.
    Show { name: String },
    /// Delete a template.
    Remove { name: String },
    /// Print the parameters a template text would declare.
    Detect { template: String },
}

#[derive(Subcommand, Debug)]
enum AliasCmd {
    /// Register an alias for a contract address.
    Add {
        alias: String,
        address: String,
        /// Human-readable contract name.
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Network the contract is deployed on.
        #[arg(long)]
        network: Option<String>,
    },
    /// Change an existing alias.
    Update {
        alias: String,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        network: Option<String>,
    },
    /// List registered aliases.
    List,
    /// Show one alias.
    Show { alias: String },
    /// Delete an alias.
    Remove { alias: String },
    /// Resolve an alias or address the way `run` would.
    Resolve { token: String },
}

/// Which registry `reset` clears.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResetTarget {
    Templates,
    Aliases,
    All,
}

// ── Main ────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let format = Format::resolve_or_detect(cli.output.as_deref());

    match run(cli, format) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            render_error(&err, format);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli, format: Format) -> Result<()> {
    let home = resolve_home(cli.home)?;
    tracing::debug!(home = %home.display(), "using data directory");
    let ws = Workspace {
        store: JsonFileStore::new(&home),
        home,
    };

    match cli.cmd {
        Cmd::Template(cmd) => match cmd {
            TemplateCmd::Add {
                name,
                template,
                params,
                description,
            } => cmd_template_add(&ws, &name, &template, params, description, format),
            TemplateCmd::List => cmd_template_list(&ws, format),
            TemplateCmd::Show { name } => cmd_template_show(&ws, &name, format),
            TemplateCmd::Remove { name } => cmd_template_remove(&ws, &name, format),
            TemplateCmd::Detect { template } => cmd_template_detect(&template, format),
        },
        Cmd::Alias(cmd) => match cmd {
            AliasCmd::Add {
                alias,
                address,
                name,
                description,
                network,
            } => {
                let metadata = AliasMetadata {
                    name,
                    description,
                    network,
                    abi: None,
                };
                cmd_alias_add(&ws, &alias, &address, metadata, format)
            }
            AliasCmd::Update {
                alias,
                address,
                name,
                description,
                network,
            } => {
                let patch = AliasPatch {
                    address,
                    name,
                    description,
                    network,
                    abi: None,
                };
                cmd_alias_update(&ws, &alias, patch, format)
            }
            AliasCmd::List => cmd_alias_list(&ws, format),
            AliasCmd::Show { alias } => cmd_alias_show(&ws, &alias, format),
            AliasCmd::Remove { alias } => cmd_alias_remove(&ws, &alias, format),
            AliasCmd::Resolve { token } => cmd_alias_resolve(&ws, &token, format),
        },
        Cmd::Run {
            name,
            args,
            rpc_url,
            dry_run,
        } => cmd_run(&ws, &name, &args, rpc_url.as_deref(), dry_run, format),
        Cmd::Reset { target } => cmd_reset(&ws, target, format),
    }
}

// ── Workspace ───────────────────────────────────────────────────────────

/// The data directory and the store over it.
struct Workspace {
    home: PathBuf,
    store: JsonFileStore,
}

impl Workspace {
    fn templates(&self) -> Result<TemplateRegistry<&JsonFileStore>> {
        TemplateRegistry::open(&self.store).context("failed to load templates")
    }

    fn aliases(&self) -> Result<AliasRegistry<&JsonFileStore>> {
        AliasRegistry::open(&self.store).context("failed to load aliases")
    }

    fn settings(&self) -> Result<Settings> {
        Settings::load(&self.home)
    }
}

fn not_found(kind: EntityKind, key: &str) -> CoreError {
    CoreError::NotFound {
        kind,
        key: key.to_string(),
    }
}

// ── Template commands ───────────────────────────────────────────────────

fn cmd_template_add(
    ws: &Workspace,
    name: &str,
    body: &str,
    params: Option<Vec<String>>,
    description: Option<String>,
    format: Format,
) -> Result<()> {
    let detected = detect_parameters(body);
    let parameters = match params {
        Some(explicit) => {
            for p in explicit.iter().filter(|p| !detected.contains(p)) {
                tracing::warn!(template = name, parameter = %p, "parameter does not appear in the template");
            }
            explicit
        }
        None => detected,
    };
    if parameters.is_empty() {
        return Err(CoreError::Validation {
            field: "template",
            value: body.to_string(),
            reason: "declares no $parameters".into(),
        }
        .into());
    }

    let mut templates = ws.templates()?;
    let template = templates
        .add(name, parameters, body, description)?
        .clone();
    templates.flush().context("failed to save templates")?;

    match format {
        Format::Json => print_json(&serde_json::json!({ "template": template })),
        Format::Pretty => status(format!(
            "saved template '{}' ({})",
            template.name,
            template.parameters.join(", ")
        )),
    }
    Ok(())
}

fn cmd_template_list(ws: &Workspace, format: Format) -> Result<()> {
    let templates = ws.templates()?;
    match format {
        Format::Json => {
            let list: Vec<&Template> = templates.list().collect();
            print_json(&serde_json::json!({ "templates": list }));
        }
        Format::Pretty => {
            let mut any = false;
            for t in templates.list() {
                any = true;
                let head = format!("{}({})", t.name, t.parameters.join(", "));
                println!("{}  {}", head.fg(Color::Cyan), t.body);
            }
            if !any {
                status("no templates saved");
            }
        }
    }
    Ok(())
}

fn cmd_template_show(ws: &Workspace, name: &str, format: Format) -> Result<()> {
    let templates = ws.templates()?;
    let template = templates
        .get(name)
        .ok_or_else(|| not_found(EntityKind::Template, name))?;
    match format {
        Format::Json => print_json(&serde_json::json!({ "template": template })),
        Format::Pretty => {
            println!("{}", template.name.as_str().fg(Color::Cyan));
            println!("  template:   {}", template.body);
            println!("  parameters: {}", template.parameters.join(", "));
            if let Some(description) = &template.description {
                println!("  about:      {description}");
            }
            println!("  updated:    {}", template.updated_at.to_rfc3339());
        }
    }
    Ok(())
}

fn cmd_template_remove(ws: &Workspace, name: &str, format: Format) -> Result<()> {
    let mut templates = ws.templates()?;
    if !templates.remove(name) {
        return Err(not_found(EntityKind::Template, name).into());
    }
    templates.flush().context("failed to save templates")?;
    match format {
        Format::Json => print_json(&serde_json::json!({ "removed": name })),
        Format::Pretty => status(format!("removed template '{name}'")),
    }
    Ok(())
}

fn cmd_template_detect(body: &str, format: Format) -> Result<()> {
    let parameters = detect_parameters(body);
    match format {
        Format::Json => print_json(&serde_json::json!({ "parameters": parameters })),
        Format::Pretty => {
            for p in &parameters {
                println!("{p}");
            }
        }
    }
    Ok(())
}

// ── Alias commands ──────────────────────────────────────────────────────

fn print_alias(entry: &AliasEntry) {
    println!(
        "{}  {}",
        entry.alias.as_str().fg(Color::Cyan),
        entry.address
    );
    let fields = [
        ("name", &entry.name),
        ("description", &entry.description),
        ("network", &entry.network),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {label}: {value}");
        }
    }
}

fn cmd_alias_add(
    ws: &Workspace,
    alias: &str,
    address: &str,
    metadata: AliasMetadata,
    format: Format,
) -> Result<()> {
    let mut aliases = ws.aliases()?;
    let entry = aliases.add(alias, address, metadata)?.clone();
    aliases.flush().context("failed to save aliases")?;
    match format {
        Format::Json => print_json(&serde_json::json!({ "alias": entry })),
        Format::Pretty => status(format!("saved alias '{}' -> {}", entry.alias, entry.address)),
    }
    Ok(())
}

fn cmd_alias_update(ws: &Workspace, alias: &str, patch: AliasPatch, format: Format) -> Result<()> {
    if patch.is_empty() {
        anyhow::bail!("nothing to update; pass --address, --name, --description or --network");
    }
    let mut aliases = ws.aliases()?;
    let entry = aliases.update(alias, patch)?.clone();
    aliases.flush().context("failed to save aliases")?;
    match format {
        Format::Json => print_json(&serde_json::json!({ "alias": entry })),
        Format::Pretty => status(format!("updated alias '{}' -> {}", entry.alias, entry.address)),
    }
    Ok(())
}

fn cmd_alias_list(ws: &Workspace, format: Format) -> Result<()> {
    let aliases = ws.aliases()?;
    match format {
        Format::Json => {
            let list: Vec<&AliasEntry> = aliases.list().collect();
            print_json(&serde_json::json!({ "aliases": list }));
        }
        Format::Pretty => {
            let mut any = false;
            for entry in aliases.list() {
                any = true;
                print_alias(entry);
            }
            if !any {
                status("no aliases registered");
            }
        }
    }
    Ok(())
}

fn cmd_alias_show(ws: &Workspace, alias: &str, format: Format) -> Result<()> {
    let aliases = ws.aliases()?;
    let entry = aliases
        .get(alias)
        .ok_or_else(|| not_found(EntityKind::Alias, alias))?;
    match format {
        Format::Json => print_json(&serde_json::json!({ "alias": entry })),
        Format::Pretty => print_alias(entry),
    }
    Ok(())
}

fn cmd_alias_remove(ws: &Workspace, alias: &str, format: Format) -> Result<()> {
    let mut aliases = ws.aliases()?;
    if !aliases.remove(alias) {
        return Err(not_found(EntityKind::Alias, alias).into());
    }
    aliases.flush().context("failed to save aliases")?;
    match format {
        Format::Json => print_json(&serde_json::json!({ "removed": alias })),
        Format::Pretty => status(format!("removed alias '{alias}'")),
    }
    Ok(())
}

fn cmd_alias_resolve(ws: &Workspace, token: &str, format: Format) -> Result<()> {
    let aliases = ws.aliases()?;
    let address = aliases.resolve(token);
    let resolved = is_address_literal(&address);
    match format {
        Format::Json => print_json(&serde_json::json!({
            "token": token,
            "address": address,
            "resolved": resolved,
        })),
        Format::Pretty => {
            println!("{address}");
            if !resolved {
                status(format!("'{token}' is not a known alias or an address"));
            }
        }
    }
    Ok(())
}

// ── Run ─────────────────────────────────────────────────────────────────

fn cmd_run(
    ws: &Workspace,
    name: &str,
    args: &[String],
    rpc_url: Option<&str>,
    dry_run: bool,
    format: Format,
) -> Result<()> {
    let settings = ws.settings()?;
    let templates = ws.templates()?;
    let aliases = ws.aliases()?;

    let prepared = prepare_call(&templates, &aliases, name, args)
        .map_err(|e| with_expanded_text(e, &templates, name, args))?;
    let call = &prepared.descriptor;
    for flag in call.unrecognized_flags() {
        tracing::warn!(
            template = name,
            flag,
            "unrecognized flag forwarded as a positional argument"
        );
    }
    call.ensure_resolved()?;

    let rpc = settings.rpc_override(rpc_url, call.rpc_url());
    let config = settings.submit_config();
    let mut submitter: Box<dyn Submitter> = if dry_run {
        Box::new(DryRunSubmitter::new(config.signer))
    } else {
        let signer = ExternalSigner::new(config.signer).context("invalid signer configuration")?;
        Box::new(RetrySubmitter::new(signer, config.retry))
    };
    let action = submitter
        .submit(call, rpc)
        .with_context(|| format!("failed to submit template '{name}'"))?;

    match format {
        Format::Json => print_json(&serde_json::json!({
            "template": prepared.template,
            "expanded": prepared.expanded,
            "call": prepared.descriptor,
            "action": action,
        })),
        Format::Pretty => {
            if action.dry_run {
                println!("{}", action.command_line());
            } else {
                println!("{}", action.handle);
                status(format!("submitted '{name}' to {}", call.resolved_address));
            }
        }
    }
    Ok(())
}

/// Attach the expanded text to reconstruction failures so they can be
/// rendered against it.
fn with_expanded_text<S: callbook_core::DocumentStore>(
    err: CoreError,
    templates: &TemplateRegistry<S>,
    name: &str,
    args: &[String],
) -> anyhow::Error {
    if let CoreError::MalformedInvocation { .. } = err
        && let Some(Ok(text)) = templates.get(name).map(|t| expand(t, args))
    {
        return anyhow::Error::new(err).context(Expanded {
            template: name.to_string(),
            text,
        });
    }
    err.into()
}

// ── Reset ───────────────────────────────────────────────────────────────

fn cmd_reset(ws: &Workspace, target: ResetTarget, format: Format) -> Result<()> {
    let mut cleared = Vec::new();
    if matches!(target, ResetTarget::Templates | ResetTarget::All) {
        let mut templates = ws.templates()?;
        templates.reset();
        templates.flush().context("failed to save templates")?;
        cleared.push("templates");
    }
    if matches!(target, ResetTarget::Aliases | ResetTarget::All) {
        let mut aliases = ws.aliases()?;
        aliases.reset();
        aliases.flush().context("failed to save aliases")?;
        cleared.push("aliases");
    }

    match format {
        Format::Json => print_json(&serde_json::json!({ "reset": cleared })),
        Format::Pretty => status(format!("cleared {}", cleared.join(" and "))),
    }
    Ok(())
}
