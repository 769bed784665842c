// ABOUTME: Simple REPL for driving an in-process toolgate registry by hand.
// ABOUTME: Reads .toolgate.json for owners and registry settings.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use rustyline::DefaultEditor;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use toolgate::prelude::*;

const HELP: &str = "\
Commands (all ids are content ids, addresses are hex):
  as <address>                                  act as this caller
  owner <key> <address>                         set the owner of a key entity
  register <key> <on|off> <tool>...             register tools
  remove <key> <tool>...                        remove tools and their policies
  enable <key> <tool>... | disable <key> <tool>...
  delegate <key> <address>...                   add delegatees
  undelegate <key> <address>...                 remove delegatees
  blanket <key> <tool> <policy> [on|off]        set a blanket policy
  unblanket <key> <tool>                        remove a blanket policy
  custom <key> <tool> <delegatee> <policy> [on|off]
  uncustom <key> <tool> <delegatee>
  enable-custom | disable-custom <key> <tool> <delegatee>
  effective <key> <tool> <delegatee>            resolve the governing policy
  authorize <key> <tool> <delegatee>            execution-time check
  tools <key> | delegatees <key>
  quit";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ShellConfig {
    registry: Option<RegistryConfig>,
    owners: HashMap<KeyEntityId, Address>,
    caller: Option<Address>,
}

fn find_config() -> Option<PathBuf> {
    // Try .toolgate.json in current directory
    let local = PathBuf::from(".toolgate.json");
    if local.exists() {
        return Some(local);
    }

    // Try ~/.toolgate.json
    if let Some(home) = dirs::home_dir() {
        let global = home.join(".toolgate.json");
        if global.exists() {
            return Some(global);
        }
    }

    None
}

fn load_config() -> Result<ShellConfig> {
    let Some(path) = find_config() else {
        return Ok(ShellConfig::default());
    };

    let content = std::fs::read_to_string(&path)?;
    let config = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

struct Shell {
    registry: Registry,
    owners: Arc<StaticOwners>,
    caller: Address,
}

fn key(arg: &str) -> Result<KeyEntityId> {
    Ok(arg.parse()?)
}

fn address(arg: &str) -> Result<Address> {
    Ok(arg.parse()?)
}

fn addresses(args: &[&str]) -> Result<Vec<Address>> {
    args.iter().map(|arg| address(arg)).collect()
}

fn flag(arg: Option<&&str>) -> Result<bool> {
    match arg.copied() {
        None | Some("on") => Ok(true),
        Some("off") => Ok(false),
        Some(other) => bail!("expected on|off, got '{}'", other),
    }
}

fn describe(effective: &EffectivePolicy) -> String {
    match (&effective.policy_id, effective.delegatee_specific) {
        (None, _) => "no policy".to_string(),
        (Some(id), true) => format!("{} (delegatee-specific)", id),
        (Some(id), false) => format!("{} (blanket)", id),
    }
}

impl Shell {
    async fn execute(&mut self, line: &str) -> Result<String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            return Ok(String::new());
        };

        let caller = self.caller;
        let tools = self.registry.tools();
        let policies = self.registry.policies();
        let delegatees = self.registry.delegatees();

        match (command, args) {
            ("help", _) => Ok(HELP.to_string()),
            ("as", [addr]) => {
                self.caller = address(addr)?;
                Ok(format!("acting as {}", self.caller))
            }
            ("owner", [k, addr]) => {
                let owner = address(addr)?;
                self.owners.set_owner(key(k)?, owner).await;
                Ok(format!("owner of {} is {}", k, owner))
            }
            ("register", [k, on, ids @ ..]) => {
                tools.register_tools(caller, key(k)?, ids, flag(Some(on))?).await?;
                Ok(format!("registered {} tool(s)", ids.len()))
            }
            ("remove", [k, ids @ ..]) => {
                tools.remove_tools(caller, key(k)?, ids).await?;
                Ok(format!("removed {} tool(s)", ids.len()))
            }
            ("enable", [k, ids @ ..]) => {
                tools.enable_tools(caller, key(k)?, ids).await?;
                Ok("ok".to_string())
            }
            ("disable", [k, ids @ ..]) => {
                tools.disable_tools(caller, key(k)?, ids).await?;
                Ok("ok".to_string())
            }
            ("delegate", [k, addrs @ ..]) => {
                delegatees
                    .add_delegatees(caller, key(k)?, &addresses(addrs)?)
                    .await?;
                Ok("ok".to_string())
            }
            ("undelegate", [k, addrs @ ..]) => {
                delegatees
                    .remove_delegatees(caller, key(k)?, &addresses(addrs)?)
                    .await?;
                Ok("ok".to_string())
            }
            ("blanket", [k, tool, policy, rest @ ..]) => {
                policies
                    .set_blanket_policies(caller, key(k)?, &[tool], &[policy], flag(rest.first())?)
                    .await?;
                Ok("ok".to_string())
            }
            ("unblanket", [k, tool]) => {
                policies.remove_blanket_policies(caller, key(k)?, &[tool]).await?;
                Ok("ok".to_string())
            }
            ("custom", [k, tool, d, policy, rest @ ..]) => {
                policies
                    .set_custom_policies(
                        caller,
                        key(k)?,
                        &[tool],
                        &[address(d)?],
                        &[policy],
                        flag(rest.first())?,
                    )
                    .await?;
                Ok("ok".to_string())
            }
            ("uncustom", [k, tool, d]) => {
                policies
                    .remove_custom_policies(caller, key(k)?, &[tool], &[address(d)?])
                    .await?;
                Ok("ok".to_string())
            }
            ("enable-custom", [k, tool, d]) => {
                policies
                    .enable_custom_policies(caller, key(k)?, &[tool], &[address(d)?])
                    .await?;
                Ok("ok".to_string())
            }
            ("disable-custom", [k, tool, d]) => {
                policies
                    .disable_custom_policies(caller, key(k)?, &[tool], &[address(d)?])
                    .await?;
                Ok("ok".to_string())
            }
            ("effective", [k, tool, d]) => {
                let effective = policies.effective_policy(key(k)?, tool, address(d)?).await?;
                Ok(describe(&effective))
            }
            ("authorize", [k, tool, d]) => {
                let effective = policies
                    .authorize_execution(key(k)?, tool, address(d)?)
                    .await?;
                Ok(format!("allowed under {}", describe(&effective)))
            }
            ("tools", [k]) => {
                let listed = tools.registered_tools(key(k)?).await;
                Ok(listed
                    .iter()
                    .map(|t| format!("{} [{}]", t.tool_id, if t.enabled { "on" } else { "off" }))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            ("delegatees", [k]) => {
                let listed = delegatees.delegatees(key(k)?).await;
                Ok(listed
                    .iter()
                    .map(Address::to_string)
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            _ => bail!("unrecognized command, try 'help'"),
        }
    }
}

async fn run_shell(shell: &mut Shell) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("Acting as {}. Type 'help' for commands, 'quit' to exit.\n", shell.caller);

    loop {
        let line = match rl.readline("toolgate> ") {
            Ok(line) => line,
            Err(_) => break,
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let _ = rl.add_history_entry(line);

        match shell.execute(line).await {
            Ok(output) if output.is_empty() => {}
            Ok(output) => println!("{}", output),
            Err(e) => println!("error: {}", e),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = load_config()?;
    let registry_config = match config.registry {
        Some(registry_config) => registry_config,
        None => RegistryConfig::from_env()?,
    };

    let owners: Arc<StaticOwners> = Arc::new(config.owners.into_iter().collect());
    let registry = Registry::builder(owners.clone())
        .config(registry_config)
        .sink(LogSink)
        .build();

    let mut shell = Shell {
        registry,
        owners,
        caller: config.caller.unwrap_or(Address::ZERO),
    };

    run_shell(&mut shell).await
}
