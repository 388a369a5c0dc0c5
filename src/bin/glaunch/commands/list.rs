use anyhow::Result;
use glaunch::config::Config;
use glaunch::launchers::LauncherRegistry;
use owo_colors::OwoColorize;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct LauncherRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "DEFAULT")]
    default: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
}

pub(crate) fn handle_list(config: &Config, registry: &LauncherRegistry) -> Result<()> {
    let rows: Vec<LauncherRow> = registry
        .launchers()
        .map(|launcher| {
            let is_default = launcher.name() == config.launcher.default;
            LauncherRow {
                name: launcher.name().to_string(),
                default: if is_default {
                    "*".green().bold().to_string()
                } else {
                    String::new()
                },
                description: launcher.description().to_string(),
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::blank());
    println!("{table}");
    Ok(())
}
