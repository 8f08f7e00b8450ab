//! Command dispatch

use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{Approach1, Approach2, Quantification};
use crate::cli::args::{AnalyzeArgs, Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings, CONFIG_FILE};
use crate::domain::ImportanceMeasures;
use crate::infrastructure::di::ServiceContainer;

pub fn execute(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `rsfta --help`".to_string(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => config_command(cli, command),
        Commands::Analyze(args) => {
            let settings = apply_overrides(Settings::load(cli.config.as_deref())?, args);
            settings.validate()?;
            analyze(&ServiceContainer::new(settings), args)
        }
        Commands::Cutsets { logic } => {
            let container = ServiceContainer::new(Settings::load(cli.config.as_deref())?);
            let tree = container.quantification.load_tree(logic)?;
            for (i, cut_set) in tree.cut_set_names().iter().enumerate() {
                output::info(&format!("{}: [{}]", i + 1, cut_set.join(", ")));
            }
            Ok(())
        }
        Commands::Tree { logic, rows } => {
            let container = ServiceContainer::new(Settings::load(cli.config.as_deref())?);
            let tree = container.quantification.load_tree(logic)?;
            if *rows {
                for row in tree.structure() {
                    output::info(&row);
                }
            } else {
                output::info(&tree);
            }
            Ok(())
        }
    }
}

/// CLI flags win over every configuration layer.
fn apply_overrides(mut settings: Settings, args: &AnalyzeArgs) -> Settings {
    if let Some(analysis) = args.analysis {
        settings.analysis = analysis;
    }
    if let Some(hazard) = &args.hazard {
        settings.hazard = Some(hazard.clone());
    }
    if let Some(im) = &args.im {
        settings.im = im.clone();
    }
    if let Some(midpoints) = &args.im_midpoints {
        settings.im_midpoints = midpoints.clone();
    }
    if let Some(nbins) = args.nbins {
        settings.nbins = nbins;
    }
    if let Some(nsamp) = args.nsamp {
        settings.nsamp = nsamp;
    }
    if let Some(seed) = args.seed {
        settings.seed = Some(seed);
    }
    if let Some(dir) = &args.results_dir {
        settings.results_dir = dir.clone();
    }
    if let Some(max) = args.max_exact_cut_sets {
        settings.max_exact_cut_sets = max;
    }
    settings.uncertainty |= args.uncertainty;
    settings.lite |= args.lite;
    settings.write_output |= args.write_output;
    settings
}

#[instrument(skip(container))]
fn analyze(container: &ServiceContainer, args: &AnalyzeArgs) -> CliResult<()> {
    let settings = &container.settings;
    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .logic
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "fta".to_string()),
    };
    let options = settings.analysis_options()?;
    debug!(?options, "analysis options");
    if settings.write_output {
        container.prepare_results_dir()?;
    }

    let result = container.quantification.run(
        &name,
        &args.logic,
        &args.basic_events,
        settings.hazard.as_deref(),
        options,
    )?;

    print_summary(&result);

    if settings.write_output {
        let written = container.report.write(&result, &settings.results_dir)?;
        output::header(&format!("Results written ({})", written.len()));
        for path in written {
            output::success_detail(&path.display());
        }
    }
    Ok(())
}

fn print_summary(result: &Quantification) {
    output::header(&format!("Fault tree: {}", result.name()));
    output::action("Cut sets", &result.tree().mocus().len());

    if let Some(a2) = result.approach_2() {
        print_approach_2(a2);
    }
    match result.approach_1() {
        Some(a1) => print_approach_1(a1),
        None => output::warning("lite analysis, cut-set quantification skipped"),
    }
}

fn print_approach_2(a2: &Approach2) {
    output::header("Top event fragility");
    output::action("Median", &format!("{:.4}", a2.fit.median));
    output::action("Beta", &format!("{:.4}", a2.fit.beta));
    output::action("Top risk", &format!("{:.6e}", a2.top_risk));
}

fn print_approach_1(a1: &Approach1) {
    output::header("Top event");
    for estimate in &a1.top_event {
        output::action(estimate.method, &format!("{:.6e}", estimate.summary.point));
    }

    output::header("Minimal cut sets");
    for cut_set in &a1.cut_sets {
        output::detail(&format!(
            "{:<30} {:.6e} {:>7.2}%",
            cut_set.label(),
            cut_set.probability.point(),
            cut_set.importance.point()
        ));
    }

    output::header("Importance measures");
    output::detail(&format!(
        "{:<12} {:>5} {}",
        "Event",
        "Count",
        ImportanceMeasures::NAMES
            .iter()
            .map(|n| format!("{:>12}", n))
            .collect::<String>()
    ));
    for event in &a1.events {
        let values: String = event
            .measures
            .as_array()
            .iter()
            .map(|s| format!("{:>12.4e}", s.point))
            .collect();
        output::detail(&format!("{:<12} {:>5} {}", event.name, event.count, values));
    }
}

fn config_command(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(cli.config.as_deref())?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("Global", &path.display()),
                None => output::warning("no config directory for this platform"),
            }
            let local = cli
                .config
                .clone()
                .unwrap_or_else(|| CONFIG_FILE.into());
            output::action("Local", &local.display());
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AnalysisMode;
    use std::path::PathBuf;

    #[test]
    fn given_flags_when_applying_overrides_then_flags_win() {
        let args = AnalyzeArgs {
            analysis: Some(AnalysisMode::Fragility),
            nbins: Some(5),
            lite: true,
            results_dir: Some(PathBuf::from("out")),
            ..Default::default()
        };

        let settings = apply_overrides(Settings::default(), &args);

        assert_eq!(settings.analysis, AnalysisMode::Fragility);
        assert_eq!(settings.nbins, 5);
        assert!(settings.lite);
        assert_eq!(settings.results_dir, PathBuf::from("out"));
        assert_eq!(settings.nsamp, 1);
    }

    #[test]
    fn given_no_command_when_executing_then_usage_error() {
        let cli = Cli {
            debug: 0,
            config: None,
            command: None,
        };
        assert!(matches!(execute(&cli), Err(CliError::Usage(_))));
    }
}
