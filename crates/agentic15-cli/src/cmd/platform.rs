use crate::cmd::context;
use crate::output::{print_json, print_table};
use agentic15_core::{
    azure::AzureDevOpsClient,
    detect::PlatformDetector,
    github::GitHubClient,
    platform::{PlatformClient, Readiness},
    process::CommandRunner,
};
use clap::Subcommand;
use serde::Serialize;
use std::path::Path;

#[derive(Subcommand)]
pub enum PlatformSubcommand {
    /// Show which platform is detected and why
    Detect,
    /// Show integration settings and probe the external tools
    Status,
}

pub fn run(root: &Path, subcmd: PlatformSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        PlatformSubcommand::Detect => detect(root, json),
        PlatformSubcommand::Status => status(root, json),
    }
}

fn detect(root: &Path, json: bool) -> anyhow::Result<()> {
    let (settings, runner) = context(root);
    let detection = PlatformDetector::new(root, &settings, &runner).detect();

    if json {
        return print_json(&detection);
    }

    match (detection.platform, detection.source) {
        (Some(platform), Some(source)) => {
            println!("Detected: {} (via {source})", platform.display_name())
        }
        (Some(platform), None) => println!("Detected: {}", platform.display_name()),
        (None, _) => println!("Detected: none (tracker sync disabled)"),
    }
    if detection.ambiguous {
        println!(
            "Warning: both integrations are enabled; GitHub was chosen. \
             Set platform.type and platform.autoDetect=false to pick one."
        );
    }
    if !detection.failures.is_empty() {
        let rows = detection
            .failures
            .iter()
            .map(|f| vec![f.step.to_string(), f.reason.clone()])
            .collect();
        println!();
        print_table(&["STEP", "MISSED BECAUSE"], rows);
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IntegrationStatus {
    platform: &'static str,
    enabled: bool,
    missing: Vec<&'static str>,
    readiness: Readiness,
}

fn status(root: &Path, json: bool) -> anyhow::Result<()> {
    let (settings, runner) = context(root);
    let detected = PlatformDetector::new(root, &settings, &runner)
        .detect()
        .platform;

    let github =
        GitHubClient::new(settings.github.clone()).with_gh_cli(runner.available("gh"));
    let azure = AzureDevOpsClient::new(settings.azure_dev_ops.clone(), &runner, root);
    let integrations = vec![
        IntegrationStatus {
            platform: "github",
            enabled: settings.github.enabled,
            missing: settings.github.missing_fields(),
            readiness: github.readiness(),
        },
        IntegrationStatus {
            platform: "azure",
            enabled: settings.azure_dev_ops.enabled,
            missing: settings.azure_dev_ops.missing_fields(),
            readiness: azure.readiness(),
        },
    ];

    if json {
        return print_json(&serde_json::json!({
            "detected": detected,
            "integrations": integrations,
        }));
    }

    match detected {
        Some(p) => println!("Detected platform: {}", p.display_name()),
        None => println!("Detected platform: none"),
    }
    println!();
    let rows = integrations
        .iter()
        .map(|i| {
            vec![
                i.platform.to_string(),
                if i.enabled { "yes" } else { "no" }.to_string(),
                if i.readiness.ready { "ready" } else { "not ready" }.to_string(),
                i.readiness.hint.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["PLATFORM", "ENABLED", "STATE", "HINT"], rows);
    Ok(())
}
