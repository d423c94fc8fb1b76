use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

/// Rehydrate the managed style containers of an HTML file and print the
/// recovered groups.
///
/// Usage: cargo run --bin inspect_sheet -- <page.html> [styled.toml]
use styled::config::StyledConfig;
use styled::core::rehydrate;
use styled::document::HostDocument;
use styled::logging::init_logging;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let Some(html_path) = args.get(1).map(PathBuf::from) else {
        eprintln!("Usage: inspect_sheet <page.html> [styled.toml]");
        return ExitCode::from(2);
    };
    let config_path = args.get(2).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("styled.toml"));

    let config = match StyledConfig::load_or_default(&config_path).and_then(StyledConfig::with_env_overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Warning: {}", e);
    }

    let html = match std::fs::read_to_string(&html_path) {
        Ok(html) => html,
        Err(e) => {
            eprintln!("Error reading {}: {}", html_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let document = HostDocument::parse_html(&html);
    let containers = document.len();
    let shared = document.into_shared();
    let result = rehydrate(&shared, &config.sheet.attribute, &config.sheet.version_attribute);

    println!("Document: {}", html_path.display());
    println!(
        "Style containers: {} ({} managed)",
        containers, result.managed_containers
    );
    println!();
    println!("{:>6}  {:<32}  {:>5}  names", "group", "id", "rules");
    for group in &result.groups {
        println!(
            "{:>6}  {:<32}  {:>5}  {}",
            group.group,
            group.id,
            group.size,
            group.names.join(",")
        );
    }
    println!();
    println!("Unindexed rules: {}", result.unindexed);
    println!("Next group: {}", result.next_group());

    ExitCode::SUCCESS
}
