use anyhow::{Context, Result};
use campusmap_core::{LocationOverlayController, LocationsClient, MarkerEntry, OverlayConfig};

mod cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = cli::parse_args();

    // Initialize logger with appropriate level based on verbose flag
    if std::env::var("RUST_LOG").is_err() {
        if args.verbose {
            std::env::set_var("RUST_LOG", "debug");
        } else {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    // Command line flags win over the environment
    let mut config = OverlayConfig::from_env()?;
    if let Some(api_root) = &args.api_root {
        config.api_root = api_root.clone();
    }
    if args.user_id.is_some() {
        config.user_id = args.user_id;
    }

    let client = LocationsClient::new(&config).context("Failed to create HTTP client")?;
    let mut controller = LocationOverlayController::new(config);

    log::info!("Loading locations from {}", client.url());
    controller
        .initialize(&client)
        .await
        .with_context(|| format!("Failed to load locations from {}", client.url()))?;

    if !controller.rejected().is_empty() {
        eprintln!("\n⚠️  Skipped {} invalid location records:", controller.rejected().len());
        for rejected in controller.rejected() {
            eprintln!("  ✗ {}", rejected);
        }
        eprintln!();
    }

    if args.json {
        let markers: Vec<_> = controller.entries().iter().map(marker_json).collect();
        println!("{}", serde_json::to_string_pretty(&markers)?);
    } else {
        print_markers(controller.entries());
    }

    // Preview a click on one marker
    if let Some(id) = args.select {
        if !controller.select_marker(id) {
            anyhow::bail!("No location with id {} was loaded", id);
        }

        let entry = controller
            .current_entry()
            .ok_or_else(|| anyhow::anyhow!("Selection of location {} was lost", id))?;

        println!();
        if args.html {
            println!("{}", entry.info.content.to_html());
        } else {
            println!("{}", entry.info.content);
            match &entry.region {
                Some(region) => println!("Outline: {} points", region.path.len()),
                None => println!("Outline: none"),
            }
        }

        let viewport = controller.viewport();
        log::info!(
            "Map centered on {} at zoom {}",
            viewport.center(),
            viewport.zoom()
        );
    }

    Ok(())
}

fn print_markers(entries: &[MarkerEntry]) {
    if entries.is_empty() {
        println!("No locations to show.");
        return;
    }

    for entry in entries {
        let outline = entry
            .region
            .as_ref()
            .map(|r| format!("{} pt outline", r.path.len()))
            .unwrap_or_else(|| "no outline".to_string());
        println!(
            "{:>6}  {:<32} {}  {}",
            entry.id, entry.title, entry.position, outline
        );
    }
}

fn marker_json(entry: &MarkerEntry) -> serde_json::Value {
    serde_json::json!({
        "id": entry.id,
        "title": entry.title,
        "lat": entry.position.lat,
        "lng": entry.position.lng,
        "address": entry.info.content.address,
        "classrooms": entry.info.content.classrooms,
        "outline_points": entry.region.as_ref().map(|r| r.path.len()),
    })
}
