use clap::Parser;

/// Lists the campus locations of a calendar user and previews marker selection
#[derive(Parser, Debug)]
#[command(name = "campusmap")]
#[command(author = "4n6h4x0r")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetches campus locations and shows what the map would highlight", long_about = None)]
pub struct Args {
    /// Base URL of the calendar API (overrides CAMPUSMAP_API_ROOT)
    #[arg(long = "api-root", value_name = "URL")]
    pub api_root: Option<String>,

    /// Only show locations where this user has lessons (overrides CAMPUSMAP_USER_ID)
    #[arg(short = 'u', long = "user-id", value_name = "ID")]
    pub user_id: Option<u64>,

    /// Select a marker and print its info window
    #[arg(short = 's', long = "select", value_name = "LOCATION_ID")]
    pub select: Option<i64>,

    /// Print markers as JSON
    #[arg(long = "json")]
    pub json: bool,

    /// Print the selected info window as HTML
    #[arg(long = "html", requires = "select")]
    pub html: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Parses command-line arguments
pub fn parse_args() -> Args {
    Args::parse()
}
