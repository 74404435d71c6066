use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "vidseek",
    version,
    about = "Search a video API, browse episodes and hand playback to a player"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Interactive terminal UI (default)")]
    Tui,
    #[command(about = "Search the current (or given) source")]
    Search {
        query: Vec<String>,
        #[arg(short, long)]
        source: Option<String>,
    },
    #[command(about = "List the episodes of one title")]
    Detail {
        id: String,
        #[arg(short, long)]
        source: Option<String>,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long, help = "Show the list last episode first")]
        reverse: bool,
    },
    #[command(about = "Hand off episode N (as labelled) of a title and start the player")]
    Play {
        id: String,
        episode: usize,
        #[arg(short, long)]
        source: Option<String>,
        #[arg(short, long)]
        title: Option<String>,
    },
    #[command(about = "Play the handed-off episode again")]
    Resume,
    #[command(about = "Play the episode after the handed-off one")]
    Next,
    #[command(about = "Play the episode before the handed-off one")]
    Previous,
    #[command(about = "Show or change the current source")]
    Source {
        code: Option<String>,
        #[arg(long)]
        custom_url: Option<String>,
    },
    #[command(about = "Availability of the current source")]
    Status {
        #[arg(long, help = "Check again even when a fresh cached result exists")]
        refresh: bool,
    },
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        matches!(self.command, None | Some(Command::Tui))
    }
}
