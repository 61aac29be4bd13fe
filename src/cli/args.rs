use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "mountradio")]
#[command(about = "Internet radio that follows your mount", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// Show playback state, settings and mount roles
    Status,
    /// Start or stop the radio
    Toggle,
    /// Set the radio volume (0-100)
    Volume(VolumeCliArgs),
    /// Toggle auto-start when mounting as driver
    AutoStart,
    /// Toggle auto-stop when dismounting
    AutoStop,
    /// Show settings, or change the stream URL
    Settings(SettingsCliArgs),
    /// Report a host condition flag change to the running service
    Condition(ConditionCliArgs),
}

#[derive(ClapArgs, Debug)]
pub struct VolumeCliArgs {
    /// Volume percentage, e.g. 55
    pub value: String,
}

#[derive(ClapArgs, Debug)]
pub struct SettingsCliArgs {
    /// New stream URL
    #[arg(long)]
    pub url: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct ConditionCliArgs {
    /// Condition flag name (mounted, riding_pillion, ...)
    pub flag: String,
    /// New flag value
    #[arg(value_enum)]
    pub state: FlagState,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagState {
    On,
    Off,
}

impl FlagState {
    pub fn as_bool(self) -> bool {
        matches!(self, FlagState::On)
    }
}
