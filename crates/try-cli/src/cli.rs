use std::path::PathBuf;

use clap::{ArgAction, Parser};
use try_core::{GlobalOptions, OptionOverrides};

pub const TRY_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nArguments:\n{positionals}\n\nOptions:\n{options}\n{after-help}";

pub const TRY_BEFORE_HELP: &str = concat!(
    "try ",
    env!("CARGO_PKG_VERSION"),
    " – Easily try out python packages\n\n",
    "Creates a throwaway virtualenv, installs the packages, drops you into\n",
    "python with them imported, and removes everything when you exit.",
);

pub const TRY_AFTER_HELP: &str = concat!(
    "\x1b[1;36mPackage tokens\x1b[0m\n",
    "  requests               install from the package index, `import requests`\n",
    "  requests==2.31         pinned; the pin is dropped from the import\n",
    "  beautifulsoup4:bs4     install one name, import another\n",
    "  timofurrer/try         install git+git://github.com/timofurrer/try\n",
    "  owner/repo:module      repository install with an explicit import\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "try",
    author,
    version,
    before_help = TRY_BEFORE_HELP,
    after_help = TRY_AFTER_HELP,
    help_template = TRY_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct TryCli {
    #[arg(
        value_name = "PACKAGE",
        required = true,
        num_args = 1..,
        help = "Packages to try: name[==version][:import] or owner/repo[:import]"
    )]
    pub packages: Vec<String>,
    #[arg(short, long, value_name = "VERSION", help = "The python version to use (e.g. 3.11)")]
    pub python: Option<String>,
    #[arg(long, value_name = "PATH", help = "Use an already existing virtualenv")]
    pub virtualenv: Option<PathBuf>,
    #[arg(long, help = "Use ipython instead of python")]
    pub ipython: bool,
    #[arg(
        long,
        value_name = "COMMAND",
        help = "The python shell to use (overrides --ipython)"
    )]
    pub shell: Option<String>,
    #[arg(short, long, help = "Keep the try environment files")]
    pub keep: bool,
    #[arg(short, long, help = "Try with an editor instead of a shell")]
    pub editor: bool,
    #[arg(long, value_name = "PATH", help = "Location for the temporary directory")]
    pub tmpdir: Option<PathBuf>,
    #[arg(short, long, value_name = "URL", help = "The package index to install from")]
    pub index: Option<String>,
    #[arg(
        long,
        value_name = "PATH",
        env = "TRY_CONFIG",
        help = "Config file to read instead of <config dir>/try/config.ini"
    )]
    pub config: Option<PathBuf>,
    #[arg(short, long, help = "Suppress human output (errors still print to stderr)")]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)")]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q")]
    pub trace: bool,
    #[arg(long, help = "Emit {status,message,details} JSON envelopes")]
    pub json: bool,
    #[arg(long, help = "Disable colored human output")]
    pub no_color: bool,
}

impl TryCli {
    pub fn global_options(&self) -> GlobalOptions {
        GlobalOptions {
            config: self
                .config
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
        }
    }

    pub fn overrides(&self) -> OptionOverrides {
        OptionOverrides {
            python: self.python.clone(),
            virtualenv: self.virtualenv.clone(),
            ipython: self.ipython,
            shell: self.shell.clone(),
            keep: self.keep,
            editor: self.editor,
            tmpdir: self.tmpdir.clone(),
            index: self.index.clone(),
        }
    }
}
