use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "neovm-debugger", version)]
#[command(about = "Interactive step debugger for NeoVM 3 scripts")]
pub struct Config {
    /// Speak the Debug Adapter Protocol on stdin/stdout instead of the prompt
    #[arg(long, alias = "debug-adapter")]
    pub dap: bool,

    /// Hex-encoded script to load before the first command
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,

    /// Raw script file to load before the first command
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Maximum instructions a single command may execute
    #[arg(long)]
    pub max_steps: Option<NonZeroUsize>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Config {
    pub fn step_limit(&self) -> Option<usize> {
        self.max_steps.map(NonZeroUsize::get)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let config = Config::parse_from([
            "neovm-debugger",
            "--debug-adapter",
            "--max-steps",
            "500",
        ]);
        assert!(config.dap);
        assert_eq!(config.step_limit(), Some(500));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn rejects_zero_step_limit() {
        assert!(Config::try_parse_from(["neovm-debugger", "--max-steps", "0"]).is_err());
        assert!(Config::try_parse_from(["neovm-debugger", "--hex", "11", "--file", "a"]).is_err());
    }
}
