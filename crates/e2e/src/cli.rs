//! Command-line arguments of the harness binary
//!
//! `cargo test` forwards libtest flags (`--nocapture`, `--test-threads 1`,
//! ...) and name filters to harness-less test binaries. Those are dropped or
//! turned into scenario filters before clap sees the rest, so suite flags are
//! always honored and a mistyped suite flag is still an error.

use std::path::PathBuf;

use clap::Parser;

use crate::config::SuiteConfig;
use crate::playwright::Browser;

/// libtest switches without a value
const LIBTEST_FLAGS: &[&str] = &[
    "--nocapture",
    "--show-output",
    "--quiet",
    "-q",
    "--exact",
    "--ignored",
    "--include-ignored",
    "--test",
    "--bench",
    "--force-run-in-process",
    "--report-time",
    "--ensure-time",
    "--shuffle",
];

/// libtest options taking a value, as `--opt value` or `--opt=value`
const LIBTEST_OPTIONS: &[&str] = &[
    "--test-threads",
    "--color",
    "--format",
    "--skip",
    "--logfile",
    "--shuffle-seed",
];

#[derive(Parser, Debug)]
#[command(name = "payflow-e2e")]
#[command(about = "E2E suite for the hosted payment confirmation flow")]
pub struct HarnessArgs {
    /// Path to the suite configuration file
    #[arg(short, long, env = "PAYFLOW_CONFIG", default_value = "payflow.toml")]
    pub config: PathBuf,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    pub name: Option<String>,

    /// List scenarios and exit
    #[arg(long)]
    pub list: bool,

    /// Base URL of the backend under test
    #[arg(long)]
    pub base_url: Option<String>,

    /// Merchant id
    #[arg(long)]
    pub merchant_id: Option<String>,

    /// Merchant key
    #[arg(long)]
    pub merchant_key: Option<String>,

    /// Status queries before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Pause between status queries in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Browser to use
    #[arg(long, value_enum)]
    pub browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Output directory for results
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Name substrings forwarded by `cargo test <filter>`
    #[arg(hide = true)]
    pub filters: Vec<String>,
}

impl HarnessArgs {
    /// Parse `args` (program name first) after dropping libtest flags
    pub fn try_parse_harness<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::try_parse_from(strip_libtest_args(args.into_iter().map(Into::into)))
    }

    /// Apply CLI overrides on top of file and environment values
    pub fn apply(&self, config: &mut SuiteConfig) {
        if let Some(url) = &self.base_url {
            config.api.base_url = url.clone();
        }
        config.override_credentials(self.merchant_id.clone(), self.merchant_key.clone());
        if let Some(max_attempts) = self.max_attempts {
            config.polling.max_attempts = max_attempts;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.polling.delay_ms = delay_ms;
        }
        if let Some(browser) = self.browser {
            config.browser.browser = browser;
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
    }

    /// Whether a scenario name passes the forwarded filters
    pub fn matches_filters(&self, name: &str) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|f| name.contains(f.as_str()))
    }
}

/// Drop the flags libtest understands and this harness does not
pub fn strip_libtest_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut kept = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if LIBTEST_FLAGS.contains(&arg.as_str()) {
            continue;
        }
        if LIBTEST_OPTIONS.contains(&arg.as_str()) || arg == "-Z" {
            args.next();
            continue;
        }
        let inline_option = LIBTEST_OPTIONS
            .iter()
            .any(|opt| arg.strip_prefix(opt).is_some_and(|rest| rest.starts_with('=')));
        if inline_option || arg.starts_with("-Z") {
            continue;
        }
        kept.push(arg);
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<HarnessArgs, clap::Error> {
        let mut argv = vec!["e2e"];
        argv.extend_from_slice(args);
        HarnessArgs::try_parse_harness(argv)
    }

    #[test]
    fn test_suite_flags_survive_libtest_flags() {
        let args = parse(&["--tag", "api", "--nocapture", "--test-threads", "1", "--color=never"])
            .unwrap();
        assert_eq!(args.tag.as_deref(), Some("api"));
        assert!(args.filters.is_empty());
    }

    #[test]
    fn test_mistyped_flag_is_an_error() {
        let err = parse(&["--nmae", "payment-done"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_positional_filters() {
        let args = parse(&["--quiet", "rejected"]).unwrap();
        assert_eq!(args.filters, vec!["rejected"]);
        assert!(args.matches_filters("payment-rejected"));
        assert!(!args.matches_filters("payment-done"));
    }

    #[test]
    fn test_strip_libtest_args() {
        let kept = strip_libtest_args(
            ["e2e", "-q", "--format", "terse", "-Zunstable-options", "--name", "payment-done"]
                .map(String::from),
        );
        assert_eq!(kept, vec!["e2e", "--name", "payment-done"]);
    }

    #[test]
    fn test_apply_overrides() {
        let args = parse(&[
            "--base-url",
            "https://payments.test",
            "--max-attempts",
            "3",
            "--headed",
            "--browser",
            "firefox",
        ])
        .unwrap();
        let mut config = SuiteConfig::default();
        args.apply(&mut config);

        assert_eq!(config.api.base_url, "https://payments.test");
        assert_eq!(config.polling.max_attempts, 3);
        assert!(!config.browser.headless);
        assert_eq!(config.browser.browser, Browser::Firefox);
    }
}
