//! Playwright browser automation
//!
//! A browser session is a list of [`BrowserStep`]s rendered into one Node
//! script. The script launches the browser, runs the steps, prints a single
//! JSON line with the captured texts and closes the browser in `finally`,
//! so a session never outlives its process.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// One interaction inside a browser session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserStep {
    /// Build a form with hidden fields on a blank page and submit it
    SubmitForm {
        action: String,
        method: String,
        fields: Vec<(String, String)>,
    },

    /// Fill an input field
    Fill { selector: String, value: String },

    /// Click an element
    Click { selector: String },

    /// Wait until one of `selectors` is visible and capture the text of
    /// `child` inside it (or of the block itself)
    ReadFirstVisible {
        selectors: Vec<String>,
        child: Option<String>,
    },
}

impl BrowserStep {
    fn name(&self) -> String {
        match self {
            BrowserStep::SubmitForm { action, method, .. } => format!("submit:{} {}", method, action),
            BrowserStep::Fill { selector, .. } => format!("fill:{}", selector),
            BrowserStep::Click { selector } => format!("click:{}", selector),
            BrowserStep::ReadFirstVisible { selectors, .. } => {
                format!("read:{}", selectors.join("|"))
            }
        }
    }
}

/// Text captured by a [`BrowserStep::ReadFirstVisible`] step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub step: usize,
    pub selector: String,
    pub text: String,
}

/// JSON line printed by a session script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutput {
    pub success: bool,
    #[serde(default)]
    pub captures: Vec<Capture>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub screenshot: Option<PathBuf>,
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Timeout of each page interaction
    pub timeout_ms: u64,
    /// Failure screenshots land here
    pub artifacts_dir: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            timeout_ms: 10_000,
            artifacts_dir: PathBuf::from("test-results/artifacts"),
        }
    }
}

/// Playwright driver owning a scratch directory for session scripts.
/// The directory is removed when the handle is dropped.
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
    workdir: TempDir,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;
        Self::create(config)
    }

    fn create(config: PlaywrightConfig) -> E2eResult<Self> {
        std::fs::create_dir_all(&config.artifacts_dir)?;
        let workdir = tempfile::Builder::new().prefix("payflow-browser").tempdir()?;
        Ok(Self { config, workdir })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    /// Run `steps` in a fresh browser and return the captured texts
    pub async fn run_session(&self, session: &str, steps: &[BrowserStep]) -> E2eResult<Vec<Capture>> {
        let script = self.build_script(session, steps);
        let output = self.run_script(session, &script, self.session_timeout(steps.len())).await?;

        if output.success {
            Ok(output.captures)
        } else {
            let mut message = output.error.unwrap_or_else(|| "unknown error".to_string());
            if let Some(path) = output.screenshot {
                message.push_str(&format!(" (screenshot: {})", path.display()));
            }
            Err(E2eError::Playwright(message))
        }
    }

    fn session_timeout(&self, steps: usize) -> Duration {
        // Browser launch and teardown get two extra step budgets
        Duration::from_millis(self.config.timeout_ms.saturating_mul(steps as u64 + 2))
    }

    fn screenshot_path(&self, session: &str) -> PathBuf {
        self.config
            .artifacts_dir
            .join(format!("{}-failure.png", session_file(session)))
    }

    /// Build the Playwright script for a session
    pub fn build_script(&self, session: &str, steps: &[BrowserStep]) -> String {
        let mut script = String::new();

        script.push_str(&format!(
            r#"
const {{ {browser} }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const timeout = {timeout};
  const captures = [];

  try {{
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = self.config.viewport_width,
            height = self.config.viewport_height,
            timeout = self.config.timeout_ms,
        ));

        for (i, step) in steps.iter().enumerate() {
            script.push_str(&format!("\n    // Step {}: {}\n", i + 1, step.name()));
            script.push_str(&step_to_js(step, i));
            script.push('\n');
        }

        script.push_str(&format!(
            r#"
    console.log(JSON.stringify({{ success: true, captures }}));
  }} catch (error) {{
    const screenshot = {screenshot};
    await page.screenshot({{ path: screenshot, fullPage: true }}).catch(() => {{}});
    console.log(JSON.stringify({{ success: false, error: error.message, screenshot, captures }}));
    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
}})();
"#,
            screenshot = js_str(&self.screenshot_path(session).to_string_lossy()),
        ));

        script
    }

    /// Execute a script with node and parse its result line
    async fn run_script(&self, session: &str, script: &str, limit: Duration) -> E2eResult<SessionOutput> {
        let script_path = self.workdir.path().join(format!("{}.js", session_file(session)));
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path).kill_on_drop(true);
        if let Some(node_path) = local_node_modules() {
            cmd.env("NODE_PATH", node_path);
        }

        let output = tokio::time::timeout(limit, cmd.output())
            .await
            .map_err(|_| E2eError::Timeout(format!("browser session '{}'", session)))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_output(&stdout) {
            Some(parsed) => Ok(parsed),
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!("Browser session '{}' printed no result line", session);
                Err(E2eError::Playwright(format!(
                    "Script failed ({}):\nstdout: {}\nstderr: {}",
                    output.status, stdout, stderr
                )))
            }
        }
    }
}

/// Convert a step to JavaScript code
fn step_to_js(step: &BrowserStep, step_index: usize) -> String {
    match step {
        BrowserStep::SubmitForm { action, method, fields } => {
            let args = json!({ "action": action, "method": method, "fields": fields });
            format!(
                r#"    await Promise.all([
      page.waitForNavigation({{ timeout }}),
      page.evaluate(({{ action, method, fields }}) => {{
        const form = document.createElement('form');
        form.method = method;
        form.action = action;
        for (const [name, value] of fields) {{
          const hidden = document.createElement('input');
          hidden.type = 'hidden';
          hidden.name = name;
          hidden.value = value;
          form.appendChild(hidden);
        }}
        document.body.appendChild(form);
        form.submit();
      }}, {args}),
    ]);"#,
                args = args
            )
        }
        BrowserStep::Fill { selector, value } => {
            format!(
                r#"    await page.fill({}, {}, {{ timeout }});"#,
                js_str(selector),
                js_str(value)
            )
        }
        BrowserStep::Click { selector } => {
            format!(r#"    await page.click({}, {{ timeout }});"#, js_str(selector))
        }
        BrowserStep::ReadFirstVisible { selectors, child } => {
            let child = child.as_deref().map(js_str).unwrap_or_else(|| "null".to_string());
            format!(
                r#"    {{
      const selectors = {selectors};
      const child = {child};
      await page.locator(selectors.join(', ')).first().waitFor({{ state: 'visible', timeout }});
      for (const selector of selectors) {{
        const block = page.locator(selector).first();
        if (await block.isVisible()) {{
          const target = child ? block.locator(child).first() : block;
          captures.push({{ step: {step_index}, selector, text: (await target.innerText()).trim() }});
          break;
        }}
      }}
    }}"#,
                selectors = json!(selectors),
                child = child,
                step_index = step_index
            )
        }
    }
}

/// Quote a string as a JavaScript literal
fn js_str(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

fn session_file(session: &str) -> String {
    session
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Last parseable JSON object line of the script's stdout
fn parse_output(stdout: &str) -> Option<SessionOutput> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str(line).ok())
}

fn local_node_modules() -> Option<PathBuf> {
    let dir = std::env::current_dir().ok()?.join("node_modules");
    is_dir(&dir).then_some(dir)
}

fn is_dir(path: &Path) -> bool {
    path.metadata().map(|m| m.is_dir()).unwrap_or(false)
}
