//! Terminal host for the integration workflow.

use zvault_integrations::{Destination, Notice, NoticeLevel, Shell};

// ── ANSI color helpers ───────────────────────────────────────────────

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const WHITE: &str = "\x1b[37m";

// ── Pretty output helpers ────────────────────────────────────────────

pub fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

pub fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<20}{RESET} {WHITE}{value}{RESET}");
}

pub fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

pub fn warning(msg: &str) {
    println!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

/// Open `url` in the default browser. Failures are ignored; the URL is
/// always printed as well.
pub fn open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    {
        let _ = std::process::Command::new("open").arg(url).spawn();
    }
    #[cfg(target_os = "linux")]
    {
        let _ = std::process::Command::new("xdg-open").arg(url).spawn();
    }
    #[cfg(target_os = "windows")]
    {
        let _ = std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn();
    }
}

/// Prints notices and destinations, and opens external pages in the
/// browser unless disabled.
#[derive(Debug)]
pub struct TerminalShell {
    site_url: String,
    open_external: bool,
}

impl TerminalShell {
    pub fn new(site_url: impl Into<String>, open_external: bool) -> Self {
        Self {
            site_url: site_url.into(),
            open_external,
        }
    }
}

impl Shell for TerminalShell {
    fn navigate(&self, destination: &Destination) {
        let url = destination.url(&self.site_url);
        match destination {
            Destination::External(_) => {
                println!("  {DIM}Opening browser for authorization...{RESET}");
                println!();
                println!("  {CYAN}{url}{RESET}");
                println!();
                if self.open_external {
                    open_browser(&url);
                }
            }
            Destination::ConfigureForm { .. } | Destination::IntegrationsList { .. } => {
                println!("  {DIM}Continue at{RESET} {CYAN}{url}{RESET}");
            }
        }
    }

    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Success => success(&format!("{}: {}", notice.title, notice.message)),
            NoticeLevel::Info => println!("  {BOLD}{}{RESET} {}", notice.title, notice.message),
            NoticeLevel::Error => {
                eprintln!("  {RED}{BOLD}✗ {}:{RESET} {}", notice.title, notice.message);
            }
        }
    }
}
