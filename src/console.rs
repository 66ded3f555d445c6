//! Console output for probe runs.
//!
//! Plain lines go out untouched; success and warning lines are colored when
//! color is enabled.

use crossterm::style::{style, Stylize};
use std::io::{self, IsTerminal, Write};

/// Line sink used by the probes.
#[cfg_attr(test, mockall::automock)]
pub trait Reporter {
    fn info(&mut self, line: &str) -> io::Result<()>;
    fn success(&mut self, line: &str) -> io::Result<()>;
    fn warning(&mut self, line: &str) -> io::Result<()>;
}

/// カラーサポート検出
pub fn detect_color_support() -> bool {
    // NO_COLOR環境変数でカラー無効化
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    // FORCE_COLOR環境変数でカラー強制有効化（テスト用）
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }

    io::stdout().is_terminal() && std::env::var("TERM").is_ok_and(|term| term != "dumb")
}

/// Writes report lines to any writer, stdout by default.
pub struct TerminalReporter<W: Write = io::Stdout> {
    out: W,
    color: bool,
}

impl TerminalReporter<io::Stdout> {
    pub fn stdout(color: bool) -> Self {
        Self::new(io::stdout(), color)
    }
}

impl<W: Write> TerminalReporter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match writeln!(self.out, "{}", line) {
            // Broken pipeは正常な終了として扱う
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        }
    }
}

impl<W: Write> Reporter for TerminalReporter<W> {
    fn info(&mut self, line: &str) -> io::Result<()> {
        self.write_line(line)
    }

    fn success(&mut self, line: &str) -> io::Result<()> {
        if self.color {
            let styled = style(line).green().to_string();
            self.write_line(&styled)
        } else {
            self.write_line(line)
        }
    }

    fn warning(&mut self, line: &str) -> io::Result<()> {
        if self.color {
            let styled = style(line).yellow().to_string();
            self.write_line(&styled)
        } else {
            self.write_line(line)
        }
    }
}
