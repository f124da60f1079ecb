// src/display/terminal.rs
//! Terminal summary of the map registry

use crate::{
    bridge::RegistrySnapshot,
    error::{MapError, Result},
    interop::CallReport,
};
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{self, Write};

pub struct TerminalDisplay;

impl TerminalDisplay {
    pub fn new() -> Self {
        Self
    }

    /// Print the call reports followed by the registry state
    pub fn show(&self, reports: &[CallReport], snapshot: &RegistrySnapshot) -> Result<()> {
        let mut stdout = io::stdout();
        self.render_reports(&mut stdout, reports)?;
        self.render_registry(&mut stdout, snapshot)?;
        stdout.flush().map_err(MapError::Io)
    }

    fn render_reports(&self, out: &mut impl Write, reports: &[CallReport]) -> Result<()> {
        if reports.is_empty() {
            return Ok(());
        }

        execute!(
            out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\nCalls\n"),
            Print("=".repeat(60)),
            Print("\n"),
            ResetColor
        )
        .map_err(MapError::Io)?;

        for (index, report) in reports.iter().enumerate() {
            let (color, status) = if report.ok {
                (Color::Green, "ok".to_string())
            } else {
                (
                    Color::Red,
                    report.error.clone().unwrap_or_else(|| "failed".to_string()),
                )
            };
            execute!(
                out,
                Print(format!("{:>3}. {:<16}", index + 1, report.call)),
                SetForegroundColor(color),
                Print(status),
                ResetColor,
                Print("\n")
            )
            .map_err(MapError::Io)?;
        }
        Ok(())
    }

    fn render_registry(&self, out: &mut impl Write, snapshot: &RegistrySnapshot) -> Result<()> {
        execute!(
            out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print(format!("\nMaps ({})\n", snapshot.maps.len())),
            Print("=".repeat(60)),
            Print("\n"),
            ResetColor
        )
        .map_err(MapError::Io)?;

        if snapshot.maps.is_empty() {
            execute!(
                out,
                SetForegroundColor(Color::DarkGrey),
                Print("No maps initialized\n"),
                ResetColor
            )
            .map_err(MapError::Io)?;
        }

        for map in &snapshot.maps {
            execute!(
                out,
                SetForegroundColor(Color::Cyan),
                Print(&map.id),
                ResetColor,
                Print(format!(
                    "  center {:>10.6}, {:>11.6}  zoom {:>4.1}  layers {}\n",
                    map.view.center.lat,
                    map.view.center.lng,
                    map.view.zoom,
                    map.layers.len()
                ))
            )
            .map_err(MapError::Io)?;

            if let Some(fitted) = map.view.fitted {
                execute!(
                    out,
                    Print(format!(
                        "    fitted  SW {:.6}, {:.6}  NE {:.6}, {:.6}\n",
                        fitted.south_west.lat,
                        fitted.south_west.lng,
                        fitted.north_east.lat,
                        fitted.north_east.lng
                    ))
                )
                .map_err(MapError::Io)?;
            }
        }

        if !snapshot.pending.is_empty() {
            execute!(
                out,
                SetForegroundColor(Color::Yellow),
                Print(format!("Pending: {}\n", snapshot.pending.join(", "))),
                ResetColor
            )
            .map_err(MapError::Io)?;
        }

        Ok(())
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}
