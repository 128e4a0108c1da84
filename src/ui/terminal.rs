use std::io::{self, Write};

use crate::services::{ClassAvailability, RosterRow, RosterStats, RosterView};
use crate::ui::{Notification, Renderer};

const HEADERS: [&str; 6] = ["ID", "Nome", "Nascimento", "Email", "Status", "Turma"];

pub fn row_cells(row: &RosterRow) -> [String; 6] {
    let student = &row.student;
    [
        student.id.to_string(),
        student.name.clone(),
        student.birth_date.format("%d/%m/%Y").to_string(),
        student.email.clone().unwrap_or_else(|| "-".to_string()),
        if student.active { "Ativo" } else { "Inativo" }.to_string(),
        row.class_name.clone(),
    ]
}

pub fn format_table(rows: &[RosterRow]) -> String {
    let cells: Vec<[String; 6]> = rows.iter().map(row_cells).collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |values: &[String]| -> String {
        values
            .iter()
            .zip(widths.iter())
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(&HEADERS.map(String::from)));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &cells {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

pub fn format_stats(stats: &RosterStats) -> String {
    format!(
        "Total de alunos: {} | Alunos ativos: {} | Alunos inativos: {}",
        stats.total, stats.active, stats.inactive
    )
}

/// Options of a class select. Assignment selects mark full classes as
/// disabled; the listing filter keeps them selectable.
pub fn format_class_options(classes: &[ClassAvailability], assignment: bool) -> Vec<String> {
    classes
        .iter()
        .map(|c| {
            if assignment && c.is_full {
                format!("[{}] {} (lotada, indisponível)", c.class.id, c.label)
            } else {
                format!("[{}] {}", c.class.id, c.label)
            }
        })
        .collect()
}

/// Table, counters and the class filter choices usable with `--class`.
pub fn format_roster(view: &RosterView) -> String {
    let mut out = format_table(&view.rows);
    out.push_str(&format_stats(&view.stats));
    out.push('\n');
    if !view.classes.is_empty() {
        let options = format_class_options(&view.classes, false);
        out.push_str(&format!("Filtro por turma: {}\n", options.join(", ")));
    }
    out
}

/// Management list followed by the filter and assignment selects.
pub fn format_classes(classes: &[ClassAvailability]) -> String {
    let mut out = String::from("Turmas:\n");
    for class in classes {
        out.push_str(&format!("  [{}] {}\n", class.class.id, class.management_label()));
    }
    out.push_str("Filtro por turma:\n");
    for option in format_class_options(classes, false) {
        out.push_str(&format!("  {}\n", option));
    }
    out.push_str("Disponíveis para matrícula:\n");
    for option in format_class_options(classes, true) {
        out.push_str(&format!("  {}\n", option));
    }
    out
}

/// Writes to stdout; diagnostics go through `tracing` on stderr.
#[derive(Default)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    pub fn new() -> Self {
        Self
    }

    fn emit(&self, text: &str) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

impl Renderer for TerminalRenderer {
    fn render_roster(&self, view: &RosterView) {
        self.emit(&format_roster(view));
    }

    fn render_classes(&self, classes: &[ClassAvailability]) {
        self.emit(&format_classes(classes));
    }

    fn notify(&self, notification: &Notification) {
        self.emit(&format!("{}\n", notification));
    }
}
