//! Output formatting for the CLI
//!
//! Rendering lives here, outside the simulation core: the core hands over
//! plain snapshot data and this module turns it into text.

use crate::{grid::Cell, sim::GridSnapshot};

/// Print a section header
pub fn print_section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Print a subsection header
pub fn print_subsection(title: &str) {
    println!("\n{title}");
    println!("{}", "-".repeat(40));
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:24} {}", format!("{key}:"), value);
}

/// Format a number with thousands separators
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i.is_multiple_of(3) {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}

fn place(labels: &mut [Vec<String>], cell: Cell, label: &str) {
    let slot = &mut labels[cell.row][cell.col];
    if !slot.is_empty() {
        slot.push('/');
    }
    slot.push_str(label);
}

/// Render a placement snapshot as a text diagram
///
/// Waypoints show as `A` and `B`, agents as their 1-based index; labels
/// sharing a cell are stacked with `/`.
pub fn render_snapshot(snapshot: &GridSnapshot) -> String {
    let n = snapshot.grid_size;
    let mut labels = vec![vec![String::new(); n]; n];

    place(&mut labels, snapshot.waypoints.a, "A");
    place(&mut labels, snapshot.waypoints.b, "B");
    for (idx, position) in snapshot.positions.iter().enumerate() {
        place(&mut labels, *position, &(idx + 1).to_string());
    }

    let width = labels
        .iter()
        .flatten()
        .map(String::len)
        .max()
        .unwrap_or(1)
        .max(1);

    let mut out = String::new();
    for row in &labels {
        let rendered: Vec<String> = row
            .iter()
            .map(|label| {
                let text = if label.is_empty() { "." } else { label.as_str() };
                format!("{text:^width$}")
            })
            .collect();
        out.push_str("[ ");
        out.push_str(&rendered.join(" | "));
        out.push_str(" ]\n");
    }
    out
}
