//! Plain-text rendering of the period summary and detail table.

use std::fmt::Write;

use chrono::TimeZone;
use shared::{
    aggregate::{display_date_in, Aggregate, Counts},
    domain::Period,
};

pub fn build_report(period: Period, view: &Aggregate) -> String {
    build_report_in(period, view, &chrono::Local)
}

pub fn build_report_in<Tz: TimeZone>(period: Period, view: &Aggregate, tz: &Tz) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Resumo dos Dados - {period}");
    if view.is_empty() {
        let _ = writeln!(output, "Nenhum registro para este período.");
        return output;
    }

    let _ = writeln!(output);
    write_counts(&mut output, "Por Status", "Status", &view.by_status);
    let _ = writeln!(output);
    write_counts(&mut output, "Por Setor", "Setor", &view.by_sector);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Dados Detalhados");
    let header = [
        "Nome",
        "Setor",
        "Status",
        "Data Entrada",
        "Data Saída",
        "Hospital",
    ]
    .map(str::to_string);
    let rows: Vec<[String; 6]> = view
        .filtered
        .iter()
        .map(|record| {
            [
                record.name.clone(),
                record.sector_key().to_string(),
                record.status_key().to_string(),
                display_date_in(record.entry.as_ref(), tz),
                display_date_in(record.exit.as_ref(), tz),
                record.hospital_key().to_string(),
            ]
        })
        .collect();
    write_table(&mut output, &header, rows.as_slice());

    output
}

fn write_counts(output: &mut String, title: &str, label: &str, counts: &Counts) {
    let _ = writeln!(output, "## {title}");
    let rows: Vec<[String; 2]> = counts
        .iter()
        .map(|(key, count)| [key.clone(), count.to_string()])
        .collect();
    write_table(
        output,
        &[label.to_string(), "Quantidade".to_string()],
        rows.as_slice(),
    );
}

fn write_table<const N: usize>(output: &mut String, header: &[String; N], rows: &[[String; N]]) {
    let mut widths = header.clone().map(|h| h.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    write_row(output, header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(output, "| {} |", rule.join(" | "));
    for row in rows {
        write_row(output, row, &widths);
    }
}

fn write_row(output: &mut String, cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    let _ = writeln!(output, "| {} |", padded.join(" | "));
}

#[cfg(test)]
#[path = "tests/report_tests.rs"]
mod tests;
